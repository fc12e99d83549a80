//! Button edge capture and short / long press classification.
//!
//! The edge interrupt only touches an [`EdgeLatch`]. Everything else runs in the 100 ms poll:
//! while the latch is set and the line is still low the hold counter climbs, a hold past the
//! timeout fires `Held` once, and the release fires `Pressed` unless a `Held` already went out.
//! After every release the latch stays disarmed for a few polls to swallow contact bounce.

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::InputPin;

use crate::config::ButtonTiming;
use crate::data_types::ButtonEvent;

/// Press flag shared with the edge interrupt.
pub struct EdgeLatch {
    pressed: AtomicBool,
    armed: AtomicBool,
}

impl EdgeLatch {
    pub const fn new() -> Self {
        Self {
            pressed: AtomicBool::new(false),
            armed: AtomicBool::new(true),
        }
    }

    /// Interrupt entry: latch a press and disarm until the classifier re-arms.
    pub fn on_edge(&self) {
        if self.armed.load(Ordering::Acquire) {
            self.armed.store(false, Ordering::Release);
            self.pressed.store(true, Ordering::Release);
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::Acquire)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    fn release(&self) {
        self.pressed.store(false, Ordering::Release);
    }

    fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }
}

impl Default for EdgeLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one 100 ms poll.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ButtonPoll {
    pub event: Option<ButtonEvent>,
    /// The latch went live again this poll; the edge interrupt should be re-attached.
    pub rearmed: bool,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ButtonClassifier {
    timing: ButtonTiming,
    held_100ms: u8,
    long_pressed: bool,
    rearm_in_100ms: u8,
}

impl ButtonClassifier {
    pub fn new(timing: ButtonTiming) -> Self {
        Self {
            timing,
            held_100ms: 0,
            long_pressed: false,
            rearm_in_100ms: 0,
        }
    }

    pub fn held_100ms(&self) -> u8 {
        self.held_100ms
    }

    /// Run one poll cycle. `line` is active low.
    pub fn poll<P: InputPin>(&mut self, latch: &EdgeLatch, line: &mut P) -> Result<ButtonPoll, P::Error> {
        let mut outcome = ButtonPoll::default();

        if self.rearm_in_100ms > 0 {
            self.rearm_in_100ms -= 1;
            if self.rearm_in_100ms == 0 {
                latch.arm();
                outcome.rearmed = true;
            }
        }

        if !latch.is_pressed() {
            return Ok(outcome);
        }

        if line.is_low()? {
            self.held_100ms = self.held_100ms.saturating_add(1);
            if self.held_100ms > self.timing.hold_timeout_100ms {
                self.held_100ms = 0;
                self.long_pressed = true;
                outcome.event = Some(ButtonEvent::Held);
            }
        } else {
            latch.release();
            self.held_100ms = 0;
            if self.long_pressed {
                self.long_pressed = false;
            } else {
                outcome.event = Some(ButtonEvent::Pressed);
            }
            self.rearm_in_100ms = self.timing.rearm_delay_100ms.max(1);
        }

        Ok(outcome)
    }
}

/// Whether an active-low button line is currently held down.
pub fn is_down<P: InputPin>(line: &mut P) -> Result<bool, P::Error> {
    line.is_low()
}

/// Await the next falling edge on `line` and latch it, for boards that run the edge capture as a task.
#[cfg(feature = "async")]
pub async fn capture_edge<P>(line: &mut P, latch: &EdgeLatch) -> Result<(), P::Error>
where
    P: embedded_hal_async::digital::Wait,
{
    line.wait_for_falling_edge().await?;
    latch.on_edge();
    Ok(())
}
