//! State shared with interrupt handlers.

use core::cell::Cell;

use critical_section::Mutex;

use crate::button::EdgeLatch;
use crate::data_types::ButtonId;

#[derive(Clone, Copy)]
struct TickState {
    pending: bool,
    ticks: u32,
}

/// 10 ms timebase written by the timer ISR.
pub struct Timebase {
    state: Mutex<Cell<TickState>>,
}

impl Timebase {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(TickState { pending: false, ticks: 0 })),
        }
    }

    /// Timer ISR entry: one 10 ms period elapsed.
    pub fn on_tick(&self) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            state.pending = true;
            state.ticks = state.ticks.wrapping_add(1);
            cell.set(state);
        });
    }

    /// Consume the pending flag; true if a 10 ms slice is due.
    pub fn take_pending(&self) -> bool {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            let pending = state.pending;
            state.pending = false;
            cell.set(state);
            pending
        })
    }

    /// Wrapping count of 10 ms periods since boot.
    pub fn now_10ms(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow(cs).get().ticks)
    }
}

impl Default for Timebase {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the interrupt handlers write. Meant to live in a `static`.
pub struct Signals {
    pub timebase: Timebase,
    pub mode_button: EdgeLatch,
    pub output_button: EdgeLatch,
}

impl Signals {
    pub const fn new() -> Self {
        Self {
            timebase: Timebase::new(),
            mode_button: EdgeLatch::new(),
            output_button: EdgeLatch::new(),
        }
    }

    pub fn latch(&self, id: ButtonId) -> &EdgeLatch {
        match id {
            ButtonId::Mode => &self.mode_button,
            ButtonId::Output => &self.output_button,
        }
    }
}

impl Default for Signals {
    fn default() -> Self {
        Self::new()
    }
}
