//! Control core of a SEPIC bench power supply / battery charger.
//!
//! The crate regulates output voltage or current by stepping a PWM duty cycle, protects the
//! power stage, and switches between a closed set of operating modes from two front-panel
//! buttons. It is `no_std` and talks to hardware only through [`Board`] and the
//! `embedded-hal` 1.0 traits, so the whole loop runs on the host in tests.
//!
//! Entry points: build a [`Controller`] over a [`Board`] and a `'static` [`Signals`], call
//! [`Controller::start`] once and [`Controller::fast_tick`] from the main loop. The timer
//! ISR calls [`Timebase::on_tick`] every 10 ms; button ISRs call [`EdgeLatch::on_edge`].

#![no_std]

mod fmt;

pub mod board;
pub mod button;
pub mod calibration;
pub mod charge;
pub mod config;
pub mod controller;
pub mod data_types;
pub mod error;
pub mod filter;
pub mod leds;
pub mod measurement;
pub mod mode;
pub mod protection;
pub mod pwm;
pub mod regulator;
pub mod scheduler;
pub mod settings;
pub mod timebase;

pub use board::Board;
pub use button::EdgeLatch;
pub use config::Config;
pub use controller::Controller;
pub use error::Error;
pub use timebase::{Signals, Timebase};
