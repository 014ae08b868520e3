//! Platform-independent HX711 load cell driver.
//!
//! The driver only depends on `embedded-hal` digital pins and an
//! `embedded-timers` clock, so it runs on any MCU or SBC that can provide them.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod sensor;
