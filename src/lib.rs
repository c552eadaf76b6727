#![cfg_attr(not(test), no_std)]

//! (R820T)[https://www.rafaelmicro.com] tuner driver.
//!
//! Frequency synthesis and self-calibration for the R820T/R820T2 silicon
//! tuner: fractional-N PLL, crystal load trim, channel filter calibration
//! and the I/Q image-rejection search.

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod constants;
pub mod register;
pub mod errors;
pub mod config;
pub mod tables;
pub mod frequency;
pub mod calibration;
pub mod imr;
pub mod gain;
pub mod device;
mod tune;

pub use calibration::CrystalCap;
pub use config::{Config, InputPath, TuneMode};
pub use device::{Host, R820t};
pub use errors::Error;
pub use gain::{GainMode, RfGain};
pub use tables::Standard;
