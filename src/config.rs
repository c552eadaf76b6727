//! Tuner configuration

use crate::{constants::*, errors::*, tables::Standard};

/// How much AGC settling `set_frequency` waits for
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuneMode {
    /// Waits for the LNA to settle before tightening its take-over point
    Normal,
    /// Skips the settle delay, leaves the fast AGC clock running
    Fast,
}

/// RF input selection
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputPath {
    /// Boards with a diplexer: air input at and above 320 MHz, cable-1 below
    Auto,
    /// Air input only
    Air,
    /// Cable-1 input only
    Cable1,
}

/// Tuner configuration
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// 7-bit I2C address
    pub address: u8,
    /// Crystal frequency, kHz
    pub xtal_khz: u32,
    /// Standard selected by `initialise`
    pub standard: Standard,
    pub tune_mode: TuneMode,
    pub input: InputPath,
    /// Run the image-rejection search during `initialise`
    pub calibrate_imr: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            address: I2C_ADDRESS,
            xtal_khz: XTAL_FREQ_KHZ,
            standard: Standard::DvbT6M,
            tune_mode: TuneMode::Normal,
            input: InputPath::Air,
            calibrate_imr: false,
        }
    }
}

impl Config {
    pub fn address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Sets the crystal frequency, kHz.
    pub fn xtal_khz(mut self, xtal_khz: u32) -> Result<Self, Error> {
        (if !(XTAL_FREQ_MIN_KHZ..=XTAL_FREQ_MAX_KHZ).contains(&xtal_khz) {
            Err(Error::FrequencyOutOfRange)
        } else {
            Ok(())
        })?;
        self.xtal_khz = xtal_khz;
        Ok(self)
    }

    pub fn standard(mut self, standard: Standard) -> Self {
        self.standard = standard;
        self
    }

    pub fn tune_mode(mut self, tune_mode: TuneMode) -> Self {
        self.tune_mode = tune_mode;
        self
    }

    pub fn input(mut self, input: InputPath) -> Self {
        self.input = input;
        self
    }

    pub fn calibrate_imr(mut self, enable: bool) -> Self {
        self.calibrate_imr = enable;
        self
    }

    /// Reference clock of the image-rejection ring oscillator, kHz
    pub(crate) fn ring_ref_khz(&self) -> u32 {
        if self.xtal_khz > 24_000 {
            self.xtal_khz / 2
        } else {
            self.xtal_khz
        }
    }

    /// 16 MHz crystals lock in a narrower VCO band window
    pub(crate) fn narrow_vco_window(&self) -> bool {
        self.xtal_khz == 16_000
    }
}
