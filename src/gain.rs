//! RF gain control

use embedded_hal::blocking::i2c::{Read, Write};

use crate::{
    constants::*,
    device::{Host, R820t},
    errors::*,
    register::*,
};

/// LNA gain added by each step, tenths of dB
pub const LNA_GAIN_STEPS: [i16; 16] = [0, 9, 13, 40, 38, 13, 31, 22, 26, 31, 26, 14, 19, 5, 35, 13];

/// Mixer gain added by each step, tenths of dB
pub const MIXER_GAIN_STEPS: [i16; 16] = [0, 5, 10, 10, 19, 9, 10, 25, 17, 10, 8, 16, 13, 6, 3, -8];

/// Gain control source
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GainMode {
    /// LNA and mixer AGC, VGA at 26.5 dB
    Auto,
    /// Fixed LNA and mixer steps, VGA at 16.3 dB
    Manual,
}

/// LNA / mixer step pair
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GainSteps {
    pub lna: u8,
    pub mixer: u8,
    /// Modeled gain of the pair, tenths of dB
    pub total: i16,
}

/// Walks both step tables, LNA first, until `target` is reached.
pub fn gain_steps(target: i16) -> GainSteps {
    let mut steps = GainSteps { lna: 0, mixer: 0, total: 0 };
    for _ in 0..15 {
        if steps.total >= target {
            break;
        }
        steps.lna += 1;
        steps.total += LNA_GAIN_STEPS[steps.lna as usize];
        if steps.total >= target {
            break;
        }
        steps.mixer += 1;
        steps.total += MIXER_GAIN_STEPS[steps.mixer as usize];
    }
    steps
}

/// Gain indices reported by the chip
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RfGain {
    pub lna: u8,
    pub mixer: u8,
    /// `lna * 2 + mixer`
    pub combined: u8,
}

impl<I2C, E, H> R820t<I2C, H>
where
    I2C: Write<Error = E> + Read<Error = E>,
    H: Host,
{
    pub(crate) fn apply_gain_mode(&mut self, mode: GainMode) -> Result<(), Error> {
        let (lna, mixer, vga) = match mode {
            GainMode::Manual => (LnaGainMode::Manual, MixerGainMode::Manual, 0x08),
            GainMode::Auto => (LnaGainMode::Auto, MixerGainMode::Auto, 0x0B),
        };
        self.modify(|r: Reg<R05>| r.set(lna))?;
        self.modify(|r: Reg<R07>| r.set(mixer))?;
        self.modify(|r: Reg<R0C>| r.set(AdcPower::On).set(VgaMode::Code).set(VgaGain(vga)))
    }

    pub(crate) fn apply_gain(&mut self, steps: GainSteps) -> Result<(), Error> {
        self.modify(|r: Reg<R05>| r.set(LnaGain(steps.lna)))?;
        self.modify(|r: Reg<R07>| r.set(MixerGain(steps.mixer)))
    }

    pub(crate) fn read_rf_gain(&mut self) -> Result<RfGain, Error> {
        let status = self.read_status(4)?;
        let (lna, mixer) = (status.lna_gain(), status.mixer_gain());
        Ok(RfGain {
            lna,
            mixer,
            combined: lna * 2 + mixer,
        })
    }
}

/// Rejects gains outside the modeled range.
pub(crate) fn check_gain(tenths_db: u16) -> Result<i16, Error> {
    if tenths_db > GAIN_MAX {
        Err(Error::GainOutOfRange)
    } else {
        Ok(tenths_db as i16)
    }
}
