//! Device

use core::convert::Infallible;

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Read, Write},
};

use crate::{
    calibration::{CalibrationState, CrystalCap},
    config::Config,
    constants::*,
    errors::*,
    gain::{check_gain, gain_steps, GainMode, GainSteps, RfGain},
    register::*,
    tables::{standard_params, Standard},
};

/// Demodulator side of the tuner.
///
/// The tuner usually sits behind an I2C repeater in the demodulator, and
/// the demodulator has to know which IF the tuner delivers.
pub trait Host {
    type Error;

    /// Opens (`true`) or closes the I2C path to the tuner.
    fn i2c_repeater(&mut self, _enable: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    /// IF the tuner now outputs, Hz
    fn set_if_frequency(&mut self, _hz: u32) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Tuner on a direct bus
impl Host for () {
    type Error = Infallible;
}

/// Register values written by `standby`, after the input stage
const STANDBY_REGS: [(u8, u8); 9] = [
    (0x07, 0x3A),
    (0x08, 0x40),
    (0x09, 0xC0), // polyfilter off
    (0x0A, 0x36),
    (0x0C, 0x35),
    (0x0F, 0x68), // clock output stays on
    (0x11, 0x03),
    (0x17, 0xF4),
    (0x19, 0x0C),
];

/// R820T tuner
pub struct R820t<I2C, H> {
    i2c: I2C,
    host: H,
    pub(crate) config: Config,
    pub(crate) shadow: RegisterShadow,
    pub(crate) cal: CalibrationState,
    pub(crate) standard: Standard,
    gain_mode: GainMode,
    gain: Option<GainSteps>,
    frequency: Option<u32>,
}

impl<I2C, E, H> R820t<I2C, H>
where
    I2C: Write<Error = E> + Read<Error = E>,
    H: Host,
{
    /// Creates the driver. Nothing is written until `initialise`.
    ///
    /// `i2c` - bus the tuner answers on, through the host's repeater
    /// `host` - repeater and IF collaborator, `()` when there is none
    pub fn new(i2c: I2C, host: H, config: Config) -> Self {
        R820t {
            i2c,
            host,
            standard: config.standard,
            config,
            shadow: RegisterShadow::default(),
            cal: CalibrationState::default(),
            gain_mode: GainMode::Manual,
            gain: None,
            frequency: None,
        }
    }

    /// Gives the bus and the host back.
    pub fn release(self) -> (I2C, H) {
        (self.i2c, self.host)
    }

    /// Loads the power-on registers, calibrates the crystal (and the image
    /// rejection when configured), selects the configured standard in manual
    /// gain mode and reports the IF to the host.
    ///
    /// Clears cached filter and image-rejection results.
    pub fn initialise<Delay>(self: &mut Self, delay: &mut Delay) -> Result<(), Error>
    where
        Delay: DelayMs<u16>,
    {
        self.with_repeater(|t| {
            t.write_init_regs()?;
            t.calibrate_crystal(delay)?;
            t.cal.reset();
            if t.config.calibrate_imr {
                t.run_imr_calibration(delay)?;
            }
            t.write_init_regs()?;

            t.apply_standard(delay, t.config.standard)?;
            t.gain_mode = GainMode::Manual;
            t.gain = None;
            t.apply_gain_mode(GainMode::Manual)?;
            t.report_if()
        })
    }

    /// Tunes to `hz` at the current standard.
    ///
    /// The span is 24 MHz ..= 1766 MHz. Near both ends the LO can fall
    /// outside what the VCO dividers reach, which is `NoValidPllDivider`.
    pub fn set_frequency<Delay>(self: &mut Self, delay: &mut Delay, hz: u32) -> Result<(), Error>
    where
        Delay: DelayMs<u16>,
    {
        if !(RF_FREQ_MIN..=RF_FREQ_MAX).contains(&hz) {
            return Err(Error::FrequencyOutOfRange);
        }
        self.with_repeater(|t| t.apply_frequency(delay, hz))?;
        self.frequency = Some(hz);
        Ok(())
    }

    /// Switches standard and reports the new IF.
    /// Calibrates the channel filter the first time a standard is used.
    pub fn set_standard<Delay>(self: &mut Self, delay: &mut Delay, standard: Standard) -> Result<(), Error>
    where
        Delay: DelayMs<u16>,
    {
        self.with_repeater(|t| {
            t.apply_standard(delay, standard)?;
            t.report_if()
        })
    }

    /// Manual gain, tenths of dB (0 ..= 496).
    pub fn set_gain(self: &mut Self, tenths_db: u16) -> Result<(), Error> {
        let steps = gain_steps(check_gain(tenths_db)?);
        self.with_repeater(|t| t.apply_gain(steps))?;
        self.gain = Some(steps);
        Ok(())
    }

    pub fn set_gain_mode(self: &mut Self, mode: GainMode) -> Result<(), Error> {
        self.with_repeater(|t| t.apply_gain_mode(mode))?;
        self.gain_mode = mode;
        Ok(())
    }

    /// Reads the LNA and mixer gain steps in use.
    pub fn rf_gain(self: &mut Self) -> Result<RfGain, Error> {
        self.with_repeater(|t| t.read_rf_gain())
    }

    /// Low power state. `loop_through` keeps the RF loop-through output alive.
    /// `initialise` brings the tuner back.
    pub fn standby(self: &mut Self, loop_through: bool) -> Result<(), Error> {
        self.with_repeater(|t| {
            if loop_through {
                t.write_regs(0x06, &[0xB1])?;
                t.write_regs(0x05, &[0x03])?;
            } else {
                t.write_regs(0x05, &[0xA3])?;
                t.write_regs(0x06, &[0xB1])?;
            }
            for &(addr, value) in STANDBY_REGS.iter() {
                t.write_regs(addr, &[value])?;
            }
            Ok(())
        })
    }

    /// Drives the general purpose output.
    pub fn set_gpio(self: &mut Self, high: bool) -> Result<(), Error> {
        let level = if high { Gpio::High } else { Gpio::Low };
        self.with_repeater(|t| t.modify(|r: Reg<R0F>| r.set(level)))
    }

    /// Runs the image-rejection search over all ring buckets, then restores
    /// the standard, gain and frequency that were in use.
    pub fn calibrate_image_rejection<Delay>(self: &mut Self, delay: &mut Delay) -> Result<(), Error>
    where
        Delay: DelayMs<u16>,
    {
        self.with_repeater(|t| {
            t.run_imr_calibration(delay)?;
            t.write_init_regs()?;

            t.apply_standard(delay, t.standard)?;
            t.apply_gain_mode(t.gain_mode)?;
            if let Some(steps) = t.gain {
                t.apply_gain(steps)?;
            }
            if let Some(hz) = t.frequency {
                t.apply_frequency(delay, hz)?;
            }
            Ok(())
        })
    }

    /// Forgets filter trims and image-rejection points.
    /// They are measured again on next use.
    pub fn reset_calibration(self: &mut Self) {
        self.cal.reset();
    }

    /// Last tuned frequency, rounded to kHz
    pub fn frequency(&self) -> Option<u32> {
        self.frequency.map(|hz| (hz + 500) / 1000 * 1000)
    }

    pub fn standard(&self) -> Standard {
        self.standard
    }

    /// IF of the current standard, Hz
    pub fn if_frequency(&self) -> u32 {
        standard_params(self.standard).if_khz * 1000
    }

    pub fn gain_mode(&self) -> GainMode {
        self.gain_mode
    }

    pub fn crystal_cap(&self) -> CrystalCap {
        self.cal.xtal_cap
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.cal
    }

    /// Register values as last written
    pub fn registers(&self) -> &RegisterShadow {
        &self.shadow
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs `f` with the repeater open. The repeater is closed even when
    /// `f` fails, and `f`'s error wins.
    fn with_repeater<T, F>(self: &mut Self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Self) -> Result<T, Error>,
    {
        self.host.i2c_repeater(true).map_err(|_| Error::Repeater)?;
        let result = f(self);
        let closed = self.host.i2c_repeater(false).map_err(|_| Error::Repeater);
        let value = result?;
        closed?;
        Ok(value)
    }

    fn report_if(self: &mut Self) -> Result<(), Error> {
        let hz = self.if_frequency();
        debug!("if {} Hz", hz);
        self.host.set_if_frequency(hz).map_err(|_| Error::Repeater)
    }

    /// Writes consecutive registers from `addr`, splitting at the bus
    /// message limit. The shadow follows every accepted message.
    pub(crate) fn write_regs(self: &mut Self, addr: u8, values: &[u8]) -> Result<(), Error> {
        let mut buf = [0u8; MAX_I2C_MSG_LEN];
        let mut reg = addr;
        for chunk in values.chunks(MAX_I2C_MSG_LEN - 1) {
            buf[0] = reg;
            buf[1..=chunk.len()].copy_from_slice(chunk);
            self.i2c
                .write(self.config.address, &buf[..=chunk.len()])
                .map_err(i2c_error)?;
            self.shadow.store(reg, chunk);
            reg += chunk.len() as u8;
        }
        Ok(())
    }

    #[inline(always)]
    pub(crate) fn write_reg<R: Address>(self: &mut Self, r: Reg<R>) -> Result<(), Error> {
        self.write_regs(R::ADDR, &[r.w])
    }

    /// Read-modify-write against the shadow
    #[inline(always)]
    pub(crate) fn modify<R, F>(self: &mut Self, f: F) -> Result<(), Error>
    where
        R: Address,
        F: FnOnce(Reg<R>) -> Reg<R>,
    {
        let r = f(self.shadow.reg::<R>());
        self.write_reg(r)
    }

    pub(crate) fn write_init_regs(self: &mut Self) -> Result<(), Error> {
        self.write_regs(REG_SHADOW_START, &INIT_REGS)
    }

    /// Reads `len` status bytes from register 0. The chip sends them
    /// LSB first.
    pub(crate) fn read_status(self: &mut Self, len: usize) -> Result<Status, Error> {
        let mut bytes = [0u8; NUM_STATUS_REGS];
        let len = len.min(NUM_STATUS_REGS);
        self.i2c.write(self.config.address, &[0x00]).map_err(i2c_error)?;
        self.i2c
            .read(self.config.address, &mut bytes[..len])
            .map_err(i2c_error)?;
        for b in bytes[..len].iter_mut() {
            *b = b.reverse_bits();
        }
        Ok(Status { bytes })
    }
}
