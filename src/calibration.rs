//! Crystal load and channel filter calibration

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Read, Write},
};

use crate::{
    constants::*,
    device::{Host, R820t},
    errors::*,
    imr::IqPoint,
    register::*,
    tables::{BandSwitchParams, Standard, StandardParams},
};

/// Crystal load capacitance ladder, probed from the top.
/// Later rungs are the more conservative settings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrystalCap {
    Low30p,
    Low20p,
    Low10p,
    Low0p,
    High0p,
}

impl CrystalCap {
    pub const LADDER: [CrystalCap; 5] = [
        CrystalCap::Low30p,
        CrystalCap::Low20p,
        CrystalCap::Low10p,
        CrystalCap::Low0p,
        CrystalCap::High0p,
    ];

    /// Load capacitor code and drive used while probing this rung
    pub fn probe_setting(self) -> (u8, XtalDrive) {
        match self {
            CrystalCap::Low30p => (0b11, XtalDrive::Low),
            CrystalCap::Low20p => (0b10, XtalDrive::Low),
            CrystalCap::Low10p => (0b01, XtalDrive::Low),
            CrystalCap::Low0p => (0b00, XtalDrive::Low),
            CrystalCap::High0p => (0b00, XtalDrive::High),
        }
    }

    pub fn settle_ms(self) -> u16 {
        match self {
            CrystalCap::High0p => XTAL_HIGH_DRIVE_SETTLE_MS,
            _ => XTAL_SETTLE_MS,
        }
    }

    /// Load capacitor code and drive to use in an LO band
    pub fn band_setting(self, band: &BandSwitchParams) -> (u8, XtalDrive) {
        match self {
            CrystalCap::Low30p | CrystalCap::Low20p => (band.xtal_cap20p, XtalDrive::Low),
            CrystalCap::Low10p => (band.xtal_cap10p, XtalDrive::Low),
            CrystalCap::Low0p => (band.xtal_cap0p, XtalDrive::Low),
            CrystalCap::High0p => (band.xtal_cap0p, XtalDrive::High),
        }
    }
}

/// Results that survive between tune calls.
/// Cleared only by `R820t::reset_calibration` or `R820t::initialise`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationState {
    pub xtal_cap: CrystalCap,
    /// Channel filter trim per standard, `None` until calibrated
    pub filter_codes: [Option<u8>; Standard::COUNT],
    /// Compensation point per ring bucket
    pub imr: [IqPoint; 5],
    /// Band switching applies `imr` only once this is set
    pub imr_done: bool,
}

impl Default for CalibrationState {
    fn default() -> Self {
        CalibrationState {
            xtal_cap: CrystalCap::Low30p,
            filter_codes: [None; Standard::COUNT],
            imr: [IqPoint::default(); 5],
            imr_done: false,
        }
    }
}

impl CalibrationState {
    /// Drops filter trims and IMR points. The crystal level is kept.
    pub fn reset(&mut self) {
        self.filter_codes = [None; Standard::COUNT];
        self.imr = [IqPoint::default(); 5];
        self.imr_done = false;
    }
}

/// Saturated trim codes are re-run once; a code stuck at the top rail
/// is read as the narrowest setting.
fn needs_rerun(code: u8) -> bool {
    code == 0 || code == 0x0F
}

impl<I2C, E, H> R820t<I2C, H>
where
    I2C: Write<Error = E> + Read<Error = E>,
    H: Host,
{
    /// One pass down the crystal ladder. Returns the first rung that locks.
    pub(crate) fn probe_crystal<Delay>(&mut self, delay: &mut Delay) -> Result<CrystalCap, Error>
    where
        Delay: DelayMs<u16>,
    {
        let (cap, drive) = CrystalCap::Low30p.probe_setting();
        self.modify(|r: Reg<R10>| r.set(XtalCap(cap)).set(drive))?;
        self.modify(|r: Reg<R1A>| r.set(PllAutotune::Khz128))?;
        self.modify(|r: Reg<R13>| r.set(VcoBandMode::Manual).set(VcoCode(0x3F)))?;
        self.modify(|r: Reg<R13>| r.set(VcoBandMode::Auto))?;

        for (i, rung) in CrystalCap::LADDER.iter().copied().enumerate() {
            if i > 0 {
                let (cap, drive) = rung.probe_setting();
                self.modify(|r: Reg<R10>| r.set(XtalCap(cap)).set(drive))?;
            }
            delay.delay_ms(rung.settle_ms());

            let status = self.read_status(3)?;
            let band = status.vco_band();
            let band_ok = if self.config.narrow_vco_window() {
                (23..=29).contains(&band)
            } else {
                band != PllStatus::VCO_BAND.bits()
            };
            if status.pll().contains(PllStatus::LOCKED) && band_ok {
                return Ok(rung);
            }
            trace!("crystal rung {} unlocked, band {}", i, band);
        }

        warn!("crystal did not lock at any load level");
        Err(Error::CrystalNotLocked)
    }

    /// Best of three ladder passes; keeps the furthest rung seen.
    pub(crate) fn calibrate_crystal<Delay>(&mut self, delay: &mut Delay) -> Result<CrystalCap, Error>
    where
        Delay: DelayMs<u16>,
    {
        let mut best = CrystalCap::Low30p;
        for _ in 0..3 {
            best = best.max(self.probe_crystal(delay)?);
        }
        self.cal.xtal_cap = best;
        info!("crystal load {:?}", best);
        Ok(best)
    }

    /// Triggers one channel filter calibration and returns the trim code.
    pub(crate) fn run_filter_calibration<Delay>(
        &mut self,
        delay: &mut Delay,
        params: &StandardParams,
    ) -> Result<u8, Error>
    where
        Delay: DelayMs<u16>,
    {
        self.modify(|r: Reg<R0B>| r.set_packed::<FilterCap>(params.hp_corner))?;
        self.modify(|r: Reg<R0F>| r.set(CalibrationClock::On))?;
        self.modify(|r: Reg<R10>| r.set(XtalCap(0)))?;

        self.set_pll(delay, params.filter_cal_lo_khz * 1000, None)?;

        self.modify(|r: Reg<R0B>| r.set(CalibrationTrigger::Start))?;
        delay.delay_ms(FILTER_CAL_PULSE_MS);
        self.modify(|r: Reg<R0B>| r.set(CalibrationTrigger::Stop))?;
        self.modify(|r: Reg<R0F>| r.set(CalibrationClock::Off))?;

        Ok(self.read_status(5)?.filter_code())
    }

    /// Cached filter trim of `standard`, calibrating on first use.
    pub(crate) fn filter_code<Delay>(
        &mut self,
        delay: &mut Delay,
        standard: Standard,
        params: &StandardParams,
    ) -> Result<u8, Error>
    where
        Delay: DelayMs<u16>,
    {
        if let Some(code) = self.cal.filter_codes[standard.index()] {
            return Ok(code);
        }

        let mut code = self.run_filter_calibration(delay, params)?;
        if needs_rerun(code) {
            code = self.run_filter_calibration(delay, params)?;
            if code == 0x0F {
                code = 0;
            }
        }

        self.cal.filter_codes[standard.index()] = Some(code);
        info!("filter code {} for {:?}", code, standard);
        Ok(code)
    }
}
