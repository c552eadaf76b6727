//! LO synthesis
//!
//! `VCO = LO * mix_div`, `VCO = 2 * ref * (Nint + frac / (2 * ref))`,
//! `Nint = 4 * Ni + Si + 13`. The fractional part is fed to the
//! sigma-delta modulator as a 16 bit binary fraction of `2 * ref`.

use core::cmp::Ordering;

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Read, Write},
};

use crate::{
    constants::*,
    device::{Host, R820t},
    errors::*,
    register::*,
    tables::{band_switch_params, BandSwitchParams, Standard},
};

/// Smallest mixer divider that puts the VCO in range, with its select code.
pub fn mixer_divider(lo_hz: u32) -> Result<(u32, u8), Error> {
    let lo_khz = lo_hz / 1000;
    let mut mix_div = MIX_DIV_MIN;
    while mix_div <= MIX_DIV_MAX {
        if (VCO_FREQ_MIN_KHZ..VCO_FREQ_MAX_KHZ).contains(&(lo_khz * mix_div)) {
            // select code counts halvings down to 2
            return Ok((mix_div, (mix_div.trailing_zeros() - 1) as u8));
        }
        mix_div <<= 1;
    }
    Err(Error::NoValidPllDivider)
}

/// Shifts the divider select by one when the VCO fine-tune reading
/// is off the reference code. Wraps like the 3 bit register field.
pub fn adjust_divider_select(div_num: u8, fine_tune: u8) -> u8 {
    match fine_tune.cmp(&VCO_POWER_REF) {
        Ordering::Greater => div_num.wrapping_sub(1),
        Ordering::Less => div_num.wrapping_add(1),
        Ordering::Equal => div_num,
    }
}

/// Moves the fractional part off the fractional-N spur points:
/// within 1/128 of an integer boundary it snaps to the integer,
/// within 1/256 of the half point it snaps to either side of it.
pub fn clamp_boundary_spurs(nint: u32, frac_khz: u32, ref_khz: u32) -> (u32, u32) {
    if frac_khz < ref_khz / 64 {
        (nint, 0)
    } else if frac_khz > ref_khz * 127 / 64 {
        (nint + 1, 0)
    } else if frac_khz > ref_khz * 127 / 128 && frac_khz < ref_khz {
        (nint, ref_khz * 127 / 128)
    } else if frac_khz > ref_khz && frac_khz < ref_khz * 129 / 128 {
        (nint, ref_khz * 129 / 128)
    } else {
        (nint, frac_khz)
    }
}

/// Sigma-delta word for a fractional remainder, `frac / (2 * ref) * 65536`
/// rounded down, built one binary digit at a time.
pub fn sdm_word(frac_khz: u32, ref_khz: u32) -> u16 {
    let mut frac = frac_khz;
    let mut sdm = 0u32;
    let mut nsdm = 2u32;
    while frac > 1 && nsdm <= 0x8000 {
        let step = 2 * ref_khz / nsdm;
        if frac > step {
            sdm += 32768 / (nsdm / 2);
            frac -= step;
        }
        nsdm <<= 1;
    }
    sdm as u16
}

/// N counter and sigma-delta settings for one VCO frequency
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PllWords {
    pub nint: u32,
    /// Fractional part after spur clamping, kHz
    pub frac_khz: u32,
    pub ni: u8,
    pub si: u8,
    pub sdm: u16,
}

impl PllWords {
    /// Splits a VCO frequency against a reference clock.
    pub fn new(vco_hz: u64, ref_hz: u32) -> Result<Self, Error> {
        let two_ref = 2 * ref_hz as u64;
        let nint = (vco_hz / two_ref) as u32;
        let frac_khz = ((vco_hz - two_ref * nint as u64) / 1000) as u32;

        // reference drops to kHz only after Nint and frac are taken in Hz
        let ref_khz = ref_hz / 1000;

        let (nint, frac_khz) = clamp_boundary_spurs(nint, frac_khz, ref_khz);
        if nint > NINT_MAX {
            return Err(Error::NoValidPllDivider);
        }

        let ni = (nint - 13) / 4;
        let si = nint - 4 * ni - 13;

        Ok(PllWords {
            nint,
            frac_khz,
            ni: ni as u8,
            si: si as u8,
            sdm: sdm_word(frac_khz, ref_khz),
        })
    }
}

/// Settle time after a PLL update
pub(crate) fn pll_settle_ms(standard: Option<Standard>) -> u16 {
    match standard {
        Some(s) if !s.is_digital() => PLL_SETTLE_ANALOG_MS,
        _ => PLL_SETTLE_MS,
    }
}

impl<I2C, E, H> R820t<I2C, H>
where
    I2C: Write<Error = E> + Read<Error = E>,
    H: Host,
{
    /// Band switch writes for an LO frequency: output stage, RF/poly mux,
    /// tracking filter, crystal load and the cached image-rejection trim.
    /// Must precede the PLL, which runs on the crystal setting it leaves.
    pub(crate) fn set_mux(&mut self, lo_khz: u32) -> Result<BandSwitchParams, Error> {
        let band = band_switch_params(lo_khz);

        self.modify(|r: Reg<R17>| r.set_packed::<OpenDrain>(band.open_d))?;
        self.modify(|r: Reg<R1A>| r.set(RfMux(band.rf_mux)).set(PolyMux(band.poly_mux)))?;
        self.write_reg(Reg::<R1B>::new(0).set(TrackingFilter(band.tf_c)))?;

        let (cap, drive) = self.cal.xtal_cap.band_setting(&band);
        self.modify(|r: Reg<R10>| r.set(XtalCap(cap)).set(drive))?;

        let point = if self.cal.imr_done {
            self.cal.imr[band.imr_mem]
        } else {
            Default::default()
        };
        self.write_iq(point.gain, point.phase)?;

        Ok(band)
    }

    /// Programs the PLL for `lo_hz` and checks lock.
    ///
    /// On unlock the VCO current is lowered one step for the next attempt
    /// and `PllNotLocked` is returned; there is no retry here.
    pub(crate) fn set_pll<Delay>(
        &mut self,
        delay: &mut Delay,
        lo_hz: u32,
        standard: Option<Standard>,
    ) -> Result<(), Error>
    where
        Delay: DelayMs<u16>,
    {
        let ref_hz = self.config.xtal_khz * 1000;

        self.modify(|r: Reg<R10>| r.set(RefDiv2::Off))?;
        self.modify(|r: Reg<R1A>| r.set(PllAutotune::Khz128))?;
        self.modify(|r: Reg<R12>| r.set(VcoCurrent(0b100)))?;

        let (mix_div, div_num) = mixer_divider(lo_hz)?;
        let fine_tune = self.read_status(5)?.vco_fine_tune();
        let div_num = adjust_divider_select(div_num, fine_tune);
        self.modify(|r: Reg<R10>| r.set(PllDividerSelect(div_num)))?;

        let pll = PllWords::new(lo_hz as u64 * mix_div as u64, ref_hz)?;
        debug!(
            "pll: lo {} Hz, mix_div {}, nint {}, frac {} kHz, sdm {}",
            lo_hz,
            mix_div,
            pll.nint,
            pll.frac_khz,
            pll.sdm
        );

        self.write_reg(Reg::<R14>::new(0).set(PllNi(pll.ni)).set(PllSi(pll.si)))?;
        self.modify(|r: Reg<R12>| {
            r.set(if pll.frac_khz == 0 { SdmPower::Off } else { SdmPower::On })
        })?;
        self.write_reg(Reg::<R16>::new(0).set(SdmHigh((pll.sdm >> 8) as u8)))?;
        self.write_reg(Reg::<R15>::new(0).set(SdmLow((pll.sdm & 0xFF) as u8)))?;

        delay.delay_ms(pll_settle_ms(standard));

        if !self.read_status(3)?.pll().contains(PllStatus::LOCKED) {
            warn!("pll not locked at {} Hz", lo_hz);
            self.modify(|r: Reg<R12>| r.set(VcoCurrent(0b011)))?;
            return Err(Error::PllNotLocked);
        }

        self.modify(|r: Reg<R1A>| r.set(PllAutotune::Khz8))
    }
}
