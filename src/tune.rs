//! Standard and frequency apply sequences

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Read, Write},
};

use crate::{
    config::{InputPath, TuneMode},
    constants::*,
    device::{Host, R820t},
    errors::*,
    register::*,
    tables::{gain_bias_params, standard_params, Standard},
};

/// LO for an RF frequency. Only SECAM-L1 mixes from below.
pub(crate) fn lo_hz(standard: Standard, rf_hz: u32) -> u32 {
    let if_hz = standard_params(standard).if_khz * 1000;
    if standard.lo_below_rf() {
        rf_hz - if_hz
    } else {
        rf_hz + if_hz
    }
}

/// Cable-1 input for an RF frequency
pub(crate) fn use_cable1(input: InputPath, rf_khz: u32) -> bool {
    match input {
        InputPath::Air => false,
        InputPath::Cable1 => true,
        InputPath::Auto => rf_khz < DIPLEXER_SWITCH_KHZ,
    }
}

impl<I2C, E, H> R820t<I2C, H>
where
    I2C: Write<Error = E> + Read<Error = E>,
    H: Host,
{
    /// Standard-level registers, calibrating the channel filter on first use.
    pub(crate) fn apply_standard<Delay>(
        &mut self,
        delay: &mut Delay,
        standard: Standard,
    ) -> Result<(), Error>
    where
        Delay: DelayMs<u16>,
    {
        let params = standard_params(standard);

        // VGA code doubles as IMR-done marker and crystal level record
        let marker = if self.cal.imr_done {
            0x01 | (self.cal.xtal_cap as u8) << 1
        } else {
            0x00
        };
        self.modify(|r: Reg<R0C>| r.set(VgaGain(marker)))?;
        self.modify(|r: Reg<R13>| r.set(VcoCode(VERSION_TAG)))?;
        if standard.is_digital() {
            self.modify(|r: Reg<R1D>| r.set(LnaTop(0)))?;
        }

        let code = self.filter_code(delay, standard, &params)?;

        self.modify(|r: Reg<R0A>| r.set_packed::<FilterQ>(params.filter_q).set(FilterCode(code)))?;
        self.modify(|r: Reg<R0B>| {
            r.with_bits(!<CalibrationTrigger as BitField<R0B>>::field_mask(), params.hp_corner)
        })?;
        self.modify(|r: Reg<R07>| r.set_packed::<ImageSide>(params.image_side))?;
        self.modify(|r: Reg<R06>| r.set_packed::<FilterGain>(params.filter_gain))?;
        self.modify(|r: Reg<R1E>| r.set_packed::<FilterExtension>(params.ext_enable))?;
        self.modify(|r: Reg<R05>| r.set_packed::<LoopThrough>(params.loop_through))?;
        self.modify(|r: Reg<R1F>| r.set_packed::<LoopThroughAttenuation>(params.lt_att))?;
        self.modify(|r: Reg<R0F>| r.set_packed::<FilterExtWidest>(params.flt_ext_widest))?;
        self.modify(|r: Reg<R19>| r.set_packed::<PolyFilterCurrent>(params.polyfil_cur))?;

        self.standard = standard;
        Ok(())
    }

    /// Band switch, PLL, gain/bias presets and AGC sequencing for `rf_hz`.
    /// A failure part way leaves the earlier writes in place.
    pub(crate) fn apply_frequency<Delay>(&mut self, delay: &mut Delay, rf_hz: u32) -> Result<(), Error>
    where
        Delay: DelayMs<u16>,
    {
        let standard = self.standard;
        let lo_hz = lo_hz(standard, rf_hz);
        let rf_khz = rf_hz / 1000;

        self.set_mux(lo_hz / 1000)?;
        self.set_pll(delay, lo_hz, Some(standard))?;

        let bias = gain_bias_params(standard, rf_khz);

        self.modify(|r: Reg<R1D>| r.with_bits(!<LnaTop as BitField<R1D>>::field_mask(), bias.lna_top))?;
        self.modify(|r: Reg<R1C>| r.set_packed::<MixerTop>(bias.mixer_top))?;
        self.write_reg(Reg::<R0D>::new(0).set(LnaThreshold(bias.lna_vth_l)))?;
        self.write_reg(Reg::<R0E>::new(0).set(MixerThreshold(bias.mixer_vth_l)))?;

        if use_cable1(self.config.input, rf_khz) {
            self.modify(|r: Reg<R05>| r.set(Cable1Input::On).set(AirInput::Off))?;
            self.modify(|r: Reg<R06>| r.set(Cable2Input::Off))?;
        } else {
            let inputs = <AirInput as BitField<R05>>::field_mask()
                | <Cable1Input as BitField<R05>>::field_mask();
            self.modify(|r: Reg<R05>| r.with_bits(inputs, bias.air_cable1_in))?;
            self.modify(|r: Reg<R06>| r.set_packed::<Cable2Input>(bias.cable2_in))?;
        }

        self.modify(|r: Reg<R11>| r.set_packed::<ChargePumpCurrent>(bias.cp_cur))?;
        self.modify(|r: Reg<R17>| r.set_packed::<DividerBufferCurrent>(bias.div_buf_cur))?;
        self.modify(|r: Reg<R0A>| r.set_packed::<FilterCurrent>(bias.filter_cur))?;

        if standard.is_digital() {
            // lowest LNA top, 250 Hz AGC clock while the loop settles
            self.modify(|r: Reg<R1D>| r.set(LnaTop(0)))?;
            self.modify(|r: Reg<R1C>| r.set(MixerDischarge(0)))?;
            self.modify(|r: Reg<R06>| r.set(PreDetect::Off))?;
            self.modify(|r: Reg<R1A>| r.set(AgcClock(0b11)))?;

            if self.config.tune_mode == TuneMode::Normal {
                delay.delay_ms(LNA_SETTLE_MS);
                self.modify(|r: Reg<R1D>| r.set(LnaTop(3)))?;
                self.modify(|r: Reg<R1C>| r.set_packed::<MixerDischarge>(bias.mixer_top))?;
                self.modify(|r: Reg<R1E>| r.set(LnaDischarge(bias.lna_discharge)))?;
                // 60 Hz
                self.modify(|r: Reg<R1A>| r.set(AgcClock(0b10)))?;
            }
        } else {
            self.modify(|r: Reg<R06>| r.set(PreDetect::Off))?;
            self.modify(|r: Reg<R1D>| r.set_packed::<LnaTop>(bias.lna_top))?;
            self.modify(|r: Reg<R1C>| r.set_packed::<MixerDischarge>(bias.mixer_top))?;
            self.modify(|r: Reg<R1E>| r.set(LnaDischarge(bias.lna_discharge)))?;
            // 1 kHz AGC clock, external detector capacitor
            self.modify(|r: Reg<R1A>| r.set(AgcClock(0)))?;
            self.modify(|r: Reg<R10>| r.set(AgcCapacitor(0)))?;
        }

        Ok(())
    }
}
