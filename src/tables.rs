//! Standard, band and gain/bias lookup tables
//!
//! Values are the vendor's empirically tuned settings. Register-valued
//! fields hold the byte already shifted into register position, they are
//! written with `Reg::set_packed`.

/// Broadcast standard.
/// Ordering matters: everything after `SecamL1` is a digital standard.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Standard {
    NtscMn,
    PalI,
    PalDk,
    PalB7M,
    PalBgh8M,
    SecamL,
    SecamL1Inv,
    SecamL1,
    DvbT6M,
    DvbT7M,
    DvbT7M2,
    DvbT8M,
    DvbT2_6M,
    DvbT2_7M,
    DvbT2_7M2,
    DvbT2_8M,
    IsdbT,
}

impl Standard {
    /// Number of standards, size of per-standard caches
    pub const COUNT: usize = 17;

    pub fn is_digital(self) -> bool {
        self > Standard::SecamL1
    }

    /// LO sits below RF only for SECAM-L1
    pub fn lo_below_rf(self) -> bool {
        self == Standard::SecamL1
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Channel filter bandwidth class
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bandwidth {
    Bw6M,
    Bw7M,
    Bw8M,
}

/// Per-standard system parameters
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StandardParams {
    /// Intermediate frequency, kHz
    pub if_khz: u32,
    pub bandwidth: Bandwidth,
    /// LO used while calibrating the channel filter, kHz
    pub filter_cal_lo_khz: u32,
    /// R6[5:4]
    pub filter_gain: u8,
    /// R7[7]
    pub image_side: u8,
    /// R10[4]
    pub filter_q: u8,
    /// R11 except the calibration trigger: narrow band, capacitor, corner
    pub hp_corner: u8,
    /// R30[6:5]
    pub ext_enable: u8,
    /// R5[7]
    pub loop_through: u8,
    /// R31[7]
    pub lt_att: u8,
    /// R15[7]
    pub flt_ext_widest: u8,
    /// R25[6:5]
    pub polyfil_cur: u8,
}

const fn std_params(
    if_khz: u32,
    bandwidth: Bandwidth,
    filter_cal_lo_khz: u32,
    hp_corner: u8,
    ext_enable: u8,
) -> StandardParams {
    StandardParams {
        if_khz,
        bandwidth,
        filter_cal_lo_khz,
        filter_gain: 0x10, // +3dB, 6MHz on
        image_side: 0x00,
        filter_q: 0x10, // low Q
        hp_corner,
        ext_enable,
        loop_through: 0x00,
        lt_att: 0x00,
        flt_ext_widest: 0x00,
        polyfil_cur: 0x60,
    }
}

const STD_6M: StandardParams = std_params(3_570, Bandwidth::Bw6M, 56_000, 0x6B, 0x60);
const STD_7M: StandardParams = std_params(4_070, Bandwidth::Bw7M, 60_000, 0x2B, 0x60);
const STD_7M_2: StandardParams = std_params(4_570, Bandwidth::Bw7M, 63_000, 0x2A, 0x60);
const STD_8M: StandardParams = std_params(4_570, Bandwidth::Bw8M, 68_500, 0x0B, 0x60);
const STD_ISDB_T: StandardParams = std_params(4_063, Bandwidth::Bw6M, 59_000, 0x6A, 0x40);
const STD_WIDEST: StandardParams = std_params(4_570, Bandwidth::Bw8M, 68_500, 0x0D, 0x60);

/// System parameters of a standard.
/// Analog standards fall back to the widest preset.
pub fn standard_params(standard: Standard) -> StandardParams {
    use Standard::*;

    match standard {
        DvbT6M | DvbT2_6M => STD_6M,
        DvbT7M | DvbT2_7M => STD_7M,
        DvbT7M2 | DvbT2_7M2 => STD_7M_2,
        DvbT8M | DvbT2_8M => STD_8M,
        IsdbT => STD_ISDB_T,
        _ => STD_WIDEST,
    }
}

/// Band switch settings of one LO interval
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BandSwitchParams {
    /// Interval start (inclusive), kHz
    pub start_khz: u32,
    /// R23[3]
    pub open_d: u8,
    /// R26[7:6]
    pub rf_mux: u8,
    /// R26[1:0]
    pub poly_mux: u8,
    /// R27 tracking filter
    pub tf_c: u8,
    /// R16[1:0] for the 30pF and 20pF crystal levels
    pub xtal_cap20p: u8,
    /// R16[1:0] for the 10pF level
    pub xtal_cap10p: u8,
    /// R16[1:0] for both 0pF levels
    pub xtal_cap0p: u8,
    /// Image-rejection ring bucket
    pub imr_mem: usize,
}

const fn band(
    start_khz: u32,
    open_d: u8,
    rf_mux_poly: u8,
    tf_c: u8,
    caps: (u8, u8, u8),
    imr_mem: usize,
) -> BandSwitchParams {
    BandSwitchParams {
        start_khz,
        open_d,
        rf_mux: (rf_mux_poly >> 6) & 0x03,
        poly_mux: rf_mux_poly & 0x03,
        tf_c,
        xtal_cap20p: caps.0,
        xtal_cap10p: caps.1,
        xtal_cap0p: caps.2,
        imr_mem,
    }
}

/// Half-open LO intervals `[start_khz, next.start_khz)`, sorted by start.
pub const BAND_SWITCH: [BandSwitchParams; 21] = [
    band(0, 0x08, 0x02, 0xDF, (2, 1, 0), 0),
    band(50_000, 0x08, 0x02, 0xBE, (2, 1, 0), 0),
    band(55_000, 0x08, 0x02, 0x8B, (2, 1, 0), 0),
    band(60_000, 0x08, 0x02, 0x7B, (2, 1, 0), 0),
    band(65_000, 0x08, 0x02, 0x69, (2, 1, 0), 0),
    band(70_000, 0x08, 0x02, 0x58, (2, 1, 0), 0),
    band(75_000, 0x00, 0x02, 0x44, (2, 1, 0), 0),
    band(80_000, 0x00, 0x02, 0x44, (2, 1, 0), 0),
    band(90_000, 0x00, 0x02, 0x34, (1, 1, 0), 0),
    band(100_000, 0x00, 0x02, 0x34, (1, 1, 0), 0),
    band(110_000, 0x00, 0x02, 0x24, (1, 1, 0), 1),
    band(120_000, 0x00, 0x02, 0x24, (1, 1, 0), 1),
    band(140_000, 0x00, 0x02, 0x14, (1, 1, 0), 1),
    band(180_000, 0x00, 0x02, 0x13, (0, 0, 0), 1),
    band(220_000, 0x00, 0x02, 0x13, (0, 0, 0), 2),
    band(250_000, 0x00, 0x02, 0x11, (0, 0, 0), 2),
    band(280_000, 0x00, 0x02, 0x00, (0, 0, 0), 2),
    band(310_000, 0x00, 0x41, 0x00, (0, 0, 0), 2),
    band(450_000, 0x00, 0x41, 0x00, (0, 0, 0), 3),
    band(588_000, 0x00, 0x40, 0x00, (0, 0, 0), 3),
    band(650_000, 0x00, 0x40, 0x00, (0, 0, 0), 4),
];

/// Band switch settings for an LO frequency
pub fn band_switch_params(lo_khz: u32) -> BandSwitchParams {
    BAND_SWITCH
        .iter()
        .rev()
        .find(|b| lo_khz >= b.start_khz)
        .copied()
        .unwrap_or(BAND_SWITCH[0])
}

/// Gain and bias presets
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GainBiasParams {
    /// R28[7:2]
    pub mixer_top: u8,
    /// R29, all but R29[5:3] in the digital path
    pub lna_top: u8,
    /// R13
    pub lna_vth_l: u8,
    /// R14
    pub mixer_vth_l: u8,
    /// R5[6:5]
    pub air_cable1_in: u8,
    /// R6[3]
    pub cable2_in: u8,
    /// R17[5:3]
    pub cp_cur: u8,
    /// R23[5:4]
    pub div_buf_cur: u8,
    /// R10[6:5]
    pub filter_cur: u8,
    /// R30[4:0]
    pub lna_discharge: u8,
}

const GAIN_BIAS_DEFAULT: GainBiasParams = GainBiasParams {
    mixer_top: 0x24,
    lna_top: 0xE5,
    lna_vth_l: 0x53,
    mixer_vth_l: 0x75,
    air_cable1_in: 0x00,
    cable2_in: 0x00,
    cp_cur: 0x38,
    div_buf_cur: 0x30,
    filter_cur: 0x40,
    lna_discharge: 14,
};

/// DVB-T channels with a known mixer spur
const DVB_T_SPUR_CHANNELS_KHZ: [u32; 3] = [506_000, 666_000, 818_000];

/// Gain/bias presets for a standard at an RF frequency.
/// The DVB-T spur channels are matched exactly.
pub fn gain_bias_params(standard: Standard, rf_khz: u32) -> GainBiasParams {
    use Standard::*;

    match standard {
        DvbT6M | DvbT7M | DvbT7M2 | DvbT8M if DVB_T_SPUR_CHANNELS_KHZ.contains(&rf_khz) => {
            GainBiasParams {
                mixer_top: 0x14,
                cp_cur: 0x28,
                div_buf_cur: 0x20,
                ..GAIN_BIAS_DEFAULT
            }
        }
        IsdbT => GainBiasParams { lna_vth_l: 0x75, ..GAIN_BIAS_DEFAULT },
        _ => GAIN_BIAS_DEFAULT,
    }
}
