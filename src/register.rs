//! R820T registers
//!
//! The writable bank is 0x05 ..= 0x1F. Every byte written to the chip also
//! lands in a `RegisterShadow`, partial field updates are computed against
//! the shadow and the whole byte goes out on the bus.

use core::marker::PhantomData;

use bitflags::bitflags;

use crate::constants::*;

/// Register address of a marker type
pub trait Address {
    /// Register address on the bus
    const ADDR: u8;

    /// Index into the shadow / init table
    #[inline]
    fn index() -> usize {
        (Self::ADDR - REG_SHADOW_START) as usize
    }
}

/// Register number marker types
macro_rules! gen_register_marker {
    ($r:ident, $n:tt) => {
        /// Register marker
        #[derive(Debug, Copy, Clone)]
        pub struct $r {}

        impl Address for $r {
            const ADDR: u8 = $n;
        }
    };
}

gen_register_marker!(R05, 0x05);
gen_register_marker!(R06, 0x06);
gen_register_marker!(R07, 0x07);
gen_register_marker!(R08, 0x08);
gen_register_marker!(R09, 0x09);
gen_register_marker!(R0A, 0x0A);
gen_register_marker!(R0B, 0x0B);
gen_register_marker!(R0C, 0x0C);
gen_register_marker!(R0D, 0x0D);
gen_register_marker!(R0E, 0x0E);
gen_register_marker!(R0F, 0x0F);
gen_register_marker!(R10, 0x10);
gen_register_marker!(R11, 0x11);
gen_register_marker!(R12, 0x12);
gen_register_marker!(R13, 0x13);
gen_register_marker!(R14, 0x14);
gen_register_marker!(R15, 0x15);
gen_register_marker!(R16, 0x16);
gen_register_marker!(R17, 0x17);
gen_register_marker!(R18, 0x18);
gen_register_marker!(R19, 0x19);
gen_register_marker!(R1A, 0x1A);
gen_register_marker!(R1B, 0x1B);
gen_register_marker!(R1C, 0x1C);
gen_register_marker!(R1D, 0x1D);
gen_register_marker!(R1E, 0x1E);
gen_register_marker!(R1F, 0x1F);

/// Single register byte
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reg<R> {
    /// Register value
    pub w: u8,
    phantom: PhantomData<R>,
}

/// Bit operations on register bytes
impl<R: Address> Reg<R> {
    #[inline]
    pub fn new(w: u8) -> Self {
        Reg { w, phantom: PhantomData }
    }

    /// Register value from the power-on image
    #[inline]
    pub fn initial() -> Self {
        Self::new(INIT_REGS[R::index()])
    }

    #[inline]
    pub fn get<F>(&self) -> F
    where
        F: BitField<R> + From<u8>,
    {
        F::from((self.w >> F::offset()) & F::mask())
    }

    #[inline]
    pub fn set<F>(self, f: F) -> Self
    where
        F: BitField<R> + Into<u8>,
    {
        self.with_bits(F::field_mask(), (f.into() & F::mask()) << F::offset())
    }

    /// Writes an already shifted value into the bits of `F`.
    /// Vendor tables store most analog settings this way.
    #[inline]
    pub fn set_packed<F>(self, packed: u8) -> Self
    where
        F: BitField<R>,
    {
        self.with_bits(F::field_mask(), packed)
    }

    /// `(w & !mask) | (value & mask)`
    #[inline]
    pub fn with_bits(mut self, mask: u8, value: u8) -> Self {
        self.w = (self.w & !mask) | (value & mask);
        self
    }
}

/// In-memory mirror of the writable register bank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterShadow {
    regs: [u8; NUM_REGS],
}

impl Default for RegisterShadow {
    fn default() -> Self {
        RegisterShadow { regs: INIT_REGS }
    }
}

impl RegisterShadow {
    /// Shadowed value of `addr`, `None` outside 0x05 ..= 0x1F
    pub fn get(&self, addr: u8) -> Option<u8> {
        addr.checked_sub(REG_SHADOW_START)
            .and_then(|i| self.regs.get(i as usize))
            .copied()
    }

    /// Typed view of a shadowed register
    #[inline]
    pub fn reg<R: Address>(&self) -> Reg<R> {
        Reg::new(self.regs[R::index()])
    }

    pub fn as_bytes(&self) -> &[u8; NUM_REGS] {
        &self.regs
    }

    /// Records bytes the chip has accepted, starting at `addr`.
    pub(crate) fn store(&mut self, addr: u8, bytes: &[u8]) {
        let start = (addr - REG_SHADOW_START) as usize;
        self.regs[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

/// Bit operations on register bytes
pub trait BitField<R> {
    /// Number of bits in the bit field
    fn num_bits() -> u8;

    /// Offset from 0
    fn offset() -> u8;

    #[inline]
    fn mask() -> u8 {
        ((1u16 << Self::num_bits()) - 1) as u8
    }

    /// Mask of the field in register position
    #[inline]
    fn field_mask() -> u8 {
        Self::mask() << Self::offset()
    }
}

/// Generate BitField implementation
macro_rules! gen_bitfield_impl {
    ($r:ty, $n:ident, $nb:tt, $off:tt) => {
        impl BitField<$r> for $n {
            #[inline]
            fn num_bits() -> u8 {
                $nb
            }
            #[inline]
            fn offset() -> u8 {
                $off
            }
        }
    };
}

/// Small bitfield-encoded numbers boilerplate
macro_rules! gen_bitfield_struct {
    ($(#[$meta:meta])*, $r:ty, $n:ident, $nb:tt, $off:tt) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub struct $n(pub u8);

        gen_bitfield_impl!($r, $n, $nb, $off);

        impl From<u8> for $n {
            #[inline]
            fn from(x: u8) -> Self {
                $n(x)
            }
        }

        impl From<$n> for u8 {
            #[inline]
            fn from(x: $n) -> u8 {
                x.0
            }
        }
    };
}

/// Write-only switches
macro_rules! gen_bitfield_enum {
    ($(#[$meta:meta])*, $r:ty, $n:ident, $nb:tt, $off:tt, { $($(#[$vmeta:meta])* $v:ident = $x:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum $n {
            $($(#[$vmeta])* $v = $x),+
        }

        gen_bitfield_impl!($r, $n, $nb, $off);

        impl From<$n> for u8 {
            #[inline]
            fn from(x: $n) -> u8 {
                x as u8
            }
        }
    };
}

// 0x05

gen_bitfield_enum!(
    /// R5[7] loop-through buffer
    , R05, LoopThrough, 1, 7, { On = 0, Off = 1 }
);

gen_bitfield_enum!(
    /// R5[6] cable-1 LNA input
    , R05, Cable1Input, 1, 6, { Off = 0, On = 1 }
);

gen_bitfield_enum!(
    /// R5[5] air (antenna) LNA input
    , R05, AirInput, 1, 5, { On = 0, Off = 1 }
);

gen_bitfield_enum!(
    /// R5[4] LNA gain control
    , R05, LnaGainMode, 1, 4, { Auto = 0, Manual = 1 }
);

gen_bitfield_struct!(
    /// R5[3:0] manual LNA gain step
    , R05, LnaGain, 4, 0
);

// 0x06

gen_bitfield_enum!(
    /// R6[6] power detector 1
    , R06, PreDetect, 1, 6, { Off = 0, On = 1 }
);

gen_bitfield_struct!(
    /// R6[5:4] channel filter gain
    , R06, FilterGain, 2, 4
);

gen_bitfield_enum!(
    /// R6[3] cable-2 LNA input
    , R06, Cable2Input, 1, 3, { Off = 0, On = 1 }
);

// 0x07

gen_bitfield_enum!(
    /// R7[7] image side of the mixer
    , R07, ImageSide, 1, 7, { Negative = 0, Positive = 1 }
);

gen_bitfield_enum!(
    /// R7[4] mixer gain control
    , R07, MixerGainMode, 1, 4, { Manual = 0, Auto = 1 }
);

gen_bitfield_struct!(
    /// R7[3:0] manual mixer gain step
    , R07, MixerGain, 4, 0
);

// 0x08, 0x09

gen_bitfield_struct!(
    /// R8[5:0] image-rejection gain trim, bit 5 selects the I path
    , R08, ImrGain, 6, 0
);

gen_bitfield_struct!(
    /// R9[5:0] image-rejection phase trim, bit 5 selects the I path
    , R09, ImrPhase, 6, 0
);

// 0x0A

gen_bitfield_struct!(
    /// R10[6:5] channel filter current
    , R0A, FilterCurrent, 2, 5
);

gen_bitfield_enum!(
    /// R10[4] channel filter Q
    , R0A, FilterQ, 1, 4, { High = 0, Low = 1 }
);

gen_bitfield_struct!(
    /// R10[3:0] channel filter trim code
    , R0A, FilterCode, 4, 0
);

// 0x0B

gen_bitfield_struct!(
    /// R11[6:5] filter bandwidth capacitor
    , R0B, FilterCap, 2, 5
);

gen_bitfield_enum!(
    /// R11[4] filter calibration trigger
    , R0B, CalibrationTrigger, 1, 4, { Stop = 0, Start = 1 }
);

gen_bitfield_struct!(
    /// R11[3:0] high-pass corner
    , R0B, HighPassCorner, 4, 0
);

// 0x0C

gen_bitfield_enum!(
    /// R12[7] ADC power
    , R0C, AdcPower, 1, 7, { On = 0, Off = 1 }
);

gen_bitfield_enum!(
    /// R12[4] VGA gain source
    , R0C, VgaMode, 1, 4, { Code = 0, Pin = 1 }
);

gen_bitfield_struct!(
    /// R12[3:0] VGA gain code
    , R0C, VgaGain, 4, 0
);

// 0x0D, 0x0E

gen_bitfield_struct!(
    /// LNA AGC thresholds, high nibble VTH, low nibble VTL
    , R0D, LnaThreshold, 8, 0
);

gen_bitfield_struct!(
    /// Mixer AGC thresholds, high nibble VTH, low nibble VTL
    , R0E, MixerThreshold, 8, 0
);

// 0x0F

gen_bitfield_enum!(
    /// R15[7] widest filter extension
    , R0F, FilterExtWidest, 1, 7, { Off = 0, On = 1 }
);

gen_bitfield_enum!(
    /// R15[3] clock output
    , R0F, ClockOutput, 1, 3, { On = 0, Off = 1 }
);

gen_bitfield_enum!(
    /// R15[2] filter calibration clock
    , R0F, CalibrationClock, 1, 2, { Off = 0, On = 1 }
);

gen_bitfield_enum!(
    /// R15[0] general purpose output
    , R0F, Gpio, 1, 0, { Low = 0, High = 1 }
);

// 0x10

gen_bitfield_struct!(
    /// R16[7:5] mixer divider select, `log2(divider) - 1`
    , R10, PllDividerSelect, 3, 5
);

gen_bitfield_enum!(
    /// R16[4] reference divide-by-2
    , R10, RefDiv2, 1, 4, { Off = 0, On = 1 }
);

gen_bitfield_enum!(
    /// R16[3] crystal oscillator drive
    , R10, XtalDrive, 1, 3, { High = 0, Low = 1 }
);

gen_bitfield_struct!(
    /// R16[2] AGC detector capacitor
    , R10, AgcCapacitor, 1, 2
);

gen_bitfield_struct!(
    /// R16[1:0] crystal load capacitor
    , R10, XtalCap, 2, 0
);

// 0x11

gen_bitfield_struct!(
    /// R17[5:3] PLL charge pump current
    , R11, ChargePumpCurrent, 3, 3
);

// 0x12

gen_bitfield_struct!(
    /// R18[7:5] VCO bias current
    , R12, VcoCurrent, 3, 5
);

gen_bitfield_enum!(
    /// R18[3] sigma-delta modulator power
    , R12, SdmPower, 1, 3, { On = 0, Off = 1 }
);

// 0x13

gen_bitfield_enum!(
    /// R19[6] VCO band selection
    , R13, VcoBandMode, 1, 6, { Auto = 0, Manual = 1 }
);

gen_bitfield_struct!(
    /// R19[5:0] manual VCO band, doubles as version tag storage
    , R13, VcoCode, 6, 0
);

// 0x14 .. 0x16

gen_bitfield_struct!(
    /// R20[5:0] PLL N counter
    , R14, PllNi, 6, 0
);

gen_bitfield_struct!(
    /// R20[7:6] PLL S counter
    , R14, PllSi, 2, 6
);

gen_bitfield_struct!(
    /// Sigma-delta word, low byte
    , R15, SdmLow, 8, 0
);

gen_bitfield_struct!(
    /// Sigma-delta word, high byte
    , R16, SdmHigh, 8, 0
);

// 0x17

gen_bitfield_struct!(
    /// R23[5:4] divider buffer current
    , R17, DividerBufferCurrent, 2, 4
);

gen_bitfield_enum!(
    /// R23[3] mixer output stage
    , R17, OpenDrain, 1, 3, { High = 0, Low = 1 }
);

// 0x18, 0x19

gen_bitfield_struct!(
    /// R24[5] ring oscillator se23
    , R18, RingSe23, 1, 5
);

gen_bitfield_enum!(
    /// R24[4] ring oscillator power
    , R18, RingPower, 1, 4, { Off = 0, On = 1 }
);

gen_bitfield_struct!(
    /// R24[3:0] ring oscillator N
    , R18, RingN, 4, 0
);

gen_bitfield_struct!(
    /// R25[6:5] polyphase filter current
    , R19, PolyFilterCurrent, 2, 5
);

gen_bitfield_struct!(
    /// R25[1:0] ring divider select
    , R19, RingDivSelect, 2, 0
);

// 0x1A

gen_bitfield_struct!(
    /// R26[7:6] RF multiplexer
    , R1A, RfMux, 2, 6
);

gen_bitfield_struct!(
    /// R26[5:4] AGC clock
    , R1A, AgcClock, 2, 4
);

gen_bitfield_enum!(
    /// R26[3:2] PLL autotune step
    , R1A, PllAutotune, 2, 2, { Khz128 = 0, Khz8 = 2 }
);

gen_bitfield_struct!(
    /// R26[1:0] polyphase filter multiplexer
    , R1A, PolyMux, 2, 0
);

// 0x1B

gen_bitfield_struct!(
    /// Tracking filter band, high nibble LPF corner, low nibble HPF corner
    , R1B, TrackingFilter, 8, 0
);

// 0x1C

gen_bitfield_struct!(
    /// R28[7:3] mixer take-over point
    , R1C, MixerTop, 5, 3
);

gen_bitfield_struct!(
    /// R28[2] mixer AGC discharge
    , R1C, MixerDischarge, 1, 2
);

gen_bitfield_enum!(
    /// R28[1] ring oscillator into the RF path
    , R1C, RingInput, 1, 1, { Off = 0, On = 1 }
);

// 0x1D

gen_bitfield_struct!(
    /// R29[5:3] LNA take-over point
    , R1D, LnaTop, 3, 3
);

// 0x1E

gen_bitfield_enum!(
    /// R30[7] power detector 3
    , R1E, PowerDetector3, 1, 7, { Off = 0, On = 1 }
);

gen_bitfield_struct!(
    /// R30[6:5] filter extension
    , R1E, FilterExtension, 2, 5
);

gen_bitfield_struct!(
    /// R30[4:0] LNA AGC discharge current
    , R1E, LnaDischarge, 5, 0
);

// 0x1F

gen_bitfield_enum!(
    /// R31[7] loop-through attenuation
    , R1F, LoopThroughAttenuation, 1, 7, { Enabled = 0, Disabled = 1 }
);

gen_bitfield_struct!(
    /// R31[1:0] ring oscillator output power
    , R1F, RingOutputPower, 2, 0
);

bitflags! {
    /// Status register 2
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct PllStatus: u8 {
        /// PLL reports lock
        const LOCKED   = 0b0100_0000;
        /// VCO band, all ones when the band search saturated
        const VCO_BAND = 0b0011_1111;
    }
}

/// Status registers 0x00 ..= 0x04, already bit-reversed
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub bytes: [u8; NUM_STATUS_REGS],
}

impl Status {
    pub fn chip_id(&self) -> u8 {
        self.bytes[0]
    }

    /// Raw image detector reading
    pub fn image_detector(&self) -> u8 {
        self.bytes[1]
    }

    pub fn pll(&self) -> PllStatus {
        PllStatus::from_bits_truncate(self.bytes[2])
    }

    pub fn vco_band(&self) -> u8 {
        (self.pll() & PllStatus::VCO_BAND).bits()
    }

    pub fn lna_gain(&self) -> u8 {
        self.bytes[3] & 0x0F
    }

    pub fn mixer_gain(&self) -> u8 {
        self.bytes[3] >> 4
    }

    pub fn vco_fine_tune(&self) -> u8 {
        (self.bytes[4] & 0x30) >> 4
    }

    pub fn filter_code(&self) -> u8 {
        self.bytes[4] & 0x0F
    }
}
