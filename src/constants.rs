//! Constants

/// Default 7-bit I2C address of the tuner
pub const I2C_ADDRESS: u8 = 0x34;

/// Chip identification byte, status register 0
pub const CHIP_ID: u8 = 0x69;

/// Largest number of register bytes sent in a single I2C write
pub const MAX_I2C_MSG_LEN: usize = 8;

/// First register mirrored by the shadow
pub const REG_SHADOW_START: u8 = 0x05;

/// Number of writable registers (0x05 ..= 0x1F)
pub const NUM_REGS: usize = 27;

/// Number of status bytes the engine ever reads back (0x00 ..= 0x04)
pub const NUM_STATUS_REGS: usize = 5;

/// Power-on register image for 0x05 ..= 0x1F.
/// Loaded into the chip at init and before every calibration run.
pub const INIT_REGS: [u8; NUM_REGS] = [
    0x83, 0x32, 0x75, //                   05 to 07
    0xC0, 0x40, 0xD6, 0x6C, //             08 to 0B
    0xF5, 0x63, 0x75, 0x68, //             0C to 0F
    0x6C, 0x83, 0x80, 0x00, //             10 to 13
    0x0F, 0x00, 0xC0, 0x30, //             14 to 17
    0x48, 0xCC, 0x60, 0x00, //             18 to 1B
    0x54, 0xAE, 0x4A, 0xC0, //             1C to 1F
];

/// Default crystal frequency, kHz
pub const XTAL_FREQ_KHZ: u32 = 28_800;

/// Lowest crystal frequency accepted by `Config`, kHz
pub const XTAL_FREQ_MIN_KHZ: u32 = 10_000;

/// Highest crystal frequency accepted by `Config`, kHz
pub const XTAL_FREQ_MAX_KHZ: u32 = 40_000;

/// Lowest tunable RF frequency, Hz
pub const RF_FREQ_MIN: u32 = 24_000_000;

/// Highest tunable RF frequency, Hz
pub const RF_FREQ_MAX: u32 = 1_766_000_000;

/// VCO lower edge, kHz. The upper edge is twice this.
pub const VCO_FREQ_MIN_KHZ: u32 = 1_770_000;

/// VCO upper edge (exclusive), kHz
pub const VCO_FREQ_MAX_KHZ: u32 = VCO_FREQ_MIN_KHZ * 2;

/// Smallest LO mixer divider
pub const MIX_DIV_MIN: u32 = 2;

/// Largest LO mixer divider
pub const MIX_DIV_MAX: u32 = 64;

/// Largest integer PLL divider the N/S counters can express
pub const NINT_MAX: u32 = 63;

/// Reference VCO fine-tune code; readings away from it shift the divider select
pub const VCO_POWER_REF: u8 = 2;

/// Version tag written to register 0x13 on every standard change
pub const VERSION_TAG: u8 = 49;

/// Maximum magnitude reached by the image-rejection step climb
pub const IMR_TRIAL: u8 = 9;

/// Trimmed-sum level the VGA pre-charge must exceed
pub const IMR_VGA_THRESHOLD: u16 = 160;

/// Offset of the calibration LO below the ring frequency, kHz
pub const IMR_RING_OFFSET_KHZ: u32 = 5_300;

/// Minimum ring oscillator frequency, kHz
pub const IMR_RING_VCO_MIN_KHZ: u32 = 3_100_000;

/// RF frequency where the diplexer switches from cable-1 to air input, kHz
pub const DIPLEXER_SWITCH_KHZ: u32 = 320_000;

/// Highest requested gain, tenths of dB
pub const GAIN_MAX: u16 = 496;

/// Settle delays, ms
pub const XTAL_SETTLE_MS: u16 = 5;
pub const XTAL_HIGH_DRIVE_SETTLE_MS: u16 = 20;
pub const PLL_SETTLE_MS: u16 = 10;
pub const PLL_SETTLE_ANALOG_MS: u16 = 20;
pub const FILTER_CAL_PULSE_MS: u16 = 1;
pub const IMR_READ_SETTLE_MS: u16 = 5;
pub const IMR_VGA_SETTLE_MS: u16 = 10;
pub const LNA_SETTLE_MS: u16 = 250;
