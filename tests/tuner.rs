mod common;

use common::*;
use r820t::{Config, CrystalCap, Error, GainMode, InputPath, Standard, TuneMode};

#[test]
fn initialise_selects_default_standard() {
    let mut b = Bench::new(Config::default(), ChipState::default());
    b.tuner.initialise(&mut b.clock).unwrap();

    assert_eq!(b.demod.borrow().repeater, [true, false]);
    assert_eq!(b.demod.borrow().if_hz, Some(3_570_000));
    assert_eq!(b.tuner.standard(), Standard::DvbT6M);
    assert_eq!(b.tuner.crystal_cap(), CrystalCap::Low30p);
    assert_eq!(b.tuner.calibration().filter_codes[Standard::DvbT6M as usize], Some(8));
    assert_eq!(b.tuner.gain_mode(), GainMode::Manual);

    // version tag, manual LNA / mixer gain, VGA at 16.3 dB
    assert_eq!(b.reg(0x13) & 0x3F, 49);
    assert_eq!(b.reg(0x05), 0x13);
    assert_eq!(b.reg(0x07), 0x65);
    assert_eq!(b.reg(0x0C), 0x68);
    assert_eq!(b.reg(0x0A) & 0x1F, 0x10 | 8);

    // three crystal passes, one filter calibration
    assert_eq!(b.clock.ms, 3 * 5 + 10 + 1);
    b.assert_in_sync();
}

#[test]
fn tune_500_mhz() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    b.tuner.set_frequency(&mut b.clock, 500_000_000).unwrap();

    // LO 503.57 MHz, divider 4
    assert_eq!(b.reg(0x10) >> 5, 1);
    assert_eq!(b.reg(0x14), 0x45);
    assert_eq!(b.reg(0x16), 0xF8);
    assert_eq!(b.reg(0x15), 0x5A);
    assert_eq!(b.reg(0x12) & 0x08, 0, "sigma-delta on");
    assert_eq!(b.reg(0x1A) & 0x0C, 0x08, "fine autotune after lock");

    // 450 MHz band
    assert_eq!(b.reg(0x1A) & 0xC3, 0x41);
    assert_eq!(b.reg(0x1B), 0x00);

    // default gain / bias presets
    assert_eq!(b.reg(0x0D), 0x53);
    assert_eq!(b.reg(0x0E), 0x75);
    assert_eq!(b.reg(0x11) & 0x38, 0x38);
    assert_eq!((b.reg(0x1D) >> 3) & 0x07, 3);
    assert_eq!((b.reg(0x1A) >> 4) & 0x03, 2);

    assert_eq!(b.clock.ms, 10 + 250);
    assert_eq!(b.tuner.frequency(), Some(500_000_000));
    assert_eq!(b.demod.borrow().repeater, [true, false]);
    b.assert_in_sync();
}

#[test]
fn band_switch_precedes_the_pll() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    b.tuner.set_frequency(&mut b.clock, 500_000_000).unwrap();

    let chip = b.chip.borrow();
    let first = |addr: u8| chip.writes.iter().position(|w| w.0 == addr).unwrap();
    assert!(first(0x1B) < first(0x14));
    assert!(first(0x17) < first(0x16));
}

#[test]
fn fast_mode_skips_lna_settle() {
    let config = Config::default().tune_mode(TuneMode::Fast);
    let mut b = Bench::initialised(config, ChipState::default());
    b.tuner.set_frequency(&mut b.clock, 500_000_000).unwrap();

    assert_eq!(b.clock.ms, 10);
    assert_eq!((b.reg(0x1D) >> 3) & 0x07, 0);
    assert_eq!((b.reg(0x1A) >> 4) & 0x03, 3);
}

#[test]
fn spur_channel_presets() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    b.tuner.set_frequency(&mut b.clock, 506_000_000).unwrap();

    assert_eq!(b.reg(0x11) & 0x38, 0x28);
    assert_eq!(b.reg(0x17) & 0x30, 0x20);
    assert_eq!(b.reg(0x1C) & 0xF8, 0x10);
}

#[test]
fn frequency_is_reported_to_the_khz() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    b.tuner.set_frequency(&mut b.clock, 433_920_700).unwrap();
    assert_eq!(b.tuner.frequency(), Some(433_921_000));
    b.tuner.set_frequency(&mut b.clock, 500_000_400).unwrap();
    assert_eq!(b.tuner.frequency(), Some(500_000_000));
}

#[test]
fn out_of_range_touches_nothing() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());

    assert_eq!(
        b.tuner.set_frequency(&mut b.clock, 23_999_999),
        Err(Error::FrequencyOutOfRange)
    );
    assert_eq!(
        b.tuner.set_frequency(&mut b.clock, 1_766_000_001),
        Err(Error::FrequencyOutOfRange)
    );
    assert_eq!(b.tuner.set_gain(497), Err(Error::GainOutOfRange));

    assert!(b.chip.borrow().writes.is_empty());
    assert_eq!(b.chip.borrow().reads, 0);
    assert!(b.demod.borrow().repeater.is_empty());
    assert_eq!(b.tuner.frequency(), None);
}

#[test]
fn lowest_channel_can_miss_the_vco() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    // LO 27.57 MHz, below VCO_MIN / 64
    assert_eq!(
        b.tuner.set_frequency(&mut b.clock, 24_000_000),
        Err(Error::NoValidPllDivider)
    );
    assert_eq!(b.demod.borrow().repeater, [true, false]);
    assert_eq!(b.tuner.frequency(), None);
}

#[test]
fn pll_unlock_lowers_vco_current() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    b.chip.borrow_mut().lock = |_| false;

    assert_eq!(
        b.tuner.set_frequency(&mut b.clock, 500_000_000),
        Err(Error::PllNotLocked)
    );
    assert_eq!(b.reg(0x12) >> 5, 0b011);
    assert_eq!(b.reg(0x1A) & 0x0C, 0x00, "autotune left coarse");
    assert_eq!(b.demod.borrow().repeater, [true, false]);
    assert_eq!(b.tuner.frequency(), None);
}

#[test]
fn nint_overflow_stops_after_divider_select() {
    let config = Config::default().xtal_khz(10_000).unwrap();
    let mut b = Bench::new(config, ChipState::default());

    // the filter calibration LO needs Nint 89 from a 10 MHz reference
    assert_eq!(b.tuner.initialise(&mut b.clock), Err(Error::NoValidPllDivider));
    assert_eq!(b.chip.borrow().writes.last().map(|w| w.0), Some(0x10));
}

#[test]
fn secam_l1_tunes_below_rf() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    b.tuner.set_standard(&mut b.clock, Standard::SecamL1).unwrap();
    assert_eq!(b.demod.borrow().if_hz, Some(4_570_000));
    b.clear();

    b.tuner.set_frequency(&mut b.clock, 200_000_000).unwrap();

    // LO 195.43 MHz, divider 16
    assert_eq!(b.reg(0x10) >> 5, 3);
    // analog settle, no LNA settle
    assert_eq!(b.clock.ms, 20);
    // 1 kHz AGC clock, detector capacitor off
    assert_eq!(b.reg(0x1A) & 0x30, 0x00);
    assert_eq!(b.reg(0x10) & 0x04, 0x00);
}

#[test]
fn filter_calibration_is_cached_per_standard() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());

    b.tuner.set_standard(&mut b.clock, Standard::DvbT8M).unwrap();
    assert_eq!(b.chip.borrow().filter_calibrations(), 1);
    b.clear();

    b.tuner.set_standard(&mut b.clock, Standard::DvbT8M).unwrap();
    b.tuner.set_standard(&mut b.clock, Standard::DvbT6M).unwrap();
    assert_eq!(b.chip.borrow().filter_calibrations(), 0);
    assert_eq!(b.clock.ms, 0);

    b.tuner.reset_calibration();
    b.tuner.set_standard(&mut b.clock, Standard::DvbT6M).unwrap();
    assert_eq!(b.chip.borrow().filter_calibrations(), 1);
}

#[test]
fn saturated_filter_code_is_rerun_then_clamped() {
    let chip = ChipState { filter_code: 15, ..Default::default() };
    let mut b = Bench::new(Config::default(), chip);
    b.tuner.initialise(&mut b.clock).unwrap();

    assert_eq!(b.chip.borrow().filter_calibrations(), 2);
    assert_eq!(b.tuner.calibration().filter_codes[Standard::DvbT6M as usize], Some(0));
    assert_eq!(b.reg(0x0A) & 0x0F, 0);
}

#[test]
fn zero_filter_code_is_rerun_and_kept() {
    let chip = ChipState { filter_code: 0, ..Default::default() };
    let mut b = Bench::new(Config::default(), chip);
    b.tuner.initialise(&mut b.clock).unwrap();

    assert_eq!(b.chip.borrow().filter_calibrations(), 2);
    assert_eq!(b.tuner.calibration().filter_codes[Standard::DvbT6M as usize], Some(0));
}

#[test]
fn crystal_ladder_stops_at_first_lock() {
    let chip = ChipState {
        lock: |regs| regs[0x10] & 0x03 <= 1,
        ..Default::default()
    };
    let mut b = Bench::new(Config::default(), chip);
    b.tuner.initialise(&mut b.clock).unwrap();

    assert_eq!(b.tuner.crystal_cap(), CrystalCap::Low10p);
    assert_eq!(b.clock.ms, 3 * 15 + 10 + 1);
}

#[test]
fn crystal_never_locking_fails_init() {
    let chip = ChipState { lock: |_| false, ..Default::default() };
    let mut b = Bench::new(Config::default(), chip);

    assert_eq!(b.tuner.initialise(&mut b.clock), Err(Error::CrystalNotLocked));
    // one pass down the ladder, the high drive rung settles longer
    assert_eq!(b.clock.ms, 4 * 5 + 20);
    assert_eq!(b.demod.borrow().repeater, [true, false]);
}

#[test]
fn saturated_vco_band_is_not_a_lock() {
    let chip = ChipState { vco_band: 0x3F, ..Default::default() };
    let mut b = Bench::new(Config::default(), chip);
    assert_eq!(b.tuner.initialise(&mut b.clock), Err(Error::CrystalNotLocked));
}

#[test]
fn sixteen_mhz_crystal_needs_a_mid_band() {
    let config = Config::default().xtal_khz(16_000).unwrap();

    let mut b = Bench::new(config, ChipState::default());
    assert_eq!(b.tuner.initialise(&mut b.clock), Err(Error::CrystalNotLocked));

    let chip = ChipState { vco_band: 25, ..Default::default() };
    let mut b = Bench::new(config, chip);
    b.tuner.initialise(&mut b.clock).unwrap();
}

#[test]
fn manual_gain() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    b.tuner.set_gain(250).unwrap();

    assert_eq!(b.reg(0x05) & 0x0F, 7);
    assert_eq!(b.reg(0x07) & 0x0F, 7);

    let gain = b.tuner.rf_gain().unwrap();
    assert_eq!((gain.lna, gain.mixer, gain.combined), (7, 7, 21));
    b.assert_in_sync();
}

#[test]
fn auto_gain_mode() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    b.tuner.set_gain_mode(GainMode::Auto).unwrap();

    assert_eq!(b.reg(0x05) & 0x10, 0);
    assert_eq!(b.reg(0x07) & 0x10, 0x10);
    assert_eq!(b.reg(0x0C), 0x6B);
    assert_eq!(b.tuner.gain_mode(), GainMode::Auto);
}

#[test]
fn input_path_selection() {
    let config = Config::default().input(InputPath::Auto);
    let mut b = Bench::initialised(config, ChipState::default());

    b.tuner.set_frequency(&mut b.clock, 100_000_000).unwrap();
    assert_eq!(b.reg(0x05) & 0x60, 0x60, "cable-1 on, air off");
    assert_eq!(b.reg(0x06) & 0x08, 0);

    b.tuner.set_frequency(&mut b.clock, 500_000_000).unwrap();
    assert_eq!(b.reg(0x05) & 0x60, 0x00, "air on, cable-1 off");
}

#[test]
fn standby_register_set() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    b.tuner.standby(false).unwrap();

    let tail: [(u8, u8); 9] = [
        (0x07, 0x3A),
        (0x08, 0x40),
        (0x09, 0xC0),
        (0x0A, 0x36),
        (0x0C, 0x35),
        (0x0F, 0x68),
        (0x11, 0x03),
        (0x17, 0xF4),
        (0x19, 0x0C),
    ];
    let writes = b.chip.borrow().writes.clone();
    assert_eq!(&writes[..2], &[(0x05, 0xA3), (0x06, 0xB1)]);
    assert_eq!(&writes[2..], &tail);

    b.clear();
    b.tuner.standby(true).unwrap();
    let writes = b.chip.borrow().writes.clone();
    assert_eq!(&writes[..2], &[(0x06, 0xB1), (0x05, 0x03)]);
    b.assert_in_sync();
}

#[test]
fn gpio() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    b.tuner.set_gpio(true).unwrap();
    assert_eq!(b.reg(0x0F) & 0x01, 1);
    b.tuner.set_gpio(false).unwrap();
    assert_eq!(b.reg(0x0F) & 0x01, 0);
}

#[test]
fn repeater_failure() {
    let mut b = Bench::new(Config::default(), ChipState::default());
    b.demod.borrow_mut().fail_repeater = true;

    assert_eq!(b.tuner.initialise(&mut b.clock), Err(Error::Repeater));
    assert!(b.chip.borrow().writes.is_empty());
}

#[test]
fn bus_failure_closes_the_repeater() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    let before = *b.tuner.registers().as_bytes();
    b.chip.borrow_mut().fail_bus = true;

    assert_eq!(b.tuner.set_gain(250), Err(Error::I2c));
    assert_eq!(b.tuner.set_frequency(&mut b.clock, 500_000_000), Err(Error::I2c));
    assert_eq!(b.demod.borrow().repeater, [true, false, true, false]);

    assert_eq!(b.tuner.registers().as_bytes(), &before);
    b.assert_in_sync();
}

#[test]
fn bus_failure_part_way_keeps_the_shadow_in_step() {
    let mut b = Bench::initialised(Config::default(), ChipState::default());
    let before = *b.tuner.registers().as_bytes();
    // band switch: 0x17, 0x1A and 0x1B go through, the crystal load write fails
    b.chip.borrow_mut().fail_after = Some(3);

    assert_eq!(b.tuner.set_frequency(&mut b.clock, 500_000_000), Err(Error::I2c));

    let addrs: Vec<u8> = b.chip.borrow().writes.iter().map(|w| w.0).collect();
    assert_eq!(addrs, [0x17, 0x1A, 0x1B]);
    assert_eq!(b.tuner.registers().get(0x1A), Some(0x69));
    assert_eq!(b.tuner.registers().get(0x10), Some(before[0x10 - 0x05]));
    b.assert_in_sync();
}

#[test]
fn release_returns_the_bus() {
    let b = Bench::initialised(Config::default(), ChipState::default());
    let (chip, _demod) = b.tuner.release();
    assert_eq!(chip.0.borrow().reg(0x13) & 0x3F, 49);
}
