//! Errors

/// Tuner error
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// I2C transaction failed
    I2c,
    /// Host failed to switch the I2C repeater or to take the new IF
    Repeater,
    /// PLL did not report lock after the settle delay
    PllNotLocked,
    /// Crystal oscillator did not lock at any capacitance level
    CrystalNotLocked,
    /// No mixer divider / N counter combination reaches the LO frequency
    NoValidPllDivider,
    /// Requested frequency (RF or crystal) is outside the supported span
    FrequencyOutOfRange,
    /// Requested gain is outside the modeled range
    GainOutOfRange,
}

#[inline]
pub(crate) fn i2c_error<E>(_: E) -> Error {
    Error::I2c
}
