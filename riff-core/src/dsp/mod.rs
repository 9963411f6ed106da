//! Low-level DSP primitives used by the processing units.
//!
//! These stay focused on the signal math; the units in [`crate::units`] layer
//! parameter handling and bypass on top. Buffers are sized once at construction
//! so nothing here allocates while audio is running.

/// Envelope follower for dynamics processing.
pub mod dynamics;
/// Circular delay line with fractional reads.
pub mod delay_line;
/// State-variable and one-pole filters.
pub mod filter;
/// Sine low frequency oscillator.
pub mod lfo;
/// Schroeder reverb (parallel combs into series allpasses).
pub mod reverb;
/// Waveshaping transfer functions.
pub mod shaper;

/// Linear dry/wet blend. `mix` of 0.0 is all dry, 1.0 all wet.
#[inline]
pub fn blend(dry: f32, wet: f32, mix: f32) -> f32 {
    dry * (1.0 - mix) + wet * mix
}

/// Converts decibels to a linear gain factor.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Converts a linear level to decibels, flooring silence at -120 dB.
#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.max(1e-6).log10()
}

/// Number of samples spanning `ms` milliseconds at `sample_rate`.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}
