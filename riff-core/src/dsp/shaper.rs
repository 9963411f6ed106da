//! Waveshaping
//!
//! Each drive stage applies a transfer function to the driven sample:
//!   output = f(input * drive)
//!
//! Soft clip (overdrive):  f(x) = x / (1 + |x|), warm and gradual.
//! Hard clip (distortion): f(x) = clamp(x, -t, t), buzzy odd harmonics.
//! Foldback (fuzz):        the signal folds back on itself past the threshold.
//!
//! Drive of 1.0 is clean; higher values push further into the nonlinear region.

#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

#[inline]
pub fn hard_clip(sample: f32, drive: f32, threshold: f32) -> f32 {
    (sample * drive).clamp(-threshold, threshold)
}

/// Foldback distortion. Non-finite input collapses to silence.
#[inline]
pub fn foldback(sample: f32, drive: f32, threshold: f32) -> f32 {
    let x = sample * drive;
    if !x.is_finite() {
        return 0.0;
    }
    let threshold = threshold.max(0.01);
    if x.abs() <= threshold {
        return x;
    }
    // Fold into a triangle wave of period 4 * threshold.
    let period = 4.0 * threshold;
    let shifted = (x + threshold).rem_euclid(period);
    if shifted < 2.0 * threshold {
        shifted - threshold
    } else {
        3.0 * threshold - shifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_clip_approaches_unity() {
        let out = soft_clip(1.0, 10.0);
        assert!(out > 0.9 && out < 1.0);
    }

    #[test]
    fn hard_clip_limits_to_threshold() {
        assert!((hard_clip(0.8, 2.0, 1.0) - 1.0).abs() < 1e-6);
        assert!((hard_clip(0.3, 1.0, 1.0) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn foldback_reflects_at_threshold() {
        // 0.7 * 2 = 1.4 folds to 2 * 1 - 1.4 = 0.6
        assert!((foldback(0.7, 2.0, 1.0) - 0.6).abs() < 1e-6);
        assert!((foldback(-0.7, 2.0, 1.0) + 0.6).abs() < 1e-6);
        assert!((foldback(0.3, 1.0, 1.0) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn foldback_stays_bounded_for_extreme_drive() {
        for i in -100..100 {
            let out = foldback(i as f32 * 0.01, 100.0, 0.5);
            assert!(out.is_finite() && out.abs() <= 0.5 + 1e-5);
        }
    }
}
