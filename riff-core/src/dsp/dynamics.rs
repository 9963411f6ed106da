//! Peak envelope follower with separate attack and release times.

pub struct EnvelopeFollower {
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
}

impl EnvelopeFollower {
    pub fn new(attack_ms: f32, release_ms: f32, sample_rate: f32) -> Self {
        let mut follower = Self {
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
        };
        follower.set_times(attack_ms, release_ms, sample_rate);
        follower
    }

    pub fn set_times(&mut self, attack_ms: f32, release_ms: f32, sample_rate: f32) {
        self.attack_coeff = time_coeff(attack_ms, sample_rate);
        self.release_coeff = time_coeff(release_ms, sample_rate);
    }

    /// Feeds one sample and returns the current linear envelope level.
    #[inline]
    pub fn next_sample(&mut self, sample: f32) -> f32 {
        let level = sample.abs();
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = level + coeff * (self.envelope - level);
        self.envelope
    }

    pub fn level(&self) -> f32 {
        self.envelope
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

fn time_coeff(ms: f32, sample_rate: f32) -> f32 {
    let samples = (ms.max(0.01) * sample_rate / 1000.0).max(1.0);
    (-1.0 / samples).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rises_fast_and_falls_slowly() {
        let mut follower = EnvelopeFollower::new(1.0, 200.0, 48_000.0);
        for _ in 0..480 {
            follower.next_sample(1.0);
        }
        assert!(follower.level() > 0.99);

        for _ in 0..480 {
            follower.next_sample(0.0);
        }
        // 10ms into a 200ms release the level has barely moved
        assert!(follower.level() > 0.9);
    }
}
