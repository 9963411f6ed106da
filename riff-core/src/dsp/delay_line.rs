/// Circular buffer delay line.
///
/// `read(d)` returns the sample written `d` writes ago, so read before
/// writing the current sample.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Creates a delay line able to hold `capacity` samples (at least 2).
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(2)],
            write_pos: 0,
        }
    }

    /// Creates a delay line long enough for `max_ms` at `sample_rate`.
    pub fn with_max_time(max_ms: f32, sample_rate: f32) -> Self {
        Self::new(super::ms_to_samples(max_ms, sample_rate).ceil() as usize + 2)
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    pub fn read(&self, delay_samples: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(1, len);
        self.buffer[(self.write_pos + len - delay) % len]
    }

    /// Linear interpolation between the two neighbouring taps.
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let max = (self.buffer.len() - 1) as f32;
        let delay = delay_samples.clamp(1.0, max);
        let whole = delay.floor();
        let frac = delay - whole;
        let a = self.read(whole as usize);
        let b = self.read(whole as usize + 1);
        a + (b - a) * frac
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
