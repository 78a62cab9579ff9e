use std::time;

/// Measures the time between frames, and the average frame rate over a few seconds.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_tick: time::Instant,
    frames: u32,
    last_measurement_time: time::Instant,
    measurement: (u32, time::Duration),
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(time::Instant::now())
    }

    fn starting_at(now: time::Instant) -> Self {
        Self {
            last_tick: now,
            frames: 0,
            last_measurement_time: now,
            measurement: (0, time::Duration::ZERO),
        }
    }

    /// Seconds since the previous call. Returns true in the second value when a new
    /// frame rate measurement is available.
    pub fn tick(&mut self) -> (f32, bool) {
        self.tick_at(time::Instant::now())
    }

    fn tick_at(&mut self, now: time::Instant) -> (f32, bool) {
        let delta = (now - self.last_tick).as_secs_f32();
        self.last_tick = now;

        self.frames += 1;
        let elapsed = now - self.last_measurement_time;
        let measured = elapsed.as_secs_f32() >= 3.0;
        if measured {
            self.measurement = (self.frames, elapsed);
            self.last_measurement_time = now;
            self.frames = 0;
        }
        (delta, measured)
    }

    pub fn fps(&self) -> f32 {
        let (frames, elapsed) = self.measurement;
        if frames == 0 || elapsed.is_zero() {
            0.0
        } else {
            frames as f32 / elapsed.as_secs_f32()
        }
    }

    pub fn mspf(&self) -> f32 {
        let (frames, elapsed) = self.measurement;
        if frames == 0 || elapsed.is_zero() {
            0.0
        } else {
            elapsed.as_secs_f32() / frames as f32 * 1000.0
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
