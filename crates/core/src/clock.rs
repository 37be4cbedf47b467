//! Frame clock that keeps the render tick and the physics tick apart.

/// What the host loop must run for one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStep {
    /// Render-frame delta in seconds.
    pub dt: f32,
    /// Number of fixed physics steps due before this frame's update.
    pub physics_steps: u32,
    /// Duration of one physics step.
    pub fixed_dt: f32,
}

/// Accumulator-based fixed-step scheduler.
///
/// Visual and event state advance once per rendered frame; rigidbody
/// velocities advance once per physics step. Feeding both from one clock
/// keeps them from being conflated.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    fixed_dt: f32,
    accumulator: f32,
    max_steps_per_frame: u32,
    elapsed: f64,
}

impl FixedStepClock {
    /// Create a clock with the given physics step (seconds).
    pub fn new(fixed_dt: f32) -> Self {
        Self {
            fixed_dt: fixed_dt.max(1.0e-4),
            accumulator: 0.0,
            max_steps_per_frame: 8,
            elapsed: 0.0,
        }
    }

    /// Physics step length.
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Total render time advanced so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advance by one rendered frame of length `dt`.
    pub fn advance(&mut self, dt: f32) -> FrameStep {
        let dt = dt.max(0.0);
        self.elapsed += f64::from(dt);
        self.accumulator += dt;

        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < self.max_steps_per_frame {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }
        // Spiral-of-death guard: drop whatever could not be simulated.
        if steps == self.max_steps_per_frame {
            self.accumulator = self.accumulator.min(self.fixed_dt);
        }

        FrameStep {
            dt,
            physics_steps: steps,
            fixed_dt: self.fixed_dt,
        }
    }
}
