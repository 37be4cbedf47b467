//! Inactivity timers that put a modality to sleep.

/// Counts time without qualifying input; past `threshold` the source sleeps.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    threshold: f32,
    idle: f32,
    sleeping: bool,
}

impl IdleTimer {
    /// Timer that sleeps after `threshold` seconds of inactivity.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.max(0.0),
            idle: 0.0,
            sleeping: false,
        }
    }

    /// Advance by `dt`. Any `active` input wakes the source immediately.
    ///
    /// Returns the new sleeping value when it changed this call.
    pub fn tick(&mut self, dt: f32, active: bool) -> Option<bool> {
        let was = self.sleeping;
        if active {
            self.idle = 0.0;
            self.sleeping = false;
        } else {
            self.idle += dt.max(0.0);
            if self.idle > self.threshold {
                self.sleeping = true;
            }
        }
        (was != self.sleeping).then_some(self.sleeping)
    }

    /// Whether the idle threshold has been exceeded.
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Seconds since the last qualifying input.
    pub fn idle_time(&self) -> f32 {
        self.idle
    }

    /// Clear the timer without reporting a transition.
    pub fn reset(&mut self) {
        self.idle = 0.0;
        self.sleeping = false;
    }
}
