// SPDX-License-Identifier: MIT OR Apache-2.0
//! Monotonic simulation time advanced once per display tick.

/// Simulation time for one open document.
///
/// Advanced externally once per display tick and threaded explicitly
/// into every stateful evaluation call, which keeps deterministic
/// testing with fixed clock values straightforward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GraphClock {
    /// Seconds of simulation time since the prototype started.
    pub graph_time: f64,
    /// Number of ticks since the prototype started.
    pub frame: u64,
}

impl GraphClock {
    /// A clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by a tick's delta time.
    pub fn advance(&mut self, delta: f64) {
        self.graph_time += delta.max(0.0);
        self.frame += 1;
    }

    /// Reset to zero on prototype restart.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether a stored pulse value is active for the current pass.
    ///
    /// A pulse is edge-triggered: it is active exactly when its firing
    /// time equals the current graph time, and inert on every later
    /// tick. An unfired pulse carries `0.0` and time zero never counts
    /// as a firing.
    pub fn pulse_active(&self, fired_at: f64) -> bool {
        fired_at != 0.0 && fired_at == self.graph_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_and_reset() {
        let mut clock = GraphClock::new();
        clock.advance(1.0 / 60.0);
        clock.advance(1.0 / 60.0);
        assert_eq!(clock.frame, 2);
        assert!(clock.graph_time > 0.0);
        clock.reset();
        assert_eq!(clock, GraphClock::default());
    }

    #[test]
    fn test_pulse_active_only_on_firing_tick() {
        let mut clock = GraphClock::new();
        clock.advance(0.5);
        let fired = clock.graph_time;
        assert!(clock.pulse_active(fired));
        clock.advance(0.5);
        assert!(!clock.pulse_active(fired));
        // An unfired pulse is never active.
        assert!(!clock.pulse_active(0.0));
    }
}
