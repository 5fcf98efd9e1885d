//! Activation timing of traps.

use serde::{Deserialize, Serialize};

/// Seconds a trap stays dangerous once triggered.
pub const ACTIVE_DURATION: f64 = 1.0;

/// Seconds before activation during which a trap shows a warning.
pub const WARNING_WINDOW: f64 = 0.5;

/// What a trap looks like at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrapState {
    Idle,
    Warning,
    Active,
}

/// A repeating cycle: active for `active_duration`, then idle for `activation_time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrapCycle {
    pub activation_time: f64,
    pub active_duration: f64,
}

impl TrapCycle {
    pub fn new(activation_time: f64) -> Self {
        TrapCycle {
            activation_time: activation_time.max(0.0),
            active_duration: ACTIVE_DURATION,
        }
    }

    /// Length of one full cycle in seconds.
    pub fn period(&self) -> f64 {
        self.activation_time + self.active_duration
    }

    pub fn state_at(&self, elapsed: f64) -> TrapState {
        let period = self.period();
        if period <= 0.0 {
            return TrapState::Idle;
        }
        let phase = elapsed.max(0.0).rem_euclid(period);
        if phase < self.active_duration {
            TrapState::Active
        } else if period - phase <= WARNING_WINDOW {
            TrapState::Warning
        } else {
            TrapState::Idle
        }
    }

    /// True while the trap hurts anything standing on it.
    pub fn is_dangerous(&self, elapsed: f64) -> bool {
        self.state_at(elapsed) == TrapState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_goes_active_idle_warning() {
        let cycle = TrapCycle::new(3.0);
        assert_eq!(cycle.period(), 4.0);
        assert_eq!(cycle.state_at(0.0), TrapState::Active);
        assert_eq!(cycle.state_at(0.99), TrapState::Active);
        assert_eq!(cycle.state_at(1.0), TrapState::Idle);
        assert_eq!(cycle.state_at(3.25), TrapState::Idle);
        assert_eq!(cycle.state_at(3.75), TrapState::Warning);
        assert_eq!(cycle.state_at(4.5), TrapState::Active);
        assert!(cycle.is_dangerous(8.2));
        assert!(!cycle.is_dangerous(9.2));
    }
}
