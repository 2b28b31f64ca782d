//! Scheduler tunables.
//!
//! Every field has a default, so a config file only needs to name the values
//! it overrides:
//!
//! ```json
//! { "rr_quantum": 3, "mlfq": { "aging_limit": 8 } }
//! ```

use serde::Deserialize;

use crate::{core::Ticks, error::SchedError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedConfig {
    /// Slice granted per round-robin dispatch.
    pub rr_quantum: Ticks,
    pub mlfq: MlfqConfig,
    pub aging: AgingConfig,
}

/// Multi-level feedback queue tiers. Q2 has no quantum: a task dispatched
/// from it runs to completion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MlfqConfig {
    pub q0_quantum: Ticks,
    pub q1_quantum: Ticks,
    /// Queued ticks after which a Q1/Q2 task is promoted back to Q0.
    pub aging_limit: Ticks,
}

/// Priority aging for the preemptive priority policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgingConfig {
    /// Every `interval` queued ticks the task's priority drops by one.
    pub interval: Ticks,
    /// Aging never lowers a priority below this value.
    pub min_priority: i32,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            rr_quantum: 4,
            mlfq: MlfqConfig::default(),
            aging: AgingConfig::default(),
        }
    }
}

impl Default for MlfqConfig {
    fn default() -> Self {
        Self {
            q0_quantum: 2,
            q1_quantum: 4,
            aging_limit: 6,
        }
    }
}

impl Default for AgingConfig {
    fn default() -> Self {
        Self {
            interval: 3,
            min_priority: 0,
        }
    }
}

impl SchedConfig {
    pub fn validate(&self) -> Result<(), SchedError> {
        let positive = [
            ("rr_quantum", self.rr_quantum),
            ("mlfq.q0_quantum", self.mlfq.q0_quantum),
            ("mlfq.q1_quantum", self.mlfq.q1_quantum),
            ("mlfq.aging_limit", self.mlfq.aging_limit),
            ("aging.interval", self.aging.interval),
        ];

        match positive.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(SchedError::InvalidConfig(format!("{name} must be positive"))),
            None => Ok(()),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, SchedError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|err| SchedError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = SchedConfig::default();
        assert_eq!(config.mlfq.q0_quantum, 2);
        assert_eq!(config.mlfq.q1_quantum, 4);
        assert_eq!(config.mlfq.aging_limit, 6);
        assert_eq!(config.aging.interval, 3);
        assert_eq!(config.aging.min_priority, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = SchedConfig::from_json(r#"{ "rr_quantum": 3, "mlfq": { "aging_limit": 8 } }"#)
            .unwrap();
        assert_eq!(config.rr_quantum, 3);
        assert_eq!(config.mlfq.aging_limit, 8);
        assert_eq!(config.mlfq.q0_quantum, 2);
        assert_eq!(config.aging, AgingConfig::default());
    }

    #[test]
    fn zero_quantum_is_rejected() {
        let err = SchedConfig::from_json(r#"{ "mlfq": { "q1_quantum": 0 } }"#).unwrap_err();
        assert_eq!(
            err,
            SchedError::InvalidConfig("mlfq.q1_quantum must be positive".into())
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(matches!(
            SchedConfig::from_json(r#"{ "quantum": 3 }"#),
            Err(SchedError::InvalidConfig(_))
        ));
    }
}
