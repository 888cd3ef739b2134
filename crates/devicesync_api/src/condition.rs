//! Status conditions.
//!
//! Conditions are the only surface operators use to observe convergence.
//! Every pass rebuilds the summary condition from the underlying ones, so
//! a summary is never left stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a false condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConditionSeverity {
    /// No severity. Used for true conditions.
    #[default]
    #[serde(rename = "")]
    None,
    /// Informational.
    Info,
    /// Degraded but expected to recover.
    Warning,
    /// Requires attention.
    Error,
}

/// A single status condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type.
    #[serde(rename = "type")]
    pub condition_type: String,
    /// Whether the condition holds.
    pub status: bool,
    /// Severity when `status` is false.
    #[serde(default)]
    pub severity: ConditionSeverity,
    /// Machine-readable reason.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Time the status last flipped.
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Creates a true condition.
    pub fn true_condition(condition_type: impl Into<String>) -> Self {
        Self {
            condition_type: condition_type.into(),
            status: true,
            severity: ConditionSeverity::None,
            reason: String::new(),
            message: String::new(),
            last_transition_time: Utc::now(),
        }
    }

    /// Creates a false condition.
    pub fn false_condition(
        condition_type: impl Into<String>,
        severity: ConditionSeverity,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            condition_type: condition_type.into(),
            status: false,
            severity,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }
}

/// The set of conditions on a record, at most one per type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns the condition of the given type.
    pub fn get(&self, condition_type: &str) -> Option<&Condition> {
        self.0.iter().find(|c| c.condition_type == condition_type)
    }

    /// Returns true if the condition exists and holds.
    pub fn is_true(&self, condition_type: &str) -> bool {
        self.get(condition_type).is_some_and(|c| c.status)
    }

    /// Returns true if the condition exists and does not hold.
    pub fn is_false(&self, condition_type: &str) -> bool {
        self.get(condition_type).is_some_and(|c| !c.status)
    }

    /// Iterates over all conditions.
    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no conditions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sets a condition, keeping the transition time when the status is unchanged.
    pub fn set(&mut self, mut condition: Condition) {
        match self
            .0
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            Some(existing) => {
                if existing.status == condition.status {
                    condition.last_transition_time = existing.last_transition_time;
                }
                *existing = condition;
            }
            None => self.0.push(condition),
        }
    }

    /// Marks the condition true.
    pub fn mark_true(&mut self, condition_type: &str) {
        self.set(Condition::true_condition(condition_type));
    }

    /// Marks the condition false.
    pub fn mark_false(
        &mut self,
        condition_type: &str,
        severity: ConditionSeverity,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.set(Condition::false_condition(
            condition_type,
            severity,
            reason,
            message,
        ));
    }

    /// Removes the condition. Returns false if it was absent.
    pub fn delete(&mut self, condition_type: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c.condition_type != condition_type);
        before != self.0.len()
    }

    /// Rebuilds the summary condition from the listed condition types.
    ///
    /// The summary is false if any listed condition is false, taking its
    /// reason and message from the most severe one (ties go to list order).
    /// It is true when every listed condition that exists holds, and it is
    /// removed when none of them exist.
    pub fn set_summary(&mut self, summary_type: &str, from: &[&str]) {
        let present: Vec<&Condition> = from.iter().filter_map(|t| self.get(t)).collect();
        if present.is_empty() {
            self.delete(summary_type);
            return;
        }

        let mut worst: Option<&Condition> = None;
        for cond in present.iter().filter(|c| !c.status) {
            if worst.map_or(true, |w| cond.severity > w.severity) {
                worst = Some(cond);
            }
        }

        let summary = match worst {
            Some(cond) => Condition::false_condition(
                summary_type,
                cond.severity,
                cond.reason.clone(),
                cond.message.clone(),
            ),
            None => Condition::true_condition(summary_type),
        };
        self.set(summary);
    }
}
