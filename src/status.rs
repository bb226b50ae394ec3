// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reduces kapp-controller's open-ended condition list to a closed readiness model.

use crate::constants::conditions;
use crate::types::status::{Condition, GenericStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Installed,
    Pending,
    Failed,
    Unspecified,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedStatus {
    pub readiness: Readiness,
    pub message: String,
}

impl NormalizedStatus {
    fn new(readiness: Readiness, message: impl Into<String>) -> Self {
        Self {
            readiness,
            message: message.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Installed
    }
}

/// Condition types this plugin understands
#[derive(Clone, Debug, PartialEq, Eq)]
enum ConditionKind {
    Reconciling,
    ReconcileSucceeded,
    ReconcileFailed,
    Deleting,
    DeleteFailed,
    Unrecognized,
}

impl From<&str> for ConditionKind {
    fn from(s: &str) -> Self {
        match s {
            conditions::RECONCILING => ConditionKind::Reconciling,
            conditions::RECONCILE_SUCCEEDED => ConditionKind::ReconcileSucceeded,
            conditions::RECONCILE_FAILED => ConditionKind::ReconcileFailed,
            conditions::DELETING => ConditionKind::Deleting,
            conditions::DELETE_FAILED => ConditionKind::DeleteFailed,
            _ => ConditionKind::Unrecognized,
        }
    }
}

/// Normalize a reconciliation status.
///
/// `generation` is the resource's `metadata.generation`; when the status has observed an
/// older generation the result is Pending regardless of the conditions.
pub fn normalize(status: Option<&GenericStatus>, generation: Option<i64>) -> NormalizedStatus {
    let Some(status) = status.filter(|s| !s.conditions.is_empty()) else {
        return NormalizedStatus::new(Readiness::Pending, conditions::NO_STATUS_MESSAGE);
    };

    if let (Some(generation), Some(observed)) = (generation, status.observed_generation) {
        if observed < generation {
            return NormalizedStatus::new(
                Readiness::Pending,
                conditions::STALE_GENERATION_MESSAGE,
            );
        }
    }

    for condition in &status.conditions {
        let readiness = match ConditionKind::from(condition.condition_type.as_str()) {
            ConditionKind::ReconcileSucceeded if condition.is_true() => Readiness::Installed,
            ConditionKind::ReconcileFailed | ConditionKind::DeleteFailed => Readiness::Failed,
            ConditionKind::Reconciling | ConditionKind::Deleting => Readiness::Pending,
            ConditionKind::ReconcileSucceeded | ConditionKind::Unrecognized => continue,
        };
        return NormalizedStatus::new(readiness, condition_message(condition, status));
    }

    let types: Vec<&str> = status
        .conditions
        .iter()
        .map(|c| c.condition_type.as_str())
        .collect();
    NormalizedStatus::new(
        Readiness::Unspecified,
        format!("Unrecognized condition type(s): {}", types.join(", ")),
    )
}

/// A resource may be mutated only once kapp-controller has settled on an outcome
pub fn is_stable(status: Option<&GenericStatus>, generation: Option<i64>) -> bool {
    matches!(
        normalize(status, generation).readiness,
        Readiness::Installed | Readiness::Failed
    )
}

fn condition_message(condition: &Condition, status: &GenericStatus) -> String {
    let non_empty = |s: &Option<String>| s.clone().filter(|s| !s.is_empty());

    match condition.message.as_deref() {
        Some(conditions::USEFUL_ERROR_SENTINEL) => non_empty(&status.useful_error_message)
            .unwrap_or_else(|| conditions::USEFUL_ERROR_SENTINEL.to_string()),
        _ => non_empty(&condition.message)
            .or_else(|| non_empty(&status.friendly_description))
            .or_else(|| non_empty(&condition.reason))
            .unwrap_or_else(|| condition.condition_type.clone()),
    }
}
