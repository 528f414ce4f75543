// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Instance state-change notification envelope.
//!
//! Notifications arrive as JSON in the cloud event-bus format:
//!
//! ```json
//! {
//!   "source": "aws.ec2",
//!   "detail-type": "EC2 Instance State-change Notification",
//!   "detail": { "instance-id": "i-0abc", "state": "running" }
//! }
//! ```
//!
//! Only the fields the engine reads are modelled; everything else is ignored.

use crate::constants::{EVENT_STATE_RUNNING, EVENT_STATE_SHUTTING_DOWN, EVENT_STATE_STOPPED};
use crate::errors::{ReconcileError, Result};
use crate::types::LifecycleState;
use serde::{Deserialize, Serialize};

/// Payload of a state-change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeDetail {
    #[serde(rename = "instance-id")]
    pub instance_id: String,
    pub state: String,
}

/// A state-change notification as delivered by the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeNotification {
    pub source: String,
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    pub detail: StateChangeDetail,
}

impl StateChangeNotification {
    /// Parse a notification from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidEvent`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ReconcileError::InvalidEvent {
            reason: e.to_string(),
        })
    }

    /// Check the envelope and map the instance state to a lifecycle state.
    ///
    /// Returns the instance identifier and the lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidEvent`] if the source or detail type do
    /// not match, or the state is not one of `running`, `stopped`, `shutting-down`.
    pub fn validate(
        &self,
        expected_source: &str,
        expected_detail_type: &str,
    ) -> Result<(&str, LifecycleState)> {
        if self.source != expected_source {
            return Err(ReconcileError::InvalidEvent {
                reason: format!(
                    "source {} invalid, expecting {expected_source}",
                    self.source
                ),
            });
        }
        if self.detail_type != expected_detail_type {
            return Err(ReconcileError::InvalidEvent {
                reason: format!(
                    "detail-type {} invalid, expecting {expected_detail_type}",
                    self.detail_type
                ),
            });
        }

        let state = match self.detail.state.as_str() {
            EVENT_STATE_RUNNING => LifecycleState::Starting,
            EVENT_STATE_STOPPED => LifecycleState::Stopped,
            EVENT_STATE_SHUTTING_DOWN => LifecycleState::Terminating,
            other => {
                return Err(ReconcileError::InvalidEvent {
                    reason: format!(
                        "detail.state {other} invalid, expecting one of {EVENT_STATE_RUNNING}, {EVENT_STATE_STOPPED}, {EVENT_STATE_SHUTTING_DOWN}"
                    ),
                })
            }
        };

        if self.detail.instance_id.is_empty() {
            return Err(ReconcileError::InvalidEvent {
                reason: "detail.instance-id is empty".to_string(),
            });
        }

        Ok((&self.detail.instance_id, state))
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod notification_tests;
