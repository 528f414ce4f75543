// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for hostwarden.
//!
//! Numeric and string defaults used throughout the codebase, grouped by concern.
//! Everything here can be overridden through [`crate::config::EngineConfig`].

// ============================================================================
// DNS Record Constants
// ============================================================================

/// TTL applied to address records created by the reconciler (5 minutes)
pub const DEFAULT_RECORD_TTL_SECS: u32 = 300;

/// Instance tag holding the declared hostname
pub const DEFAULT_HOSTNAME_TAG: &str = "HostName";

// ============================================================================
// Change Synchronization Constants
// ============================================================================

/// Interval between change status polls (10 seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Number of change status polls before giving up (~90 seconds total)
pub const DEFAULT_POLL_ATTEMPTS: u32 = 9;

// ============================================================================
// Naming Convention Constants
// ============================================================================

/// Width of the company code segment
pub const DEFAULT_COMPANY_CODE_LEN: usize = 3;

/// Minimum width of the application code segment
pub const DEFAULT_APPLICATION_CODE_MIN_LEN: usize = 2;

/// Maximum width of the application code segment
pub const DEFAULT_APPLICATION_CODE_MAX_LEN: usize = 5;

/// Environment codes accepted in the environment segment
pub const DEFAULT_ENVIRONMENT_CODES: &str = "abcdijlmopqrstu";

/// Highest instance number representable in two digits
pub const MAX_INSTANCE_NUMBER: u32 = 99;

/// Regex fragment for the two-digit instance number
pub const INSTANCE_NUMBER_PATTERN: &str = "[0-9]{2}";

/// Regex fragment matching any zone suffix (cross-zone scope)
pub const ANY_ZONE_SUFFIX_PATTERN: &str = "[a-z]";

/// Company code substituted into hostnames while test mode is enabled
pub const TEST_COMPANY_CODE: &str = "tst";

// ============================================================================
// Event Envelope Constants
// ============================================================================

/// Expected `source` of lifecycle notifications
pub const DEFAULT_EVENT_SOURCE: &str = "aws.ec2";

/// Expected `detail-type` of lifecycle notifications
pub const DEFAULT_EVENT_DETAIL_TYPE: &str = "EC2 Instance State-change Notification";

/// Notification state for an instance that has started
pub const EVENT_STATE_RUNNING: &str = "running";

/// Notification state for an instance that has stopped
pub const EVENT_STATE_STOPPED: &str = "stopped";

/// Notification state for an instance that is terminating
pub const EVENT_STATE_SHUTTING_DOWN: &str = "shutting-down";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Enables the prune pass when truthy
pub const ENV_PRUNE: &str = "PRUNE";

/// Enables test mode when truthy
pub const ENV_TEST: &str = "TEST";
