// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Package repository auth: user-managed secret references and plugin-managed secrets.

pub mod credentials;
pub mod reconcile;
pub mod secrets;

pub use credentials::{parse_auth, AuthKind, AuthRequest, Credential, Credentials};
pub use reconcile::{AppliedAuth, AuthPlan, AuthState};
