// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery, deployed resource lookup, and access reviews.

pub mod access;
pub mod crd;
pub mod resources;

pub use access::repository_permissions;
pub use crd::wait_for_packaging_crds;
pub use resources::resource_refs;
