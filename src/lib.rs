// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod api;
pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod identifiers;
pub mod kubernetes;
pub mod policy;
pub mod rpc;
pub mod server;
pub mod status;
pub mod translate;
pub mod types;
pub mod versions;

#[cfg(test)]
pub mod test_utils;

pub use server::PackagesServer;
