// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! kapp-controller custom resources consumed by the plugin.

pub mod app;
pub mod package;
pub mod package_install;
pub mod package_repository;
pub mod status;

pub use app::App;
pub use package::{Package, PackageMetadata};
pub use package_install::PackageInstall;
pub use package_repository::{Fetch, FetchType, PackageRepository};
pub use status::{Condition, GenericStatus};
