// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Identity this plugin reports on every reference it hands out
pub mod plugin {
    pub const NAME: &str = "kapp_controller.packages";
    pub const VERSION: &str = "v1alpha1";
}

/// Kubernetes annotation keys read or written by the plugin
pub mod annotations {
    /// Set by kapp-controller on PackageMetadata, value is `<namespace>/<repository-name>`
    pub const REPO_REF: &str = "packaging.carvel.dev/package-repository-ref";
    /// Present on a PackageInstall that kapp-controller may downgrade
    pub const DOWNGRADABLE: &str = "packaging.carvel.dev/downgradable";
    /// Marks secrets whose lifecycle is owned by the plugin
    pub const MANAGED_BY: &str = "kapp-packages-plugin.carvel.dev/managed-by";
    /// Value of the managed-by annotation
    pub const MANAGED_BY_VALUE: &str = "plugin:kapp-controller";
    /// Free-form repository description
    pub const DESCRIPTION: &str = "kapp-packages-plugin.carvel.dev/description";
}

/// Fallback repository slug for packages whose metadata carries no repository annotation
pub const UNKNOWN_REPO: &str = "unknown";

/// Placeholder returned instead of credential values, and accepted back to mean "unchanged"
pub const REDACTED: &str = "REDACTED";

/// Secret types and data keys understood by kapp-controller fetchers
pub mod secrets {
    pub const TYPE_BASIC_AUTH: &str = "kubernetes.io/basic-auth";
    pub const TYPE_DOCKER_CONFIG_JSON: &str = "kubernetes.io/dockerconfigjson";
    pub const TYPE_OPAQUE: &str = "Opaque";

    pub const KEY_USERNAME: &str = "username";
    pub const KEY_PASSWORD: &str = "password";
    pub const KEY_TOKEN: &str = "token";
    pub const KEY_DOCKER_CONFIG_JSON: &str = ".dockerconfigjson";
    pub const KEY_SSH_PRIVATE_KEY: &str = "ssh-privatekey";
    pub const KEY_SSH_KNOWN_HOSTS: &str = "ssh-knownhosts";

    /// Key used for the values file of an installed package
    pub const KEY_VALUES: &str = "values.yaml";
}

/// Condition types of kapp-controller's generic reconciliation status
pub mod conditions {
    pub const RECONCILING: &str = "Reconciling";
    pub const RECONCILE_SUCCEEDED: &str = "ReconcileSucceeded";
    pub const RECONCILE_FAILED: &str = "ReconcileFailed";
    pub const DELETING: &str = "Deleting";
    pub const DELETE_FAILED: &str = "DeleteFailed";

    /// Message kapp-controller puts on a condition when the detail lives in usefulErrorMessage
    pub const USEFUL_ERROR_SENTINEL: &str = "Error (see .status.usefulErrorMessage for details)";

    pub const NO_STATUS_MESSAGE: &str = "No status information yet";
    pub const STALE_GENERATION_MESSAGE: &str = "Waiting for the latest changes to be reconciled";
}

/// API group polling configuration used at startup
pub mod crd {
    pub const PACKAGING_GROUP: &str = "packaging.carvel.dev";
    pub const DATA_PACKAGING_GROUP: &str = "data.packaging.carvel.dev";
    /// Initial polling interval in seconds when waiting for the API groups
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Suffix kapp-controller appends to an App name for its kapp app ConfigMap
pub const KAPP_APP_SUFFIX: &str = "-ctrl";

/// Type URL carried by the repository custom detail payload
pub const REPOSITORY_CUSTOM_DETAIL_TYPE: &str =
    "type.googleapis.com/kubeappsapis.plugins.kapp_controller.packages.v1alpha1.KappControllerPackageRepositoryCustomDetail";
