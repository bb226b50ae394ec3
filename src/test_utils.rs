// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request the mock received, with its decoded JSON body (Null when empty)
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: serde_json::Value,
}

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PUT requests matching the path
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    /// Add a response for PATCH requests matching the path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Add a response for DELETE requests matching the path
    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Handle to the requests received so far, usable after the client was built
    pub fn recorder(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        self.requests.clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Longest registered prefix wins, so specific paths can shadow broader ones
        responses
            .iter()
            .filter(|((m, p), _)| m == method && path.starts_with(p.as_str()))
            .max_by_key(|((_, p), _)| p.len())
            .map(|(_, resp)| resp.clone())
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

/// Requests with the given method, in arrival order
pub fn requests_with_method(
    recorder: &Arc<Mutex<Vec<RecordedRequest>>>,
    method: &str,
) -> Vec<RecordedRequest> {
    recorder
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.method == method)
        .cloned()
        .collect()
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let response = self.find_response(&method, &path);
        let requests = self.requests.clone();

        Box::pin(async move {
            let bytes = req.into_body().collect().await?.to_bytes();
            let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
            requests.lock().unwrap().push(RecordedRequest {
                method,
                path,
                body,
            });

            let (status, body) = response.unwrap_or_else(|| {
                // Default 404 for unmatched requests
                (
                    404,
                    r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#
                        .to_string(),
                )
            });
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a 409 conflict response
pub fn already_exists_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" already exists", resource, name),
        "reason": "AlreadyExists",
        "code": 409
    })
    .to_string()
}

/// Wrap items in a list response
pub fn list_json(api_version: &str, kind: &str, items: Vec<serde_json::Value>) -> String {
    serde_json::json!({
        "apiVersion": api_version,
        "kind": format!("{}List", kind),
        "metadata": {"resourceVersion": "1"},
        "items": items
    })
    .to_string()
}

pub fn package_json(namespace: &str, ref_name: &str, version: &str) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "data.packaging.carvel.dev/v1alpha1",
        "kind": "Package",
        "metadata": {
            "name": format!("{}.{}", ref_name, version),
            "namespace": namespace
        },
        "spec": {
            "refName": ref_name,
            "version": version,
            "releaseNotes": format!("release notes for {}", version),
            "licenses": ["Apache 2.0"]
        }
    })
}

pub fn package_metadata_json(
    namespace: &str,
    ref_name: &str,
    repo_ref: Option<&str>,
) -> serde_json::Value {
    let mut metadata = serde_json::json!({
        "name": ref_name,
        "namespace": namespace
    });
    if let Some(repo_ref) = repo_ref {
        metadata["annotations"] = serde_json::json!({});
        metadata["annotations"][crate::constants::annotations::REPO_REF] =
            serde_json::json!(repo_ref);
    }
    serde_json::json!({
        "apiVersion": "data.packaging.carvel.dev/v1alpha1",
        "kind": "PackageMetadata",
        "metadata": metadata,
        "spec": {
            "displayName": "Classic Tetris",
            "shortDescription": "A great game for arcade gamers",
            "categories": ["logging", "daemon-set"],
            "maintainers": [{"name": "person1"}]
        }
    })
}

pub fn package_install_json(
    namespace: &str,
    name: &str,
    ref_name: &str,
    constraints: &str,
    installed_version: Option<&str>,
) -> serde_json::Value {
    let mut status = serde_json::json!({
        "observedGeneration": 1,
        "conditions": [{"type": "ReconcileSucceeded", "status": "True"}],
        "friendlyDescription": "Reconcile succeeded"
    });
    if let Some(version) = installed_version {
        status["version"] = serde_json::json!(version);
        status["lastAttemptedVersion"] = serde_json::json!(version);
    }
    serde_json::json!({
        "apiVersion": "packaging.carvel.dev/v1alpha1",
        "kind": "PackageInstall",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "generation": 1,
            "resourceVersion": "42"
        },
        "spec": {
            "serviceAccountName": "default",
            "syncPeriod": "10m",
            "packageRef": {
                "refName": ref_name,
                "versionSelection": {"constraints": constraints}
            }
        },
        "status": status
    })
}

/// A reconciled imgpkgBundle repository without auth
pub fn package_repository_json(namespace: &str, name: &str) -> String {
    package_repository_value(namespace, name, None, "ReconcileSucceeded").to_string()
}

pub fn package_repository_value(
    namespace: &str,
    name: &str,
    secret_name: Option<&str>,
    condition: &str,
) -> serde_json::Value {
    let mut fetch = serde_json::json!({
        "image": "projects.registry.vmware.com/tce/main:0.9.1"
    });
    if let Some(secret_name) = secret_name {
        fetch["secretRef"] = serde_json::json!({ "name": secret_name });
    }
    serde_json::json!({
        "apiVersion": "packaging.carvel.dev/v1alpha1",
        "kind": "PackageRepository",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "repo-uid",
            "generation": 1,
            "resourceVersion": "7"
        },
        "spec": {
            "syncPeriod": "24h",
            "fetch": {"imgpkgBundle": fetch}
        },
        "status": {
            "observedGeneration": 1,
            "conditions": [{"type": condition, "status": "True"}]
        }
    })
}

/// A secret with string data, encoded the way the API server returns it
pub fn secret_json(
    namespace: &str,
    name: &str,
    secret_type: &str,
    data: &[(&str, &str)],
    annotations: &[(&str, &str)],
) -> serde_json::Value {
    use base64::Engine;

    let data: serde_json::Map<String, serde_json::Value> = data
        .iter()
        .map(|(k, v)| {
            (
                k.to_string(),
                serde_json::json!(base64::engine::general_purpose::STANDARD.encode(v)),
            )
        })
        .collect();
    let annotations: serde_json::Map<String, serde_json::Value> = annotations
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::json!(v)))
        .collect();
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "annotations": annotations,
            "resourceVersion": "3"
        },
        "type": secret_type,
        "data": data
    })
}
