// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! JSON-over-HTTP gateway: `POST /<Method>` with the request message as body.
//!
//! The last path segment selects the method, so both `/GetAvailablePackageSummaries`
//! and fully qualified service paths are accepted.

use crate::error::{ErrorCode, PluginError, Result};
use crate::server::PackagesServer;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct ErrorBody {
    code: ErrorCode,
    message: String,
}

impl IntoResponse for PluginError {
    fn into_response(self) -> Response {
        let code = self.code();
        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (code.http_status(), Json(body)).into_response()
    }
}

/// Routes of the packages API
pub fn router(server: PackagesServer) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/{*path}", post(handle))
        .with_state(server)
}

/// Serve the packages API until the listener fails
pub async fn serve(addr: SocketAddr, server: PackagesServer) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Serving packages API on {}", addr);
    axum::serve(listener, router(server)).await?;
    Ok(())
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({}))
}

async fn handle(
    State(server): State<PackagesServer>,
    Path(path): Path<String>,
    body: Bytes,
) -> Response {
    let method = path.rsplit('/').next().unwrap_or_default().to_string();

    let timeout = Duration::from_secs(server.config().timeout_seconds);
    // Zero disables the deadline
    let result = if timeout.is_zero() {
        dispatch(&server, &method, &body).await
    } else {
        match tokio::time::timeout(timeout, dispatch(&server, &method, &body)).await {
            Ok(result) => result,
            Err(_) => Err(PluginError::Internal(format!(
                "{} did not complete within {} seconds",
                method,
                timeout.as_secs()
            ))),
        }
    };

    match result {
        Ok(response) => {
            debug!("{} succeeded", method);
            response
        }
        Err(e) => {
            if e.code() == ErrorCode::Internal {
                warn!("{} failed: {}", method, e);
            } else {
                debug!("{} rejected: {}", method, e);
            }
            e.into_response()
        }
    }
}

async fn call<Req, Resp, F, Fut>(body: &[u8], f: F) -> Result<Response>
where
    Req: DeserializeOwned,
    Resp: Serialize,
    F: FnOnce(Req) -> Fut,
    Fut: Future<Output = Result<Resp>>,
{
    let body = if body.is_empty() { b"{}".as_slice() } else { body };
    let request: Req = serde_json::from_slice(body)
        .map_err(|e| PluginError::invalid(format!("invalid request body: {}", e)))?;
    let response = f(request).await?;
    Ok(Json(response).into_response())
}

async fn dispatch(server: &PackagesServer, method: &str, body: &[u8]) -> Result<Response> {
    match method {
        "GetAvailablePackageSummaries" => {
            call(body, |r| server.get_available_package_summaries(r)).await
        }
        "GetAvailablePackageDetail" => call(body, |r| server.get_available_package_detail(r)).await,
        "GetAvailablePackageVersions" => {
            call(body, |r| server.get_available_package_versions(r)).await
        }
        "GetInstalledPackageSummaries" => {
            call(body, |r| server.get_installed_package_summaries(r)).await
        }
        "GetInstalledPackageDetail" => call(body, |r| server.get_installed_package_detail(r)).await,
        "CreateInstalledPackage" => call(body, |r| server.create_installed_package(r)).await,
        "UpdateInstalledPackage" => call(body, |r| server.update_installed_package(r)).await,
        "DeleteInstalledPackage" => call(body, |r| server.delete_installed_package(r)).await,
        "GetInstalledPackageResourceRefs" => {
            call(body, |r| server.get_installed_package_resource_refs(r)).await
        }
        "GetPackageRepositorySummaries" => {
            call(body, |r| server.get_package_repository_summaries(r)).await
        }
        "GetPackageRepositoryDetail" => {
            call(body, |r| server.get_package_repository_detail(r)).await
        }
        "AddPackageRepository" => call(body, |r| server.add_package_repository(r)).await,
        "UpdatePackageRepository" => call(body, |r| server.update_package_repository(r)).await,
        "DeletePackageRepository" => call(body, |r| server.delete_package_repository(r)).await,
        "GetPackageRepositoryPermissions" => {
            call(body, |r| server.get_package_repository_permissions(r)).await
        }
        other => Err(PluginError::not_found(format!("unknown method '{}'", other))),
    }
}
