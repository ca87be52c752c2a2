//! Monitoring endpoints seeded into every registry.
//!
//! Heartbeat and version follow the Dockerflow container conventions; `ping`
//! predates them and is kept for existing clients.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, get};
use http::{Method, StatusCode};
use indexmap::IndexMap;
use serde_json::json;

use crate::entry::{EndpointEntry, EntryHandler};
use crate::stability::Stability;
use crate::version::VersionCache;

const CATEGORY: &str = "Monitoring";

/// The built-in endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `GET /ping` answering `{alive, uptime}`.
    Ping,
    /// `GET /__lbheartbeat__` answering `{}`.
    LbHeartbeat,
    /// `GET /__version__` answering the version object.
    Version,
}

impl Builtin {
    pub const ALL: [Self; 3] = [Self::Ping, Self::LbHeartbeat, Self::Version];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::LbHeartbeat => "lbheartbeat",
            Self::Version => "version",
        }
    }

    #[must_use]
    pub const fn route(self) -> &'static str {
        match self {
            Self::Ping => "/ping",
            Self::LbHeartbeat => "/__lbheartbeat__",
            Self::Version => "/__version__",
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Ping => "Ping Server",
            Self::LbHeartbeat => "Load Balancer Heartbeat",
            Self::Version => "Version",
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Ping | Self::LbHeartbeat => {
                "Respond without doing anything.\nThis endpoint is used to check that the service is up."
            }
            Self::Version => {
                "Respond with the JSON version object.\nhttps://github.com/mozilla-services/Dockerflow/blob/main/docs/version_object.md"
            }
        }
    }

    /// The registry entry describing this endpoint.
    pub(crate) fn entry(self) -> EndpointEntry {
        EndpointEntry {
            name: self.name().to_owned(),
            method: Method::GET,
            route: self.route().to_owned(),
            clean_route: self.route().to_owned(),
            axum_path: self.route().to_owned(),
            route_params: Vec::new(),
            title: self.title().to_owned(),
            description: self.description().to_owned(),
            category: CATEGORY.to_owned(),
            stability: Stability::Stable,
            scopes: None,
            params: IndexMap::new(),
            query: IndexMap::new(),
            input: None,
            output: None,
            no_publish: false,
            handler: EntryHandler::Builtin(self),
        }
    }

    /// Materialize the handler once the serving environment is known.
    pub(crate) fn router(self, started: Instant, versions: &Arc<VersionCache>) -> MethodRouter {
        match self {
            Self::Ping => get(move || async move {
                Json(json!({
                    "alive": true,
                    "uptime": started.elapsed().as_secs_f64(),
                }))
            }),
            Self::LbHeartbeat => get(|| async { Json(json!({})) }),
            Self::Version => {
                let versions = Arc::clone(versions);
                get(move || {
                    let versions = Arc::clone(&versions);
                    async move { version_response(&versions).await }
                })
            }
        }
    }
}

async fn version_response(versions: &VersionCache) -> Response {
    match versions.load().await {
        Ok(version) => Json(version.as_ref().clone()).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load version object");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "code": "InternalServerError",
                    "message": "Internal Server Error",
                })),
            )
                .into_response()
        }
    }
}
