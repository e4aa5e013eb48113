// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Status client library for wssocks proxy servers.
//!
//! Reads the server's status snapshot once and derives what a dashboard
//! should show from it. The layers can be used independently or composed:
//!
//! - **Snapshot layer**: the status data model and its JSON shape
//! - **Fetch layer**: endpoint derivation and the single background request
//! - **Presentation layer**: loading/error/ready view state with a locally
//!   ticking uptime clock
//!
//! # Quick Start
//!
//! Use the [`Dashboard`] type for full-stack operation:
//!
//! ```no_run
//! use status_client::{Dashboard, DashboardConfig, ViewState};
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let dashboard = Dashboard::spawn(DashboardConfig {
//!         origin: "http://localhost:1088".to_string(),
//!         ..Default::default()
//!     })
//!     .expect("valid origin");
//!
//!     loop {
//!         match dashboard.view_state() {
//!             ViewState::Loading => println!("loading..."),
//!             ViewState::Error(message) => println!("{message}"),
//!             ViewState::Ready(model) => println!("up {}", model.statistics.up_time),
//!         }
//!         tokio::time::sleep(Duration::from_secs(1)).await;
//!     }
//! }
//! ```

pub mod fetch;
pub mod presentation;
pub mod snapshot;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::debug;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

pub use fetch::{
    EndpointError, ErrorKind, FetchError, FetchFailure, FetchResult, StatusEndpoint, StatusFetcher,
};
pub use presentation::{
    format_uptime, DisplayModel, FeatureLine, MapperConfig, PresentationMapper, StatisticsDisplay,
    ViewState,
};
pub use snapshot::{
    Feature, FeatureSet, FeatureStatus, SnapshotError, Statistics, StatusSnapshot, VersionInfo,
    CLIENT_PROTOCOL_VERSION,
};

/// Default origin of a locally running wssocks server.
pub const DEFAULT_ORIGIN: &str = "http://localhost:1088";

/// Errors setting up a dashboard.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Configuration for the full-stack dashboard.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Origin of the server to read status from.
    pub origin: String,
    /// Timeout for the status request.
    pub request_timeout: Duration,
    /// Client protocol revision to check against the server, if any.
    pub client_protocol_version: Option<u32>,
    /// Uptime tick period.
    pub tick_period: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            request_timeout: Duration::from_secs(10),
            client_protocol_version: Some(CLIENT_PROTOCOL_VERSION),
            tick_period: presentation::TICK_PERIOD,
        }
    }
}

/// One mounted dashboard: a single status fetch feeding one presentation
/// mapper.
///
/// Dropping the dashboard (or calling [`shutdown`](Self::shutdown)) cancels
/// the request if it is still in flight and stops the uptime ticker.
pub struct Dashboard {
    mapper: Arc<Mutex<PresentationMapper>>,
    fetcher: StatusFetcher,
    runtime: Handle,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    /// Spawn a dashboard with the given configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: DashboardConfig) -> Result<Self, DashboardError> {
        let endpoint = StatusEndpoint::from_origin(&config.origin)?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self::with_client(
            client,
            endpoint,
            MapperConfig {
                server_address: String::new(),
                client_protocol_version: config.client_protocol_version,
                tick_period: config.tick_period,
            },
        ))
    }

    /// Spawn a dashboard with a caller-supplied HTTP client.
    ///
    /// The mapper's server address is always taken from `endpoint`.
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        endpoint: StatusEndpoint,
        mapper_config: MapperConfig,
    ) -> Self {
        let mapper = Arc::new(Mutex::new(PresentationMapper::new(MapperConfig {
            server_address: endpoint.origin().to_string(),
            ..mapper_config
        })));
        let fetcher = StatusFetcher::spawn(client, endpoint);
        let cancel_token = CancellationToken::new();

        // Push the outcome into the mapper as soon as it lands so the ticker
        // starts with the data, not with the next render
        let mut result_rx = fetcher.subscribe();
        let task_mapper = Arc::clone(&mapper);
        let task_cancel = cancel_token.clone();

        tokio::spawn(async move {
            loop {
                let result = result_rx.borrow_and_update().clone();
                apply_result(&task_mapper, &result);
                if !result.is_pending() {
                    return;
                }

                tokio::select! {
                    changed = result_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    () = task_cancel.cancelled() => {
                        debug!("Dashboard result forwarding cancelled");
                        return;
                    }
                }
            }
        });

        Self {
            mapper,
            fetcher,
            runtime: Handle::current(),
            cancel_token,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &StatusEndpoint {
        self.fetcher.endpoint()
    }

    /// Raw outcome of the status request.
    #[must_use]
    pub fn fetch_result(&self) -> FetchResult {
        self.fetcher.result()
    }

    /// Current view for the renderer.
    ///
    /// Safe to call from threads outside the runtime.
    #[must_use]
    pub fn view_state(&self) -> ViewState {
        // The ticker may start here if the forwarding task has not run yet
        let _runtime = self.runtime.enter();
        let result = self.fetcher.result();
        let mut mapper = self.mapper.lock().unwrap_or_else(PoisonError::into_inner);
        mapper.apply(&result);
        mapper.view_state()
    }

    /// Wait for the request to settle and return the resulting view.
    pub async fn settled(&self) -> ViewState {
        self.fetcher.settled().await;
        self.view_state()
    }

    /// Stop the request, the result forwarding and the uptime ticker.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
        self.fetcher.shutdown();
        self.mapper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .teardown();
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn apply_result(mapper: &Mutex<PresentationMapper>, result: &FetchResult) {
    mapper
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .apply(result);
}
