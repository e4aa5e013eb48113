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

//! Presentation layer.
//!
//! Turns the fetch outcome into the [`ViewState`] a renderer draws from:
//! a spinner while loading, a static error, or a display-ready model whose
//! uptime keeps ticking locally after the snapshot arrived.
//!
//! The state machine only moves forward: `Loading` goes to `Error` or
//! `Ready`, and both are final for the lifetime of the mapper.

mod ticker;
mod uptime;

pub use ticker::{UptimeTicker, TICK_PERIOD};
pub use uptime::format_uptime;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::fetch::{FetchFailure, FetchResult};
use crate::snapshot::{Feature, StatusSnapshot};

/// Shown when a failure carries no message of its own.
pub const DEFAULT_ERROR_MESSAGE: &str = "Error while loading server status.";

/// Service state shown while the server answers.
pub const SERVICE_STATE_IN_SERVICE: &str = "In service";

/// What the renderer should draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Error(String),
    Ready(DisplayModel),
}

/// Display-ready projection of a snapshot plus the ticked uptime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayModel {
    /// Origin the dashboard reads from.
    pub server_address: String,
    /// e.g. `v0.6.0`
    pub version_line: String,
    pub protocol_version: u32,
    pub compatible_version: u32,
    /// Whether the configured client protocol revision may connect.
    pub client_compatibility: Option<ClientCompatibility>,
    pub features: Vec<FeatureLine>,
    pub statistics: StatisticsDisplay,
    /// When the snapshot was received.
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientCompatibility {
    pub client_version: u32,
    pub compatible: bool,
}

/// One feature row. `disabled_reason` is set iff the feature is off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLine {
    pub feature: Feature,
    pub label: &'static str,
    pub enabled: bool,
    pub state_label: &'static str,
    pub disabled_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsDisplay {
    pub service_state: &'static str,
    pub up_time_seconds: u64,
    /// Formatted with [`format_uptime`].
    pub up_time: String,
    pub clients: u64,
    pub proxies: u64,
}

/// Static inputs of a mapper.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    pub server_address: String,
    /// Client protocol revision to check against the server's range.
    pub client_protocol_version: Option<u32>,
    pub tick_period: Duration,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            client_protocol_version: None,
            tick_period: TICK_PERIOD,
        }
    }
}

#[derive(Debug)]
enum Phase {
    Loading,
    Failed(String),
    Ready {
        snapshot: Arc<StatusSnapshot>,
        fetched_at: DateTime<Utc>,
        ticker: UptimeTicker,
    },
}

/// Derives [`ViewState`] from fetch outcomes and owns the uptime ticker.
///
/// The ticker starts on the first successful outcome and is released by
/// [`teardown`](Self::teardown) or when the mapper is dropped.
#[derive(Debug)]
pub struct PresentationMapper {
    config: MapperConfig,
    phase: Phase,
    torn_down: bool,
}

impl PresentationMapper {
    #[must_use]
    pub fn new(config: MapperConfig) -> Self {
        Self {
            config,
            phase: Phase::Loading,
            torn_down: false,
        }
    }

    /// Fold a fetch outcome into the current state.
    ///
    /// Applying the same outcome again is a no-op. Starting the ticker
    /// requires a tokio runtime.
    pub fn apply(&mut self, result: &FetchResult) {
        if self.torn_down {
            return;
        }

        match (&mut self.phase, result) {
            (_, FetchResult::Pending) => {}
            (Phase::Loading, FetchResult::Failed(failure)) => {
                self.phase = Phase::Failed(error_message(failure));
            }
            (Phase::Loading, FetchResult::Succeeded(snapshot)) => {
                let seed = snapshot.statistics().up_time;
                info!("Server status ready, uptime {}", format_uptime(seed));

                self.phase = Phase::Ready {
                    snapshot: Arc::clone(snapshot),
                    fetched_at: Utc::now(),
                    ticker: UptimeTicker::with_period(seed, self.config.tick_period),
                };
            }
            (
                Phase::Ready {
                    snapshot: current,
                    fetched_at,
                    ticker,
                },
                FetchResult::Succeeded(snapshot),
            ) => {
                // A newer snapshot replaces the old one and resyncs the clock
                if !Arc::ptr_eq(current, snapshot) {
                    *current = Arc::clone(snapshot);
                    *fetched_at = Utc::now();
                    ticker.reseed(snapshot.statistics().up_time);
                }
            }
            (Phase::Ready { .. }, FetchResult::Failed(_)) | (Phase::Failed(_), _) => {}
        }
    }

    /// Current view.
    #[must_use]
    pub fn view_state(&self) -> ViewState {
        match &self.phase {
            Phase::Loading => ViewState::Loading,
            Phase::Failed(message) => ViewState::Error(message.clone()),
            Phase::Ready {
                snapshot,
                fetched_at,
                ticker,
            } => ViewState::Ready(self.display_model(snapshot, *fetched_at, ticker.seconds())),
        }
    }

    /// Ticked uptime, once ready.
    #[must_use]
    pub fn uptime_seconds(&self) -> Option<u64> {
        match &self.phase {
            Phase::Ready { ticker, .. } => Some(ticker.seconds()),
            _ => None,
        }
    }

    /// Stop the ticker and ignore any further outcomes.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Phase::Ready { ticker, .. } = &mut self.phase {
            ticker.stop();
        }
        debug!("Presentation mapper for {} torn down", self.config.server_address);
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn display_model(
        &self,
        snapshot: &StatusSnapshot,
        fetched_at: DateTime<Utc>,
        up_time_seconds: u64,
    ) -> DisplayModel {
        let version = snapshot.version();
        let statistics = snapshot.statistics();

        let features = snapshot
            .features()
            .iter()
            .map(|(feature, status)| FeatureLine {
                feature,
                label: feature.label(),
                enabled: status.is_enabled(),
                state_label: if status.is_enabled() { "enabled" } else { "disabled" },
                disabled_reason: status.disabled_reason().map(str::to_string),
            })
            .collect();

        let client_compatibility =
            self.config
                .client_protocol_version
                .map(|client_version| ClientCompatibility {
                    client_version,
                    compatible: version.accepts_client(client_version),
                });

        DisplayModel {
            server_address: self.config.server_address.clone(),
            version_line: format!("v{}", version.version_str()),
            protocol_version: version.version_code(),
            compatible_version: version.compatible_version(),
            client_compatibility,
            features,
            statistics: StatisticsDisplay {
                service_state: SERVICE_STATE_IN_SERVICE,
                up_time_seconds,
                up_time: format_uptime(up_time_seconds),
                clients: statistics.clients,
                proxies: statistics.proxies,
            },
            fetched_at,
        }
    }
}

fn error_message(failure: &FetchFailure) -> String {
    match failure.message() {
        Some(message) => message.to_string(),
        None => DEFAULT_ERROR_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ErrorKind;
    use crate::snapshot::tests::SAMPLE_BODY;
    use tokio::time::sleep;

    fn sample_snapshot() -> Arc<StatusSnapshot> {
        Arc::new(StatusSnapshot::from_json(SAMPLE_BODY.as_bytes()).unwrap())
    }

    fn mapper() -> PresentationMapper {
        PresentationMapper::new(MapperConfig {
            server_address: "http://localhost:1088".to_string(),
            client_protocol_version: Some(4),
            ..Default::default()
        })
    }

    fn ready_model(mapper: &PresentationMapper) -> DisplayModel {
        match mapper.view_state() {
            ViewState::Ready(model) => model,
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[test]
    fn test_pending_is_loading() {
        let mut mapper = mapper();
        assert_eq!(mapper.view_state(), ViewState::Loading);

        mapper.apply(&FetchResult::Pending);
        assert_eq!(mapper.view_state(), ViewState::Loading);
        assert_eq!(mapper.uptime_seconds(), None);
    }

    #[test]
    fn test_failure_message_is_passed_through() {
        let mut mapper = mapper();
        mapper.apply(&FetchResult::Failed(FetchFailure::new(
            ErrorKind::Transport,
            Some("connection refused".to_string()),
        )));

        assert_eq!(
            mapper.view_state(),
            ViewState::Error("connection refused".to_string())
        );
    }

    #[test]
    fn test_failure_without_message_uses_default() {
        let mut mapper = mapper();
        mapper.apply(&FetchResult::Failed(FetchFailure::new(ErrorKind::Shape, None)));

        assert_eq!(
            mapper.view_state(),
            ViewState::Error(DEFAULT_ERROR_MESSAGE.to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_is_terminal() {
        let mut mapper = mapper();
        mapper.apply(&FetchResult::Failed(FetchFailure::new(ErrorKind::Transport, None)));
        mapper.apply(&FetchResult::Succeeded(sample_snapshot()));

        assert!(matches!(mapper.view_state(), ViewState::Error(_)));
        assert_eq!(mapper.uptime_seconds(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_seeds_uptime_from_snapshot() {
        let mut mapper = mapper();
        mapper.apply(&FetchResult::Succeeded(sample_snapshot()));

        let model = ready_model(&mapper);
        assert_eq!(model.statistics.up_time_seconds, 3661);
        assert_eq!(model.statistics.up_time, "1 hour(s) 1 minute(s) 1 second(s)");
        assert_eq!(model.statistics.clients, 2);
        assert_eq!(model.statistics.proxies, 7);
        assert_eq!(model.statistics.service_state, SERVICE_STATE_IN_SERVICE);
        assert_eq!(model.version_line, "v0.6.0");
        assert_eq!(model.protocol_version, 4);
        assert_eq!(model.compatible_version, 3);
        assert_eq!(model.server_address, "http://localhost:1088");
        assert_eq!(
            model.client_compatibility,
            Some(ClientCompatibility {
                client_version: 4,
                compatible: true,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_uptime_ticks_while_ready() {
        let mut mapper = mapper();
        mapper.apply(&FetchResult::Succeeded(sample_snapshot()));

        sleep(Duration::from_millis(2_500)).await;

        let model = ready_model(&mapper);
        assert_eq!(model.statistics.up_time_seconds, 3663);
        assert_eq!(model.statistics.up_time, "1 hour(s) 1 minute(s) 3 second(s)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reapplying_same_snapshot_keeps_ticking() {
        let snapshot = sample_snapshot();
        let mut mapper = mapper();
        mapper.apply(&FetchResult::Succeeded(Arc::clone(&snapshot)));

        sleep(Duration::from_millis(1_500)).await;
        mapper.apply(&FetchResult::Succeeded(Arc::clone(&snapshot)));
        mapper.apply(&FetchResult::Failed(FetchFailure::new(ErrorKind::Transport, None)));

        assert_eq!(mapper.uptime_seconds(), Some(3662));
        assert!(matches!(mapper.view_state(), ViewState::Ready(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_snapshot_replaces_old() {
        let mut mapper = mapper();
        mapper.apply(&FetchResult::Succeeded(sample_snapshot()));
        sleep(Duration::from_millis(1_500)).await;

        let body = SAMPLE_BODY
            .replace(r#""up_time": 3661"#, r#""up_time": 60"#)
            .replace(r#""clients": 2"#, r#""clients": 9"#);
        let newer = Arc::new(StatusSnapshot::from_json(body.as_bytes()).unwrap());
        mapper.apply(&FetchResult::Succeeded(newer));

        let model = ready_model(&mapper);
        assert_eq!(model.statistics.up_time_seconds, 60);
        assert_eq!(model.statistics.clients, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_ticking() {
        let mut mapper = mapper();
        mapper.apply(&FetchResult::Succeeded(sample_snapshot()));
        sleep(Duration::from_millis(1_500)).await;

        mapper.teardown();
        let before = mapper.view_state();

        sleep(Duration::from_secs(5)).await;
        mapper.apply(&FetchResult::Succeeded(sample_snapshot()));

        assert!(mapper.is_torn_down());
        assert_eq!(mapper.view_state(), before);
        assert_eq!(mapper.uptime_seconds(), Some(3662));
    }

    #[test]
    fn test_teardown_while_loading_ignores_later_results() {
        let mut mapper = mapper();
        mapper.teardown();
        mapper.apply(&FetchResult::Failed(FetchFailure::new(ErrorKind::Transport, None)));
        assert_eq!(mapper.view_state(), ViewState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_reason_only_on_disabled_features() {
        let mut mapper = mapper();
        mapper.apply(&FetchResult::Succeeded(sample_snapshot()));
        let model = ready_model(&mapper);

        let labels: Vec<&str> = model.features.iter().map(|line| line.label).collect();
        assert_eq!(
            labels,
            vec!["Socks5 Proxy", "Http(s) Proxy", "SSL/TLS", "Connection Key"]
        );

        for line in &model.features {
            assert_eq!(line.disabled_reason.is_some(), !line.enabled);
            assert_eq!(line.state_label, if line.enabled { "enabled" } else { "disabled" });
        }

        let ssl = model
            .features
            .iter()
            .find(|line| line.feature == Feature::Ssl)
            .unwrap();
        assert_eq!(ssl.disabled_reason.as_deref(), Some("not support"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_incompatible_client() {
        let mut mapper = PresentationMapper::new(MapperConfig {
            client_protocol_version: Some(2),
            ..Default::default()
        });
        mapper.apply(&FetchResult::Succeeded(sample_snapshot()));

        let model = ready_model(&mapper);
        assert_eq!(
            model.client_compatibility,
            Some(ClientCompatibility {
                client_version: 2,
                compatible: false,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_mappers() {
        let mut first = mapper();
        let mut second = mapper();
        first.apply(&FetchResult::Succeeded(sample_snapshot()));
        sleep(Duration::from_millis(2_500)).await;
        second.apply(&FetchResult::Succeeded(sample_snapshot()));

        first.teardown();
        sleep(Duration::from_millis(1_200)).await;

        assert_eq!(first.uptime_seconds(), Some(3663));
        assert_eq!(second.uptime_seconds(), Some(3662));
    }
}
