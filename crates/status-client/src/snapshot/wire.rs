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

//! JSON shape of the `/api/status` response.
//!
//! Every field is required. Unknown fields are ignored.

use serde::Deserialize;

use super::{FeatureSet, FeatureStatus, SnapshotError, Statistics, StatusSnapshot, VersionInfo};

#[derive(Debug, Deserialize)]
pub(super) struct WireStatus {
    info: WireInfo,
    statistics: WireStatistics,
}

#[derive(Debug, Deserialize)]
struct WireVersion {
    version_str: String,
    version_code: u32,
    compatible_version: u32,
}

#[derive(Debug, Deserialize)]
struct WireInfo {
    version: WireVersion,
    socks5_enabled: bool,
    socks5_disabled_reason: String,
    http_enabled: bool,
    http_disabled_reason: String,
    ssl_enabled: bool,
    ssl_disabled_reason: String,
    conn_key_enable: bool,
    conn_key_disabled_reason: String,
}

#[derive(Debug, Deserialize)]
struct WireStatistics {
    // Encoded from a float duration on the server side
    up_time: f64,
    clients: u64,
    proxies: u64,
}

impl TryFrom<WireStatus> for StatusSnapshot {
    type Error = SnapshotError;

    fn try_from(status: WireStatus) -> Result<Self, Self::Error> {
        let WireStatus { info, statistics } = status;

        let version = VersionInfo::new(
            info.version.version_str,
            info.version.version_code,
            info.version.compatible_version,
        )?;

        let features = FeatureSet {
            socks5: FeatureStatus::from_flag(info.socks5_enabled, &info.socks5_disabled_reason),
            http: FeatureStatus::from_flag(info.http_enabled, &info.http_disabled_reason),
            ssl: FeatureStatus::from_flag(info.ssl_enabled, &info.ssl_disabled_reason),
            connection_key: FeatureStatus::from_flag(
                info.conn_key_enable,
                &info.conn_key_disabled_reason,
            ),
        };

        let statistics = Statistics {
            up_time: whole_seconds(statistics.up_time)?,
            clients: statistics.clients,
            proxies: statistics.proxies,
        };

        Ok(StatusSnapshot::new(version, features, statistics))
    }
}

// 2^64, the first value a u64 cannot hold
const UPTIME_LIMIT: f64 = 18_446_744_073_709_551_616.0;

fn whole_seconds(value: f64) -> Result<u64, SnapshotError> {
    if !value.is_finite() || value < 0.0 || value >= UPTIME_LIMIT {
        return Err(SnapshotError::InvalidUptime(value));
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "value is finite, non-negative, below 2^64 and truncated to whole seconds"
    )]
    let seconds = value.trunc() as u64;
    Ok(seconds)
}
