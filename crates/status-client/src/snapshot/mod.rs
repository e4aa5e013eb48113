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

//! Status snapshot data model.
//!
//! A [`StatusSnapshot`] is one complete, immutable answer from the server's
//! status endpoint: version information, the feature switches, and runtime
//! statistics. Snapshots are only built from a fully valid response body;
//! a body with a missing field or a broken invariant is rejected as a whole.

mod wire;

use thiserror::Error;

/// Protocol revision spoken by the wssocks client this dashboard ships with.
pub const CLIENT_PROTOCOL_VERSION: u32 = 0x004;

/// Reason substituted when the server disables a feature without saying why.
pub const DEFAULT_DISABLED_REASON: &str = "disabled";

/// Errors raised while turning a response body into a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed status response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid version range: compatible version {compatible_version} is newer than version code {version_code}")]
    InvalidVersionRange {
        version_code: u32,
        compatible_version: u32,
    },

    #[error("invalid up_time value: {0}")]
    InvalidUptime(f64),
}

/// Server version and protocol revision range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    version_str: String,
    version_code: u32,
    compatible_version: u32,
}

impl VersionInfo {
    /// Create version info, enforcing `compatible_version <= version_code`.
    pub fn new(
        version_str: impl Into<String>,
        version_code: u32,
        compatible_version: u32,
    ) -> Result<Self, SnapshotError> {
        if compatible_version > version_code {
            return Err(SnapshotError::InvalidVersionRange {
                version_code,
                compatible_version,
            });
        }

        Ok(Self {
            version_str: version_str.into(),
            version_code,
            compatible_version,
        })
    }

    /// Display version of the server, e.g. `0.6.0`.
    #[must_use]
    pub fn version_str(&self) -> &str {
        &self.version_str
    }

    /// Current protocol revision of the server.
    #[must_use]
    pub fn version_code(&self) -> u32 {
        self.version_code
    }

    /// Lowest protocol revision the server accepts from a client.
    #[must_use]
    pub fn compatible_version(&self) -> u32 {
        self.compatible_version
    }

    /// Whether a client speaking `client_code` may connect.
    ///
    /// Clients newer than the server are refused, as are clients older than
    /// the compatible floor.
    #[must_use]
    pub fn accepts_client(&self, client_code: u32) -> bool {
        self.compatible_version <= client_code && client_code <= self.version_code
    }
}

/// The switchable server features shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Socks5,
    Http,
    Ssl,
    ConnectionKey,
}

impl Feature {
    /// All features in display order.
    pub const ALL: [Feature; 4] = [
        Feature::Socks5,
        Feature::Http,
        Feature::Ssl,
        Feature::ConnectionKey,
    ];

    /// Human-readable name
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Feature::Socks5 => "Socks5 Proxy",
            Feature::Http => "Http(s) Proxy",
            Feature::Ssl => "SSL/TLS",
            Feature::ConnectionKey => "Connection Key",
        }
    }
}

/// Enablement of one feature. A disabled feature always carries a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureStatus {
    Enabled,
    Disabled { reason: String },
}

impl FeatureStatus {
    /// Build a status from the server's flag and reason pair.
    ///
    /// The reason is ignored for enabled features. A blank reason on a
    /// disabled feature becomes [`DEFAULT_DISABLED_REASON`].
    #[must_use]
    pub fn from_flag(enabled: bool, reason: &str) -> Self {
        if enabled {
            return Self::Enabled;
        }

        let reason = reason.trim();
        let reason = if reason.is_empty() {
            DEFAULT_DISABLED_REASON
        } else {
            reason
        };

        Self::Disabled {
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Why the feature is off; `None` when it is enabled.
    #[must_use]
    pub fn disabled_reason(&self) -> Option<&str> {
        match self {
            Self::Enabled => None,
            Self::Disabled { reason } => Some(reason),
        }
    }
}

/// Enablement of every [`Feature`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSet {
    pub socks5: FeatureStatus,
    pub http: FeatureStatus,
    pub ssl: FeatureStatus,
    pub connection_key: FeatureStatus,
}

impl FeatureSet {
    #[must_use]
    pub fn get(&self, feature: Feature) -> &FeatureStatus {
        match feature {
            Feature::Socks5 => &self.socks5,
            Feature::Http => &self.http,
            Feature::Ssl => &self.ssl,
            Feature::ConnectionKey => &self.connection_key,
        }
    }

    /// Iterate features in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, &FeatureStatus)> {
        Feature::ALL.into_iter().map(move |feature| (feature, self.get(feature)))
    }
}

/// Runtime counters reported by the server at fetch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistics {
    /// Seconds since the server started.
    pub up_time: u64,
    /// Connected proxy clients.
    pub clients: u64,
    /// Open proxy/tunnel connections.
    pub proxies: u64,
}

/// One complete status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    version: VersionInfo,
    features: FeatureSet,
    statistics: Statistics,
}

impl StatusSnapshot {
    #[must_use]
    pub fn new(version: VersionInfo, features: FeatureSet, statistics: Statistics) -> Self {
        Self {
            version,
            features,
            statistics,
        }
    }

    /// Parse and validate a status response body.
    pub fn from_json(body: &[u8]) -> Result<Self, SnapshotError> {
        let status: wire::WireStatus = serde_json::from_slice(body)?;
        Self::try_from(status)
    }

    #[must_use]
    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    #[must_use]
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }
}
