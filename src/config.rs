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

//! Application configuration management.
//!
//! This module handles persistent configuration storage using TOML format
//! and command line overrides of the stored values.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use status_client::{DashboardConfig, CLIENT_PROTOCOL_VERSION, DEFAULT_ORIGIN};

/// confy application name
pub const APP_NAME: &str = "wssocks-status-desktop";

const CONFIG_NAME: &str = "config";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Origin of the wssocks server (http, https, ws or wss)
    #[serde(default = "default_server_origin")]
    pub server_origin: String,

    /// Timeout for the status request in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Client protocol revision checked against the server (0 disables the check)
    #[serde(default = "default_client_protocol_version")]
    pub client_protocol_version: u32,

    /// Initial window width in pixels
    #[serde(default = "default_window_width")]
    pub window_width: f32,

    /// Initial window height in pixels
    #[serde(default = "default_window_height")]
    pub window_height: f32,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_server_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_client_protocol_version() -> u32 {
    CLIENT_PROTOCOL_VERSION
}

fn default_window_width() -> f32 {
    900.0
}

fn default_window_height() -> f32 {
    520.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            server_origin: default_server_origin(),
            request_timeout_secs: default_request_timeout_secs(),
            client_protocol_version: default_client_protocol_version(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Apply command line overrides for this session
    pub fn apply_overrides(&mut self, origin: Option<String>, timeout_secs: Option<u64>) {
        if let Some(origin) = origin.filter(|o| !o.trim().is_empty()) {
            self.server_origin = origin.trim().to_string();
        }
        if let Some(timeout_secs) = timeout_secs {
            self.request_timeout_secs = timeout_secs;
        }
    }

    /// Build the dashboard configuration from the stored values
    pub fn dashboard_config(&self) -> DashboardConfig {
        DashboardConfig {
            origin: self.server_origin.clone(),
            // A zero timeout would fail every request
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            client_protocol_version: (self.client_protocol_version > 0)
                .then_some(self.client_protocol_version),
            ..Default::default()
        }
    }
}
