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

use std::fmt;

use reqwest::Url;
use thiserror::Error;

/// Fixed path of the status resource on the server.
pub const STATUS_PATH: &str = "/api/status";

/// Errors in the configured server origin.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid server origin '{origin}': {reason}")]
    Parse { origin: String, reason: String },

    #[error("unsupported scheme '{0}', expected http, https, ws or wss")]
    UnsupportedScheme(String),

    #[error("server origin '{0}' has no host")]
    MissingHost(String),
}

/// Status URL bound to one server origin.
///
/// Only the scheme, host and port of the origin survive; the status path
/// is always [`STATUS_PATH`]. WebSocket origins map onto the HTTP listener
/// they share (`ws` to `http`, `wss` to `https`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEndpoint {
    origin: String,
    url: Url,
}

impl StatusEndpoint {
    pub fn from_origin(origin: &str) -> Result<Self, EndpointError> {
        let parse_error = |reason: String| EndpointError::Parse {
            origin: origin.to_string(),
            reason,
        };

        let parsed = Url::parse(origin.trim()).map_err(|e| parse_error(e.to_string()))?;

        let scheme = match parsed.scheme() {
            "http" | "ws" => "http",
            "https" | "wss" => "https",
            other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
        };

        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| EndpointError::MissingHost(origin.to_string()))?;

        // port() is None when it matches the default for the parsed scheme,
        // which is also the default for the mapped one
        let authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let origin = format!("{scheme}://{authority}");
        let url = Url::parse(&format!("{origin}{STATUS_PATH}"))
            .map_err(|e| parse_error(e.to_string()))?;

        Ok(Self { origin, url })
    }

    /// Normalized origin, e.g. `http://proxy.example.com:1088`.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for StatusEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.url, f)
    }
}
