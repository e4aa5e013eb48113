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

//! Status fetch layer.
//!
//! Derives the status endpoint from the server origin and issues exactly one
//! request against it in a background task. The outcome is published as a
//! [`FetchResult`] over a watch channel so the presentation side can
//! subscribe to it.

mod endpoint;

pub use endpoint::{EndpointError, StatusEndpoint, STATUS_PATH};

use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::snapshot::{SnapshotError, StatusSnapshot};

/// Errors from a single status request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("status request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Shape(#[from] SnapshotError),
}

/// Coarse failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be completed or was answered with a non-success status.
    Transport,
    /// The response body does not describe a valid snapshot.
    Shape,
}

impl FetchError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::HttpStatus(_) => ErrorKind::Transport,
            Self::Shape(_) => ErrorKind::Shape,
        }
    }
}

/// Cloneable summary of a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    kind: ErrorKind,
    message: Option<String>,
}

impl FetchFailure {
    /// Blank messages are stored as `None`.
    #[must_use]
    pub fn new(kind: ErrorKind, message: Option<String>) -> Self {
        let message = message.filter(|m| !m.trim().is_empty());
        Self { kind, message }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl From<&FetchError> for FetchFailure {
    fn from(error: &FetchError) -> Self {
        Self::new(error.kind(), Some(error.to_string()))
    }
}

/// Outcome of the status request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchResult {
    /// Request in flight.
    #[default]
    Pending,
    /// Request errored.
    Failed(FetchFailure),
    /// Response parsed into a snapshot.
    Succeeded(Arc<StatusSnapshot>),
}

impl FetchResult {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl From<Result<StatusSnapshot, FetchError>> for FetchResult {
    fn from(result: Result<StatusSnapshot, FetchError>) -> Self {
        match result {
            Ok(snapshot) => Self::Succeeded(Arc::new(snapshot)),
            Err(error) => Self::Failed(FetchFailure::from(&error)),
        }
    }
}

/// Request the status once and parse the body.
pub async fn fetch_snapshot(
    client: &reqwest::Client,
    endpoint: &StatusEndpoint,
) -> Result<StatusSnapshot, FetchError> {
    let response = client.get(endpoint.url().clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status));
    }

    let body = response.bytes().await?;
    Ok(StatusSnapshot::from_json(&body)?)
}

/// Request the status once and fold the outcome into a [`FetchResult`].
pub async fn fetch(client: &reqwest::Client, endpoint: &StatusEndpoint) -> FetchResult {
    match fetch_snapshot(client, endpoint).await {
        Ok(snapshot) => {
            info!(
                "Server status received from {} (version {})",
                endpoint,
                snapshot.version().version_str()
            );
            FetchResult::from(Ok(snapshot))
        }
        Err(e) => {
            warn!("Failed to load server status from {}: {}", endpoint, e);
            FetchResult::from(Err(e))
        }
    }
}

/// Handle to the single background status request.
///
/// The request starts as soon as the fetcher is spawned. It is never retried;
/// dropping the handle or calling [`shutdown`](Self::shutdown) abandons a
/// request that is still in flight.
pub struct StatusFetcher {
    endpoint: StatusEndpoint,
    result_rx: watch::Receiver<FetchResult>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for StatusFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusFetcher")
            .field("endpoint", &self.endpoint)
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl StatusFetcher {
    /// Spawn the request task. Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(client: reqwest::Client, endpoint: StatusEndpoint) -> Self {
        let (result_tx, result_rx) = watch::channel(FetchResult::Pending);
        let cancel_token = CancellationToken::new();

        let task_cancel = cancel_token.clone();
        let task_endpoint = endpoint.clone();

        tokio::spawn(async move {
            info!("Fetching server status from {}", task_endpoint);

            tokio::select! {
                result = fetch(&client, &task_endpoint) => {
                    // Only fails once every receiver is gone
                    let _ = result_tx.send(result);
                }
                () = task_cancel.cancelled() => {
                    debug!("Status fetch from {} cancelled", task_endpoint);
                }
            }
        });

        Self {
            endpoint,
            result_rx,
            cancel_token,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &StatusEndpoint {
        &self.endpoint
    }

    /// Current outcome.
    #[must_use]
    pub fn result(&self) -> FetchResult {
        self.result_rx.borrow().clone()
    }

    /// Subscribe to outcome changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FetchResult> {
        self.result_rx.clone()
    }

    /// Wait until the request has failed or succeeded.
    ///
    /// Returns [`FetchResult::Pending`] if the request was cancelled first.
    pub async fn settled(&self) -> FetchResult {
        let mut result_rx = self.result_rx.clone();
        let settled = result_rx
            .wait_for(|result| !result.is_pending())
            .await
            .map(|result| result.clone());

        settled.unwrap_or_else(|_| result_rx.borrow().clone())
    }

    /// Abandon the request if it is still in flight.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for StatusFetcher {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::snapshot::tests::SAMPLE_BODY;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port and return its origin.
    pub(crate) async fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Read until the end of the request head
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}")
    }

    fn endpoint_for(origin: &str) -> StatusEndpoint {
        StatusEndpoint::from_origin(origin).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let origin = serve_once("200 OK", SAMPLE_BODY.to_string()).await;
        let result = fetch(&reqwest::Client::new(), &endpoint_for(&origin)).await;

        match result {
            FetchResult::Succeeded(snapshot) => {
                assert_eq!(snapshot.statistics().up_time, 3661);
                assert_eq!(snapshot.version().version_str(), "0.6.0");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_failure() {
        let origin = serve_once("500 Internal Server Error", String::new()).await;
        let err = fetch_snapshot(&reqwest::Client::new(), &endpoint_for(&origin))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::HttpStatus(s) if s.as_u16() == 500));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_malformed_body_is_shape_failure() {
        let origin = serve_once("200 OK", r#"{"info": {}}"#.to_string()).await;
        let result = fetch(&reqwest::Client::new(), &endpoint_for(&origin)).await;

        match result {
            FetchResult::Failed(failure) => {
                assert_eq!(failure.kind(), ErrorKind::Shape);
                assert!(failure.message().is_some());
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_body_is_shape_failure() {
        let origin = serve_once("200 OK", String::new()).await;
        let result = fetch(&reqwest::Client::new(), &endpoint_for(&origin)).await;

        assert!(matches!(
            result,
            FetchResult::Failed(ref failure) if failure.kind() == ErrorKind::Shape
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_failure() {
        // Bind and drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = endpoint_for(&format!("http://{addr}"));
        let result = fetch(&reqwest::Client::new(), &endpoint).await;

        assert!(matches!(
            result,
            FetchResult::Failed(ref failure) if failure.kind() == ErrorKind::Transport
        ));
    }

    #[tokio::test]
    async fn test_fetcher_starts_pending_and_settles() {
        let origin = serve_once("200 OK", SAMPLE_BODY.to_string()).await;
        let fetcher = StatusFetcher::spawn(reqwest::Client::new(), endpoint_for(&origin));

        assert!(fetcher.result().is_pending());

        let settled = fetcher.settled().await;
        assert!(matches!(settled, FetchResult::Succeeded(_)));
        assert_eq!(fetcher.result(), settled);
    }

    #[tokio::test]
    async fn test_fetcher_shutdown_leaves_pending() {
        // Accept the connection but never answer
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _socket = listener.accept().await;
            std::future::pending::<()>().await;
        });

        let fetcher = StatusFetcher::spawn(
            reqwest::Client::new(),
            endpoint_for(&format!("http://{addr}")),
        );
        fetcher.shutdown();

        assert_eq!(fetcher.settled().await, FetchResult::Pending);
    }

    #[test]
    fn test_blank_failure_message_is_dropped() {
        let failure = FetchFailure::new(ErrorKind::Transport, Some("  ".to_string()));
        assert_eq!(failure.message(), None);
    }
}
