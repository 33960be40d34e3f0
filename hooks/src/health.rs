//! Engine health probing over loopback HTTP

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, redirect};
use tracing::debug;

/// Default timeout for a single probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Decides whether an engine is serving on a port
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// True only if the engine answered its health check in time
    async fn is_alive(&self, port: u16) -> bool;
}

/// Probes `GET http://127.0.0.1:<port>/health`
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    http: Option<Client>,
    timeout: Duration,
}

impl Default for HttpHealthProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl HttpHealthProbe {
    pub fn new(timeout: Duration) -> Self {
        // Loopback only: never route through an environment proxy.
        // A redirect is not a 200 from the engine, so never follow one.
        let http = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .redirect(redirect::Policy::none())
            .build();
        if let Err(e) = &http {
            debug!(error = %e, "HttpHealthProbe::new: failed to build client");
        }
        Self {
            http: http.ok(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(port: u16) -> String {
        format!("http://127.0.0.1:{}/health", port)
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn is_alive(&self, port: u16) -> bool {
        let Some(http) = &self.http else {
            return false;
        };

        // Dropping the request future on timeout closes its connection
        let result = tokio::time::timeout(self.timeout, http.get(Self::url(port)).send()).await;
        let alive = match result {
            Ok(Ok(response)) => response.status() == StatusCode::OK,
            Ok(Err(e)) => {
                debug!(port, error = %e, "HttpHealthProbe::is_alive: request failed");
                false
            }
            Err(_) => {
                debug!(port, timeout_ms = self.timeout.as_millis() as u64, "HttpHealthProbe::is_alive: timed out");
                false
            }
        };
        debug!(port, alive, "HttpHealthProbe::is_alive: probed");
        alive
    }
}
