//! Readiness probing for the externally managed application
//!
//! The harness does not own the server process; deployments bring it up
//! before the suite starts. Driving a browser at a target that is not
//! answering yet produces confusing driver errors, so the first thing the
//! suite does is wait for the URL to respond.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

pub struct ServerProbe {
    base_url: String,
    deadline: Duration,
}

impl ServerProbe {
    pub fn new(base_url: impl Into<String>, deadline: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            deadline,
        }
    }

    /// Poll the target URL until it answers.
    ///
    /// Unauthenticated visitors get redirected to the login page, so any
    /// success or redirect status counts as ready.
    pub async fn wait_until_ready(&self) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < self.deadline {
            attempts += 1;

            match client.get(&self.base_url).send().await {
                Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("readiness probe returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for {} to answer...", self.base_url);
                    }
                    // Connection refused is expected while the server is starting
                    if !e.is_connect() {
                        warn!("readiness probe error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerNotReady(attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_server_exhausts_the_probe() {
        // Bind then drop to get a port nobody is listening on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = ServerProbe::new(
            format!("http://127.0.0.1:{}", port),
            Duration::from_millis(250),
        );

        let err = probe.wait_until_ready().await.unwrap_err();
        assert!(matches!(err, E2eError::ServerNotReady(n) if n >= 1));
    }
}
