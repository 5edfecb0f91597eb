//! Failure capture
//!
//! Once the test runner tears a browser session down, the page state that
//! explains a failure is gone. Wrapping each test body here attaches a
//! screenshot to the failure before the error propagates.

use std::future::Future;
use std::path::Path;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::E2eResult;
use crate::session::Session;

/// Run a test body; on failure capture a screenshot, then return the
/// original error unchanged.
///
/// The capture is best-effort: a failing screenshot is logged and never
/// replaces the body's error. A successful body triggers no capture.
pub async fn run_captured<S, Fut>(session: &S, name: &str, body: Fut) -> E2eResult<()>
where
    S: Session + ?Sized,
    Fut: Future<Output = E2eResult<()>>,
{
    match body.await {
        Ok(()) => Ok(()),
        Err(err) => {
            capture_failure(session, name).await;
            Err(err)
        }
    }
}

async fn capture_failure<S: Session + ?Sized>(session: &S, name: &str) {
    match session.screenshot(&artifact_name(name)).await {
        Ok(path) => match fingerprint(&path) {
            Ok(digest) => warn!(
                "test {:?} failed, screenshot saved to {} (sha256 {})",
                name,
                path.display(),
                digest
            ),
            Err(_) => warn!(
                "test {:?} failed, screenshot saved to {}",
                name,
                path.display()
            ),
        },
        Err(capture_err) => warn!(
            "test {:?} failed and no screenshot could be captured: {}",
            name, capture_err
        ),
    }
}

/// Artifact names carry a timestamp so consecutive runs do not overwrite
/// each other's evidence.
fn artifact_name(test: &str) -> String {
    let slug: String = test
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    format!("failure-{}-{}", Utc::now().format("%Y%m%dT%H%M%S"), slug)
}

fn fingerprint(path: &Path) -> E2eResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
