//! Browser capability seam consumed by the harness core
//!
//! The retry and failure-capture mechanisms only ever need three things
//! from a browser session; everything else (navigation, form filling) is
//! an inherent API of the concrete driver. Keeping the seam this narrow
//! lets the core be exercised against recording doubles.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{E2eError, E2eResult};

#[async_trait]
pub trait Session: Send + Sync {
    /// Force a full reload of the current page.
    async fn reload(&self) -> E2eResult<()>;

    /// Capture the current visual state under the given artifact name and
    /// return the path it was written to.
    async fn screenshot(&self, name: &str) -> E2eResult<PathBuf>;

    /// Whether the given text is currently present anywhere on the page.
    async fn text_exists(&self, needle: &str) -> E2eResult<bool>;

    /// Whether the given text is currently absent from the page.
    async fn text_absent(&self, needle: &str) -> E2eResult<bool> {
        Ok(!self.text_exists(needle).await?)
    }
}

/// Assert that the given text is visible on the page right now.
pub async fn assert_text_exists<S: Session + ?Sized>(session: &S, needle: &str) -> E2eResult<()> {
    if session.text_exists(needle).await? {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(format!(
            "expected text {:?} on the page",
            needle
        )))
    }
}

/// Assert that the given text is not visible on the page right now.
pub async fn assert_text_absent<S: Session + ?Sized>(session: &S, needle: &str) -> E2eResult<()> {
    if session.text_absent(needle).await? {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(format!(
            "expected text {:?} to be gone from the page",
            needle
        )))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    /// Session double that counts calls and writes fake screenshots into a
    /// temp directory.
    pub(crate) struct RecordingSession {
        pub reloads: AtomicU32,
        pub screenshots: AtomicU32,
        fail_screenshots: bool,
        dir: TempDir,
    }

    impl RecordingSession {
        pub fn new() -> Self {
            Self {
                reloads: AtomicU32::new(0),
                screenshots: AtomicU32::new(0),
                fail_screenshots: false,
                dir: TempDir::new().expect("temp dir"),
            }
        }

        pub fn with_failing_screenshots() -> Self {
            Self {
                fail_screenshots: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl Session for RecordingSession {
        async fn reload(&self) -> E2eResult<()> {
            self.reloads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn screenshot(&self, name: &str) -> E2eResult<PathBuf> {
            self.screenshots.fetch_add(1, Ordering::SeqCst);
            if self.fail_screenshots {
                return Err(E2eError::Driver("screenshot refused".to_string()));
            }

            let path = self.dir.path().join(format!("{}.png", name));
            std::fs::write(&path, b"not really a png")?;
            Ok(path)
        }

        async fn text_exists(&self, _needle: &str) -> E2eResult<bool> {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSession;
    use super::*;

    struct FixedTexts(&'static [&'static str]);

    #[async_trait]
    impl Session for FixedTexts {
        async fn reload(&self) -> E2eResult<()> {
            Ok(())
        }

        async fn screenshot(&self, _name: &str) -> E2eResult<PathBuf> {
            Ok(PathBuf::new())
        }

        async fn text_exists(&self, needle: &str) -> E2eResult<bool> {
            Ok(self.0.iter().any(|text| *text == needle))
        }
    }

    #[tokio::test]
    async fn test_assert_text_exists() {
        let session = FixedTexts(&["4.18km", "10.03km/h"]);

        assert!(assert_text_exists(&session, "4.18km").await.is_ok());

        let err = assert_text_exists(&session, "9.99km").await.unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed(_)));
        assert!(err.to_string().contains("9.99km"));
    }

    #[tokio::test]
    async fn test_assert_text_absent() {
        let session = FixedTexts(&["2021/01/31 22:01"]);

        assert!(assert_text_absent(&session, "2021/02/01 08:00").await.is_ok());
        assert!(assert_text_absent(&session, "2021/01/31 22:01").await.is_err());
    }

    #[tokio::test]
    async fn test_recording_session_counts_calls() {
        let session = RecordingSession::new();

        session.reload().await.unwrap();
        session.reload().await.unwrap();
        let path = session.screenshot("probe").await.unwrap();

        assert_eq!(session.reloads.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(
            session.screenshots.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
        assert!(path.ends_with("probe.png"));
    }
}
