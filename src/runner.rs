//! Sequential test-case runner
//!
//! Deliberately not a test framework: a fixed list of named cases, run
//! strictly one after another against a fresh browser session each. The
//! browser is an exclusively-owned resource, so there is no parallelism
//! to manage.

use std::path::PathBuf;
use std::time::Instant;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::capture::run_captured;
use crate::driver::{DriverConfig, PlaywrightSession};
use crate::error::E2eResult;
use crate::settings::Settings;

pub type TestBody = for<'a> fn(&'a TestContext) -> BoxFuture<'a, E2eResult<()>>;

pub struct TestCase {
    pub name: &'static str,
    pub body: TestBody,
}

/// What a test body gets to work with: the target settings and a live
/// browser session already pointed at the application's index page.
pub struct TestContext {
    pub settings: Settings,
    pub session: PlaywrightSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

pub struct Runner {
    settings: Settings,
    driver_config: DriverConfig,
    output_dir: PathBuf,
}

impl Runner {
    pub fn new(settings: Settings, driver_config: DriverConfig, output_dir: PathBuf) -> Self {
        Self {
            settings,
            driver_config,
            output_dir,
        }
    }

    /// Run every case in order and report the suite outcome.
    pub async fn run(&self, cases: &[TestCase]) -> SuiteResult {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} test(s)...", cases.len());

        for case in cases {
            let result = self.run_case(case).await;

            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }

            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteResult {
            total: cases.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    async fn run_case(&self, case: &TestCase) -> TestResult {
        let start = Instant::now();
        debug!("Running test: {}", case.name);

        let outcome = self.drive_case(case).await;

        TestResult {
            name: case.name.to_string(),
            success: outcome.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    /// Each case gets its own browser: launch, land on the index page, run
    /// the body under failure capture, close.
    async fn drive_case(&self, case: &TestCase) -> E2eResult<()> {
        let session = PlaywrightSession::launch(self.driver_config.clone()).await?;
        let cx = TestContext {
            settings: self.settings.clone(),
            session,
        };

        cx.session.goto(&cx.settings.url).await?;

        let outcome = run_captured(&cx.session, case.name, (case.body)(&cx)).await;

        if let Err(close_err) = cx.session.close().await {
            warn!("could not close the browser session cleanly: {}", close_err);
        }

        outcome
    }

    /// Write test results to a JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
