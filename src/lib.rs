//! Acceptance-test harness for the sport running tracker
//!
//! This crate drives a real browser against a running instance of the
//! application: it submits a GPX upload through the web UI, waits for the
//! asynchronous server-side processing to surface in the page, and checks
//! the derived values (distance, average speed, duration).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Acceptance Harness (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Runner                                                     │
//! │    ├── launches a PlaywrightSession per test case           │
//! │    ├── run_captured(name, body) -> screenshot on failure    │
//! │    └── writes test-results.json                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  poll_until(session, condition, policy, predicate)          │
//! │    └── sleep + page reload between failed evaluations       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PlaywrightSession                                          │
//! │    └── node subprocess, NDJSON commands over stdin/stdout   │
//! │          goto / click / fill / attach_file / reload /       │
//! │          text_exists / screenshot                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The application under test is externally managed; the harness only
//! probes it for readiness and talks to it through the browser.

pub mod capture;
pub mod driver;
pub mod error;
pub mod retry;
pub mod runner;
pub mod server;
pub mod session;
pub mod settings;

pub use capture::run_captured;
pub use error::{E2eError, E2eResult};
pub use retry::{poll_until, RetryPolicy};
pub use runner::{Runner, TestCase, TestContext};
pub use session::Session;
pub use settings::Settings;
