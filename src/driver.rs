//! Playwright browser automation
//!
//! The browser is driven by a long-lived `node` subprocess running a
//! generated Playwright script. Commands go in as one JSON object per
//! line on stdin; every command is answered with one JSON object on
//! stdout. The page lives as long as the subprocess, which is what lets
//! [`reload`](crate::session::Session::reload) act on accumulated state
//! (login session, submitted forms) instead of a fresh context.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::session::Session;

#[derive(Debug, Clone, Copy, Default)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Configuration for a driver session
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub screenshot_dir: PathBuf,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,
    pub startup_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            startup_timeout: Duration::from_secs(30),
        }
    }
}

/// One command sent to the driver subprocess
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Command {
    Goto { url: String },
    Reload,
    Click { text: String },
    ClickWithin { text: String, anchor: String },
    Fill { label: String, value: String },
    AttachFile { label: String, path: String },
    TextExists { text: String },
    Screenshot { path: String },
    Close,
}

/// The driver's answer to a single command
#[derive(Debug, Deserialize)]
struct Response {
    ok: bool,
    #[serde(default)]
    found: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

struct DriverIo {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

/// A live browser session backed by a Playwright driver subprocess
pub struct PlaywrightSession {
    io: Mutex<DriverIo>,
    child_id: Option<u32>,
    closed: AtomicBool,
    screenshot_dir: PathBuf,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightSession {
    /// Spawn the driver subprocess and wait for its ready acknowledgement.
    pub async fn launch(config: DriverConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        std::fs::create_dir_all(&config.screenshot_dir)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, build_driver_script(&config))?;

        debug!("Starting Playwright driver: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            // The script lives in a temp dir; point module resolution back
            // at the project's node_modules.
            .env("NODE_PATH", std::env::current_dir()?.join("node_modules"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Driver(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("driver: {}", line);
                }
            });
        }

        let child_id = child.id();
        let mut lines = BufReader::new(stdout).lines();

        let ready = tokio::time::timeout(config.startup_timeout, lines.next_line())
            .await
            .map_err(|_| {
                E2eError::Driver(format!(
                    "driver not ready within {:?}",
                    config.startup_timeout
                ))
            })??
            .ok_or_else(|| E2eError::Driver("driver exited during startup".to_string()))?;

        let ack: Response = serde_json::from_str(&ready)?;
        if !ack.ok {
            return Err(E2eError::Driver(
                ack.error
                    .unwrap_or_else(|| "driver failed to start".to_string()),
            ));
        }

        info!("Playwright driver ready ({})", config.browser.as_str());

        Ok(Self {
            io: Mutex::new(DriverIo {
                child,
                stdin,
                lines,
            }),
            child_id,
            closed: AtomicBool::new(false),
            screenshot_dir: config.screenshot_dir,
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn send(&self, cmd: &Command) -> E2eResult<Response> {
        let mut io = self.io.lock().await;

        let mut line = serde_json::to_string(cmd)?;
        line.push('\n');
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        let reply = io
            .lines
            .next_line()
            .await?
            .ok_or_else(|| E2eError::Driver("driver closed its output stream".to_string()))?;

        let response: Response = serde_json::from_str(&reply)?;
        if response.ok {
            Ok(response)
        } else {
            Err(E2eError::Driver(response.error.unwrap_or_else(|| {
                "driver reported an unspecified failure".to_string()
            })))
        }
    }

    /// Navigate to an absolute URL.
    pub async fn goto(&self, url: &str) -> E2eResult<()> {
        self.send(&Command::Goto {
            url: url.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Click the first element showing the given text.
    pub async fn click(&self, text: &str) -> E2eResult<()> {
        self.send(&Command::Click {
            text: text.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Click the element showing `text` inside the row/list item that also
    /// shows `anchor`. Used to pick one entry out of a listing, e.g. the
    /// Delete link of a specific running session.
    pub async fn click_within(&self, text: &str, anchor: &str) -> E2eResult<()> {
        self.send(&Command::ClickWithin {
            text: text.to_string(),
            anchor: anchor.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Fill the form field with the given label. Works for text inputs and
    /// `datetime-local` fields alike.
    pub async fn fill(&self, label: &str, value: &str) -> E2eResult<()> {
        self.send(&Command::Fill {
            label: label.to_string(),
            value: value.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Attach a local file to the upload field with the given label.
    pub async fn attach_file(&self, label: &str, path: &str) -> E2eResult<()> {
        self.send(&Command::AttachFile {
            label: label.to_string(),
            path: path.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Close the browser and wait for the subprocess to exit.
    pub async fn close(&self) -> E2eResult<()> {
        self.closed.store(true, Ordering::SeqCst);

        let mut io = self.io.lock().await;

        let mut line = serde_json::to_string(&Command::Close)?;
        line.push('\n');
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;
        let _ = io.lines.next_line().await;

        match tokio::time::timeout(Duration::from_secs(5), io.child.wait()).await {
            Ok(status) => {
                status?;
            }
            Err(_) => {
                warn!("driver did not exit after close, killing it");
                io.child.start_kill()?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Session for PlaywrightSession {
    async fn reload(&self) -> E2eResult<()> {
        self.send(&Command::Reload).await?;
        Ok(())
    }

    async fn screenshot(&self, name: &str) -> E2eResult<PathBuf> {
        let path = self.screenshot_dir.join(format!("{}.png", name));
        self.send(&Command::Screenshot {
            path: path.to_string_lossy().into_owned(),
        })
        .await?;
        Ok(path)
    }

    async fn text_exists(&self, needle: &str) -> E2eResult<bool> {
        let response = self
            .send(&Command::TextExists {
                text: needle.to_string(),
            })
            .await?;
        Ok(response.found.unwrap_or(false))
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        // close() was never awaited; signal the subprocess directly and
        // let kill_on_drop reap whatever survives.
        #[cfg(unix)]
        if let Some(pid) = self.child_id {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }
    }
}

/// Build the Playwright driver script for a session
fn build_driver_script(config: &DriverConfig) -> String {
    format!(
        r#"
const readline = require('readline');
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{
    headless: {headless},
    args: ['--no-sandbox', '--disable-setuid-sandbox']
  }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const reply = (payload) => process.stdout.write(JSON.stringify(payload) + '\n');

  reply({{ ok: true }});

  const rl = readline.createInterface({{ input: process.stdin }});
  for await (const line of rl) {{
    let cmd;
    try {{
      cmd = JSON.parse(line);
    }} catch (error) {{
      reply({{ ok: false, error: 'unparsable command: ' + error.message }});
      continue;
    }}

    try {{
      switch (cmd.action) {{
        case 'goto':
          await page.goto(cmd.url, {{ waitUntil: 'load' }});
          reply({{ ok: true }});
          break;
        case 'reload':
          await page.reload({{ waitUntil: 'load' }});
          reply({{ ok: true }});
          break;
        case 'click':
          await page.getByText(cmd.text, {{ exact: false }}).first().click();
          reply({{ ok: true }});
          break;
        case 'click_within': {{
          const scope = page.locator('tr, li, article', {{ hasText: cmd.anchor }}).first();
          await scope.getByText(cmd.text, {{ exact: false }}).first().click();
          reply({{ ok: true }});
          break;
        }}
        case 'fill':
          await page.getByLabel(cmd.label).fill(cmd.value);
          reply({{ ok: true }});
          break;
        case 'attach_file':
          await page.getByLabel(cmd.label).setInputFiles(cmd.path);
          reply({{ ok: true }});
          break;
        case 'text_exists':
          reply({{ ok: true, found: await page.getByText(cmd.text, {{ exact: false }}).count() > 0 }});
          break;
        case 'screenshot':
          await page.screenshot({{ path: cmd.path, fullPage: true }});
          reply({{ ok: true }});
          break;
        case 'close':
          await browser.close();
          reply({{ ok: true }});
          process.exit(0);
          break;
        default:
          reply({{ ok: false, error: 'unknown action: ' + cmd.action }});
      }}
    }} catch (error) {{
      reply({{ ok: false, error: error.message }});
    }}
  }}
}})();
"#,
        browser = config.browser.as_str(),
        headless = config.headless,
        width = config.viewport_width,
        height = config.viewport_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let cmd = Command::Goto {
            url: "http://127.0.0.1:8080".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&cmd).unwrap(),
            r#"{"action":"goto","url":"http://127.0.0.1:8080"}"#
        );

        let cmd = Command::TextExists {
            text: "2021/01/31 22:01".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&cmd).unwrap(),
            r#"{"action":"text_exists","text":"2021/01/31 22:01"}"#
        );

        let cmd = Command::ClickWithin {
            text: "Delete".to_string(),
            anchor: "2021/01/31 22:01".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&cmd).unwrap(),
            r#"{"action":"click_within","text":"Delete","anchor":"2021/01/31 22:01"}"#
        );

        assert_eq!(
            serde_json::to_string(&Command::Reload).unwrap(),
            r#"{"action":"reload"}"#
        );
    }

    #[test]
    fn test_response_wire_format() {
        let response: Response = serde_json::from_str(r#"{"ok":true,"found":false}"#).unwrap();
        assert!(response.ok);
        assert_eq!(response.found, Some(false));
        assert!(response.error.is_none());

        let response: Response =
            serde_json::from_str(r#"{"ok":false,"error":"no such element"}"#).unwrap();
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some("no such element"));
    }

    #[test]
    fn test_driver_script_reflects_config() {
        let script = build_driver_script(&DriverConfig {
            browser: Browser::Firefox,
            headless: false,
            viewport_width: 1920,
            viewport_height: 1080,
            ..Default::default()
        });

        assert!(script.contains("firefox.launch"));
        assert!(script.contains("headless: false"));
        assert!(script.contains("width: 1920, height: 1080"));
        assert!(script.contains("'--no-sandbox'"));
    }

    #[test]
    fn test_browser_names() {
        assert_eq!(Browser::Chromium.as_str(), "chromium");
        assert_eq!(Browser::Firefox.as_str(), "firefox");
        assert_eq!(Browser::Webkit.as_str(), "webkit");
    }
}
