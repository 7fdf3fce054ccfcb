//! Playwright script generation and execution
//!
//! A whole flow renders into one Playwright script, so the browser session
//! and page state persist across steps: the fill in step three happens on
//! the page that step one opened. The script reports per-step outcomes as
//! prefixed JSON lines on stdout, which the driver parses back into
//! [`StepReport`]s. All actual browser driving (navigation, element
//! polling, wait semantics) stays with Playwright itself.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};
use crate::flow::{FlowSpec, FlowStep};

/// Prefix for per-step JSON report lines printed by the generated script
const STEP_MARKER: &str = "E2E-STEP ";

/// Prefix for the terminal JSON outcome line
const DONE_MARKER: &str = "E2E-DONE ";

/// Presence wait applied before single-read element assertions, mirroring
/// the automation framework's implicit element wait
const ELEMENT_READ_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, Default)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Per-step outcome parsed from a script report line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub label: String,
    pub ok: bool,
    pub duration_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Terminal outcome line printed by the script
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DoneReport {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Outcome of running a whole flow script
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub steps: Vec<StepReport>,
    pub failure_screenshot: Option<PathBuf>,
}

/// Configuration for the Playwright driver
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    /// Directory node resolves `require('playwright')` from
    pub playwright_root: PathBuf,

    /// Directory for screenshots and failure artifacts
    pub artifact_dir: PathBuf,

    /// Browser type
    pub browser: Browser,

    /// Run in headless mode
    pub headless: bool,

    /// Hard cap on a single flow's wall-clock time
    pub flow_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            playwright_root: PathBuf::from("."),
            artifact_dir: PathBuf::from("test-results/artifacts"),
            browser: Browser::Chromium,
            headless: true,
            flow_timeout: Duration::from_secs(120),
        }
    }
}

/// Renders flows into Playwright scripts and runs them via node
pub struct PlaywrightDriver {
    config: PlaywrightConfig,
}

impl PlaywrightDriver {
    pub fn new(mut config: PlaywrightConfig) -> HarnessResult<Self> {
        std::fs::create_dir_all(&config.artifact_dir)?;
        // Node runs with its own cwd, so artifact paths must be absolute.
        config.artifact_dir = config.artifact_dir.canonicalize()?;
        Ok(Self { config })
    }

    /// Check that node can load playwright and that the configured
    /// browser's executable is installed.
    pub async fn check_available(&self) -> HarnessResult<()> {
        let probe = format!(
            "require('fs').accessSync(require('playwright').{}.executablePath())",
            self.config.browser.as_str()
        );

        let status = Command::new("node")
            .args(["-e", &probe])
            .current_dir(&self.config.playwright_root)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => Err(HarnessError::PlaywrightNotFound),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(HarnessError::NodeNotFound),
            Err(e) => Err(HarnessError::Io(e)),
        }
    }

    /// Build the Playwright script for a whole flow
    pub fn build_script(&self, spec: &FlowSpec, base_url: &str) -> String {
        let labels = spec
            .steps
            .iter()
            .map(|s| js_str(&s.label()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut script = String::new();

        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const baseUrl = {base_url};
  const step = (index, label, ok, ms, error) => {{
    console.log({step_marker} + JSON.stringify({{ index, label, ok, duration_ms: ms, error: error || null }}));
  }};
  const labels = [{labels}];
  let current = -1;
  let t0 = Date.now();

  try {{
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = spec.viewport.width,
            height = spec.viewport.height,
            base_url = js_str(base_url),
            step_marker = js_str(STEP_MARKER),
            labels = labels,
        ));

        for (i, step) in spec.steps.iter().enumerate() {
            script.push_str(&format!("\n    // step {}: {}\n", i + 1, step.label()));
            script.push_str(&format!("    current = {}; t0 = Date.now();\n", i));
            script.push_str("    {\n");
            script.push_str(&self.step_to_js(step));
            script.push_str("    }\n");
            script.push_str(&format!(
                "    step({i}, labels[{i}], true, Date.now() - t0, null);\n"
            ));
        }

        script.push_str(&format!(
            r#"
    console.log({done_marker} + JSON.stringify({{ success: true, error: null }}));
  }} catch (error) {{
    const message = String((error && error.message) || error);
    if (current >= 0) {{
      step(current, labels[current], false, Date.now() - t0, message);
    }}
    console.log({done_marker} + JSON.stringify({{ success: false, error: message }}));
    try {{
      await page.screenshot({{ path: {failure_path}, fullPage: true }});
    }} catch (ignored) {{}}
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            done_marker = js_str(DONE_MARKER),
            failure_path = js_str(&self.failure_screenshot_path(&spec.name).to_string_lossy()),
        ));

        script
    }

    /// Convert a step to the JavaScript inside its block
    fn step_to_js(&self, step: &FlowStep) -> String {
        match step {
            FlowStep::Navigate { url, wait_for_selector } => {
                let goto = if url.starts_with("http://") || url.starts_with("https://") {
                    format!("      await page.goto({});\n", js_str(url))
                } else {
                    format!("      await page.goto(baseUrl + {});\n", js_str(url))
                };
                let wait = wait_for_selector
                    .as_ref()
                    .map(|s| format!("      await page.waitForSelector({});\n", js_str(s)))
                    .unwrap_or_default();
                format!("{}{}", goto, wait)
            }
            FlowStep::Click { selector, timeout_ms } => format!(
                "      await page.click({}, {{ timeout: {} }});\n",
                js_str(selector),
                timeout_ms.unwrap_or(5000)
            ),
            FlowStep::Fill { selector, value, clear_first } => {
                let mut js = String::new();
                if *clear_first {
                    js.push_str(&format!("      await page.fill({}, '');\n", js_str(selector)));
                }
                js.push_str(&format!(
                    "      await page.fill({}, {});\n",
                    js_str(selector),
                    js_str(value)
                ));
                js
            }
            FlowStep::Press { selector, key } => match selector {
                Some(sel) => format!(
                    "      await page.locator({}).press({});\n",
                    js_str(sel),
                    js_str(key)
                ),
                None => format!("      await page.keyboard.press({});\n", js_str(key)),
            },
            FlowStep::Wait { selector, timeout_ms, state } => format!(
                "      await page.waitForSelector({}, {{ state: {}, timeout: {} }});\n",
                js_str(selector),
                js_str(state.as_str()),
                timeout_ms
            ),
            FlowStep::Sleep { ms } => format!("      await page.waitForTimeout({});\n", ms),
            FlowStep::AssertTitle { equals } => {
                let expected = js_str(equals);
                format!(
                    r#"      const title = await page.title();
      if (title !== {expected}) {{
        throw new Error('title mismatch: expected ' + JSON.stringify({expected}) + ', got ' + JSON.stringify(title));
      }}
"#
                )
            }
            FlowStep::Assert { selector, visible, text, text_contains } => {
                let sel = js_str(selector);
                let mut js = String::new();

                if let Some(expected_visible) = visible {
                    if *expected_visible {
                        js.push_str(&format!(
                            r#"      if (!await page.isVisible({sel})) {{
        throw new Error('element not visible: ' + {sel});
      }}
"#
                        ));
                    } else {
                        js.push_str(&format!(
                            r#"      if (await page.isVisible({sel})) {{
        throw new Error('element unexpectedly visible: ' + {sel});
      }}
"#
                        ));
                    }
                }

                if text.is_some() || text_contains.is_some() {
                    js.push_str(&format!(
                        "      const el = await page.waitForSelector({}, {{ timeout: {} }});\n",
                        sel, ELEMENT_READ_TIMEOUT_MS
                    ));
                    js.push_str("      const text = ((await el.textContent()) || '').trim();\n");

                    if let Some(expected) = text {
                        let expected = js_str(expected);
                        js.push_str(&format!(
                            r#"      if (text !== {expected}) {{
        throw new Error('text mismatch for ' + {sel} + ': expected ' + JSON.stringify({expected}) + ', got ' + JSON.stringify(text));
      }}
"#
                        ));
                    }

                    if let Some(fragment) = text_contains {
                        let fragment = js_str(fragment);
                        js.push_str(&format!(
                            r#"      if (!text.includes({fragment})) {{
        throw new Error('text of ' + {sel} + ' does not contain ' + JSON.stringify({fragment}) + ': got ' + JSON.stringify(text));
      }}
"#
                        ));
                    }
                }

                js
            }
            FlowStep::Screenshot { name, selector, full_page } => {
                let path = js_str(
                    &self
                        .config
                        .artifact_dir
                        .join(format!("{}.png", name))
                        .to_string_lossy(),
                );
                match selector {
                    Some(sel) => format!(
                        "      await page.locator({}).screenshot({{ path: {} }});\n",
                        js_str(sel),
                        path
                    ),
                    None => format!(
                        "      await page.screenshot({{ path: {}, fullPage: {} }});\n",
                        path, full_page
                    ),
                }
            }
        }
    }

    /// Run a whole flow and parse the per-step reports
    pub async fn run_flow(&self, spec: &FlowSpec, base_url: &str) -> HarnessResult<ScriptOutcome> {
        let script = self.build_script(spec, base_url);

        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("flow.js");
        std::fs::write(&script_path, &script)?;

        debug!("Running flow script: {}", script_path.display());

        let mut cmd = Command::new("node");
        cmd.arg(&script_path)
            .current_dir(&self.config.playwright_root)
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.config.flow_timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(HarnessError::Timeout {
                    what: format!("flow '{}'", spec.name),
                    timeout_ms: self.config.flow_timeout.as_millis() as u64,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (steps, done) = parse_report_lines(&stdout)?;

        let done = match done {
            Some(done) => done,
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(HarnessError::Script(format!(
                    "script produced no outcome (exit: {})\nstdout: {}\nstderr: {}",
                    output.status, stdout, stderr
                )));
            }
        };

        debug!("Flow script finished: success={}", done.success);

        let failure_screenshot = if done.success {
            None
        } else {
            let path = self.failure_screenshot_path(&spec.name);
            path.exists().then_some(path)
        };

        Ok(ScriptOutcome {
            success: done.success,
            error: done.error,
            steps,
            failure_screenshot,
        })
    }

    fn failure_screenshot_path(&self, flow_name: &str) -> PathBuf {
        self.config.artifact_dir.join(format!("{}-failure.png", flow_name))
    }
}

/// Parse `E2E-STEP` / `E2E-DONE` report lines out of script stdout
fn parse_report_lines(stdout: &str) -> HarnessResult<(Vec<StepReport>, Option<DoneReport>)> {
    let mut steps = Vec::new();
    let mut done = None;

    for line in stdout.lines() {
        if let Some(json) = line.strip_prefix(STEP_MARKER) {
            steps.push(serde_json::from_str::<StepReport>(json)?);
        } else if let Some(json) = line.strip_prefix(DONE_MARKER) {
            done = Some(serde_json::from_str::<DoneReport>(json)?);
        }
    }

    Ok((steps, done))
}

/// Quote a string as a single-quoted JavaScript literal
fn js_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
