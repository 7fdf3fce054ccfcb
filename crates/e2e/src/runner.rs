//! Flow runner that orchestrates targets, Playwright, and reporting

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{HarnessError, HarnessResult};
use crate::flow::FlowSpec;
use crate::playwright::{PlaywrightConfig, PlaywrightDriver, StepReport};
use crate::target::{check_reachable, FixtureConfig, FixtureHandle};

/// Result of running a single flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowReport {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepReport>,
    pub error: Option<String>,
    pub failure_screenshot: Option<String>,
}

/// Result of running a whole suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub results: Vec<FlowReport>,
}

impl SuiteReport {
    /// Fold per-flow reports into a suite summary
    pub fn from_results(started_at: DateTime<Utc>, duration_ms: u64, results: Vec<FlowReport>) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            started_at,
            duration_ms,
            results,
        }
    }
}

/// Main flow runner
pub struct FlowRunner {
    fixture_config: FixtureConfig,
    playwright_config: PlaywrightConfig,

    /// Running fixture handle, spawned lazily for the first hermetic flow
    fixture: Option<FixtureHandle>,

    specs_dir: PathBuf,
    output_dir: PathBuf,
}

impl FlowRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            fixture_config: config.fixture,
            playwright_config: config.playwright,
            fixture: None,
            specs_dir: config.specs_dir,
            output_dir: config.output_dir,
        }
    }

    /// Run all flows in the specs directory
    pub async fn run_all(&mut self) -> HarnessResult<SuiteReport> {
        let specs = FlowSpec::load_all(&self.specs_dir)?;
        self.run_flows(&specs).await
    }

    /// Run flows carrying a tag
    pub async fn run_tagged(&mut self, tag: &str) -> HarnessResult<SuiteReport> {
        let specs = FlowSpec::load_all(&self.specs_dir)?;
        let filtered: Vec<FlowSpec> = specs.into_iter().filter(|s| s.has_tag(tag)).collect();
        self.run_flows(&filtered).await
    }

    /// Run a specific flow by name
    pub async fn run_flow_named(&mut self, name: &str) -> HarnessResult<FlowReport> {
        let specs = FlowSpec::load_all(&self.specs_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| HarnessError::FlowNotFound(name.to_string()))?;

        self.run_flow(&spec).await
    }

    /// Run a list of flows and summarize
    pub async fn run_flows(&mut self, specs: &[FlowSpec]) -> HarnessResult<SuiteReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::new();

        info!("Running {} flow(s)...", specs.len());

        for spec in specs {
            match self.run_flow(spec).await {
                Ok(report) => {
                    if report.success {
                        info!("✓ {} ({} ms)", report.name, report.duration_ms);
                    } else {
                        error!(
                            "✗ {} - {}",
                            report.name,
                            report.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                    results.push(report);
                }
                Err(e) => {
                    error!("✗ {} - {}", spec.name, e);
                    results.push(FlowReport {
                        name: spec.name.clone(),
                        success: false,
                        started_at: Utc::now(),
                        duration_ms: 0,
                        steps: vec![],
                        error: Some(e.to_string()),
                        failure_screenshot: None,
                    });
                }
            }
        }

        let suite =
            SuiteReport::from_results(started_at, start.elapsed().as_millis() as u64, results);

        info!("");
        info!(
            "Flow results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );

        Ok(suite)
    }

    /// Run a single flow in one browser session, stopping at the first
    /// failing step
    pub async fn run_flow(&mut self, spec: &FlowSpec) -> HarnessResult<FlowReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        debug!("Running flow: {}", spec.name);

        let base_url = self.resolve_base_url(spec).await?;

        let driver = PlaywrightDriver::new(self.playwright_config.clone())?;
        let outcome = driver.run_flow(spec, &base_url).await?;

        Ok(FlowReport {
            name: spec.name.clone(),
            success: outcome.success,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            steps: outcome.steps,
            error: outcome.error,
            failure_screenshot: outcome
                .failure_screenshot
                .map(|p| p.to_string_lossy().to_string()),
        })
    }

    /// Pinned base URL for live flows, spawned fixture for hermetic ones
    async fn resolve_base_url(&mut self, spec: &FlowSpec) -> HarnessResult<String> {
        if let Some(url) = &spec.base_url {
            check_reachable(url).await?;
            return Ok(url.clone());
        }

        if self.fixture.is_none() {
            let handle = FixtureHandle::spawn(self.fixture_config.clone()).await?;
            self.fixture = Some(handle);
        }

        // Just inserted above if absent
        Ok(self
            .fixture
            .as_ref()
            .map(|f| f.base_url().to_string())
            .unwrap_or_default())
    }

    /// Stop the fixture site if one was spawned
    pub fn stop_fixture(&mut self) -> HarnessResult<()> {
        if let Some(mut fixture) = self.fixture.take() {
            fixture.stop()?;
        }
        Ok(())
    }

    /// Write suite results to a JSON file under the output directory
    pub fn write_results(&self, suite: &SuiteReport) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("flow-results.json");
        let json = serde_json::to_string_pretty(suite)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Drop for FlowRunner {
    fn drop(&mut self) {
        let _ = self.stop_fixture();
    }
}

/// Configuration for the flow runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub fixture: FixtureConfig,
    pub playwright: PlaywrightConfig,
    pub specs_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fixture: FixtureConfig::default(),
            playwright: PlaywrightConfig::default(),
            specs_dir: PathBuf::from("crates/e2e/specs"),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, success: bool) -> FlowReport {
        FlowReport {
            name: name.to_string(),
            success,
            started_at: Utc::now(),
            duration_ms: 10,
            steps: vec![],
            error: (!success).then(|| "step failed".to_string()),
            failure_screenshot: None,
        }
    }

    #[test]
    fn test_suite_summary_counts() {
        let suite = SuiteReport::from_results(
            Utc::now(),
            30,
            vec![report("a", true), report("b", false), report("c", true)],
        );

        assert_eq!(suite.total, 3);
        assert_eq!(suite.passed, 2);
        assert_eq!(suite.failed, 1);
    }

    #[test]
    fn test_write_results_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FlowRunner::new(RunnerConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        });

        let suite = SuiteReport::from_results(Utc::now(), 5, vec![report("only", true)]);
        let path = runner.write_results(&suite).unwrap();
        assert_eq!(path, dir.path().join("flow-results.json"));

        let parsed: SuiteReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.total, 1);
        assert_eq!(parsed.results[0].name, "only");
    }

    #[tokio::test]
    async fn test_unknown_flow_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.yaml"),
            "name: a\nsteps:\n  - action: sleep\n    ms: 1\n",
        )
        .unwrap();

        let mut runner = FlowRunner::new(RunnerConfig {
            specs_dir: dir.path().to_path_buf(),
            ..Default::default()
        });

        match runner.run_flow_named("nope").await {
            Err(HarnessError::FlowNotFound(name)) => assert_eq!(name, "nope"),
            other => panic!("expected FlowNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_runner_config_default() {
        let config = RunnerConfig::default();
        assert_eq!(config.specs_dir, PathBuf::from("crates/e2e/specs"));
        assert_eq!(config.output_dir, PathBuf::from("test-results"));
    }
}
