//! Declarative YAML flow specifications

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{HarnessError, HarnessResult};

/// A complete flow specification parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSpec {
    /// Unique name for this flow
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for selecting flows (`live`, `hermetic`, ...)
    #[serde(default)]
    pub tags: Vec<String>,

    /// Base URL this flow is pinned to. Hermetic flows leave it unset and
    /// inherit the spawned fixture's address.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Viewport size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Steps to execute in order
    pub steps: Vec<FlowStep>,
}

fn default_viewport() -> Viewport {
    Viewport { width: 1280, height: 720 }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A single step in a flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FlowStep {
    /// Navigate to a URL (relative to the flow's base, or absolute)
    Navigate {
        url: String,
        #[serde(default)]
        wait_for_selector: Option<String>,
    },

    /// Click an element
    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Fill an input field
    Fill {
        selector: String,
        value: String,
        #[serde(default)]
        clear_first: bool,
    },

    /// Press a key, optionally scoped to an element
    Press {
        #[serde(default)]
        selector: Option<String>,
        key: String,
    },

    /// Wait for an element to reach a display state
    Wait {
        selector: String,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
        #[serde(default)]
        state: WaitState,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep {
        ms: u64,
    },

    /// Assert the page title equals a literal, read once
    AssertTitle {
        equals: String,
    },

    /// Assert something about an element
    Assert {
        selector: String,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_contains: Option<String>,
    },

    /// Take a screenshot into the artifacts directory
    Screenshot {
        name: String,
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        full_page: bool,
    },
}

fn default_wait_timeout() -> u64 {
    5000 // 5 seconds default
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    /// The Playwright `waitForSelector` state string
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

impl FlowStep {
    /// Short label for logs and step reports
    pub fn label(&self) -> String {
        match self {
            FlowStep::Navigate { url, .. } => format!("navigate:{}", url),
            FlowStep::Click { selector, .. } => format!("click:{}", selector),
            FlowStep::Fill { selector, .. } => format!("fill:{}", selector),
            FlowStep::Press { key, .. } => format!("press:{}", key),
            FlowStep::Wait { selector, .. } => format!("wait:{}", selector),
            FlowStep::Sleep { ms } => format!("sleep:{}ms", ms),
            FlowStep::AssertTitle { equals } => format!("assert_title:{}", equals),
            FlowStep::Assert { selector, .. } => format!("assert:{}", selector),
            FlowStep::Screenshot { name, .. } => format!("screenshot:{}", name),
        }
    }
}

impl FlowSpec {
    /// Parse a flow spec from a YAML string
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Reject specs that would execute as silent no-ops
    fn validate(&self) -> HarnessResult<()> {
        for step in &self.steps {
            if let FlowStep::Assert { selector, visible, text, text_contains } = step {
                if visible.is_none() && text.is_none() && text_contains.is_none() {
                    return Err(HarnessError::SpecParse(format!(
                        "assert step for '{}' in flow '{}' has no predicate \
                         (one of visible, text, text_contains is required)",
                        selector, self.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse a flow spec from a YAML file
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all flow specs from a directory, in file-name order
    pub fn load_all(dir: &Path) -> HarnessResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(HarnessError::SpecParse(format!(
                "spec directory not found: {}",
                dir.display()
            )));
        }

        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path()).map_err(|e| {
                HarnessError::SpecParse(format!("{}: {}", entry.path().display(), e))
            })?;
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Whether this flow carries the given tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
