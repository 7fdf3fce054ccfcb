//! Searchflow end-to-end harness
//!
//! Runs declarative browser flows against a search site. The harness
//! never drives the browser itself: each flow renders into a single
//! Playwright script (one browser session, page state persisting across
//! steps) which `node` executes, and navigation, element polling, and
//! wait semantics all stay with Playwright.
//!
//! - [`flow`] — YAML flow specifications ([`FlowSpec`], [`FlowStep`])
//! - [`playwright`] — script generation and execution via node
//! - [`target`] — live-site preflight and fixture-site lifecycle
//! - [`runner`] — orchestration, suite summary, JSON results file
//!
//! Flows either pin a live base URL or run hermetically against the
//! bundled `searchflow-fixture` site, which the runner spawns and
//! health-checks like any server under test.

pub mod error;
pub mod flow;
pub mod playwright;
pub mod runner;
pub mod target;

pub use error::{HarnessError, HarnessResult};
pub use flow::{FlowSpec, FlowStep};
pub use runner::FlowRunner;
