//! The shipped flow specs parse and render to the expected browser calls.

use std::path::{Path, PathBuf};

use searchflow_e2e::flow::{FlowSpec, FlowStep, WaitState};
use searchflow_e2e::playwright::{PlaywrightConfig, PlaywrightDriver};

fn specs_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("specs")
}

fn load(name: &str) -> FlowSpec {
    FlowSpec::from_file(&specs_dir().join(name)).unwrap()
}

#[test]
fn all_shipped_specs_load() {
    let specs = FlowSpec::load_all(&specs_dir()).unwrap();
    let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["fixture-search", "google-search"]);
}

#[test]
fn google_search_carries_the_scenario_literals() {
    let spec = load("google-search.yaml");

    assert!(spec.has_tag("live"));
    assert_eq!(spec.base_url.as_deref(), Some("https://google.com"));
    assert_eq!(spec.steps.len(), 6);

    match &spec.steps[1] {
        FlowStep::AssertTitle { equals } => assert_eq!(equals, "Google"),
        other => panic!("expected assert_title, got {:?}", other),
    }

    match &spec.steps[2] {
        FlowStep::Fill { selector, value, .. } => {
            assert_eq!(selector, r#"input[aria-label="Search"]"#);
            assert_eq!(value, "https://github.com/taktakpeops");
        }
        other => panic!("expected fill, got {:?}", other),
    }

    match &spec.steps[3] {
        FlowStep::Press { selector, key } => {
            assert_eq!(selector.as_deref(), Some(r#"input[aria-label="Search"]"#));
            assert_eq!(key, "Enter");
        }
        other => panic!("expected press, got {:?}", other),
    }

    match &spec.steps[4] {
        FlowStep::Wait { selector, timeout_ms, state } => {
            assert_eq!(selector, "#extabar");
            assert_eq!(*timeout_ms, 5000);
            assert!(matches!(state, WaitState::Visible));
        }
        other => panic!("expected wait, got {:?}", other),
    }

    match &spec.steps[5] {
        FlowStep::Assert { selector, text, .. } => {
            assert_eq!(selector, r#"//h3[text()="taktakpeops · GitHub"]"#);
            assert_eq!(text.as_deref(), Some("taktakpeops · GitHub"));
        }
        other => panic!("expected assert, got {:?}", other),
    }
}

#[test]
fn fixture_search_mirrors_the_live_flow_shape() {
    let live = load("google-search.yaml");
    let hermetic = load("fixture-search.yaml");

    assert!(hermetic.has_tag("hermetic"));
    // Hermetic flows inherit the spawned fixture's address.
    assert!(hermetic.base_url.is_none());

    let actions: Vec<String> = hermetic.steps.iter().map(|s| s.label()).collect();
    // Same shape, same selectors; only the title literal differs.
    assert_eq!(hermetic.steps.len(), live.steps.len());
    assert_eq!(actions[4], "wait:#extabar");
    assert_eq!(actions[5], r#"assert://h3[text()="taktakpeops · GitHub"]"#);

    match &hermetic.steps[1] {
        FlowStep::AssertTitle { equals } => assert_eq!(equals, "Searchflow Fixture"),
        other => panic!("expected assert_title, got {:?}", other),
    }
}

#[test]
fn google_search_renders_the_expected_playwright_calls() {
    let dir = tempfile::tempdir().unwrap();
    let driver = PlaywrightDriver::new(PlaywrightConfig {
        artifact_dir: dir.path().join("artifacts"),
        ..Default::default()
    })
    .unwrap();

    let spec = load("google-search.yaml");
    let script = driver.build_script(&spec, spec.base_url.as_deref().unwrap());

    assert!(script.contains("const baseUrl = 'https://google.com';"));
    assert!(script.contains("await page.goto(baseUrl + '/');"));
    assert!(script.contains("if (title !== 'Google')"));
    assert!(script.contains(
        r#"await page.fill('input[aria-label="Search"]', 'https://github.com/taktakpeops');"#
    ));
    assert!(script.contains(r#"await page.locator('input[aria-label="Search"]').press('Enter');"#));
    assert!(script
        .contains("await page.waitForSelector('#extabar', { state: 'visible', timeout: 5000 });"));
    assert!(script.contains("if (text !== 'taktakpeops · GitHub')"));
}
