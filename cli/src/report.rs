//! Runner report rendering.

use std::fmt::Write;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ScenarioOutcome {
    pub(crate) name: String,
    pub(crate) passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) detail: Option<String>,
}

impl ScenarioOutcome {
    pub(crate) fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: None,
        }
    }

    pub(crate) fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: Some(detail.into()),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct Report {
    passed: usize,
    failed: usize,
    scenarios: Vec<ScenarioOutcome>,
}

impl Report {
    pub(crate) fn push(&mut self, outcome: ScenarioOutcome) {
        if outcome.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.scenarios.push(outcome);
    }

    #[must_use]
    pub(crate) fn is_success(&self) -> bool {
        self.failed == 0
    }

    #[must_use]
    pub(crate) fn render_text(&self) -> String {
        let mut out = String::new();
        for outcome in &self.scenarios {
            match (&outcome.detail, outcome.passed) {
                (_, true) => {
                    let _ = writeln!(out, "PASS {}", outcome.name);
                }
                (Some(detail), false) => {
                    let _ = writeln!(out, "FAIL {}: {detail}", outcome.name);
                }
                (None, false) => {
                    let _ = writeln!(out, "FAIL {}", outcome.name);
                }
            }
        }
        let _ = write!(out, "{} passed, {} failed", self.passed, self.failed);
        out
    }

    pub(crate) fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
