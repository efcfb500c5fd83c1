use crate::app::error::Error;
use crate::engine::{Event, EventBus, ExecutionResult, FailureKind, SkipReason};
use serde_derive::Serialize;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
    /// Skipped because a fixture failed.
    Broken,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SpecRecord {
    name: String,
    full_name: String,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<usize>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    number: usize,
    kind: &'static str,
    source: String,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    passed: usize,
    failed: usize,
    skipped: usize,
    duration_ms: u128,
    focused: bool,
    specs: Vec<SpecRecord>,
    failures: Vec<FailureRecord>,
}

/// Collects terminal spec events into a JSON report.
#[derive(Debug, Clone)]
pub struct JsonReporter {
    specs: Arc<Mutex<Vec<SpecRecord>>>,
}

impl JsonReporter {
    pub fn attach(events: &EventBus) -> Self {
        let specs = Arc::new(Mutex::new(Vec::new()));
        let sink = specs.clone();
        events.subscribe_all(move |event| {
            let (spec, status, failure) = match event {
                Event::SpecPass(spec) => (spec, Status::Passed, None),
                Event::SpecFail(spec, failure) => (spec, Status::Failed, Some(failure.number)),
                Event::SpecSkip(spec, SkipReason::Fixture(failure)) => {
                    (spec, Status::Broken, Some(failure.number))
                }
                Event::SpecSkip(spec, _) => (spec, Status::Skipped, None),
                _ => return,
            };
            lock!(sink).push(SpecRecord {
                name: spec.name().to_owned(),
                full_name: spec.full_title(),
                status,
                failure,
            });
        });
        Self { specs }
    }

    pub fn report(&self, result: &ExecutionResult) -> Report {
        Report {
            passed: result.passed,
            failed: result.failed,
            skipped: result.skipped,
            duration_ms: result.time.as_millis(),
            focused: result.focused,
            specs: lock!(self.specs).clone(),
            failures: result
                .failures
                .iter()
                .map(|failure| FailureRecord {
                    number: failure.number,
                    kind: match failure.kind {
                        FailureKind::Timeout => "timeout",
                        FailureKind::Thrown => "thrown",
                        FailureKind::Late => "late",
                    },
                    source: failure.source.title(),
                    message: failure.error.to_string(),
                })
                .collect(),
        }
    }

    pub fn save_into_file(&self, path: &Path, result: &ExecutionResult) -> Result<(), Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        serde_json::to_writer_pretty(File::create(path)?, &self.report(result))?;
        Ok(())
    }
}
