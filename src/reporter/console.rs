use crate::engine::{Event, EventBus, ExecutionResult, SkipReason};

/// Logs run progress through the `log` facade.
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn attach(events: &EventBus) {
        events.subscribe_all(|event| match event {
            Event::SuiteStart(suite) if !suite.is_root() => info!("Suite '{}'", suite.full_title()),
            Event::SpecPass(spec) => info!("[pass] {}", spec.full_title()),
            Event::SpecFail(spec, failure) => {
                error!("[fail] {} (#{}: {})", spec.full_title(), failure.number, failure.error)
            }
            Event::SpecSkip(spec, SkipReason::Fixture(failure)) => warn!(
                "[skip] {} (fixture failure #{})",
                spec.full_title(),
                failure.number
            ),
            Event::SpecSkip(spec, _) => info!("[skip] {}", spec.full_title()),
            Event::HookFail(hook, failure) => {
                error!("[fail] {} (#{}: {})", hook.full_title(), failure.number, failure.error)
            }
            Event::SpecError(_, failure) | Event::HookError(_, failure) => warn!(
                "[late] {} (#{}: {})",
                failure.source.title(),
                failure.number,
                failure.error
            ),
            other => trace!("{} {}", other.kind(), other.node().title()),
        });
    }

    pub fn summary(result: &ExecutionResult) {
        info!(
            "{} passed, {} failed, {} skipped ({} ms)",
            result.passed,
            result.failed,
            result.skipped,
            result.time.as_millis()
        );
        for failure in &result.failures {
            error!(
                "{}) {}: {}",
                failure.number,
                failure.source.title(),
                failure.error
            );
        }
        if result.focused {
            warn!("Run is focused, specs flagged `only` were left in the suite");
        }
    }
}
