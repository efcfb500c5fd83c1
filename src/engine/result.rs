use crate::engine::error::Error;
use crate::engine::events::Node;
use crate::engine::tree::{Flag, Suite};
use derivative::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Thrown,
    /// The body failed after its node had already settled on a timeout.
    Late,
}

#[derive(Debug)]
pub struct ExecutionFailure {
    /// Detection order, starting at 1. Emission order may differ.
    pub number: usize,
    pub error: Error,
    pub source: Node,
    pub kind: FailureKind,
}

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ExecutionResult {
    /// The executed tree, kept alive so failure sources can still name their owners.
    #[derivative(Debug = "ignore")]
    pub root: Arc<Suite>,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub time: Duration,
    /// Every failure detected during the run, sorted by number.
    pub failures: Vec<Arc<ExecutionFailure>>,
    /// The root suite ended up flagged `only`.
    pub focused: bool,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct Tally {
    passed: usize,
    failed: usize,
    skipped: usize,
    failures: Vec<Arc<ExecutionFailure>>,
}

/// Counts spec outcomes and numbers failures as they are detected.
#[derive(Debug)]
pub(crate) struct Aggregator {
    sequence: AtomicUsize,
    tally: Mutex<Tally>,
}

impl Aggregator {
    pub(crate) fn new() -> Self {
        Self {
            sequence: AtomicUsize::new(0),
            tally: Mutex::new(Tally::default()),
        }
    }

    pub(crate) fn detect(&self, source: Node, error: Error, late: bool) -> Arc<ExecutionFailure> {
        let kind = if late {
            FailureKind::Late
        } else if error.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Thrown
        };
        let failure = Arc::new(ExecutionFailure {
            number: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            error,
            source,
            kind,
        });
        warn!(
            "Failure #{} in {}: {}",
            failure.number,
            failure.source.title(),
            failure.error
        );
        lock!(self.tally).failures.push(failure.clone());
        failure
    }

    pub(crate) fn passed(&self) {
        lock!(self.tally).passed += 1;
    }

    pub(crate) fn failed(&self) {
        lock!(self.tally).failed += 1;
    }

    pub(crate) fn skipped(&self) {
        lock!(self.tally).skipped += 1;
    }

    /// Every failure detected so far, sorted by number.
    pub(crate) fn failures(&self) -> Vec<Arc<ExecutionFailure>> {
        let mut failures = lock!(self.tally).failures.clone();
        failures.sort_by_key(|failure| failure.number);
        failures
    }

    pub(crate) fn result(&self, root: Arc<Suite>, time: Duration) -> ExecutionResult {
        let failures = self.failures();
        let tally = lock!(self.tally);
        ExecutionResult {
            focused: root.flag() == Flag::Only,
            root,
            passed: tally.passed,
            failed: tally.failed,
            skipped: tally.skipped,
            time,
            failures,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_failures_are_numbered_in_detection_order() {
        let aggregator = Aggregator::new();
        let root = Suite::empty("root");
        let node = Node::Suite(root.clone());
        let first = aggregator.detect(node.clone(), Error::Timeout(5), false);
        let second = aggregator.detect(node.clone(), Error::Thrown("boom".into()), false);
        let third = aggregator.detect(node, Error::Thrown("late".into()), true);
        aggregator.failed();
        aggregator.passed();

        let result = aggregator.result(root, Duration::from_millis(3));

        assert_eq!((first.number, second.number, third.number), (1, 2, 3));
        assert_eq!(first.kind, FailureKind::Timeout);
        assert_eq!(second.kind, FailureKind::Thrown);
        assert_eq!(third.kind, FailureKind::Late);
        assert_eq!((result.passed, result.failed, result.skipped), (1, 1, 0));
        assert_eq!(result.failures.len(), 3);
        assert_eq!(result.time, Duration::from_millis(3));
        assert!(!result.focused);
        assert!(!result.is_success());
    }
}
