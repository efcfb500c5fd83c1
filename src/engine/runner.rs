use crate::engine::error::Result;
use crate::engine::events::{Event, EventBus, Node, SkipReason};
use crate::engine::executor::{self, LateFailure, Outcome};
use crate::engine::hooks::{Hook, HookKind};
use crate::engine::result::{Aggregator, ExecutionFailure, ExecutionResult};
use crate::engine::tree::{Child, Flag, Spec, Suite};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// A prepared run: subscribe to `events`, then await `result` to execute.
///
/// Nothing runs until `result` is polled, so listeners registered beforehand
/// observe every event.
pub struct Run {
    pub events: EventBus,
    pub result: BoxFuture<'static, Result<ExecutionResult>>,
    /// Bodies that outlived their timeout and may fail after `result` resolved.
    pub pending: Pending,
}

pub fn run_suite(root: Arc<Suite>) -> Run {
    let events = EventBus::new();
    let execution = Arc::new(Execution {
        root,
        events: events.clone(),
        aggregator: Aggregator::new(),
        watchers: Mutex::new(Vec::new()),
    });
    let pending = Pending(execution.clone());
    let result: BoxFuture<'static, Result<ExecutionResult>> = async move {
        let root = execution.root.clone();
        root.setup()?;
        info!("Running suite '{}'", root.full_title());
        let started = Instant::now();
        execute_suite(&execution, &root, None).await;
        let result = execution.aggregator.result(root, started.elapsed());
        info!(
            "Finished '{}': {} passed, {} failed, {} skipped in {} ms",
            result.root.full_title(),
            result.passed,
            result.failed,
            result.skipped,
            result.time.as_millis()
        );
        Ok(result)
    }
    .boxed();
    Run {
        events,
        result,
        pending,
    }
}

/// Late failures of a run still being watched.
#[derive(Clone)]
pub struct Pending(Arc<Execution>);

impl Pending {
    /// Waits up to `grace` for bodies that timed out to settle, then refreshes
    /// `result.failures` with the late failures detected meanwhile.
    pub async fn settle(&self, result: &mut ExecutionResult, grace: Duration) {
        let watchers = std::mem::take(&mut *lock!(self.0.watchers));
        if !watchers.is_empty() {
            debug!("Waiting for {} timed out bodies to settle", watchers.len());
            if tokio::time::timeout(grace, join_all(watchers)).await.is_err() {
                warn!(
                    "Timed out bodies still running {} ms after the run",
                    grace.as_millis()
                );
            }
        }
        result.failures = self.0.aggregator.failures();
    }
}

struct Execution {
    root: Arc<Suite>,
    events: EventBus,
    aggregator: Aggregator,
    watchers: Mutex<Vec<JoinHandle<()>>>,
}

enum Status {
    Passed,
    Skipped(SkipReason),
    Failed(Arc<ExecutionFailure>),
}

impl Execution {
    fn emit(&self, event: Event) {
        self.events.emit(event);
    }

    /// Reports the late failure of `node`, if its body ends up failing at all.
    fn watch(self: &Arc<Self>, node: Node, late: Option<LateFailure>) {
        let late = match late {
            Some(late) => late,
            None => return,
        };
        let execution = self.clone();
        let watcher = tokio::spawn(async move {
            if let Some(error) = late.wait().await {
                let failure = execution.aggregator.detect(node.clone(), error, true);
                match node {
                    Node::Spec(spec) => execution.emit(Event::SpecError(spec, failure)),
                    Node::Hook(hook) => execution.emit(Event::HookError(hook, failure)),
                    Node::Suite(_) => {}
                }
            }
        });
        lock!(self.watchers).push(watcher);
    }
}

fn execute_suite<'a>(
    execution: &'a Arc<Execution>,
    suite: &'a Arc<Suite>,
    skip: Option<SkipReason>,
) -> BoxFuture<'a, ()> {
    async move {
        execution.emit(Event::SuiteStart(suite.clone()));
        let children = suite.children();

        let skip = skip.or_else(|| (suite.flag() == Flag::Skip).then(|| SkipReason::Flagged));
        if let Some(reason) = skip {
            for child in &children {
                execute_child(execution, child, Some(reason.clone())).await;
            }
            execution.emit(Event::SuiteDone(suite.clone()));
            return;
        }

        let aborted = run_fixtures(execution, suite.hooks(HookKind::BeforeAll)).await;
        if aborted.is_some() {
            debug!("Skipping children of '{}', beforeAll hook did not pass", suite.name());
        }
        for child in &children {
            execute_child(execution, child, aborted.clone()).await;
        }
        for hook in suite.hooks(HookKind::AfterAll) {
            execute_hook(execution, &hook).await;
        }
        execution.emit(Event::SuiteDone(suite.clone()));
    }
    .boxed()
}

async fn execute_child(execution: &Arc<Execution>, child: &Child, skip: Option<SkipReason>) {
    match child {
        Child::Suite(suite) => execute_suite(execution, suite, skip).await,
        Child::Spec(spec) => execute_spec(execution, spec, skip).await,
    }
}

/// Runs hooks in order until one does not pass, returning why it stopped.
async fn run_fixtures(execution: &Arc<Execution>, hooks: Vec<Arc<Hook>>) -> Option<SkipReason> {
    for hook in hooks {
        match execute_hook(execution, &hook).await {
            Status::Passed => {}
            Status::Skipped(reason) => return Some(reason),
            Status::Failed(failure) => return Some(SkipReason::Fixture(failure)),
        }
    }
    None
}

async fn execute_spec(execution: &Arc<Execution>, spec: &Arc<Spec>, skip: Option<SkipReason>) {
    execution.emit(Event::SpecStart(spec.clone()));

    let skip = skip.or_else(|| (spec.flag() == Flag::Skip).then(|| SkipReason::Flagged));
    if let Some(reason) = skip {
        execution.aggregator.skipped();
        execution.emit(Event::SpecSkip(spec.clone(), reason));
        return;
    }

    let status = match run_fixtures(execution, spec.before_hooks()).await {
        Some(reason) => Status::Skipped(reason),
        None => {
            let settlement = executor::execute(spec.body(), spec.timeout()).await;
            execution.watch(Node::Spec(spec.clone()), settlement.late);
            match settlement.outcome {
                Outcome::Passed => Status::Passed,
                Outcome::Skipped => Status::Skipped(SkipReason::Requested),
                Outcome::Failed(error) => {
                    Status::Failed(execution.aggregator.detect(Node::Spec(spec.clone()), error, false))
                }
            }
        }
    };

    for hook in spec.after_hooks() {
        execute_hook(execution, &hook).await;
    }

    match status {
        Status::Passed => {
            execution.aggregator.passed();
            execution.emit(Event::SpecPass(spec.clone()));
        }
        Status::Skipped(reason) => {
            execution.aggregator.skipped();
            execution.emit(Event::SpecSkip(spec.clone(), reason));
        }
        Status::Failed(failure) => {
            execution.aggregator.failed();
            execution.emit(Event::SpecFail(spec.clone(), failure));
        }
    }
}

async fn execute_hook(execution: &Arc<Execution>, hook: &Arc<Hook>) -> Status {
    if hook.flag() == Flag::Skip {
        return Status::Passed;
    }
    execution.emit(Event::HookStart(hook.clone()));
    let settlement = executor::execute(hook.body(), hook.timeout()).await;
    execution.watch(Node::Hook(hook.clone()), settlement.late);
    match settlement.outcome {
        Outcome::Passed => {
            execution.emit(Event::HookPass(hook.clone()));
            Status::Passed
        }
        Outcome::Skipped => {
            execution.emit(Event::HookSkip(hook.clone()));
            Status::Skipped(SkipReason::Requested)
        }
        Outcome::Failed(error) => {
            let failure = execution.aggregator.detect(Node::Hook(hook.clone()), error, false);
            execution.emit(Event::HookFail(hook.clone(), failure.clone()));
            Status::Failed(failure)
        }
    }
}
