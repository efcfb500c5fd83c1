use crate::engine::hooks::Hook;
use crate::engine::result::ExecutionFailure;
use crate::engine::tree::{Spec, Suite};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Node a failure or event is attributed to.
#[derive(Debug, Clone)]
pub enum Node {
    Suite(Arc<Suite>),
    Spec(Arc<Spec>),
    Hook(Arc<Hook>),
}

impl Node {
    pub fn title(&self) -> String {
        match self {
            Node::Suite(suite) => suite.full_title(),
            Node::Spec(spec) => spec.full_title(),
            Node::Hook(hook) => hook.full_title(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SkipReason {
    /// The node or one of its ancestors is flagged `skip`, or lost to a focused sibling.
    Flagged,
    /// A body or hook asked to be skipped.
    Requested,
    /// A `beforeAll` or `beforeEach` hook failed.
    Fixture(Arc<ExecutionFailure>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SuiteStart,
    SuiteDone,
    SpecStart,
    SpecPass,
    SpecFail,
    SpecSkip,
    SpecError,
    HookStart,
    HookPass,
    HookFail,
    HookSkip,
    HookError,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SuiteStart => "suite:start",
            EventKind::SuiteDone => "suite:done",
            EventKind::SpecStart => "spec:start",
            EventKind::SpecPass => "spec:pass",
            EventKind::SpecFail => "spec:fail",
            EventKind::SpecSkip => "spec:skip",
            EventKind::SpecError => "spec:error",
            EventKind::HookStart => "hook:start",
            EventKind::HookPass => "hook:pass",
            EventKind::HookFail => "hook:fail",
            EventKind::HookSkip => "hook:skip",
            EventKind::HookError => "hook:error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    SuiteStart(Arc<Suite>),
    SuiteDone(Arc<Suite>),
    SpecStart(Arc<Spec>),
    SpecPass(Arc<Spec>),
    SpecFail(Arc<Spec>, Arc<ExecutionFailure>),
    SpecSkip(Arc<Spec>, SkipReason),
    SpecError(Arc<Spec>, Arc<ExecutionFailure>),
    HookStart(Arc<Hook>),
    HookPass(Arc<Hook>),
    HookFail(Arc<Hook>, Arc<ExecutionFailure>),
    HookSkip(Arc<Hook>),
    HookError(Arc<Hook>, Arc<ExecutionFailure>),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::SuiteStart(_) => EventKind::SuiteStart,
            Event::SuiteDone(_) => EventKind::SuiteDone,
            Event::SpecStart(_) => EventKind::SpecStart,
            Event::SpecPass(_) => EventKind::SpecPass,
            Event::SpecFail(..) => EventKind::SpecFail,
            Event::SpecSkip(..) => EventKind::SpecSkip,
            Event::SpecError(..) => EventKind::SpecError,
            Event::HookStart(_) => EventKind::HookStart,
            Event::HookPass(_) => EventKind::HookPass,
            Event::HookFail(..) => EventKind::HookFail,
            Event::HookSkip(_) => EventKind::HookSkip,
            Event::HookError(..) => EventKind::HookError,
        }
    }

    pub fn node(&self) -> Node {
        match self {
            Event::SuiteStart(suite) | Event::SuiteDone(suite) => Node::Suite(suite.clone()),
            Event::SpecStart(spec)
            | Event::SpecPass(spec)
            | Event::SpecFail(spec, _)
            | Event::SpecSkip(spec, _)
            | Event::SpecError(spec, _) => Node::Spec(spec.clone()),
            Event::HookStart(hook)
            | Event::HookPass(hook)
            | Event::HookFail(hook, _)
            | Event::HookSkip(hook)
            | Event::HookError(hook, _) => Node::Hook(hook.clone()),
        }
    }

    pub fn failure(&self) -> Option<&Arc<ExecutionFailure>> {
        match self {
            Event::SpecFail(_, failure)
            | Event::SpecError(_, failure)
            | Event::HookFail(_, failure)
            | Event::HookError(_, failure) => Some(failure),
            Event::SpecSkip(_, SkipReason::Fixture(failure)) => Some(failure),
            _ => None,
        }
    }
}

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    filter: Option<EventKind>,
    once: bool,
    listener: Listener,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

/// Typed observer list for run events.
///
/// Every emission works on a snapshot of the matching listeners, so listeners
/// may subscribe or unsubscribe (themselves included) while being notified.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &lock!(self.registry).subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to events of one kind.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(Some(kind), false, Arc::new(listener))
    }

    /// Subscribes to the next event of one kind only.
    pub fn subscribe_once<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(Some(kind), true, Arc::new(listener))
    }

    /// Subscribes to every event.
    pub fn subscribe_all<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(None, false, Arc::new(listener))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = lock!(self.registry);
        let before = registry.subscriptions.len();
        registry.subscriptions.retain(|subscription| subscription.id != id);
        registry.subscriptions.len() != before
    }

    fn register(&self, filter: Option<EventKind>, once: bool, listener: Listener) -> SubscriptionId {
        let mut registry = lock!(self.registry);
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        registry.subscriptions.push(Subscription {
            id,
            filter,
            once,
            listener,
        });
        id
    }

    pub(crate) fn emit(&self, event: Event) {
        let kind = event.kind();
        trace!("{} {}", kind, event.node().title());
        let listeners: Vec<Listener> = {
            let mut registry = lock!(self.registry);
            let listeners = registry
                .subscriptions
                .iter()
                .filter(|s| s.filter.map_or(true, |filter| filter == kind))
                .map(|s| s.listener.clone())
                .collect();
            registry
                .subscriptions
                .retain(|s| !(s.once && s.filter.map_or(true, |filter| filter == kind)));
            listeners
        };
        for listener in listeners {
            listener(&event);
        }
    }
}
