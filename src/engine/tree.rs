use crate::engine::context::SuiteGuard;
use crate::engine::error::{from_panic, Error, Result};
use crate::engine::executor::{Body, CallResult};
use crate::engine::hooks::{Hook, HookKind, HookOwner};
use crate::engine::normalize::normalize;
use derivative::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Synchronous body registering the children of a suite.
pub type Declaration = Arc<dyn Fn() -> CallResult + Send + Sync>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    #[default]
    None,
    Skip,
    Only,
}

#[derive(Debug, Clone)]
pub enum Child {
    Suite(Arc<Suite>),
    Spec(Arc<Spec>),
}

impl Child {
    pub fn flag(&self) -> Flag {
        match self {
            Child::Suite(suite) => suite.flag(),
            Child::Spec(spec) => spec.flag(),
        }
    }

    pub(crate) fn set_flag(&self, flag: Flag) {
        match self {
            Child::Suite(suite) => suite.set_flag(flag),
            Child::Spec(spec) => spec.set_flag(flag),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Child::Suite(suite) => suite.name(),
            Child::Spec(spec) => spec.name(),
        }
    }
}

#[derive(Debug, Default)]
struct SuiteHooks {
    before_all: Vec<Arc<Hook>>,
    after_all: Vec<Arc<Hook>>,
    before_each: Vec<Arc<Hook>>,
    after_each: Vec<Arc<Hook>>,
}

impl SuiteHooks {
    fn of_kind(&mut self, kind: HookKind) -> &mut Vec<Arc<Hook>> {
        match kind {
            HookKind::BeforeAll => &mut self.before_all,
            HookKind::AfterAll => &mut self.after_all,
            HookKind::BeforeEach => &mut self.before_each,
            HookKind::AfterEach => &mut self.after_each,
        }
    }
}

#[derive(Debug)]
struct SuiteState {
    timeout: Duration,
    flag: Flag,
    children: Vec<Child>,
    hooks: SuiteHooks,
    setup: Option<Result<()>>,
}

/// A named group of specs, nested suites and hooks.
///
/// Ownership flows from parent to child only, the back reference to the parent
/// is weak. Children are registered while the declaration body runs during
/// [`Suite::setup`] and never change afterwards.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Suite {
    name: String,
    #[derivative(Debug = "ignore")]
    parent: Weak<Suite>,
    #[derivative(Debug = "ignore")]
    declaration: Option<Declaration>,
    state: Mutex<SuiteState>,
}

impl Suite {
    /// Creates a root suite whose children are registered by `declaration`.
    pub fn new<F>(name: &str, declaration: F) -> Arc<Self>
    where
        F: Fn() -> CallResult + Send + Sync + 'static,
    {
        Self::build(name, Weak::new(), Some(Arc::new(declaration)), DEFAULT_TIMEOUT)
    }

    /// Creates a root suite without a declaration body, children are added directly.
    pub fn empty(name: &str) -> Arc<Self> {
        Self::build(name, Weak::new(), None, DEFAULT_TIMEOUT)
    }

    fn build(
        name: &str,
        parent: Weak<Suite>,
        declaration: Option<Declaration>,
        timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            parent,
            declaration,
            state: Mutex::new(SuiteState {
                timeout,
                flag: Flag::None,
                children: Vec::new(),
                hooks: SuiteHooks::default(),
                setup: None,
            }),
        })
    }

    pub fn add_child_suite(
        self: &Arc<Self>,
        name: &str,
        declaration: Option<Declaration>,
    ) -> Arc<Suite> {
        let suite = Self::build(name, Arc::downgrade(self), declaration, self.timeout());
        lock!(self.state)
            .children
            .push(Child::Suite(suite.clone()));
        trace!("Registered suite '{}' in '{}'", name, self.name);
        suite
    }

    pub fn add_child_spec(self: &Arc<Self>, name: &str, body: Body) -> Arc<Spec> {
        let spec = Arc::new(Spec {
            name: name.to_owned(),
            parent: Arc::downgrade(self),
            body,
            state: Mutex::new(SpecState {
                timeout: self.timeout(),
                flag: Flag::None,
                before: Vec::new(),
                after: Vec::new(),
                resolved: false,
            }),
        });
        lock!(self.state).children.push(Child::Spec(spec.clone()));
        trace!("Registered spec '{}' in '{}'", name, self.name);
        spec
    }

    pub fn add_hook(self: &Arc<Self>, kind: HookKind, flag: Flag, body: Body) -> Result<Arc<Hook>> {
        let owner = HookOwner::Suite(Arc::downgrade(self));
        let hook = Arc::new(Hook::new(kind, owner, flag, self.timeout(), body)?);
        lock!(self.state).hooks.of_kind(kind).push(hook.clone());
        Ok(hook)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<Arc<Suite>> {
        self.parent.upgrade()
    }

    pub fn is_root(&self) -> bool {
        self.parent.upgrade().is_none()
    }

    pub fn full_title(&self) -> String {
        match self.parent() {
            Some(parent) => join_title(parent.full_title(), &self.name),
            None => self.name.clone(),
        }
    }

    pub fn flag(&self) -> Flag {
        lock!(self.state).flag
    }

    pub(crate) fn set_flag(&self, flag: Flag) {
        lock!(self.state).flag = flag;
    }

    pub fn only(&self) {
        self.set_flag(Flag::Only);
    }

    pub fn skip(&self) {
        self.set_flag(Flag::Skip);
    }

    pub fn timeout(&self) -> Duration {
        lock!(self.state).timeout
    }

    /// Overrides the timeout. Nodes registered afterwards inherit it.
    pub fn set_timeout(&self, timeout: Duration) {
        lock!(self.state).timeout = timeout;
    }

    pub fn children(&self) -> Vec<Child> {
        lock!(self.state).children.clone()
    }

    pub fn hooks(&self, kind: HookKind) -> Vec<Arc<Hook>> {
        lock!(self.state).hooks.of_kind(kind).clone()
    }

    /// Runs the declaration body, sets up nested suites, resolves inherited hooks
    /// of the specs and normalizes flags. Only the first call does any work, later
    /// calls return the first outcome.
    pub fn setup(self: &Arc<Self>) -> Result<()> {
        if let Some(outcome) = lock!(self.state).setup.clone() {
            return outcome;
        }
        let outcome = self.run_setup();
        lock!(self.state).setup = Some(outcome.clone());
        outcome
    }

    fn run_setup(self: &Arc<Self>) -> Result<()> {
        if let Some(declaration) = &self.declaration {
            self.declare(declaration)?;
        }
        let children = self.children();
        for child in &children {
            if let Child::Suite(suite) = child {
                suite.setup()?;
            }
        }
        for child in &children {
            if let Child::Spec(spec) = child {
                spec.resolve_hooks();
            }
        }
        normalize(self);
        debug!(
            "Suite '{}' set up with {} children, flag {:?}",
            self.name,
            children.len(),
            self.flag()
        );
        Ok(())
    }

    fn declare(self: &Arc<Self>, declaration: &Declaration) -> Result<()> {
        let timeout = self.timeout();
        let started = Instant::now();
        let outcome = {
            let _guard = SuiteGuard::enter(self.clone());
            catch_unwind(AssertUnwindSafe(|| (declaration.as_ref())()))
        };
        let failure = match outcome {
            Ok(Ok(())) if started.elapsed() > timeout => {
                Some(Error::Timeout(timeout.as_millis() as u64))
            }
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(Error::from(err)),
            Err(payload) => Some(from_panic(payload)),
        };
        match failure {
            Some(err) => {
                error!("Declaration of suite '{}' failed: {}", self.name, err);
                Err(Error::setup(&self.full_title(), err))
            }
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
struct SpecState {
    timeout: Duration,
    flag: Flag,
    before: Vec<Arc<Hook>>,
    after: Vec<Arc<Hook>>,
    resolved: bool,
}

/// A single test case.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Spec {
    name: String,
    #[derivative(Debug = "ignore")]
    parent: Weak<Suite>,
    #[derivative(Debug = "ignore")]
    body: Body,
    state: Mutex<SpecState>,
}

impl Spec {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<Arc<Suite>> {
        self.parent.upgrade()
    }

    pub fn full_title(&self) -> String {
        match self.parent() {
            Some(parent) => join_title(parent.full_title(), &self.name),
            None => self.name.clone(),
        }
    }

    pub fn flag(&self) -> Flag {
        lock!(self.state).flag
    }

    pub(crate) fn set_flag(&self, flag: Flag) {
        lock!(self.state).flag = flag;
    }

    pub fn only(&self) {
        self.set_flag(Flag::Only);
    }

    pub fn skip(&self) {
        self.set_flag(Flag::Skip);
    }

    pub fn timeout(&self) -> Duration {
        lock!(self.state).timeout
    }

    pub fn set_timeout(&self, timeout: Duration) {
        lock!(self.state).timeout = timeout;
    }

    pub(crate) fn body(&self) -> &Body {
        &self.body
    }

    /// Inherited `beforeEach` hooks, outermost suite first.
    pub fn before_hooks(&self) -> Vec<Arc<Hook>> {
        lock!(self.state).before.clone()
    }

    /// Inherited `afterEach` hooks, nearest suite first.
    pub fn after_hooks(&self) -> Vec<Arc<Hook>> {
        lock!(self.state).after.clone()
    }

    pub(crate) fn resolve_hooks(self: &Arc<Self>) {
        if lock!(self.state).resolved {
            return;
        }
        let mut ancestors = Vec::new();
        let mut cursor = self.parent();
        while let Some(suite) = cursor {
            cursor = suite.parent();
            ancestors.push(suite);
        }
        let before: Vec<Arc<Hook>> = ancestors
            .iter()
            .rev()
            .flat_map(|suite| suite.hooks(HookKind::BeforeEach))
            .map(|hook| hook.bind(self))
            .collect();
        let after: Vec<Arc<Hook>> = ancestors
            .iter()
            .flat_map(|suite| suite.hooks(HookKind::AfterEach))
            .map(|hook| hook.bind(self))
            .collect();
        let mut state = lock!(self.state);
        state.before = before;
        state.after = after;
        state.resolved = true;
    }
}

fn join_title(prefix: String, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else if name.is_empty() {
        prefix
    } else {
        format!("{} {}", prefix, name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::declare;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop() -> Body {
        Body::new(|_| async { Ok(()) })
    }

    fn hook_labels(hooks: &[Arc<Hook>]) -> Vec<String> {
        hooks
            .iter()
            .map(|hook| format!("{}:{}", hook.name(), hook.timeout().as_millis()))
            .collect()
    }

    #[test]
    fn test_setup_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let root = Suite::new("root", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            declare::spec("first", |_| async { Ok(()) })?;
            declare::suite("nested", || {
                declare::spec("second", |_| async { Ok(()) })?;
                Ok(())
            })?;
            Ok(())
        });

        root.setup().unwrap();
        let names: Vec<String> = root.children().iter().map(|c| c.name().to_owned()).collect();
        root.setup().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(names, vec!["first", "nested"]);
        assert_eq!(root.children().len(), 2);
    }

    #[test]
    fn test_hooks_are_inherited_in_order() {
        let root = Suite::empty("root");
        root.set_timeout(Duration::from_millis(1));
        root.add_hook(HookKind::BeforeEach, Flag::None, noop()).unwrap();
        root.add_hook(HookKind::AfterEach, Flag::None, noop()).unwrap();
        let middle = root.add_child_suite("middle", None);
        middle.set_timeout(Duration::from_millis(2));
        middle.add_hook(HookKind::BeforeEach, Flag::None, noop()).unwrap();
        middle.add_hook(HookKind::AfterEach, Flag::None, noop()).unwrap();
        let inner = middle.add_child_suite("inner", None);
        inner.set_timeout(Duration::from_millis(3));
        inner.add_hook(HookKind::BeforeEach, Flag::None, noop()).unwrap();
        inner.add_hook(HookKind::AfterEach, Flag::None, noop()).unwrap();
        let spec = inner.add_child_spec("deep", noop());

        root.setup().unwrap();

        assert_eq!(
            hook_labels(&spec.before_hooks()),
            vec!["beforeEach:1", "beforeEach:2", "beforeEach:3"]
        );
        assert_eq!(
            hook_labels(&spec.after_hooks()),
            vec!["afterEach:3", "afterEach:2", "afterEach:1"]
        );
        assert!(spec
            .before_hooks()
            .iter()
            .all(|hook| hook.owner_title() == "root middle inner deep"));
    }

    #[test]
    fn test_timeouts_are_inherited_from_parent() {
        let root = Suite::empty("root");
        root.set_timeout(Duration::from_millis(250));
        let nested = root.add_child_suite("nested", None);
        let spec = nested.add_child_spec("spec", noop());

        assert_eq!(nested.timeout(), Duration::from_millis(250));
        assert_eq!(spec.timeout(), Duration::from_millis(250));
        assert_eq!(Suite::empty("other").timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_failing_declaration_is_a_setup_failure() {
        let root = Suite::new("root", || {
            declare::suite("broken", || Err("cannot declare".into()))?;
            Ok(())
        });

        let error = root.setup().unwrap_err();

        match &error {
            Error::Setup { suite, source } => {
                assert_eq!(suite, "root broken");
                assert_eq!(source.to_string(), "cannot declare");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(root.setup(), Err(Error::Setup { .. })));
    }

    #[test]
    fn test_panicking_declaration_is_a_setup_failure() {
        let root = Suite::new("root", || panic!("declaration exploded"));

        let error = root.setup().unwrap_err();

        assert_eq!(
            error.to_string(),
            "Setup of suite 'root' failed: Panicked: declaration exploded"
        );
    }

    #[test]
    fn test_slow_declaration_times_out() {
        let root = Suite::new("root", || {
            std::thread::sleep(Duration::from_millis(20));
            Ok(())
        });
        root.set_timeout(Duration::from_millis(5));

        let error = root.setup().unwrap_err();

        assert_eq!(
            error.to_string(),
            "Setup of suite 'root' failed: Timeout of 5 ms reached"
        );
    }
}
