use crate::engine::error::{Error, Result};
use crate::engine::executor::Body;
use crate::engine::tree::{Flag, Spec, Suite};
use derivative::*;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::BeforeAll => "beforeAll",
            HookKind::AfterAll => "afterAll",
            HookKind::BeforeEach => "beforeEach",
            HookKind::AfterEach => "afterEach",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node a hook instance reports its failures against.
#[derive(Debug, Clone)]
pub(crate) enum HookOwner {
    Suite(Weak<Suite>),
    Spec(Weak<Spec>),
}

/// A fixture callback.
///
/// Hooks declared on a suite are owned by that suite. The `beforeEach` and
/// `afterEach` hooks a spec inherits are separate instances bound to the spec
/// itself, sharing the declared body, so a failure names the spec it ran for.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Hook {
    kind: HookKind,
    #[derivative(Debug = "ignore")]
    owner: HookOwner,
    flag: Flag,
    timeout: Mutex<Duration>,
    #[derivative(Debug = "ignore")]
    body: Body,
}

impl Hook {
    pub(crate) fn new(
        kind: HookKind,
        owner: HookOwner,
        flag: Flag,
        timeout: Duration,
        body: Body,
    ) -> Result<Self> {
        if flag == Flag::Only {
            return Err(Error::OnlyHook);
        }
        Ok(Self {
            kind,
            owner,
            flag,
            timeout: Mutex::new(timeout),
            body,
        })
    }

    pub(crate) fn bind(&self, spec: &Arc<Spec>) -> Arc<Hook> {
        Arc::new(Self {
            kind: self.kind,
            owner: HookOwner::Spec(Arc::downgrade(spec)),
            flag: self.flag,
            timeout: Mutex::new(self.timeout()),
            body: self.body.clone(),
        })
    }

    #[inline]
    pub fn kind(&self) -> HookKind {
        self.kind
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    #[inline]
    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn timeout(&self) -> Duration {
        *lock!(self.timeout)
    }

    pub fn set_timeout(&self, timeout: Duration) {
        *lock!(self.timeout) = timeout;
    }

    pub(crate) fn body(&self) -> &Body {
        &self.body
    }

    /// Title of the nearest owner, empty once the owner is gone.
    pub fn owner_title(&self) -> String {
        match &self.owner {
            HookOwner::Suite(suite) => suite.upgrade().map(|s| s.full_title()),
            HookOwner::Spec(spec) => spec.upgrade().map(|s| s.full_title()),
        }
        .unwrap_or_default()
    }

    pub fn full_title(&self) -> String {
        format!("\"{}\" hook for \"{}\"", self.kind, self.owner_title())
    }
}
