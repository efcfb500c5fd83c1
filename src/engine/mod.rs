//! Hierarchical test execution engine.
//!
//! A tree of [`Suite`]s, [`Spec`]s and [`Hook`]s is declared, set up once
//! (declaration bodies, hook inheritance, `only`/`skip` normalization) and then
//! executed depth-first by [`run_suite`], which reports every node transition
//! on an [`EventBus`] and resolves to an [`ExecutionResult`].

pub mod context;
pub mod declare;
pub mod error;
pub mod events;
pub mod executor;
pub mod hooks;
pub(crate) mod normalize;
pub mod result;
pub mod runner;
pub mod tree;

pub use self::error::{BodyError, Error, Result};
pub use self::events::{Event, EventBus, EventKind, Node, SkipReason, SubscriptionId};
pub use self::executor::{Body, CallContext, CallResult, Outcome, Settlement};
pub use self::hooks::{Hook, HookKind};
pub use self::result::{ExecutionFailure, ExecutionResult, FailureKind};
pub use self::runner::{run_suite, Pending, Run};
pub use self::tree::{Child, Flag, Spec, Suite, DEFAULT_TIMEOUT};
