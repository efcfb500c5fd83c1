//! Registration primitives for use inside declaration bodies.

use crate::engine::context::current_suite;
use crate::engine::error::Result;
use crate::engine::executor::{Body, CallContext, CallResult};
use crate::engine::hooks::{Hook, HookKind};
use crate::engine::tree::{Flag, Spec, Suite};
use std::future::Future;
use std::sync::Arc;

pub fn suite<F>(name: &str, declaration: F) -> Result<Arc<Suite>>
where
    F: Fn() -> CallResult + Send + Sync + 'static,
{
    Ok(current_suite()?.add_child_suite(name, Some(Arc::new(declaration))))
}

pub fn spec<F, Fut>(name: &str, body: F) -> Result<Arc<Spec>>
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    Ok(current_suite()?.add_child_spec(name, Body::new(body)))
}

pub fn hook<F, Fut>(kind: HookKind, body: F) -> Result<Arc<Hook>>
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    current_suite()?.add_hook(kind, Flag::None, Body::new(body))
}

/// Registers a hook that never runs and emits no events.
pub fn skipped_hook<F, Fut>(kind: HookKind, body: F) -> Result<Arc<Hook>>
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    current_suite()?.add_hook(kind, Flag::Skip, Body::new(body))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::error::Error;

    #[test]
    fn test_registration_outside_declaration_fails() {
        assert!(matches!(
            spec("orphan", |_| async { Ok(()) }),
            Err(Error::NoActiveSuite)
        ));
        assert!(matches!(suite("orphan", || Ok(())), Err(Error::NoActiveSuite)));
        assert!(matches!(
            hook(HookKind::BeforeAll, |_| async { Ok(()) }),
            Err(Error::NoActiveSuite)
        ));
    }

    #[test]
    fn test_nodes_attach_to_current_suite() {
        let root = Suite::new("root", || {
            hook(HookKind::BeforeEach, |_| async { Ok(()) })?;
            skipped_hook(HookKind::AfterEach, |_| async { Ok(()) })?;
            spec("a", |_| async { Ok(()) })?.skip();
            suite("group", || {
                spec("b", |_| async { Ok(()) })?;
                Ok(())
            })?;
            Ok(())
        });

        root.setup().unwrap();

        assert_eq!(root.hooks(HookKind::BeforeEach).len(), 1);
        assert_eq!(root.hooks(HookKind::AfterEach)[0].flag(), Flag::Skip);
        let children = root.children();
        assert_eq!(children[0].flag(), Flag::Skip);
        match &children[1] {
            crate::engine::tree::Child::Suite(group) => {
                assert_eq!(group.children()[0].name(), "b");
            }
            other => panic!("expected suite, got {:?}", other),
        }
    }
}
