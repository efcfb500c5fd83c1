use crate::engine::tree::{Flag, Suite};

/// Resolves `only` and `skip` across the direct children of `suite`.
///
/// Nested suites must already be normalized, [`Suite::setup`] calls this last.
/// A suite holding any focused child becomes focused itself, which is how focus
/// reaches the parent's own pass. Explicitly skipped children stay skipped.
pub(crate) fn normalize(suite: &Suite) {
    let children = suite.children();

    if children.iter().any(|child| child.flag() == Flag::Only) {
        for child in &children {
            if child.flag() != Flag::Only {
                child.set_flag(Flag::Skip);
            }
        }
        suite.set_flag(Flag::Only);
    }

    if suite.flag() == Flag::Only {
        for child in &children {
            if child.flag() != Flag::Skip {
                child.set_flag(Flag::Only);
            }
        }
    }

    if !children.is_empty() && children.iter().all(|child| child.flag() == Flag::Skip) {
        suite.set_flag(Flag::Skip);
    }
}

#[cfg(test)]
mod test {
    use crate::engine::executor::Body;
    use crate::engine::tree::{Child, Flag, Suite};
    use std::sync::Arc;

    fn noop() -> Body {
        Body::new(|_| async { Ok(()) })
    }

    fn flags(suite: &Arc<Suite>) -> Vec<(String, Flag)> {
        suite
            .children()
            .iter()
            .map(|child| (child.name().to_owned(), child.flag()))
            .collect()
    }

    fn suite_child(suite: &Arc<Suite>, index: usize) -> Arc<Suite> {
        match &suite.children()[index] {
            Child::Suite(suite) => suite.clone(),
            Child::Spec(spec) => panic!("expected suite, got spec {}", spec.name()),
        }
    }

    #[test]
    fn test_only_escalates_from_deep_spec() {
        let root = Suite::empty("root");
        root.add_child_spec("root spec", noop());
        let level1 = root.add_child_suite("level1", None);
        level1.add_child_spec("level1 spec", noop());
        let level2 = level1.add_child_suite("level2", None);
        level2.add_child_spec("level2 spec", noop());
        level2.add_child_spec("focused", noop()).only();
        let sibling = root.add_child_suite("sibling", None);
        sibling.add_child_spec("sibling spec", noop());

        root.setup().unwrap();

        assert_eq!(root.flag(), Flag::Only);
        assert_eq!(
            flags(&root),
            vec![
                ("root spec".to_owned(), Flag::Skip),
                ("level1".to_owned(), Flag::Only),
                ("sibling".to_owned(), Flag::Skip),
            ]
        );
        assert_eq!(
            flags(&suite_child(&root, 1)),
            vec![
                ("level1 spec".to_owned(), Flag::Skip),
                ("level2".to_owned(), Flag::Only),
            ]
        );
        assert_eq!(
            flags(&level2),
            vec![
                ("level2 spec".to_owned(), Flag::Skip),
                ("focused".to_owned(), Flag::Only),
            ]
        );
    }

    #[test]
    fn test_focused_suite_focuses_children_except_skipped() {
        let root = Suite::empty("root");
        let focused = root.add_child_suite("focused", None);
        focused.only();
        focused.add_child_spec("a", noop());
        focused.add_child_spec("b", noop()).skip();
        root.add_child_spec("other", noop());

        root.setup().unwrap();

        assert_eq!(
            flags(&focused),
            vec![("a".to_owned(), Flag::Only), ("b".to_owned(), Flag::Skip)]
        );
        assert_eq!(
            flags(&root),
            vec![("focused".to_owned(), Flag::Only), ("other".to_owned(), Flag::Skip)]
        );
    }

    #[test]
    fn test_all_skipped_children_collapse_suite() {
        let root = Suite::empty("root");
        let group = root.add_child_suite("group", None);
        group.add_child_spec("a", noop()).skip();
        group.add_child_spec("b", noop()).skip();
        root.add_child_spec("runs", noop());

        root.setup().unwrap();

        assert_eq!(group.flag(), Flag::Skip);
        assert_eq!(root.flag(), Flag::None);
    }

    #[test]
    fn test_empty_suite_keeps_its_flag() {
        let root = Suite::empty("root");
        let empty = root.add_child_suite("empty", None);

        root.setup().unwrap();

        assert_eq!(empty.flag(), Flag::None);
        assert_eq!(root.flag(), Flag::None);
    }
}
