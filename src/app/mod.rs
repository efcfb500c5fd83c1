pub mod error;
pub(crate) mod steps;

use crate::app::error::Error;
use crate::app::steps::perform_all;
use crate::configuration::constants::defaults::LATE_FAILURE_GRACE;
use crate::configuration::manifest::{ChildEntry, HookEntry, Manifest, SpecEntry, SuiteEntry};
use crate::engine::context::current_suite;
use crate::engine::{declare, run_suite, Body, CallResult, ExecutionResult, Flag, HookKind, Run, Suite};
use crate::reporter::console::ConsoleReporter;
use crate::reporter::serialize::JsonReporter;
use std::path::PathBuf;
use std::sync::Arc;

/// Runs the suite tree described by a manifest.
pub struct App {
    manifest: Arc<Manifest>,
    output: Option<PathBuf>,
}

impl App {
    pub fn new(manifest: Manifest) -> Self {
        App {
            manifest: Arc::new(manifest),
            output: None,
        }
    }

    pub fn load(file: PathBuf) -> Result<Self, Error> {
        let manifest = Manifest::from(file)?;
        debug!("Initiated configuration {:#?}", manifest);
        Ok(App::new(manifest))
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    /// Builds the root suite. Its children are declared from the manifest
    /// when the run sets the tree up.
    pub fn suite(&self) -> Arc<Suite> {
        let manifest = self.manifest.clone();
        let root = Suite::new(&self.manifest.root.name, move || declare_suite(&manifest.root));
        apply_flags(&self.manifest.root, &root);
        if let Some(timeout) = self.manifest.root.timeout {
            root.set_timeout(timeout);
        }
        root
    }

    pub async fn run(&self) -> Result<ExecutionResult, Error> {
        info!("Starting suite '{}'", self.manifest.root.name);
        let Run {
            events,
            result,
            pending,
        } = run_suite(self.suite());
        ConsoleReporter::attach(&events);
        let json = self.output.as_ref().map(|_| JsonReporter::attach(&events));

        let mut result = result.await?;
        pending.settle(&mut result, LATE_FAILURE_GRACE).await;
        ConsoleReporter::summary(&result);
        if let (Some(path), Some(json)) = (&self.output, json) {
            json.save_into_file(path, &result)?;
            info!("Report written to {}", path.display());
        }
        Ok(result)
    }
}

fn apply_flags(entry: &SuiteEntry, suite: &Suite) {
    if entry.skip {
        suite.skip();
    } else if entry.only {
        suite.only();
    }
}

fn declare_suite(entry: &SuiteEntry) -> CallResult {
    let suite = current_suite()?;
    if let Some(timeout) = entry.timeout {
        suite.set_timeout(timeout);
    }
    declare_hooks(&suite, HookKind::BeforeAll, &entry.before_all)?;
    declare_hooks(&suite, HookKind::BeforeEach, &entry.before_each)?;
    declare_hooks(&suite, HookKind::AfterEach, &entry.after_each)?;
    declare_hooks(&suite, HookKind::AfterAll, &entry.after_all)?;

    for child in &entry.children {
        match child {
            ChildEntry::Suite(nested) => {
                let nested_entry = Arc::new(nested.clone());
                let declared = declare::suite(&nested.name, move || declare_suite(&nested_entry))?;
                apply_flags(nested, &declared);
            }
            ChildEntry::Spec(spec) => declare_spec(spec)?,
        }
    }
    Ok(())
}

fn declare_spec(entry: &SpecEntry) -> CallResult {
    let steps = Arc::new(entry.steps.clone());
    let spec = declare::spec(&entry.name, move |cx| perform_all(steps.clone(), cx))?;
    if let Some(timeout) = entry.timeout {
        spec.set_timeout(timeout);
    }
    if entry.skip {
        spec.skip();
    } else if entry.only {
        spec.only();
    }
    Ok(())
}

fn declare_hooks(suite: &Arc<Suite>, kind: HookKind, entries: &[HookEntry]) -> CallResult {
    for entry in entries {
        let steps = Arc::new(entry.steps.clone());
        let flag = if entry.skip { Flag::Skip } else { Flag::None };
        let hook = suite.add_hook(kind, flag, Body::new(move |cx| perform_all(steps.clone(), cx)))?;
        if let Some(timeout) = entry.timeout {
            hook.set_timeout(timeout);
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::{EventKind, Node};
    use config::FileFormat;
    use std::sync::Mutex;

    const MANIFEST: &str = r#"
name: shop
timeout: 1s
before_all:
  - steps:
      - log: opening shop
before_each:
  - steps:
      - sleep: 1ms
children:
  - spec:
      name: lists products
      steps:
        - equal: [3, 3]
  - spec:
      name: applies discount
      steps:
        - equal: [10, 9]
  - suite:
      name: checkout
      after_each:
        - steps:
            - fail: cleanup failed
      children:
        - spec:
            name: pays
            timeout: 20ms
            steps:
              - sleep: 5s
        - spec:
            name: refunds
            steps:
              - skip: not implemented
  - spec:
      name: archived
      skip: true
"#;

    fn app() -> App {
        App::new(Manifest::from_content(MANIFEST, FileFormat::Yaml).unwrap())
    }

    #[test]
    fn test_missing_manifest_is_reported() {
        let error = App::load(PathBuf::from("missing/manifest.yaml")).err();

        assert!(matches!(error, Some(Error::Manifest(_))));
    }

    #[tokio::test]
    async fn test_manifest_builds_suite_tree() {
        let root = app().suite();
        root.setup().unwrap();

        let names: Vec<String> = root.children().iter().map(|c| c.name().to_owned()).collect();
        assert_eq!(names, vec!["lists products", "applies discount", "checkout", "archived"]);
        assert_eq!(root.timeout(), std::time::Duration::from_secs(1));
        assert_eq!(root.hooks(HookKind::BeforeAll).len(), 1);
        assert_eq!(root.children()[3].flag(), Flag::Skip);
    }

    #[tokio::test]
    async fn test_run_manifest() {
        let Run { events, result, .. } = run_suite(app().suite());
        let failed = Arc::new(Mutex::new(Vec::new()));
        let sink = failed.clone();
        events.subscribe(EventKind::SpecFail, move |event| {
            if let Node::Spec(spec) = event.node() {
                sink.lock().unwrap().push(spec.name().to_owned());
            }
        });

        let result = result.await.unwrap();

        assert_eq!((result.passed, result.failed, result.skipped), (1, 2, 2));
        assert_eq!(*failed.lock().unwrap(), vec!["applies discount", "pays"]);
        let messages: Vec<String> = result
            .failures
            .iter()
            .map(|failure| failure.error.to_string())
            .collect();
        assert_eq!(
            messages,
            vec![
                "Expected 10 but got 9",
                "Timeout of 20 ms reached",
                "cleanup failed",
                "cleanup failed",
            ]
        );
        assert!(!result.focused);
    }
}
