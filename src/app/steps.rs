use crate::app::error::Error;
use crate::configuration::manifest::Step;
use crate::engine::{CallContext, CallResult};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::time::sleep;

pub(crate) enum Flow {
    Continue,
    Stop,
}

pub(crate) trait Performable {
    fn perform<'a>(&'a self, cx: &'a CallContext) -> BoxFuture<'a, Result<Flow, Error>>;
}

impl Performable for Step {
    fn perform<'a>(&'a self, cx: &'a CallContext) -> BoxFuture<'a, Result<Flow, Error>> {
        Box::pin(async move {
            match self {
                Step::Sleep(duration) => {
                    tokio::select! {
                        _ = sleep(*duration) => {}
                        _ = cx.cancelled() => {
                            debug!("Sleep interrupted by cancellation");
                            return Ok(Flow::Stop);
                        }
                    }
                }
                Step::Log(message) => info!("{}", message),
                Step::Fail(message) => return Err(Error::Failed(message.clone())),
                Step::Skip(reason) => {
                    info!("Skipping: {}", reason);
                    cx.skip();
                    return Ok(Flow::Stop);
                }
                Step::Equal(values) => {
                    trace!("Check equality of {:?}", values);
                    if let Some(pair) = values.windows(2).find(|pair| pair[0] != pair[1]) {
                        return Err(Error::NotEqual {
                            expected: pair[0].to_string(),
                            actual: pair[1].to_string(),
                        });
                    }
                }
            }
            Ok(Flow::Continue)
        })
    }
}

/// Body of a manifest spec or hook: performs each step until one stops the call.
pub(crate) async fn perform_all(steps: Arc<Vec<Step>>, cx: CallContext) -> CallResult {
    for step in steps.iter() {
        if let Flow::Stop = step.perform(&cx).await? {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::executor::{execute, Body, Outcome};
    use serde_json::json;
    use std::time::Duration;

    fn body(steps: Vec<Step>) -> Body {
        let steps = Arc::new(steps);
        Body::new(move |cx| perform_all(steps.clone(), cx))
    }

    #[tokio::test]
    async fn test_equal_values_pass() {
        let body = body(vec![
            Step::Log("checking".to_owned()),
            Step::Equal(vec![json!("a"), json!("a"), json!("a")]),
        ]);

        let settlement = execute(&body, Duration::from_millis(100)).await;

        assert!(matches!(settlement.outcome, Outcome::Passed));
    }

    #[tokio::test]
    async fn test_unequal_values_fail() {
        let body = body(vec![Step::Equal(vec![json!(1), json!(2)])]);

        let settlement = execute(&body, Duration::from_millis(100)).await;

        match settlement.outcome {
            Outcome::Failed(err) => assert_eq!(err.to_string(), "Expected 1 but got 2"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skip_stops_remaining_steps() {
        let body = body(vec![
            Step::Skip("not today".to_owned()),
            Step::Fail("unreachable".to_owned()),
        ]);

        let settlement = execute(&body, Duration::from_millis(100)).await;

        assert!(matches!(settlement.outcome, Outcome::Skipped));
    }

    #[tokio::test]
    async fn test_sleep_honors_cancellation() {
        let body = body(vec![
            Step::Sleep(Duration::from_secs(5)),
            Step::Fail("after sleep".to_owned()),
        ]);

        let settlement = execute(&body, Duration::from_millis(5)).await;

        assert!(matches!(settlement.outcome, Outcome::Failed(crate::engine::Error::Timeout(5))));
        let late = tokio::time::timeout(Duration::from_secs(1), settlement.late.unwrap().wait())
            .await
            .unwrap();
        assert!(late.is_none());
    }
}
