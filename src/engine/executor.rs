use crate::engine::error::{from_panic, BodyError, Error};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

pub type CallResult = Result<(), BodyError>;

/// Hook or spec body: called once per execution with a fresh [`CallContext`].
#[derive(Clone)]
pub struct Body(Arc<dyn Fn(CallContext) -> BoxFuture<'static, CallResult> + Send + Sync>);

impl Body {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: Fn(CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallResult> + Send + 'static,
    {
        Body(Arc::new(move |cx| body(cx).boxed()))
    }

    fn call(&self, cx: CallContext) -> BoxFuture<'static, CallResult> {
        (self.0)(cx)
    }
}

/// Handle given to a running body.
///
/// The cancellation token fires once the executor stopped waiting for the body,
/// either because it settled or because its timeout elapsed. Honoring it is up
/// to the body.
#[derive(Debug, Clone)]
pub struct CallContext {
    token: CancellationToken,
    skip: Arc<AtomicBool>,
}

impl CallContext {
    fn new(token: CancellationToken) -> Self {
        Self {
            token,
            skip: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests the call to be reported as skipped. Control flow is not
    /// interrupted and an error returned afterwards still fails the call.
    pub fn skip(&self) {
        self.skip.store(true, Ordering::SeqCst);
    }

    pub fn skip_requested(&self) -> bool {
        self.skip.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

#[derive(Debug)]
pub enum Outcome {
    Passed,
    Skipped,
    Failed(Error),
}

/// A body that outlived its timeout and is still running.
#[derive(Debug)]
pub struct LateFailure(JoinHandle<CallResult>);

impl LateFailure {
    /// Waits for the body to settle, yielding the error it ended with, if any.
    pub async fn wait(self) -> Option<Error> {
        match self.0.await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(Error::from(err)),
            Err(err) => Some(join_failure(err)),
        }
    }
}

#[derive(Debug)]
pub struct Settlement {
    pub outcome: Outcome,
    pub late: Option<LateFailure>,
}

/// Races `body` against a timer of exactly `timeout`. A zero `timeout` disables
/// the timer and waits for the body to settle.
///
/// The body runs as its own task, so a body ignoring cancellation keeps running
/// after a timeout, and its eventual error is available through
/// [`Settlement::late`] instead of changing the primary outcome.
pub async fn execute(body: &Body, timeout: Duration) -> Settlement {
    let token = CancellationToken::new();
    let cx = CallContext::new(token.clone());
    let skip = cx.skip.clone();
    let mut handle = tokio::spawn(body.call(cx));

    if timeout.is_zero() {
        let joined = handle.await;
        token.cancel();
        return settled(joined, &skip);
    }

    tokio::select! {
        biased;
        joined = &mut handle => {
            token.cancel();
            settled(joined, &skip)
        }
        _ = tokio::time::sleep(timeout) => {
            token.cancel();
            let millis = timeout.as_millis() as u64;
            trace!("Call timed out after {} ms", millis);
            Settlement {
                outcome: Outcome::Failed(Error::Timeout(millis)),
                late: Some(LateFailure(handle)),
            }
        }
    }
}

fn settled(joined: Result<CallResult, JoinError>, skip: &AtomicBool) -> Settlement {
    let outcome = match joined {
        Ok(Ok(())) if skip.load(Ordering::SeqCst) => Outcome::Skipped,
        Ok(Ok(())) => Outcome::Passed,
        Ok(Err(err)) => Outcome::Failed(Error::from(err)),
        Err(err) => Outcome::Failed(join_failure(err)),
    };
    Settlement { outcome, late: None }
}

fn join_failure(err: JoinError) -> Error {
    if err.is_panic() {
        from_panic(err.into_panic())
    } else {
        Error::Thrown(err.to_string())
    }
}
