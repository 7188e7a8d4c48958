//! Long-running operation handles.
//!
//! An LRO-returning RPC hands back an [`Operation`] record; the service
//! client wraps it in an [`OperationFuture`] that polls the operations
//! service until the record is `done`, then decodes the typed result.
//!
//! The handle is terminal from the first observed `done = true`. Terminal
//! handles never issue another RPC: `result()`, `poll()` and `cancel()` all
//! answer from the cached record.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prost::Name;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::call::Deadline;
use crate::errors::{ErrorKind, RpcError};
use crate::identifiers::OperationName;
use crate::longrunning::{ListOperationsRequest, ListOperationsResponse, Operation};
use crate::wkt::Empty;

/// Port onto the operations service.
#[async_trait]
pub trait OperationsClient: Send + Sync + fmt::Debug {
    async fn get_operation(&self, name: &str) -> Result<Operation, RpcError>;

    async fn cancel_operation(&self, name: &str) -> Result<(), RpcError>;

    async fn delete_operation(&self, name: &str) -> Result<(), RpcError>;

    async fn list_operations(
        &self,
        _request: ListOperationsRequest,
    ) -> Result<ListOperationsResponse, RpcError> {
        Err(RpcError::new(
            ErrorKind::Unimplemented,
            "list_operations is not supported by this client",
        ))
    }

    /// Blocks server-side until the operation is done or `timeout` elapses.
    async fn wait_operation(
        &self,
        _name: &str,
        _timeout: Option<Duration>,
    ) -> Result<Operation, RpcError> {
        Err(RpcError::new(
            ErrorKind::Unimplemented,
            "wait_operation is not supported by this client",
        ))
    }
}

/// Typed payload of an operation's `response` or `metadata`.
pub trait OperationPayload:
    prost::Message + Default + Name + DeserializeOwned + Clone + Send + Sync + 'static
{
}

impl<T> OperationPayload for T where
    T: prost::Message + Default + Name + DeserializeOwned + Clone + Send + Sync + 'static
{
}

/// Polling schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Overall cap on `result()` when the caller passes no timeout.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            multiplier: 1.5,
            max_delay: Duration::from_secs(20),
            timeout: Some(Duration::from_secs(900)),
        }
    }
}

impl PollPolicy {
    fn next_delay(&self, current: Duration) -> Duration {
        current
            .mul_f64(self.multiplier.max(1.0))
            .min(self.max_delay)
    }
}

type DoneCallback<R, M> = Box<dyn FnOnce(&OperationFuture<R, M>) + Send>;

/// Client-side handle over a server-side operation.
///
/// `R` is the result type carried in `response`; `M` the metadata type.
pub struct OperationFuture<R, M = Empty> {
    client: Arc<dyn OperationsClient>,
    name: OperationName,
    latest: Operation,
    outcome: Option<Result<R, RpcError>>,
    metadata: Option<M>,
    policy: PollPolicy,
    callbacks: Vec<DoneCallback<R, M>>,
    cancel_sent: bool,
}

impl<R: OperationPayload, M: OperationPayload> OperationFuture<R, M> {
    /// Wraps the record an LRO-returning RPC produced.
    pub fn new(
        client: Arc<dyn OperationsClient>,
        operation: Operation,
        policy: PollPolicy,
    ) -> Result<Self, RpcError> {
        let name = OperationName::new(operation.name.clone()).ok_or_else(|| {
            RpcError::new(ErrorKind::Internal, "the server returned an operation without a name")
        })?;
        let mut future = Self {
            client,
            name,
            latest: Operation::default(),
            outcome: None,
            metadata: None,
            policy,
            callbacks: Vec::new(),
            cancel_sent: false,
        };
        future.update(operation);
        Ok(future)
    }

    pub fn operation_name(&self) -> &OperationName {
        &self.name
    }

    /// Whether the cached record is terminal. Never issues an RPC.
    pub fn done(&self) -> bool {
        self.outcome.is_some()
    }

    /// The last polled record.
    pub fn latest(&self) -> &Operation {
        &self.latest
    }

    /// Decoded metadata of the last polled record, when it carried any.
    pub fn metadata(&self) -> Option<&M> {
        self.metadata.as_ref()
    }

    /// Cached outcome; `None` until terminal.
    pub fn outcome(&self) -> Option<&Result<R, RpcError>> {
        self.outcome.as_ref()
    }

    /// Registers a one-shot callback run once the handle is terminal.
    ///
    /// Runs immediately when the handle already is.
    pub fn add_done_callback(&mut self, callback: impl FnOnce(&Self) + Send + 'static) {
        if self.done() {
            callback(self);
        } else {
            self.callbacks.push(Box::new(callback));
        }
    }

    /// Refreshes the record once, unless it is already terminal.
    pub async fn poll(&mut self) -> Result<&Operation, RpcError> {
        self.refresh().await?;
        Ok(&self.latest)
    }

    async fn refresh(&mut self) -> Result<(), RpcError> {
        if !self.done() {
            let operation = self.client.get_operation(self.name.as_str()).await?;
            self.update(operation);
        }
        Ok(())
    }

    /// Polls until terminal, then returns the decoded result or the
    /// operation's error.
    ///
    /// `timeout` overrides the policy's overall timeout. The last sleep is
    /// shortened to end at the deadline, and the record is polled there once
    /// more before giving up. Running out of time yields `DeadlineExceeded`
    /// and leaves the handle pollable.
    pub async fn result(&mut self, timeout: Option<Duration>) -> Result<R, RpcError> {
        let deadline = timeout.or(self.policy.timeout).map(Deadline::after);
        let mut delay = self.policy.initial_delay;
        let mut polls = 0u32;

        loop {
            if let Some(outcome) = &self.outcome {
                return outcome.clone();
            }

            let wait = deadline.map_or(delay, |d| delay.min(d.remaining()));
            tokio::time::sleep(wait).await;
            polls += 1;
            debug!(
                operation = %self.name,
                polls,
                delay_ms = wait.as_millis() as u64,
                "polling operation"
            );
            self.refresh().await?;

            if self.outcome.is_none() && deadline.is_some_and(Deadline::is_expired) {
                return Err(RpcError::deadline_exceeded(format!(
                    "operation {} did not complete in time",
                    self.name
                ))
                .with_attempts(polls));
            }
            delay = self.policy.next_delay(delay);
        }
    }

    /// Asks the server to cancel the operation.
    ///
    /// Sends nothing once the handle is terminal or after one successful
    /// request. Does not make the handle terminal; poll to observe the effect.
    pub async fn cancel(&mut self) -> Result<(), RpcError> {
        if self.done() || self.cancel_sent {
            debug!(operation = %self.name, "cancel skipped");
            return Ok(());
        }
        self.client.cancel_operation(self.name.as_str()).await?;
        self.cancel_sent = true;
        Ok(())
    }

    fn update(&mut self, operation: Operation) {
        if let Some(metadata) = &operation.metadata {
            match metadata.unpack::<M>() {
                Ok(decoded) => self.metadata = Some(decoded),
                Err(err) => {
                    warn!(operation = %self.name, error = %err, "undecodable operation metadata")
                }
            }
        }

        let done = operation.done;
        self.latest = operation;
        if done && self.outcome.is_none() {
            self.outcome = Some(self.extract());
            debug!(
                operation = %self.name,
                ok = self.outcome.as_ref().is_some_and(Result::is_ok),
                "operation finished"
            );
            for callback in std::mem::take(&mut self.callbacks) {
                callback(self);
            }
        }
    }

    fn extract(&self) -> Result<R, RpcError> {
        if let Some(status) = &self.latest.error {
            return Err(status.to_error());
        }
        match &self.latest.response {
            Some(response) => response.unpack::<R>(),
            None if R::full_name() == Empty::full_name() => Ok(R::default()),
            None => Err(RpcError::new(
                ErrorKind::Unknown,
                format!("operation {} finished with neither a response nor an error", self.name),
            )),
        }
    }
}

impl<R, M> fmt::Debug for OperationFuture<R, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationFuture")
            .field("name", &self.name)
            .field("done", &self.outcome.is_some())
            .field("callbacks", &self.callbacks.len())
            .field("cancel_sent", &self.cancel_sent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wkt::{Any, Status};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, Default)]
    struct FakeOperations {
        polls: Mutex<VecDeque<Result<Operation, RpcError>>>,
        get_calls: AtomicUsize,
        cancel_calls: AtomicUsize,
    }

    #[async_trait]
    impl OperationsClient for FakeOperations {
        async fn get_operation(&self, _name: &str) -> Result<Operation, RpcError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RpcError::new(ErrorKind::Internal, "no more polls")))
        }

        async fn cancel_operation(&self, _name: &str) -> Result<(), RpcError> {
            self.cancel_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete_operation(&self, _name: &str) -> Result<(), RpcError> {
            Ok(())
        }
    }

    fn pending() -> Operation {
        Operation {
            name: "operations/42".into(),
            ..Operation::default()
        }
    }

    fn finished(message: &str) -> Operation {
        Operation {
            name: "operations/42".into(),
            done: true,
            response: Some(Any::pack(&Status {
                code: 0,
                message: message.into(),
                details: vec![],
            })),
            ..Operation::default()
        }
    }

    fn fake(polls: Vec<Result<Operation, RpcError>>) -> Arc<FakeOperations> {
        Arc::new(FakeOperations {
            polls: Mutex::new(polls.into()),
            ..FakeOperations::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_done_and_fires_callback_once() {
        let ops = fake(vec![Ok(pending()), Ok(pending()), Ok(finished("d"))]);
        let mut future: OperationFuture<Status> =
            OperationFuture::new(ops.clone(), pending(), PollPolicy::default()).unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        future.add_done_callback(move |f| {
            assert!(f.done());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let result = future.result(None).await.unwrap();
        assert_eq!(result.message, "d");
        assert_eq!(ops.get_calls.load(Ordering::SeqCst), 3);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Terminal: no further polls.
        future.result(None).await.unwrap();
        future.poll().await.unwrap();
        assert_eq!(ops.get_calls.load(Ordering::SeqCst), 3);

        // Late callbacks run immediately.
        let counter = fired.clone();
        future.add_done_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_error_is_surfaced() {
        let failed = Operation {
            done: true,
            error: Some(Status {
                code: 9,
                message: "dataset is in use".into(),
                details: vec![],
            }),
            ..pending()
        };
        let ops = fake(vec![Ok(failed)]);
        let mut future: OperationFuture<Status> =
            OperationFuture::new(ops, pending(), PollPolicy::default()).unwrap();
        let err = future.result(None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::FailedPrecondition);
        assert_eq!(err.message, "dataset is in use");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_does_not_transition() {
        let ops = fake(vec![Ok(pending()), Ok(pending()), Ok(pending())]);
        let mut future: OperationFuture<Status> =
            OperationFuture::new(ops, pending(), PollPolicy::default()).unwrap();

        let err = future
            .result(Some(Duration::from_secs(3)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DeadlineExceeded);
        assert!(!future.done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_timeout_still_polls_at_deadline() {
        let ops = fake(vec![Ok(finished("early"))]);
        let mut future: OperationFuture<Status> =
            OperationFuture::new(ops.clone(), pending(), PollPolicy::default()).unwrap();

        let start = Instant::now();
        let result = future.result(Some(Duration::from_millis(500))).await.unwrap();
        assert_eq!(result.message, "early");
        assert_eq!(ops.get_calls.load(Ordering::SeqCst), 1);
        assert_eq!(Instant::now() - start, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_poll_lands_on_deadline() {
        let ops = fake(vec![Ok(pending()), Ok(pending()), Ok(pending())]);
        let mut future: OperationFuture<Status> =
            OperationFuture::new(ops.clone(), pending(), PollPolicy::default()).unwrap();

        let start = Instant::now();
        let err = future
            .result(Some(Duration::from_secs(3)))
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 3);
        // 1s + 1.5s, then 0.5s up to the deadline.
        assert_eq!(Instant::now() - start, Duration::from_secs(3));
        assert_eq!(ops.get_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_does_not_overflow() {
        let ops = fake(vec![Ok(finished("x"))]);
        let mut future: OperationFuture<Status> =
            OperationFuture::new(ops, pending(), PollPolicy::default()).unwrap();
        assert_eq!(future.result(Some(Duration::MAX)).await.unwrap().message, "x");
    }

    #[test]
    fn test_shrinking_multiplier_is_clamped() {
        for multiplier in [0.5, -2.0, f64::NAN] {
            let policy = PollPolicy {
                multiplier,
                ..PollPolicy::default()
            };
            assert_eq!(
                policy.next_delay(Duration::from_secs(2)),
                Duration::from_secs(2)
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule() {
        let ops = fake(vec![Ok(pending()), Ok(pending()), Ok(finished("x"))]);
        let mut future: OperationFuture<Status> =
            OperationFuture::new(ops, pending(), PollPolicy::default()).unwrap();

        let start = Instant::now();
        future.result(None).await.unwrap();
        // 1s + 1.5s + 2.25s
        assert_eq!(Instant::now() - start, Duration::from_millis(4750));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_skipped_when_terminal() {
        let ops = fake(vec![]);
        let mut future: OperationFuture<Status> =
            OperationFuture::new(ops.clone(), pending(), PollPolicy::default()).unwrap();
        future.cancel().await.unwrap();
        future.cancel().await.unwrap();
        assert_eq!(ops.cancel_calls.load(Ordering::SeqCst), 1);
        assert!(!future.done());

        let done_ops = fake(vec![]);
        let mut done: OperationFuture<Status> =
            OperationFuture::new(done_ops.clone(), finished("x"), PollPolicy::default()).unwrap();
        done.cancel().await.unwrap();
        assert_eq!(done_ops.cancel_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_response_type_mismatch() {
        let wrong = Operation {
            response: Some(Any::pack(&Empty {})),
            ..finished("x")
        };
        let future: OperationFuture<Status> =
            OperationFuture::new(fake(vec![]), wrong, PollPolicy::default()).unwrap();
        let err = future.outcome().unwrap().clone().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }

    #[tokio::test]
    async fn test_metadata_is_decoded() {
        let op = Operation {
            metadata: Some(Any::pack(&Status {
                code: 0,
                message: "50%".into(),
                details: vec![],
            })),
            ..pending()
        };
        let future: OperationFuture<Empty, Status> =
            OperationFuture::new(fake(vec![]), op, PollPolicy::default()).unwrap();
        assert_eq!(future.metadata().map(|m| m.message.as_str()), Some("50%"));
    }
}
