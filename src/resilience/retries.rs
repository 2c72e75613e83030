//! Recoverable call executor.
//!
//! # Responsibilities
//! - Run one remote operation against a stub
//! - Classify failures and renew the session on expiry
//! - Back off between transient failures, up to a retry budget
//!
//! # States
//! ```text
//! RUNNING → SUCCESS                       operation returned a value
//! RUNNING → FAILED                        budget spent, or failure not retryable
//! RUNNING → RENEWING → RUNNING            session expired
//! RUNNING → RETRY_WAIT → RUNNING          transient failure
//! ```

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::broadcast;

use crate::config::RecoveryConfig;
use crate::net::RemoteFault;
use crate::observability::metrics;
use crate::resilience::backoff::{calculate_backoff, DEFAULT_BASE_DELAY};
use crate::resilience::classifier::FailureClassifier;
use crate::resilience::registry::ClassifierRegistry;
use crate::resilience::types::{RecoveryError, RecoveryResult};
use crate::stub::Stub;

/// Default retry budget per invoke.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// A single described remote operation with retry and session renewal.
///
/// ```rust,ignore
/// use futures_util::FutureExt;
///
/// let mut call = RecoverableCall::new("Query", move |stub: &ServiceStub| {
///     let soql = soql.clone();
///     async move { stub.connection()?.call("query", (soql,)).await }.boxed()
/// });
/// let result = call.invoke(&mut stub).await?;
/// ```
pub struct RecoverableCall<R, S, F> {
    name: String,
    max_retries: u32,
    base_delay: Duration,
    /// Retries made by the current (or last) invoke.
    retries: u32,
    registry: Arc<ClassifierRegistry>,
    shutdown: Option<broadcast::Receiver<()>>,
    operation: F,
    _marker: PhantomData<fn(&S) -> R>,
}

impl<R, S, F> RecoverableCall<R, S, F> {
    /// Describe an operation. `name` is used in logs, metrics and errors.
    pub fn new(name: impl Into<String>, operation: F) -> Self
    where
        F: for<'a> FnMut(&'a S) -> BoxFuture<'a, Result<R, RemoteFault>>,
    {
        Self {
            name: name.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            retries: 0,
            registry: Arc::new(ClassifierRegistry::builtin()),
            shutdown: None,
            operation,
            _marker: PhantomData,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Apply retry budget and backoff unit from configuration.
    pub fn with_policy(self, policy: &RecoveryConfig) -> Self {
        self.with_max_retries(policy.max_retries)
            .with_base_delay(Duration::from_millis(policy.base_delay_ms))
    }

    pub fn with_registry(mut self, registry: Arc<ClassifierRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Abort backoff waits when a shutdown signal arrives.
    pub fn with_shutdown(mut self, shutdown: broadcast::Receiver<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Retries performed by the most recent invoke.
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

impl<R, S, F> RecoverableCall<R, S, F>
where
    S: Stub,
    F: for<'a> FnMut(&'a S) -> BoxFuture<'a, Result<R, RemoteFault>>,
{
    /// Run the operation until it succeeds, the budget is spent, or a
    /// failure is not retryable.
    ///
    /// May force a fresh login through `stub.prepare(true)`. Attempts are
    /// strictly sequential.
    pub async fn invoke(&mut self, stub: &mut S) -> RecoveryResult<R> {
        self.retries = 0;
        let result = self.run(stub).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.outcome(),
        };
        metrics::record_call(&self.name, outcome);
        result
    }

    async fn run(&mut self, stub: &mut S) -> RecoveryResult<R> {
        // Resolved lazily on first failure, then reused for this invoke.
        let mut cached: Option<Arc<dyn FailureClassifier>> = None;

        loop {
            let fault = match (self.operation)(&*stub).await {
                Ok(value) => return Ok(value),
                Err(fault) => fault,
            };

            let classifier = match cached.clone() {
                Some(classifier) => classifier,
                None => {
                    let resolved = self.resolve_classifier(&*stub)?;
                    cached = Some(resolved.clone());
                    resolved
                }
            };

            if self.retries >= self.max_retries {
                return Err(RecoveryError::Exhausted {
                    operation: self.name.clone(),
                    attempts: self.retries,
                    source: fault,
                });
            }

            if !classifier.is_retryable(&fault) {
                return Err(RecoveryError::NonRetryable {
                    operation: self.name.clone(),
                    source: fault,
                });
            }

            self.retries += 1;
            let expired = classifier.is_expired(&fault);
            tracing::warn!(
                operation = %self.name,
                attempt = self.retries,
                max_retries = self.max_retries,
                expired,
                error = %fault,
                "Retrying remote operation"
            );

            if expired {
                metrics::record_retry(&self.name, "expired");
                self.renew_session(stub).await?;
            } else {
                metrics::record_retry(&self.name, "transient");
                self.wait_before_next_retry().await?;
            }
        }
    }

    fn resolve_classifier(&self, stub: &S) -> RecoveryResult<Arc<dyn FailureClassifier>> {
        let session_type = stub.session().session_type();
        let classifier = self
            .registry
            .resolve(session_type)
            .map_err(|source| RecoveryError::Classifier {
                operation: self.name.clone(),
                source,
            })?;
        tracing::debug!(
            operation = %self.name,
            session_type = %session_type,
            classifier = classifier.name(),
            "Resolved failure classifier"
        );
        Ok(classifier)
    }

    async fn renew_session(&self, stub: &mut S) -> RecoveryResult<()> {
        tracing::warn!(operation = %self.name, "Session expired, forcing a fresh login");
        metrics::record_session_renewal(&self.name);
        stub.prepare(true).await.map_err(|source| RecoveryError::Session {
            operation: self.name.clone(),
            source,
        })
    }

    async fn wait_before_next_retry(&mut self) -> RecoveryResult<()> {
        let delay = calculate_backoff(self.retries, self.base_delay);
        tracing::debug!(operation = %self.name, attempt = self.retries, delay = ?delay, "Backing off");

        let Some(shutdown) = self.shutdown.as_mut() else {
            tokio::time::sleep(delay).await;
            return Ok(());
        };

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        tokio::select! {
            _ = &mut sleep => Ok(()),
            signal = shutdown.recv() => match signal {
                // Every sender is gone; nobody can cancel us any more.
                Err(broadcast::error::RecvError::Closed) => {
                    (&mut sleep).await;
                    Ok(())
                }
                _ => {
                    tracing::info!(operation = %self.name, attempt = self.retries, "Shutdown signalled during backoff");
                    Err(RecoveryError::Cancelled {
                        operation: self.name.clone(),
                        attempts: self.retries,
                    })
                }
            },
        }
    }
}

impl<R, S, F> std::fmt::Debug for RecoverableCall<R, S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoverableCall")
            .field("name", &self.name)
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("retries", &self.retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use futures_util::FutureExt;
    use tokio::time::Instant;

    use crate::lifecycle::Shutdown;
    use crate::session::{Session, SessionType};
    use crate::stub::login::LoginError;
    use crate::stub::StubError;

    struct MockStub {
        session: Session,
        /// Bumped by every forced prepare.
        generation: u32,
        forced_prepares: u32,
        fail_prepare: bool,
        /// Each classifier lookup reads the session type once.
        session_reads: AtomicU32,
    }

    impl MockStub {
        fn new(session_type: SessionType) -> Self {
            Self {
                session: Session::new(session_type),
                generation: 0,
                forced_prepares: 0,
                fail_prepare: false,
                session_reads: AtomicU32::new(0),
            }
        }
    }

    impl Stub for MockStub {
        fn session(&self) -> &Session {
            self.session_reads.fetch_add(1, Ordering::SeqCst);
            &self.session
        }

        async fn prepare(&mut self, force_new: bool) -> Result<(), StubError> {
            if force_new {
                self.forced_prepares += 1;
            }
            if self.fail_prepare {
                return Err(StubError::Login(LoginError::Rejected {
                    status: 401,
                    message: "bad password".into(),
                }));
            }
            self.generation += 1;
            Ok(())
        }
    }

    type Script = Arc<Mutex<VecDeque<Result<u32, RemoteFault>>>>;

    fn script(results: Vec<Result<u32, RemoteFault>>) -> Script {
        Arc::new(Mutex::new(results.into()))
    }

    fn busy(n: u32) -> RemoteFault {
        RemoteFault::fault("SERVER_UNAVAILABLE", format!("busy {n}"))
    }

    fn expired() -> RemoteFault {
        RemoteFault::fault("INVALID_SESSION_ID", "Session expired or invalid")
    }

    fn scripted_call(
        name: &str,
        results: Script,
        calls: Arc<AtomicU32>,
    ) -> RecoverableCall<u32, MockStub, impl for<'a> FnMut(&'a MockStub) -> BoxFuture<'a, Result<u32, RemoteFault>>> {
        RecoverableCall::new(name, move |_stub: &MockStub| {
            calls.fetch_add(1, Ordering::SeqCst);
            let next = results.lock().unwrap().pop_front().unwrap_or(Ok(0));
            async move { next }.boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut call = scripted_call("Query", script(vec![Ok(7)]), calls.clone());
        let mut stub = MockStub::new(SessionType::Enterprise);

        assert_eq!(call.invoke(&mut stub).await.unwrap(), 7);
        assert_eq!(call.retries(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(stub.forced_prepares, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut call = scripted_call("Query", script(vec![Err(busy(1)), Err(busy(2)), Ok(42)]), calls.clone());
        let mut stub = MockStub::new(SessionType::Enterprise);

        let start = Instant::now();
        assert_eq!(call.invoke(&mut stub).await.unwrap(), 42);
        let elapsed = start.elapsed();

        assert_eq!(call.retries(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(stub.forced_prepares, 0);
        // 2 * 3000ms + 3 * 3000ms
        assert!(elapsed >= Duration::from_millis(15_000), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(15_100), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_retry_budget_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut results: Vec<_> = (1..=DEFAULT_MAX_RETRIES).map(|n| Err(busy(n))).collect();
        results.push(Ok(6));
        let mut call = scripted_call("Query", script(results), calls.clone())
            .with_base_delay(Duration::from_millis(10));
        let mut stub = MockStub::new(SessionType::Enterprise);

        assert_eq!(call.invoke(&mut stub).await.unwrap(), 6);
        assert_eq!(call.retries(), DEFAULT_MAX_RETRIES);
        assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_MAX_RETRIES + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_resolved_once_per_invoke() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut call = scripted_call(
            "Query",
            script(vec![Err(busy(1)), Err(expired()), Err(busy(2)), Ok(3)]),
            calls.clone(),
        )
        .with_base_delay(Duration::from_millis(10));
        let mut stub = MockStub::new(SessionType::Enterprise);

        assert_eq!(call.invoke(&mut stub).await.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(stub.session_reads.load(Ordering::SeqCst), 1);

        // a fresh invoke looks the classifier up again on its first failure
        let calls = Arc::new(AtomicU32::new(0));
        let mut call = scripted_call("Query", script(vec![Err(busy(3)), Ok(4)]), calls)
            .with_base_delay(Duration::from_millis(10));
        assert_eq!(call.invoke(&mut stub).await.unwrap(), 4);
        assert_eq!(stub.session_reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_skips_classifier_lookup() {
        let calls = Arc::new(AtomicU32::new(0));
        // an empty registry fails any lookup
        let mut call = scripted_call("Query", script(vec![Ok(1)]), calls)
            .with_registry(Arc::new(ClassifierRegistry::empty()));
        let mut stub = MockStub::new(SessionType::Rest);

        assert_eq!(call.invoke(&mut stub).await.unwrap(), 1);
        assert_eq!(stub.session_reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let failures = (1..=6).map(|n| Err(busy(n))).collect();
        let mut call = scripted_call("QueryMore", script(failures), calls.clone())
            .with_base_delay(Duration::from_millis(10));
        let mut stub = MockStub::new(SessionType::Partner);

        let err = call.invoke(&mut stub).await.unwrap_err();

        assert!(err.is_exhausted());
        assert_eq!(err.operation(), "QueryMore");
        assert_eq!(err.fault(), Some(&busy(6)));
        assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_MAX_RETRIES + 1);
        assert_eq!(call.retries(), DEFAULT_MAX_RETRIES);
        assert!(matches!(err, RecoveryError::Exhausted { attempts: 5, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_retry_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let failures = (1..=10).map(|n| Err(busy(n))).collect();
        let mut call = scripted_call("create", script(failures), calls.clone())
            .with_max_retries(2)
            .with_base_delay(Duration::from_millis(1));
        let mut stub = MockStub::new(SessionType::Enterprise);

        let err = call.invoke(&mut stub).await.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let fault = RemoteFault::Decode("unexpected shape".into());
        let mut call = scripted_call("Delete", script(vec![Err(fault.clone()), Ok(1)]), calls.clone());
        let mut stub = MockStub::new(SessionType::Enterprise);

        let start = Instant::now();
        let err = call.invoke(&mut stub).await.unwrap_err();

        assert!(err.is_non_retryable());
        assert_eq!(err.operation(), "Delete");
        assert_eq!(err.fault(), Some(&fault));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(call.retries(), 0);
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_renews_session_without_waiting() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut call = RecoverableCall::new("Query", move |stub: &MockStub| {
            counter.fetch_add(1, Ordering::SeqCst);
            let generation = stub.generation;
            async move {
                if generation < 2 {
                    Err(expired())
                } else {
                    Ok(generation)
                }
            }
            .boxed()
        });
        let mut stub = MockStub::new(SessionType::Enterprise);

        let start = Instant::now();
        let result = call.invoke(&mut stub).await.unwrap();

        assert_eq!(result, 2);
        assert_eq!(stub.forced_prepares, 2);
        assert_eq!(call.retries(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_renewal_failure_propagates() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut call = scripted_call("Query", script(vec![Err(expired()), Ok(1)]), calls.clone());
        let mut stub = MockStub::new(SessionType::Enterprise);
        stub.fail_prepare = true;

        let err = call.invoke(&mut stub).await.unwrap_err();

        assert!(matches!(err, RecoveryError::Session { .. }));
        assert_eq!(stub.forced_prepares, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregistered_session_type() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut call = scripted_call("Query", script(vec![Err(busy(1))]), calls.clone())
            .with_registry(Arc::new(ClassifierRegistry::empty()));
        let mut stub = MockStub::new(SessionType::Rest);

        let err = call.invoke(&mut stub).await.unwrap_err();
        assert!(matches!(err, RecoveryError::Classifier { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_follows_session_type() {
        // 401 is an expiry for REST sessions, but unknown to fault-code backends.
        let calls = Arc::new(AtomicU32::new(0));
        let mut rest_call = scripted_call(
            "Query",
            script(vec![Err(RemoteFault::http(401, "expired")), Ok(1)]),
            calls.clone(),
        );
        let mut rest_stub = MockStub::new(SessionType::Rest);
        assert_eq!(rest_call.invoke(&mut rest_stub).await.unwrap(), 1);
        assert_eq!(rest_stub.forced_prepares, 1);

        let mut soap_call = scripted_call(
            "Query",
            script(vec![Err(RemoteFault::http(401, "expired")), Ok(1)]),
            calls.clone(),
        );
        let mut soap_stub = MockStub::new(SessionType::Enterprise);
        assert!(soap_call.invoke(&mut soap_stub).await.unwrap_err().is_non_retryable());
        assert_eq!(soap_stub.forced_prepares, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_resets_retry_counter() {
        let calls = Arc::new(AtomicU32::new(0));
        let results = script(vec![Err(busy(1)), Err(busy(2)), Ok(1), Ok(2)]);
        let mut call = scripted_call("Query", results, calls.clone()).with_base_delay(Duration::from_millis(5));
        let mut stub = MockStub::new(SessionType::Enterprise);

        assert_eq!(call.invoke(&mut stub).await.unwrap(), 1);
        assert_eq!(call.retries(), 2);

        assert_eq!(call.invoke(&mut stub).await.unwrap(), 2);
        assert_eq!(call.retries(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_backoff() {
        let shutdown = Shutdown::new();
        let calls = Arc::new(AtomicU32::new(0));
        let mut call = scripted_call("Query", script(vec![Err(busy(1)), Ok(1)]), calls.clone())
            .with_shutdown(shutdown.subscribe());
        let mut stub = MockStub::new(SessionType::Enterprise);

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.trigger();
        });

        let start = Instant::now();
        let err = call.invoke(&mut stub).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(matches!(err, RecoveryError::Cancelled { attempts: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_shutdown_does_not_cancel() {
        let shutdown = Shutdown::new();
        let calls = Arc::new(AtomicU32::new(0));
        let mut call = scripted_call("Query", script(vec![Err(busy(1)), Ok(9)]), calls.clone())
            .with_shutdown(shutdown.subscribe());
        drop(shutdown);
        let mut stub = MockStub::new(SessionType::Enterprise);

        let start = Instant::now();
        assert_eq!(call.invoke(&mut stub).await.unwrap(), 9);
        assert!(start.elapsed() >= Duration::from_millis(6000));
    }

    #[test]
    fn test_with_policy() {
        let policy = RecoveryConfig {
            max_retries: 2,
            base_delay_ms: 250,
        };
        let call = RecoverableCall::new("update", |_stub: &MockStub| async { Ok::<u32, RemoteFault>(0) }.boxed())
            .with_policy(&policy);
        assert_eq!(call.max_retries(), 2);
        assert_eq!(call.name(), "update");
        assert!(format!("{:?}", call).contains("250ms"));
    }
}
