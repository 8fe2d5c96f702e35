//! Call orchestrator - reserve, execute, retry and refund
//!
//! One [`CallOrchestrator::run`] drives a single metered operation through
//!
//! ```text
//! INIT -> RATE_CHECK -> RESERVING -> EXECUTING -> SUCCESS
//!                          ^            |
//!                          |            v
//!                     BACKOFF_WAIT <- REFUNDING -> RATE_OPEN | FAILED
//! ```
//!
//! Every attempt reserves its own cost and every failed attempt is refunded
//! before the next reservation, so a run that eventually succeeds is charged
//! once and a run that fails is charged nothing (unless a refund fails).

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use meterguard_common::resilience::{Clock, SystemClock};
use meterguard_domain::{
    ErrorClass, FatalKind, MeterGuardError, OperationKey, OrchestratorConfig, RetriableKind,
    UpstreamCode, UpstreamError,
};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use super::context::RunContext;
use super::outcome::{Outcome, RefundWarning, RunError, RunMetrics};
use super::ports::OutcomeSink;
use crate::classification::{DefaultClassifier, ErrorClassifier};
use crate::quota::{LedgerError, QuotaLedger, QuotaStore, Reservation};
use crate::rate_limit::RateLimitLedger;
use crate::retry::BackoffPolicy;

type Result<T> = std::result::Result<T, MeterGuardError>;

/// States of a single run, used for transition logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Init,
    RateCheck,
    Reserving,
    Executing,
    BackoffWait,
    Refunding,
    Success,
    RateOpen,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::RateCheck => "RATE_CHECK",
            Self::Reserving => "RESERVING",
            Self::Executing => "EXECUTING",
            Self::BackoffWait => "BACKOFF_WAIT",
            Self::Refunding => "REFUNDING",
            Self::Success => "SUCCESS",
            Self::RateOpen => "RATE_OPEN",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

fn transition(from: RunState, to: RunState, attempt: u32) -> RunState {
    debug!(from = %from, state = %to, attempt, "run state transition");
    to
}

/// Lifetime counters across all runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    pub runs: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Runs that ended with `rate_limited = true`
    pub rate_limited: u64,
    /// Runs refused by an active cooldown before reserving
    pub cooldown_rejections: u64,
    pub refund_failures: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    runs: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    rate_limited: AtomicU64,
    cooldown_rejections: AtomicU64,
    refund_failures: AtomicU64,
}

impl StatsCounters {
    fn record<T>(&self, outcome: &Outcome<T>) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        if outcome.is_success() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if outcome.rate_limited {
            self.rate_limited.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> OrchestratorStats {
        OrchestratorStats {
            runs: self.runs.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            cooldown_rejections: self.cooldown_rejections.load(Ordering::Relaxed),
            refund_failures: self.refund_failures.load(Ordering::Relaxed),
        }
    }
}

/// Coordinates quota, retries and cooldowns around a metered operation
pub struct CallOrchestrator<C: Clock = SystemClock> {
    config: OrchestratorConfig,
    policy: BackoffPolicy,
    classifier: Arc<dyn ErrorClassifier>,
    quota: QuotaLedger,
    rate_limits: Arc<RateLimitLedger<C>>,
    sinks: Vec<Arc<dyn OutcomeSink>>,
    stats: StatsCounters,
}

impl CallOrchestrator<SystemClock> {
    /// Create an orchestrator on the system clock
    pub fn new(config: OrchestratorConfig, store: Arc<dyn QuotaStore>) -> Result<Self> {
        Self::with_clock(config, store, SystemClock)
    }
}

impl<C: Clock> CallOrchestrator<C> {
    /// Create an orchestrator whose cooldowns run on `clock`
    pub fn with_clock(
        config: OrchestratorConfig,
        store: Arc<dyn QuotaStore>,
        clock: C,
    ) -> Result<Self> {
        Self::with_rate_limits(config, store, Arc::new(RateLimitLedger::with_clock(clock)))
    }

    /// Create an orchestrator sharing an existing rate limit ledger
    pub fn with_rate_limits(
        config: OrchestratorConfig,
        store: Arc<dyn QuotaStore>,
        rate_limits: Arc<RateLimitLedger<C>>,
    ) -> Result<Self> {
        config.validate()?;
        let policy = BackoffPolicy::from_config(&config)
            .map_err(|e| MeterGuardError::Config(e.to_string()))?;

        Ok(Self {
            config,
            policy,
            classifier: Arc::new(DefaultClassifier),
            quota: QuotaLedger::new(store),
            rate_limits,
            sinks: Vec::new(),
            stats: StatsCounters::default(),
        })
    }

    /// Replace the error classifier
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Add an outcome listener
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn quota(&self) -> &QuotaLedger {
        &self.quota
    }

    pub fn rate_limits(&self) -> &Arc<RateLimitLedger<C>> {
        &self.rate_limits
    }

    pub fn stats(&self) -> OrchestratorStats {
        self.stats.snapshot()
    }

    /// Run `operation` under quota, retry and cooldown control
    ///
    /// `operation` is called once per attempt. The returned outcome is also
    /// delivered to every registered sink.
    pub async fn run<T, F, Fut>(
        &self,
        ctx: &RunContext,
        operation: F,
        cost: u32,
        key: &OperationKey,
    ) -> Outcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, UpstreamError>>,
    {
        let span = info_span!("orchestrator.run", key = %key, user = %ctx.user_id(), cost);
        async move {
            let outcome = self.execute(ctx, operation, cost, key).await;
            self.stats.record(&outcome);

            if !self.sinks.is_empty() {
                let event = outcome.event(key, ctx.user_id(), self.rate_limits.now());
                futures::future::join_all(self.sinks.iter().map(|sink| sink.on_outcome(&event)))
                    .await;
            }

            info!(
                succeeded = outcome.is_success(),
                rate_limited = outcome.rate_limited,
                attempts = outcome.metrics.attempts,
                "run finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    async fn execute<T, F, Fut>(
        &self,
        ctx: &RunContext,
        mut operation: F,
        cost: u32,
        key: &OperationKey,
    ) -> Outcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, UpstreamError>>,
    {
        let mut metrics = RunMetrics::default();
        let mut warnings = Vec::new();
        let mut attempt: u32 = 1;
        let mut state = RunState::Init;

        if ctx.is_cancelled() {
            return Outcome::failed(RunError::Cancelled, metrics, warnings);
        }

        state = transition(state, RunState::RateCheck, attempt);
        if let Some(until) = self.rate_limits.cooldown_until(key) {
            self.stats.cooldown_rejections.fetch_add(1, Ordering::Relaxed);
            info!(retry_after = %until, "cooldown active, refusing run");
            let error = RunError::RateLimited { retry_after: until };
            return Outcome::limited(error, until, metrics, warnings);
        }

        loop {
            state = transition(state, RunState::Reserving, attempt);
            let reservation = match self.quota.reserve(ctx.user_id(), cost).await {
                Ok(reservation) => reservation,
                Err(LedgerError::QuotaExceeded { used, limit }) => {
                    transition(state, RunState::Failed, attempt);
                    info!(used, limit, "quota exhausted");
                    let error = RunError::QuotaExceeded { used, limit };
                    return Outcome::failed(error, metrics, warnings);
                }
                Err(err) => {
                    transition(state, RunState::Failed, attempt);
                    warn!(error = %err, "reservation outcome unknown, not executing");
                    let error = RunError::StoreUnavailable { message: err.to_string() };
                    return Outcome::failed(error, metrics, warnings);
                }
            };
            if !reservation.is_noop() {
                metrics.reservations += 1;
            }

            state = transition(state, RunState::Executing, attempt);
            metrics.attempts = attempt;
            let result = tokio::select! {
                biased;
                () = ctx.cancelled() => None,
                result = operation() => Some(result),
            };

            let preempted = result.is_none();
            let (class, code) = match result {
                Some(Ok(data)) => {
                    transition(state, RunState::Success, attempt);
                    self.rate_limits.clear(key);
                    return Outcome::succeeded(data, metrics, warnings);
                }
                Some(Err(err)) => {
                    let class = self.classifier.classify(&err);
                    warn!(
                        attempt,
                        code = %err.code,
                        http_status = ?err.http_status,
                        class = %class,
                        "upstream call failed"
                    );
                    (class, err.code)
                }
                None => {
                    info!(attempt, "run cancelled during upstream call");
                    (ErrorClass::Unknown, UpstreamCode::Cancelled)
                }
            };

            state = transition(state, RunState::Refunding, attempt);
            self.refund(&reservation, attempt, &mut metrics, &mut warnings).await;

            // A cancel that lands after the upstream answered keeps that answer;
            // a pending backoff still observes it below.
            if preempted {
                transition(state, RunState::Failed, attempt);
                return Outcome::failed(RunError::Cancelled, metrics, warnings);
            }

            let kind = match class {
                ErrorClass::Fatal(kind) => {
                    transition(state, RunState::Failed, attempt);
                    let error = match kind {
                        FatalKind::AuthInvalid => RunError::AuthInvalid,
                        FatalKind::BadInput => RunError::BadInput,
                    };
                    return Outcome::failed(error, metrics, warnings);
                }
                ErrorClass::Unknown => {
                    transition(state, RunState::Failed, attempt);
                    return Outcome::failed(RunError::Internal { code }, metrics, warnings);
                }
                ErrorClass::Retriable(kind) => kind,
            };

            if self.policy.should_retry(class, attempt) {
                state = transition(state, RunState::BackoffWait, attempt);
                let delay = self.policy.next_delay(attempt);
                info!(
                    attempt,
                    class = %class,
                    delay_ms = delay.as_millis() as u64,
                    "backing off before retry"
                );

                tokio::select! {
                    biased;
                    () = ctx.cancelled() => {
                        transition(state, RunState::Failed, attempt);
                        info!(attempt, "run cancelled during backoff");
                        return Outcome::failed(RunError::Cancelled, metrics, warnings);
                    }
                    () = tokio::time::sleep(delay) => {}
                }

                metrics.total_backoff = metrics.total_backoff.saturating_add(delay);
                attempt += 1;
                continue;
            }

            transition(state, RunState::RateOpen, attempt);
            let until = self.rate_limits.open_for(key, self.config.rate_limit_cooldown);
            warn!(
                attempt,
                class = %class,
                retry_after = %until,
                "retries exhausted, cooldown opened"
            );
            let error = match kind {
                RetriableKind::Overloaded => RunError::Overloaded { attempts: attempt },
                RetriableKind::RateLimited => RunError::RateLimited { retry_after: until },
            };
            return Outcome::limited(error, until, metrics, warnings);
        }
    }

    /// Best-effort refund of one attempt's reservation
    async fn refund(
        &self,
        reservation: &Reservation,
        attempt: u32,
        metrics: &mut RunMetrics,
        warnings: &mut Vec<RefundWarning>,
    ) {
        if reservation.is_noop() {
            return;
        }

        match self.quota.refund(reservation).await {
            Ok(()) => metrics.refunds += 1,
            Err(err) => {
                metrics.refunds_failed += 1;
                self.stats.refund_failures.fetch_add(1, Ordering::Relaxed);
                warnings.push(RefundWarning {
                    attempt,
                    cost: reservation.cost,
                    token: reservation.token,
                    reason: err.to_string(),
                });
            }
        }
    }
}
