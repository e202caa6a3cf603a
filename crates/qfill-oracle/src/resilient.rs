//! Timeout, retry and concurrency limits around any [`Oracle`].

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use qfill_model::{GlobalContext, OracleSettings};
use tracing::{debug, warn};

use crate::error::{OracleError, Result};
use crate::oracle::{Oracle, OracleReply};
use crate::request::{
    ClassificationRequest, ContextRequest, HierarchyRequest, HierarchyVerdict, StrategyRequest,
    StrategyVerdict, Verdict,
};

/// Upper bound on the wait honoured for a remote rate limit.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(30);

/// Counting limiter bounding calls in flight.
#[derive(Debug)]
pub struct Limiter {
    capacity: usize,
    in_use: Mutex<usize>,
    released: Condvar,
}

impl Limiter {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            in_use: Mutex::new(0),
            released: Condvar::new(),
        })
    }

    /// Block until a slot is free.
    pub fn acquire(self: &Arc<Self>) -> Permit {
        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        while *in_use >= self.capacity {
            in_use = self
                .released
                .wait(in_use)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *in_use += 1;
        Permit {
            limiter: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> usize {
        *self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Slot held for the lifetime of one call. Released on drop.
#[derive(Debug)]
pub struct Permit {
    limiter: Arc<Limiter>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        let mut in_use = self
            .limiter
            .in_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *in_use = in_use.saturating_sub(1);
        self.limiter.released.notify_one();
    }
}

/// Decorator adding a per-call timeout, bounded retries with exponential
/// backoff and a shared concurrency limit to an inner oracle.
///
/// A call that times out keeps its permit until the inner oracle actually
/// returns, so the limit also covers abandoned calls.
pub struct ResilientOracle<O> {
    inner: Arc<O>,
    settings: OracleSettings,
    limiter: Arc<Limiter>,
}

impl<O: Oracle + 'static> ResilientOracle<O> {
    pub fn new(inner: O, settings: OracleSettings) -> Self {
        Self::with_shared(Arc::new(inner), settings)
    }

    pub fn with_shared(inner: Arc<O>, settings: OracleSettings) -> Self {
        let limiter = Limiter::new(settings.max_concurrent);
        Self {
            inner,
            settings,
            limiter,
        }
    }

    pub fn limiter(&self) -> &Arc<Limiter> {
        &self.limiter
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    fn call<Req, T>(
        &self,
        operation: &'static str,
        request: &Req,
        f: fn(&O, &Req) -> Result<OracleReply<T>>,
    ) -> Result<OracleReply<T>>
    where
        Req: Clone + Send + 'static,
        T: Send + 'static,
    {
        let mut attempt: u32 = 0;
        loop {
            match self.attempt(request.clone(), f) {
                Ok(reply) => return Ok(reply),
                Err(err) if err.is_retryable() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt, &err);
                    warn!(
                        oracle = self.inner.name(),
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Oracle call failed, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(err) => {
                    debug!(
                        oracle = self.inner.name(),
                        operation,
                        attempt,
                        error = %err,
                        "Oracle call gave up"
                    );
                    return Err(err);
                }
            }
        }
    }

    fn attempt<Req, T>(
        &self,
        request: Req,
        f: fn(&O, &Req) -> Result<OracleReply<T>>,
    ) -> Result<OracleReply<T>>
    where
        Req: Send + 'static,
        T: Send + 'static,
    {
        let permit = self.limiter.acquire();
        let inner = Arc::clone(&self.inner);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = f(&inner, &request);
            drop(permit);
            // Receiver is gone when the caller already timed out.
            let _ = tx.send(result);
        });
        match rx.recv_timeout(self.settings.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(OracleError::Timeout {
                after: self.settings.timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => {
                Err(OracleError::Network("oracle worker exited".to_string()))
            }
        }
    }

    /// `base * 2^(attempt-1)`, or the remote's rate-limit hint when larger.
    fn backoff(&self, attempt: u32, err: &OracleError) -> Duration {
        let exponential = self
            .settings
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        match err {
            OracleError::RateLimited { retry_after_secs } => exponential
                .max(Duration::from_secs(*retry_after_secs))
                .min(MAX_RATE_LIMIT_WAIT),
            _ => exponential,
        }
    }
}

impl<O: Oracle + 'static> Oracle for ResilientOracle<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn classify(&self, request: &ClassificationRequest) -> Result<OracleReply<Verdict>> {
        self.call("classify", request, |o, r| o.classify(r))
    }

    fn hierarchy(&self, request: &HierarchyRequest) -> Result<OracleReply<HierarchyVerdict>> {
        self.call("hierarchy", request, |o, r| o.hierarchy(r))
    }

    fn strategy(&self, request: &StrategyRequest) -> Result<OracleReply<StrategyVerdict>> {
        self.call("strategy", request, |o, r| o.strategy(r))
    }

    fn context(&self, request: &ContextRequest) -> Result<OracleReply<GlobalContext>> {
        self.call("context", request, |o, r| o.context(r))
    }
}
