//! Bounded synchronous adapter over asynchronous evaluation
//!
//! Some call sites (template conditionals, legacy synchronous code) need a
//! plain boolean without suspension. This adapter is the one sanctioned
//! blocking point in the engine: it spawns the evaluation on the runtime
//! and waits on a channel with a bound. It must never be called from an
//! async task on the primary request path.

use crate::error::Result;
use crate::handler::EventNotifier;
use futures::future::BoxFuture;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::warn;

/// Synchronous boolean gate with deny-by-default timeout fallback
pub struct BlockingEvaluator {
    handle: Handle,
    notifier: Arc<dyn EventNotifier>,
    default_timeout_ms: u64,
}

impl BlockingEvaluator {
    /// Create an adapter spawning onto the given runtime handle
    ///
    /// `default_timeout_ms` is the bound used by [`allowed`](Self::allowed);
    /// it is the single piece of configuration the engine consumes.
    pub fn new(handle: Handle, notifier: Arc<dyn EventNotifier>, default_timeout_ms: u64) -> Self {
        Self {
            handle,
            notifier,
            default_timeout_ms,
        }
    }

    /// The configured default timeout in milliseconds
    pub fn default_timeout_ms(&self) -> u64 {
        self.default_timeout_ms
    }

    /// Evaluate with the default timeout
    pub fn allowed(&self, description: &str, eval: BoxFuture<'static, Result<bool>>) -> bool {
        self.allowed_within(description, eval, self.default_timeout_ms)
    }

    /// Evaluate with an explicit timeout in milliseconds
    ///
    /// Returns the boolean outcome when the evaluation completes within
    /// the bound. On timeout, denies and fires the notifier's timeout
    /// callback exactly once. The in-flight evaluation is not cancelled;
    /// it may still complete and its result is discarded. An evaluation
    /// that errors or panics is logged and denied without the timeout
    /// callback.
    pub fn allowed_within(
        &self,
        description: &str,
        eval: BoxFuture<'static, Result<bool>>,
        timeout_ms: u64,
    ) -> bool {
        let (tx, rx) = mpsc::channel();
        self.handle.spawn(async move {
            let _ = tx.send(eval.await);
        });

        match rx.recv_timeout(Duration::from_millis(timeout_ms)) {
            Ok(Ok(allowed)) => allowed,
            Ok(Err(err)) => {
                warn!(description, %err, "synchronous evaluation failed, denying");
                false
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.notifier.on_timeout(description, timeout_ms);
                false
            }
            // The spawned task dropped the sender without a result (it
            // panicked); that is not a timeout.
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!(description, "evaluation task died without a result, denying");
                false
            }
        }
    }
}
