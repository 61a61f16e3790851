//! Cooperative cancellation
//!
//! The caller keeps a [`CancelTrigger`]; the engine polls the matching
//! [`CancelSignal`] before each major phase and bails out with
//! `GenerationError::Cancelled`. A signal can also carry a check budget and
//! raise itself once that many polls have passed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Signal polled by the engine.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    flag: Option<Arc<AtomicBool>>,
    budget: Option<Arc<AtomicU64>>,
}

impl CancelSignal {
    /// Create a new (signal, trigger) pair.
    pub fn new() -> (Self, CancelTrigger) {
        let flag = Arc::new(AtomicBool::new(false));
        let signal = Self {
            flag: Some(flag.clone()),
            budget: None,
        };
        (signal, CancelTrigger { flag })
    }

    /// A signal that is never raised.
    pub fn never() -> Self {
        Self::default()
    }

    /// A signal that passes `checks` polls, then stays raised.
    ///
    /// Clones share the budget.
    pub fn with_budget(checks: u64) -> Self {
        Self {
            flag: None,
            budget: Some(Arc::new(AtomicU64::new(checks))),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        let raised = self
            .flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Acquire));
        raised
            || self.budget.as_ref().is_some_and(|b| {
                b.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                    .is_err()
            })
    }
}

/// Caller-side handle that raises the signal.
#[derive(Debug, Clone)]
pub struct CancelTrigger {
    flag: Arc<AtomicBool>,
}

impl CancelTrigger {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}
