//! Progress observers for long-running interpretation passes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The pass reporting progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    InterpretModel,
    ErrorAnalysis,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InterpretModel => f.write_str("interpret_model"),
            Self::ErrorAnalysis => f.write_str("error_analysis"),
        }
    }
}

/// Advisory progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub operation: Operation,
    pub processed: usize,
    /// Number of samples in the pass, when known up front.
    pub total: Option<usize>,
}

/// Receives progress notifications. Observers must not affect results.
pub trait ProgressObserver {
    fn on_progress(&self, event: &ProgressEvent);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Logs each notification at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        match event.total {
            Some(total) => tracing::info!(
                operation = %event.operation,
                processed = event.processed,
                total,
                "Processed {}/{} samples",
                event.processed,
                total
            ),
            None => tracing::info!(
                operation = %event.operation,
                processed = event.processed,
                "Processed {} samples",
                event.processed
            ),
        }
    }
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent),
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Emits a notification every `interval` processed samples.
///
/// An interval of zero never notifies. Streaming callers that cannot know
/// the total pass `None`.
pub struct ProgressTicker<'a> {
    operation: Operation,
    interval: usize,
    total: Option<usize>,
    processed: usize,
    observer: &'a dyn ProgressObserver,
}

impl<'a> ProgressTicker<'a> {
    pub fn new(
        operation: Operation,
        interval: usize,
        total: Option<usize>,
        observer: &'a dyn ProgressObserver,
    ) -> Self {
        Self {
            operation,
            interval,
            total,
            processed: 0,
            observer,
        }
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn tick(&mut self) {
        self.processed += 1;
        if self.interval > 0 && self.processed % self.interval == 0 {
            self.observer.on_progress(&ProgressEvent {
                operation: self.operation,
                processed: self.processed,
                total: self.total,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_ticker_interval() {
        let seen = RefCell::new(Vec::new());
        let observer = |e: &ProgressEvent| seen.borrow_mut().push(e.processed);
        let mut ticker = ProgressTicker::new(Operation::ErrorAnalysis, 10, Some(25), &observer);
        for _ in 0..25 {
            ticker.tick();
        }
        assert_eq!(*seen.borrow(), vec![10, 20]);
        assert_eq!(ticker.processed(), 25);
    }

    #[test]
    fn test_unknown_total_is_passed_through() {
        let seen = RefCell::new(Vec::new());
        let observer = |e: &ProgressEvent| seen.borrow_mut().push((e.processed, e.total));
        let mut ticker = ProgressTicker::new(Operation::ErrorAnalysis, 2, None, &observer);
        for _ in 0..5 {
            ticker.tick();
        }
        assert_eq!(*seen.borrow(), vec![(2, None), (4, None)]);
    }

    #[test]
    fn test_zero_interval_never_notifies() {
        let seen = RefCell::new(0usize);
        let observer = |_: &ProgressEvent| *seen.borrow_mut() += 1;
        let mut ticker = ProgressTicker::new(Operation::InterpretModel, 0, Some(5), &observer);
        for _ in 0..5 {
            ticker.tick();
        }
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::InterpretModel.to_string(), "interpret_model");
        assert_eq!(Operation::ErrorAnalysis.to_string(), "error_analysis");
    }
}
