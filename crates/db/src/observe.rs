//! Timing instrumentation for store calls.
//!
//! [`observed`] starts a clock, awaits the store call and reports the
//! elapsed time to a [`QueryObserver`]. The start instant lives on the
//! wrapper's stack, so concurrent calls never share timer state.

use std::error::Error;
use std::future::Future;
use std::time::{Duration, Instant};

/// Receives one report per completed store call.
pub trait QueryObserver: Send + Sync {
    fn query_completed(&self, operation: &'static str, elapsed: Duration, rows: usize);

    fn query_failed(&self, operation: &'static str, elapsed: Duration, error: &dyn Error);
}

/// Emits each report as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingQueryObserver;

impl QueryObserver for TracingQueryObserver {
    fn query_completed(&self, operation: &'static str, elapsed: Duration, rows: usize) {
        tracing::debug!(
            operation,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            rows,
            "Query completed"
        );
    }

    fn query_failed(&self, operation: &'static str, elapsed: Duration, error: &dyn Error) {
        tracing::warn!(
            operation,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            error = %error,
            "Query failed"
        );
    }
}

/// Number of records a store call produced, for reporting.
pub trait RowCount {
    fn row_count(&self) -> usize;
}

impl<T> RowCount for Vec<T> {
    fn row_count(&self) -> usize {
        self.len()
    }
}

impl<T> RowCount for Option<T> {
    fn row_count(&self) -> usize {
        usize::from(self.is_some())
    }
}

/// A scalar aggregate is one row.
impl RowCount for i64 {
    fn row_count(&self) -> usize {
        1
    }
}

impl RowCount for bool {
    fn row_count(&self) -> usize {
        usize::from(*self)
    }
}

/// Await `call` and report its duration and row count under `operation`.
pub async fn observed<T, E, F>(
    observer: &dyn QueryObserver,
    operation: &'static str,
    call: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    T: RowCount,
    E: Error,
{
    let started = Instant::now();
    let result = call.await;
    let elapsed = started.elapsed();
    match &result {
        Ok(value) => observer.query_completed(operation, elapsed, value.row_count()),
        Err(err) => observer.query_failed(operation, elapsed, err),
    }
    result
}
