#![allow(clippy::new_without_default)]

pub mod parsers;

#[doc(hidden)]
pub use tracing;

use std::{
    future::Future,
    pin::Pin,
    task,
    time::{Duration, Instant},
};

use tokio::task::JoinHandle;

/// This ensures structural-concurrency: the spawned task does not outlive its owner. All of the tasks wrapped
/// this way are cancellation-safe, it is fine to just drop the futures.
pub struct AbortOnDrop<T>(JoinHandle<T>);
impl<T: Send + 'static> AbortOnDrop<T> {
    #[track_caller] // forward the tokio track_caller
    pub fn spawn<F: Future<Output = T> + Send + 'static>(future: F) -> Self {
        Self(tokio::spawn(future))
    }
}
impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort()
    }
}
impl<T> Future for AbortOnDrop<T> {
    type Output = T;
    fn poll(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> task::Poll<Self::Output> {
        // Panic: the task is never aborted, except on drop in which case it cannot be polled again.
        Pin::new(&mut self.get_mut().0).poll(cx).map(|r| r.expect("Join error"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PerfStopwatch(pub Instant);

impl PerfStopwatch {
    pub fn new() -> PerfStopwatch {
        PerfStopwatch(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

#[macro_export]
macro_rules! stopwatch_end {
    ($stopwatch:expr, $($arg:tt)+) => {
        $crate::tracing::debug!($($arg)+, $stopwatch.elapsed())
    }
}
