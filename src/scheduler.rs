//! Executors used by the bridges.
//!
//! Bridges never own threads. A remote future is polled once on the thread
//! that subscribed or requested; only if it is still pending is it handed to
//! a [`Spawn`] scheduler, which then completes it on whatever thread the
//! scheduler runs. Blocking I/O goes to a separate [`BlockingSpawn`] pool.

use futures::{
  future::{BoxFuture, FutureExt},
  task::{noop_waker_ref, Spawn, SpawnExt},
  Future,
};
use std::task::{Context, Poll};

mod elastic_pool;
pub use elastic_pool::ElasticPool;

#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

#[cfg(feature = "futures-scheduler")]
pub use futures::executor::ThreadPool;

#[cfg(feature = "futures-scheduler")]
pub(crate) static DEFAULT_RUNTIME: once_cell::sync::Lazy<ThreadPool> = once_cell::sync::Lazy::new(|| {
  ThreadPool::builder()
    .name_prefix("rxremote-")
    .create()
    .expect("create the default thread pool failed.")
});

/// The process-wide thread pool used when no scheduler is supplied.
#[cfg(feature = "futures-scheduler")]
pub fn default_runtime() -> ThreadPool { DEFAULT_RUNTIME.clone() }

/// Runs blocking jobs off the caller's thread.
pub trait BlockingSpawn: Clone + Send + Sync + 'static {
  fn spawn_blocking(&self, job: Box<dyn FnOnce() + Send>);
}

/// Outcome of polling a future once on the calling thread.
pub(crate) enum Inline<T> {
  Ready(T),
  Pending(BoxFuture<'static, T>),
}

/// Polls `future` once with a no-op waker. A future that is not ready yet is
/// returned boxed so the caller can hand it to a scheduler.
pub(crate) fn poll_inline<F>(future: F) -> Inline<F::Output>
where
  F: Future + Send + 'static,
{
  let mut future = future.boxed();
  let mut cx = Context::from_waker(noop_waker_ref());
  match future.poll_unpin(&mut cx) {
    Poll::Ready(output) => Inline::Ready(output),
    Poll::Pending => Inline::Pending(future),
  }
}

/// Runs `future` on the calling thread if it is immediately ready, otherwise
/// on `scheduler`.
pub(crate) fn run_or_spawn<S, F>(scheduler: &S, future: F)
where
  S: Spawn,
  F: Future<Output = ()> + Send + 'static,
{
  if let Inline::Pending(future) = poll_inline(future) {
    spawn(scheduler, future);
  }
}

pub(crate) fn spawn<S, F>(scheduler: &S, future: F)
where
  S: Spawn,
  F: Future<Output = ()> + Send + 'static,
{
  scheduler
    .spawn(future)
    .expect("spawn task to scheduler failed.");
}
