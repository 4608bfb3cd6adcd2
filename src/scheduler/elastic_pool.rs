use std::{
  io,
  panic::{catch_unwind, AssertUnwindSafe},
  sync::Arc,
  thread,
  time::Duration,
};

use once_cell::sync::Lazy;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::error;

use super::BlockingSpawn;

static GLOBAL: Lazy<ElasticPool> = Lazy::new(|| {
  let cpus = thread::available_parallelism().map_or(1, |n| n.get());
  ElasticPool::new(10 * cpus, Duration::from_secs(60)).expect("create the blocking pool failed.")
});

/// A bounded, elastic pool for blocking work.
///
/// Backed by the blocking pool of a dedicated Tokio runtime: threads are
/// started on demand up to `max_threads` and exit after sitting idle for
/// `keep_alive`. Jobs submitted while every thread is busy wait in a queue.
/// A job that panics takes only itself down.
#[derive(Clone)]
pub struct ElasticPool {
  handle: Handle,
  _runtime: Arc<OwnedRuntime>,
}

struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
  fn drop(&mut self) {
    // Dropping a runtime blocks, which Tokio forbids inside async contexts.
    if let Some(runtime) = self.0.take() {
      runtime.shutdown_background();
    }
  }
}

impl ElasticPool {
  pub fn new(max_threads: usize, keep_alive: Duration) -> io::Result<Self> {
    let runtime = Builder::new_multi_thread()
      .worker_threads(1)
      .max_blocking_threads(max_threads.max(1))
      .thread_keep_alive(keep_alive)
      .thread_name("rxremote-blocking")
      .build()?;
    Ok(ElasticPool { handle: runtime.handle().clone(), _runtime: Arc::new(OwnedRuntime(Some(runtime))) })
  }

  /// The process-wide pool, sized at ten threads per CPU with a 60 second
  /// keep-alive.
  pub fn global() -> ElasticPool { GLOBAL.clone() }
}

impl BlockingSpawn for ElasticPool {
  fn spawn_blocking(&self, job: Box<dyn FnOnce() + Send>) {
    self.handle.spawn_blocking(move || {
      if catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!("blocking job panicked");
      }
    });
  }
}
