use futures::{
  future::FutureObj,
  task::{Spawn, SpawnError},
};
use tokio::runtime::Handle;

use super::BlockingSpawn;

/// Drives bridge futures on a Tokio runtime and blocking jobs on its
/// blocking pool.
#[derive(Clone)]
pub struct TokioScheduler(pub Handle);

impl TokioScheduler {
  /// Scheduler for the runtime the caller is running in.
  ///
  /// # Panics
  ///
  /// When called outside of a Tokio runtime.
  pub fn current() -> Self { TokioScheduler(Handle::current()) }
}

impl Spawn for TokioScheduler {
  fn spawn_obj(&self, future: FutureObj<'static, ()>) -> Result<(), SpawnError> {
    self.0.spawn(future);
    Ok(())
  }
}

impl BlockingSpawn for TokioScheduler {
  fn spawn_blocking(&self, job: Box<dyn FnOnce() + Send>) {
    self.0.spawn_blocking(job);
  }
}
