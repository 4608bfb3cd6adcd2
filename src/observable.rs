//! Cold, backpressured sources built over remote primitives.
//!
//! Every source in this module follows the same contract: nothing runs until
//! an observer subscribes, and nothing is delivered until the returned
//! subscription has requested it. The bridges are:
//!
//! - [`from_operation`]: one remote future, one value.
//! - [`from_operation_iter`]: one remote future producing a collection.
//! - [`from_operations`]: many remote futures, results in completion order.
//! - [`from_pages`]: a paginated remote iterator, fetched on demand.
//! - [`from_task`] / [`from_task_iter`]: a callback-registration task.
//! - [`from_iter`] / [`defer_iter`]: a local iterator, pulled on demand.

use crate::{
  observer::{ObserverAll, ObserverN},
  ops::into_stream::{IntoStream, IntoStreamObserver},
  subscription::{Subscription, SubscriptionWrapper},
};

pub mod from_iter;
pub use from_iter::*;
pub mod from_operation;
pub use from_operation::*;
pub mod from_operation_iter;
pub use from_operation_iter::*;
pub mod from_operations;
pub use from_operations::*;
pub mod from_pages;
pub use from_pages::*;
pub mod from_task;
pub use from_task::*;

/// Item and error types of a source.
pub trait ObservableType {
  type Item;
  type Err;
}

/// The subscribe primitive every source implements for the observers it can
/// drive.
pub trait CoreObservable<O>: ObservableType {
  type Unsub: Subscription;

  /// Attach `observer` without requesting anything.
  fn actual_subscribe(self, observer: O) -> Self::Unsub;
}

/// User-facing subscribe helpers and operators, available on every source.
pub trait Observable: ObservableType + Sized {
  /// Subscribe with a `next` closure and request unbounded demand. Errors and
  /// completion are ignored.
  fn subscribe<N>(self, next: N) -> SubscriptionWrapper<<Self as CoreObservable<ObserverN<N>>>::Unsub>
  where
    N: FnMut(Self::Item),
    Self: CoreObservable<ObserverN<N>>,
  {
    let unsub = self.actual_subscribe(ObserverN(next));
    unsub.request(crate::demand::UNBOUNDED);
    SubscriptionWrapper(unsub)
  }

  /// Subscribe with all three handlers and request unbounded demand.
  fn subscribe_all<N, E, C>(
    self,
    next: N,
    error: E,
    complete: C,
  ) -> SubscriptionWrapper<<Self as CoreObservable<ObserverAll<N, E, C>>>::Unsub>
  where
    N: FnMut(Self::Item),
    E: FnOnce(Self::Err),
    C: FnOnce(),
    Self: CoreObservable<ObserverAll<N, E, C>>,
  {
    let unsub = self.actual_subscribe(ObserverAll::new(next, error, complete));
    unsub.request(crate::demand::UNBOUNDED);
    SubscriptionWrapper(unsub)
  }

  /// Subscribe without requesting anything. The caller drives demand through
  /// the returned handle.
  fn subscribe_flow<O>(self, observer: O) -> <Self as CoreObservable<O>>::Unsub
  where
    Self: CoreObservable<O>,
  {
    self.actual_subscribe(observer)
  }

  /// Complete the stream once no signal arrived for `duration` since
  /// subscription or since the previous element. The source is cancelled
  /// first.
  #[cfg(feature = "timer")]
  fn timeout_empty<S>(self, duration: std::time::Duration, scheduler: S) -> crate::ops::timeout::TimeoutEmpty<Self, S> {
    crate::ops::timeout::TimeoutEmpty { source: self, duration, scheduler }
  }

  /// Convert this source into a [`futures::Stream`] of results. One element
  /// is requested per poll.
  fn into_stream(self) -> IntoStream<Self::Item, Self::Err>
  where
    Self: CoreObservable<IntoStreamObserver<<Self as ObservableType>::Item, <Self as ObservableType>::Err>>,
    <Self as CoreObservable<IntoStreamObserver<<Self as ObservableType>::Item, <Self as ObservableType>::Err>>>::Unsub: Send + 'static,
  {
    IntoStream::new(self)
  }
}

impl<T: ObservableType> Observable for T {}
