use futures::task::Spawn;

use crate::{
  observable::{from_operation, CoreObservable, FromOperation, ObservableType, RemoteOperation},
  observer::Observer,
  ops::merge::{merge, Merge},
  sink::OverflowStrategy,
  subscription::FlowSubscription,
};

/// Source emitting the results of several remote calls, created by
/// [`from_operations`].
pub struct FromOperations<Op, S>(Merge<FromOperation<Op, S>>);

impl<Op, S: Clone> Clone for FromOperations<Op, S> {
  fn clone(&self) -> Self { FromOperations(self.0.clone()) }
}

/// Submit every operation on subscribe and emit each result as it arrives.
///
/// Results come in completion order, not in the order of `operations`. The
/// stream completes once every call has succeeded. The first failure is
/// delivered as the stream's error and cancels the calls still in flight.
pub fn from_operations<Op, S>(operations: impl IntoIterator<Item = Op>, scheduler: S) -> FromOperations<Op, S>
where
  Op: RemoteOperation,
  S: Spawn + Clone,
{
  let sources = operations.into_iter().map(|op| from_operation(op, scheduler.clone()));
  FromOperations(merge(sources, OverflowStrategy::Buffer))
}

impl<Op: RemoteOperation, S> ObservableType for FromOperations<Op, S> {
  type Item = Op::Output;
  type Err = Op::Error;
}

impl<Op, S, O> CoreObservable<O> for FromOperations<Op, S>
where
  Op: RemoteOperation,
  S: Spawn,
  O: Observer<Op::Output, Op::Error> + Send + 'static,
{
  type Unsub = FlowSubscription;

  fn actual_subscribe(self, observer: O) -> FlowSubscription { self.0.actual_subscribe(observer) }
}
