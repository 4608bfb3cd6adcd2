use std::sync::Arc;

use tracing::trace;

use crate::{
  demand::UNBOUNDED,
  observable::{from_operation_iter::Spread, CoreObservable, ObservableType},
  observer::Observer,
  sink::{FlowSink, OverflowStrategy},
  subscription::{FlowSubscription, Subscription},
};

/// A running remote task that reports its outcome through callbacks.
///
/// Callbacks may be registered any number of times and may fire on any
/// thread, including the registering one if the task already finished.
pub trait CancellableTask: Send + Sync + 'static {
  type Output: Send + 'static;
  type Error: Send + 'static;

  fn on_success(&self, callback: Box<dyn FnOnce(Self::Output) + Send>);

  fn on_error(&self, callback: Box<dyn FnOnce(Self::Error) + Send>);

  fn cancel(&self);
}

/// Source created by [`from_task`].
pub struct FromTask<T> {
  task: Arc<T>,
}

impl<T> Clone for FromTask<T> {
  fn clone(&self) -> Self { FromTask { task: self.task.clone() } }
}

/// Wrap a cancellable task as a single-value source. Unsubscribing cancels
/// the task.
pub fn from_task<T: CancellableTask>(task: T) -> FromTask<T> { FromTask { task: Arc::new(task) } }

impl<T: CancellableTask> ObservableType for FromTask<T> {
  type Item = T::Output;
  type Err = T::Error;
}

impl<T, O> CoreObservable<O> for FromTask<T>
where
  T: CancellableTask,
  O: Observer<T::Output, T::Error> + Send + 'static,
{
  type Unsub = FlowSubscription;

  fn actual_subscribe(self, observer: O) -> FlowSubscription {
    let sink = FlowSink::new(observer, OverflowStrategy::Buffer);
    let task = self.task.clone();
    sink.on_cancel(move || {
      trace!("task cancelled");
      task.cancel();
    });

    let c_sink = sink.clone();
    self.task.on_success(Box::new(move |value| {
      c_sink.next(value);
      c_sink.complete();
    }));
    let c_sink = sink.clone();
    self.task.on_error(Box::new(move |err| c_sink.error(err)));

    sink.subscription()
  }
}

/// Source created by [`from_task_iter`].
pub struct FromTaskIter<T>(FromTask<T>);

impl<T> Clone for FromTaskIter<T> {
  fn clone(&self) -> Self { FromTaskIter(self.0.clone()) }
}

/// Wrap a cancellable task producing a collection as a multi-value source.
pub fn from_task_iter<T>(task: T) -> FromTaskIter<T>
where
  T: CancellableTask,
  T::Output: IntoIterator,
{
  FromTaskIter(from_task(task))
}

impl<T> ObservableType for FromTaskIter<T>
where
  T: CancellableTask,
  T::Output: IntoIterator,
{
  type Item = <T::Output as IntoIterator>::Item;
  type Err = T::Error;
}

impl<T, O, V> CoreObservable<O> for FromTaskIter<T>
where
  T: CancellableTask,
  T::Output: IntoIterator<Item = V>,
  V: Send + 'static,
  O: Observer<V, T::Error> + Send + 'static,
{
  type Unsub = FlowSubscription;

  fn actual_subscribe(self, observer: O) -> FlowSubscription {
    let sink = FlowSink::new(observer, OverflowStrategy::Buffer);
    let upstream = self.0.actual_subscribe(Spread { sink: sink.clone() });
    let c_upstream = upstream.clone();
    sink.on_cancel(move || c_upstream.unsubscribe());
    upstream.request(UNBOUNDED);
    sink.subscription()
  }
}
