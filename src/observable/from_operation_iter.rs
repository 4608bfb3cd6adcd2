use futures::task::Spawn;

use crate::{
  demand::UNBOUNDED,
  observable::{from_operation, CoreObservable, FromOperation, ObservableType, RemoteOperation},
  observer::Observer,
  sink::{FlowSink, OverflowStrategy},
  subscription::{FlowSubscription, Subscription},
};

/// Source emitting every element of a remote collection, created by
/// [`from_operation_iter`].
pub struct FromOperationIter<Op, S>(FromOperation<Op, S>);

impl<Op, S: Clone> Clone for FromOperationIter<Op, S> {
  fn clone(&self) -> Self { FromOperationIter(self.0.clone()) }
}

/// Wrap a remote call producing a collection as a cold multi-value source.
///
/// The collection is fetched in one call and then emitted element by element
/// as the consumer requests them. A failure surfaces as a single error with no
/// elements.
pub fn from_operation_iter<Op, S>(operation: Op, scheduler: S) -> FromOperationIter<Op, S>
where
  Op: RemoteOperation,
  Op::Output: IntoIterator,
  S: Spawn,
{
  FromOperationIter(from_operation(operation, scheduler))
}

impl<Op, S> ObservableType for FromOperationIter<Op, S>
where
  Op: RemoteOperation,
  Op::Output: IntoIterator,
{
  type Item = <Op::Output as IntoIterator>::Item;
  type Err = Op::Error;
}

impl<Op, S, O, T> CoreObservable<O> for FromOperationIter<Op, S>
where
  Op: RemoteOperation,
  Op::Output: IntoIterator<Item = T>,
  T: Send + 'static,
  S: Spawn,
  O: Observer<T, Op::Error> + Send + 'static,
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

/// Pushes each element of an upstream collection into a buffered sink.
pub(crate) struct Spread<T, Err> {
  pub(crate) sink: FlowSink<T, Err>,
}

impl<C, T, Err> Observer<C, Err> for Spread<T, Err>
where
  C: IntoIterator<Item = T>,
  T: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, collection: C) {
    for value in collection {
      if !self.sink.next(value) {
        break;
      }
    }
  }

  fn error(self, err: Err) { self.sink.error(err) }

  fn complete(self) { self.sink.complete() }

  fn is_finished(&self) -> bool { self.sink.is_closed() }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    observable::{from_operation::test::Pending, from_operation::test::Ready, Observable},
    observer::ObserverAll,
  };
  use futures::{channel::oneshot, executor::ThreadPool};
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  };

  #[test]
  fn emits_elements_on_demand() {
    let pool = ThreadPool::new().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(AtomicUsize::new(0));
    let (c_seen, c_completed) = (seen.clone(), completed.clone());
    let subscription = from_operation_iter(Ready::<_, ()>::new(Ok(vec![1, 2, 3, 4])), pool).subscribe_flow(
      ObserverAll::new(
        move |v| c_seen.lock().unwrap().push(v),
        |_| {},
        move || {
          c_completed.fetch_add(1, Ordering::SeqCst);
        },
      ),
    );

    subscription.request(3);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(completed.load(Ordering::SeqCst), 0);
    subscription.request(1);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(completed.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn failure_emits_no_elements() {
    let pool = ThreadPool::new().unwrap();
    let seen = Arc::new(Mutex::new(Vec::<i32>::new()));
    let errors = Arc::new(Mutex::new(Vec::new()));
    let (c_seen, c_errors) = (seen.clone(), errors.clone());
    from_operation_iter(Ready::<Vec<i32>, _>::new(Err("forbidden")), pool).subscribe_all(
      move |v| c_seen.lock().unwrap().push(v),
      move |e| c_errors.lock().unwrap().push(e),
      || {},
    );
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(*errors.lock().unwrap(), vec!["forbidden"]);
  }

  #[test]
  fn cancel_after_arrival_does_not_cancel_operation() {
    struct Listed(Arc<AtomicUsize>);
    impl RemoteOperation for Listed {
      type Output = Vec<u8>;
      type Error = ();
      fn submit(&self) -> futures::future::BoxFuture<'static, Result<Vec<u8>, ()>> {
        Box::pin(futures::future::ready(Ok(vec![1, 2, 3])))
      }
      fn cancel(&self) { self.0.fetch_add(1, Ordering::SeqCst); }
    }

    let pool = ThreadPool::new().unwrap();
    let cancelled = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let c_seen = seen.clone();
    let subscription = from_operation_iter(Listed(cancelled.clone()), pool).subscribe_flow(ObserverAll::new(
      move |v| c_seen.lock().unwrap().push(v),
      |_| {},
      || {},
    ));
    subscription.request(1);
    subscription.clone().unsubscribe();
    subscription.request(5);
    assert_eq!(*seen.lock().unwrap(), vec![1]);
    assert_eq!(cancelled.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn cancel_before_arrival_cancels_operation() {
    let pool = ThreadPool::new().unwrap();
    let (tx, rx) = oneshot::channel();
    let cancelled = Arc::new(AtomicUsize::new(0));
    struct Wrapped(Pending);
    impl RemoteOperation for Wrapped {
      type Output = Vec<i32>;
      type Error = &'static str;
      fn submit(&self) -> futures::future::BoxFuture<'static, Result<Vec<i32>, &'static str>> {
        use futures::FutureExt;
        self.0.submit().map(|r| r.map(|v| vec![v])).boxed()
      }
      fn cancel(&self) { self.0.cancel() }
    }
    let op = Wrapped(Pending { rx: Mutex::new(Some(rx)), cancelled: cancelled.clone() });
    let subscription = from_operation_iter(op, pool).subscribe(|_| {});
    subscription.unsubscribe();
    let _ = tx.send(Ok(1));
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
  }
}
