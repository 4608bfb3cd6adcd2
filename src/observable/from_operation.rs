use std::sync::Arc;

use futures::{
  future::{AbortHandle, Abortable, BoxFuture},
  task::Spawn,
  FutureExt,
};
use tracing::{debug, trace};

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  scheduler::run_or_spawn,
  sink::{FlowSink, OverflowStrategy},
  subscription::FlowSubscription,
};

/// A single asynchronous remote call.
///
/// `submit` starts a fresh execution each time it is called. `cancel` asks
/// the remote side to abandon the execution in flight, if it supports that;
/// it must be idempotent and harmless after completion.
pub trait RemoteOperation: Send + Sync + 'static {
  type Output: Send + 'static;
  type Error: Send + 'static;

  fn submit(&self) -> BoxFuture<'static, Result<Self::Output, Self::Error>>;

  fn cancel(&self) {}
}

/// Source emitting the result of one remote call, created by
/// [`from_operation`].
pub struct FromOperation<Op, S> {
  operation: Arc<Op>,
  scheduler: S,
}

impl<Op, S: Clone> Clone for FromOperation<Op, S> {
  fn clone(&self) -> Self { FromOperation { operation: self.operation.clone(), scheduler: self.scheduler.clone() } }
}

/// Wrap a remote call as a cold single-value source.
///
/// Each subscription submits the operation once. A result that is ready
/// immediately is handled on the subscribing thread, otherwise the call is
/// awaited on `scheduler`. The value is held until at least one element has
/// been requested.
pub fn from_operation<Op, S>(operation: Op, scheduler: S) -> FromOperation<Op, S>
where
  Op: RemoteOperation,
  S: Spawn,
{
  FromOperation { operation: Arc::new(operation), scheduler }
}

impl<Op: RemoteOperation, S> ObservableType for FromOperation<Op, S> {
  type Item = Op::Output;
  type Err = Op::Error;
}

impl<Op, S, O> CoreObservable<O> for FromOperation<Op, S>
where
  Op: RemoteOperation,
  S: Spawn,
  O: Observer<Op::Output, Op::Error> + Send + 'static,
{
  type Unsub = FlowSubscription;

  fn actual_subscribe(self, observer: O) -> FlowSubscription {
    let sink = FlowSink::new(observer, OverflowStrategy::Buffer);
    let (abort, registration) = AbortHandle::new_pair();

    let operation = self.operation.clone();
    sink.on_cancel(move || {
      trace!("remote operation cancelled");
      abort.abort();
      operation.cancel();
    });

    let c_sink = sink.clone();
    let call = Abortable::new(self.operation.submit(), registration);
    run_or_spawn(
      &self.scheduler,
      call.map(move |outcome| match outcome {
        Ok(Ok(value)) => {
          c_sink.next(value);
          c_sink.complete();
        }
        Ok(Err(err)) => {
          debug!("remote operation failed");
          c_sink.error(err);
        }
        Err(_aborted) => {}
      }),
    );

    sink.subscription()
  }
}

#[cfg(test)]
pub(crate) mod test {
  use super::*;
  use crate::{
    observable::Observable,
    observer::ObserverAll,
    subscription::Subscription,
  };
  use futures::{
    channel::oneshot,
    executor::{block_on, ThreadPool},
  };
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
  };

  /// An operation resolving immediately with a fixed result.
  pub(crate) struct Ready<T, E> {
    pub(crate) result: Mutex<Option<Result<T, E>>>,
    pub(crate) submitted: AtomicUsize,
  }

  impl<T, E> Ready<T, E> {
    pub(crate) fn new(result: Result<T, E>) -> Self {
      Ready { result: Mutex::new(Some(result)), submitted: AtomicUsize::new(0) }
    }
  }

  impl<T: Send + 'static, E: Send + 'static> RemoteOperation for Ready<T, E> {
    type Output = T;
    type Error = E;

    fn submit(&self) -> BoxFuture<'static, Result<T, E>> {
      self.submitted.fetch_add(1, Ordering::SeqCst);
      let result = self.result.lock().unwrap().take().expect("submitted twice");
      futures::future::ready(result).boxed()
    }
  }

  /// An operation resolved by the test through a oneshot channel.
  pub(crate) struct Pending {
    pub(crate) rx: Mutex<Option<oneshot::Receiver<Result<i32, &'static str>>>>,
    pub(crate) cancelled: Arc<AtomicUsize>,
  }

  impl RemoteOperation for Pending {
    type Output = i32;
    type Error = &'static str;

    fn submit(&self) -> BoxFuture<'static, Result<i32, &'static str>> {
      let rx = self.rx.lock().unwrap().take().expect("submitted twice");
      rx.map(|r| r.unwrap_or(Err("dropped"))).boxed()
    }

    fn cancel(&self) { self.cancelled.fetch_add(1, Ordering::SeqCst); }
  }

  #[test]
  fn holds_value_until_requested() {
    let pool = ThreadPool::new().unwrap();
    let op = Arc::new(Mutex::new(Vec::new()));
    let (c_op, c_op2) = (op.clone(), op.clone());
    let subscription = from_operation(Ready::<_, ()>::new(Ok(7)), pool).subscribe_flow(ObserverAll::new(
      move |v: i32| c_op.lock().unwrap().push(format!("next {v}")),
      |_| {},
      move || c_op2.lock().unwrap().push("complete".to_string()),
    ));
    assert!(op.lock().unwrap().is_empty());
    subscription.request(1);
    assert_eq!(*op.lock().unwrap(), vec!["next 7", "complete"]);
  }

  #[test]
  fn failure_is_delivered_without_demand() {
    let pool = ThreadPool::new().unwrap();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let c_errors = errors.clone();
    let _subscription = from_operation(Ready::<i32, _>::new(Err("boom")), pool).subscribe_flow(ObserverAll::new(
      |_| {},
      move |e| c_errors.lock().unwrap().push(e),
      || {},
    ));
    assert_eq!(*errors.lock().unwrap(), vec!["boom"]);
  }

  #[test]
  fn pending_result_arrives_on_scheduler() {
    let pool = ThreadPool::new().unwrap();
    let (tx, rx) = oneshot::channel();
    let (done_tx, done_rx) = oneshot::channel();
    let done_tx = Mutex::new(Some(done_tx));
    let op = Pending { rx: Mutex::new(Some(rx)), cancelled: Arc::new(AtomicUsize::new(0)) };
    from_operation(op, pool).subscribe(move |v| {
      if let Some(tx) = done_tx.lock().unwrap().take() {
        let _ = tx.send(v);
      }
    });
    tx.send(Ok(5)).unwrap();
    assert_eq!(block_on(done_rx).unwrap(), 5);
  }

  #[test]
  fn cancel_before_completion_cancels_operation() {
    let pool = ThreadPool::new().unwrap();
    let (tx, rx) = oneshot::channel();
    let cancelled = Arc::new(AtomicUsize::new(0));
    let op = Pending { rx: Mutex::new(Some(rx)), cancelled: cancelled.clone() };
    let seen = Arc::new(AtomicUsize::new(0));
    let c_seen = seen.clone();
    let subscription = from_operation(op, pool).subscribe(move |_| {
      c_seen.fetch_add(1, Ordering::SeqCst);
    });
    subscription.unsubscribe();
    let _ = tx.send(Ok(1));
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(seen.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn each_subscription_submits_again() {
    struct Counting(AtomicUsize);
    impl RemoteOperation for Counting {
      type Output = usize;
      type Error = ();
      fn submit(&self) -> BoxFuture<'static, Result<usize, ()>> {
        futures::future::ready(Ok(self.0.fetch_add(1, Ordering::SeqCst))).boxed()
      }
    }

    let pool = ThreadPool::new().unwrap();
    let source = from_operation(Counting(AtomicUsize::new(0)), pool);
    let seen = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..3 {
      let c_seen = seen.clone();
      source.clone().subscribe(move |v| c_seen.lock().unwrap().push(v));
    }
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
  }
}
