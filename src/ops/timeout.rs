use std::{
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use futures::task::Spawn;
use tracing::debug;

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  scheduler::spawn,
  sink::{FlowSink, OverflowStrategy},
  subscription::{FlowSubscription, Subscription},
};

/// Operator created by
/// [`Observable::timeout_empty`](crate::observable::Observable::timeout_empty).
#[derive(Clone)]
pub struct TimeoutEmpty<S, Sch> {
  pub(crate) source: S,
  pub(crate) duration: Duration,
  pub(crate) scheduler: Sch,
}

impl<S: ObservableType, Sch> ObservableType for TimeoutEmpty<S, Sch> {
  type Item = S::Item;
  type Err = S::Err;
}

type Cancel = Box<dyn FnOnce() + Send>;

struct Watch {
  deadline: Instant,
  done: bool,
  /// Cancels the source; present once subscribed and until terminated.
  upstream: Option<Cancel>,
}

impl<S, Sch, O> CoreObservable<O> for TimeoutEmpty<S, Sch>
where
  S: ObservableType + CoreObservable<TimeoutObserver<<S as ObservableType>::Item, <S as ObservableType>::Err>>,
  S::Item: Send + 'static,
  S::Err: Send + 'static,
  <S as CoreObservable<TimeoutObserver<S::Item, S::Err>>>::Unsub: Clone + Send + Sync + 'static,
  Sch: Spawn,
  O: Observer<S::Item, S::Err> + Send + 'static,
{
  type Unsub = FlowSubscription;

  fn actual_subscribe(self, observer: O) -> FlowSubscription {
    let sink = FlowSink::new(observer, OverflowStrategy::Buffer);
    let watch = Arc::new(Mutex::new(Watch { deadline: Instant::now() + self.duration, done: false, upstream: None }));
    let upstream = self.source.actual_subscribe(TimeoutObserver {
      sink: sink.clone(),
      watch: watch.clone(),
      duration: self.duration,
    });
    {
      let mut w = watch.lock().unwrap();
      if w.done {
        return sink.subscription();
      }
      let c_upstream = upstream.clone();
      w.upstream = Some(Box::new(move || c_upstream.unsubscribe()));
    }

    let c_upstream = upstream.clone();
    sink.on_request(move |n| c_upstream.request(n));
    let c_watch = watch.clone();
    sink.on_cancel(move || {
      let upstream = {
        let mut w = c_watch.lock().unwrap();
        w.done = true;
        w.upstream.take()
      };
      if let Some(cancel) = upstream {
        cancel();
      }
    });

    let c_sink = sink.clone();
    spawn(&self.scheduler, async move {
      loop {
        let wait = {
          let w = watch.lock().unwrap();
          if w.done {
            return;
          }
          w.deadline.saturating_duration_since(Instant::now())
        };
        if wait.is_zero() {
          break;
        }
        futures_time::task::sleep(wait.into()).await;
      }

      let upstream = {
        let mut w = watch.lock().unwrap();
        if w.done {
          return;
        }
        w.done = true;
        w.upstream.take()
      };
      debug!("no signal before the deadline, completing");
      if let Some(cancel) = upstream {
        cancel();
      }
      c_sink.complete();
    });

    sink.subscription()
  }
}

/// Forwards upstream signals and pushes the deadline back on every element.
#[doc(hidden)]
pub struct TimeoutObserver<Item, Err> {
  sink: FlowSink<Item, Err>,
  watch: Arc<Mutex<Watch>>,
  duration: Duration,
}

impl<Item, Err> TimeoutObserver<Item, Err> {
  fn finish(&self) -> bool {
    let released = {
      let mut w = self.watch.lock().unwrap();
      if w.done {
        return false;
      }
      w.done = true;
      w.upstream.take()
    };
    drop(released);
    true
  }
}

impl<Item, Err> Observer<Item, Err> for TimeoutObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    {
      let mut w = self.watch.lock().unwrap();
      if w.done {
        return;
      }
      w.deadline = Instant::now() + self.duration;
    }
    self.sink.next(value);
  }

  fn error(self, err: Err) {
    if self.finish() {
      self.sink.error(err);
    }
  }

  fn complete(self) {
    if self.finish() {
      self.sink.complete();
    }
  }

  fn is_finished(&self) -> bool { self.watch.lock().unwrap().done }
}
