//! Backpressured delivery endpoint shared by every bridge.
//!
//! A [`FlowSink`] owns one downstream observer. Producers push signals into
//! it from any thread; the sink holds values until the consumer has
//! requested them and serializes all delivery through a drain loop, so the
//! observer is never called concurrently and never called while the sink's
//! lock is held. A consumer may therefore call `request` from inside `next`.
//!
//! Values that arrive while there is no outstanding demand are handled by the
//! sink's [`OverflowStrategy`]. Terminal signals are delivered once every
//! queued value has been drained.

use std::{
  collections::VecDeque,
  mem,
  sync::{Arc, Mutex, MutexGuard},
};

use tracing::{trace, warn};

use crate::{
  demand::Demand,
  observer::{BoxedObserver, Observer},
  subscription::{FlowControl, FlowSubscription},
};

/// What a sink does with values that exceed outstanding demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowStrategy {
  /// Queue every value until it is requested.
  #[default]
  Buffer,
  /// Keep only the most recent value beyond the outstanding demand.
  Latest,
  /// Discard values beyond the outstanding demand.
  Drop,
}

type RequestHook = Arc<dyn Fn(i64) + Send + Sync>;
type CancelHook = Box<dyn FnOnce() + Send>;

enum Terminal<Err> {
  Complete,
  Error(Err),
}

struct SinkState<Item, Err> {
  observer: Option<BoxedObserver<Item, Err>>,
  requested: Demand,
  queue: VecDeque<Item>,
  strategy: OverflowStrategy,
  terminal: Option<Terminal<Err>>,
  /// A terminal signal was pushed; producers are ignored from now on.
  done: bool,
  /// The terminal signal reached the observer.
  finished: bool,
  cancelled: bool,
  draining: bool,
  on_request: Option<RequestHook>,
  on_cancel: Option<CancelHook>,
}

struct SinkCore<Item, Err> {
  state: Mutex<SinkState<Item, Err>>,
}

/// Producer handle of a backpressured sink. Clones share the same sink.
pub struct FlowSink<Item, Err> {
  core: Arc<SinkCore<Item, Err>>,
}

impl<Item, Err> Clone for FlowSink<Item, Err> {
  fn clone(&self) -> Self { FlowSink { core: self.core.clone() } }
}

impl<Item, Err> FlowSink<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  pub fn new<O>(observer: O, strategy: OverflowStrategy) -> Self
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let state = SinkState {
      observer: Some(Box::new(observer)),
      requested: Demand::NONE,
      queue: VecDeque::new(),
      strategy,
      terminal: None,
      done: false,
      finished: false,
      cancelled: false,
      draining: false,
      on_request: None,
      on_cancel: None,
    };
    FlowSink { core: Arc::new(SinkCore { state: Mutex::new(state) }) }
  }

  /// The consumer-side handle of this sink.
  pub fn subscription(&self) -> FlowSubscription {
    let control: Arc<dyn FlowControl> = self.core.clone();
    FlowSubscription::from_arc(control)
  }

  /// Called with the raw amount of every positive `request` after the sink has
  /// accounted for it, outside of the sink's lock.
  pub fn on_request(&self, hook: impl Fn(i64) + Send + Sync + 'static) {
    self.core.lock().on_request = Some(Arc::new(hook));
  }

  /// Called once when the consumer cancels. Runs immediately if the consumer
  /// already has.
  pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) {
    let mut state = self.core.lock();
    if state.cancelled {
      drop(state);
      hook();
    } else {
      state.on_cancel = Some(Box::new(hook));
    }
  }

  /// Push a value. Returns `false` if the sink no longer accepts values, in
  /// which case the value was discarded.
  pub fn next(&self, value: Item) -> bool {
    {
      let mut state = self.core.lock();
      if state.done || state.cancelled {
        return false;
      }
      let pending = state.queue.len();
      if state.requested.is_covered_by(pending) {
        match state.strategy {
          OverflowStrategy::Buffer => {}
          OverflowStrategy::Latest => {
            if pending > 0 && state.requested.is_covered_by(pending - 1) {
              trace!(pending, "superseding undelivered element");
              state.queue.pop_back();
            }
          }
          OverflowStrategy::Drop => {
            warn!(pending, "no outstanding demand, dropping element");
            return true;
          }
        }
      }
      state.queue.push_back(value);
    }
    self.core.drain();
    true
  }

  pub fn complete(&self) { self.core.terminate(Terminal::Complete) }

  pub fn error(&self, err: Err) { self.core.terminate(Terminal::Error(err)) }

  /// Whether the consumer cancelled or the stream already terminated.
  pub fn is_closed(&self) -> bool { self.core.is_closed() }

  /// Demand the consumer requested that has not been delivered yet.
  pub fn requested(&self) -> Demand { self.core.lock().requested }
}

impl<Item, Err> SinkCore<Item, Err> {
  fn lock(&self) -> MutexGuard<'_, SinkState<Item, Err>> { self.state.lock().unwrap() }

  fn terminate(&self, terminal: Terminal<Err>) {
    {
      let mut state = self.lock();
      if state.done || state.cancelled {
        return;
      }
      state.done = true;
      state.terminal = Some(terminal);
    }
    self.drain();
  }

  fn drain(&self) {
    let mut observer = {
      let mut state = self.lock();
      if state.draining {
        return;
      }
      match state.observer.take() {
        Some(observer) => {
          state.draining = true;
          observer
        }
        None => return,
      }
    };

    loop {
      let mut state = self.lock();
      if state.cancelled {
        state.draining = false;
        let discarded = mem::take(&mut state.queue);
        drop(state);
        drop(discarded);
        return;
      }

      let value = if state.requested.is_positive() { state.queue.pop_front() } else { None };
      if let Some(value) = value {
        if observer.is_finished() {
          trace!("observer finished, cancelling sink");
          state.draining = false;
          drop(state);
          drop(value);
          self.cancel_with(Some(observer));
          return;
        }
        state.requested.take_one();
        drop(state);
        observer.next(value);
        continue;
      }

      if state.queue.is_empty() {
        if let Some(terminal) = state.terminal.take() {
          state.draining = false;
          state.finished = true;
          state.on_request = None;
          state.on_cancel = None;
          drop(state);
          match terminal {
            Terminal::Complete => observer.complete(),
            Terminal::Error(err) => observer.error(err),
          }
          return;
        }
      }

      state.observer = Some(observer);
      state.draining = false;
      return;
    }
  }

  fn is_closed(&self) -> bool {
    let state = self.lock();
    state.cancelled || state.finished
  }

  /// Cancels the sink. `draining` is the observer taken out by a drain loop
  /// that gave up on it.
  fn cancel_with(&self, draining: Option<BoxedObserver<Item, Err>>) {
    let (observer, queue, hook) = {
      let mut state = self.lock();
      if state.cancelled || state.finished {
        return;
      }
      state.cancelled = true;
      state.done = true;
      state.terminal = None;
      state.on_request = None;
      (state.observer.take(), mem::take(&mut state.queue), state.on_cancel.take())
    };
    drop(draining);
    drop(observer);
    drop(queue);
    if let Some(hook) = hook {
      hook();
    }
  }
}

impl<Item, Err> FlowControl for SinkCore<Item, Err>
where
  Item: Send,
  Err: Send,
{
  fn request(&self, n: i64) {
    let Some(demand) = Demand::from_request(n) else {
      return;
    };
    let hook = {
      let mut state = self.lock();
      if state.cancelled || state.finished {
        return;
      }
      state.requested.add(demand);
      if state.done { None } else { state.on_request.clone() }
    };
    self.drain();
    if let Some(hook) = hook {
      hook(n);
    }
  }

  fn cancel(&self) { self.cancel_with(None) }

  fn is_closed(&self) -> bool { SinkCore::is_closed(self) }
}
