//! Demand-driven bridge over a paginated remote iterator.
//!
//! The bridge owns the iterator exclusively and drives it through one
//! primitive, [`RemoteIterator::deliver_remaining`]. Fetches only start when
//! the consumer has outstanding demand, and at most one fetch is in flight at
//! any time: a `request` that arrives while a fetch is running only raises
//! the demand, and the running fetch picks it up either at the next element
//! boundary or, if it already paused, by chaining another fetch when it
//! finishes.
//!
//! ```text
//!            request(n > 0)                 Ok, demand == 0
//!   Idle ─────────────────────▶ Fetching ─────────────────────▶ Idle
//!                                 │  ▲
//!                                 │  └── Ok, paused with demand > 0
//!                                 ├──── Ok, exhausted ─────────▶ Completed
//!                                 └──── Err ───────────────────▶ Failed
//!   any non-terminal ── cancel ──────────────────────────────────▶ Cancelled
//! ```

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::{future::BoxFuture, task::Spawn};
use tracing::{debug, trace};

use crate::{
  demand::Demand,
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  scheduler::{poll_inline, spawn, Inline},
  sink::{FlowSink, OverflowStrategy},
  subscription::{FlowSubscription, Subscription},
};

/// Element callback handed to [`RemoteIterator::deliver_remaining`]. Returns
/// whether the iterator should keep delivering.
pub type ElementCallback<T> = Box<dyn FnMut(T) -> bool + Send>;

/// A stateful cursor over a paginated remote resource.
pub trait RemoteIterator: Send + 'static {
  type Item: Send + 'static;
  type Error: Send + 'static;

  /// Deliver elements from the current position, fetching further pages as
  /// needed, until `callback` returns `false`, the resource is exhausted, or
  /// a fetch fails.
  ///
  /// When the callback returns `false` the element it was given counts as
  /// consumed and the position stays right after it, so the next call
  /// resumes there. Elements may be delivered before the returned future is
  /// first polled; the future resolves once delivery has stopped.
  fn deliver_remaining(&mut self, callback: ElementCallback<Self::Item>) -> BoxFuture<'static, Result<(), Self::Error>>;

  /// Called once when a bridge takes ownership. Iterators that cache every
  /// element they retrieve should stop doing so here.
  fn on_attach(&mut self) {}
}

/// Lifecycle of a paginated bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeState {
  /// No fetch in flight, waiting for demand.
  #[default]
  Idle,
  /// A fetch is in flight.
  Fetching,
  Completed,
  Cancelled,
  Failed,
}

impl BridgeState {
  #[inline]
  pub fn is_terminal(&self) -> bool {
    matches!(self, BridgeState::Completed | BridgeState::Cancelled | BridgeState::Failed)
  }
}

/// Source created by [`from_pages`] or [`from_pages_with`].
pub struct Paginated<I, S> {
  iterator: I,
  scheduler: S,
  strategy: OverflowStrategy,
}

/// Wrap a paginated remote iterator as a demand-driven source.
///
/// Elements that reach the sink beyond the consumer's demand keep only the
/// most recent one ([`OverflowStrategy::Latest`]).
pub fn from_pages<I, S>(iterator: I, scheduler: S) -> Paginated<I, S>
where
  I: RemoteIterator,
  S: Spawn,
{
  from_pages_with(iterator, scheduler, OverflowStrategy::Latest)
}

/// Like [`from_pages`], with an explicit overflow strategy.
pub fn from_pages_with<I, S>(iterator: I, scheduler: S, strategy: OverflowStrategy) -> Paginated<I, S>
where
  I: RemoteIterator,
  S: Spawn,
{
  Paginated { iterator, scheduler, strategy }
}

impl<I: RemoteIterator, S> ObservableType for Paginated<I, S> {
  type Item = I::Item;
  type Err = I::Error;
}

impl<I, S, O> CoreObservable<O> for Paginated<I, S>
where
  I: RemoteIterator,
  S: Spawn + Send + Sync + 'static,
  O: Observer<I::Item, I::Error> + Send + 'static,
{
  type Unsub = PagesSubscription;

  fn actual_subscribe(mut self, observer: O) -> PagesSubscription {
    self.iterator.on_attach();
    let sink = FlowSink::new(observer, self.strategy);
    let books = Arc::new(Mutex::new(Bookkeeping::default()));
    let bridge = Arc::new(PageBridge {
      iterator: Mutex::new(self.iterator),
      books: books.clone(),
      sink: sink.clone(),
      scheduler: self.scheduler,
    });

    let c_bridge = bridge.clone();
    sink.on_request(move |n| c_bridge.request(n));
    sink.on_cancel(move || bridge.cancel());
    PagesSubscription { flow: sink.subscription(), books }
  }
}

/// Subscription handle of a paginated source.
#[derive(Clone)]
pub struct PagesSubscription {
  flow: FlowSubscription,
  books: Arc<Mutex<Bookkeeping>>,
}

impl PagesSubscription {
  pub fn state(&self) -> BridgeState { self.books.lock().unwrap().state }
}

impl Subscription for PagesSubscription {
  #[inline]
  fn request(&self, n: i64) { self.flow.request(n) }

  #[inline]
  fn unsubscribe(self) { self.flow.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.flow.is_closed() }
}

#[derive(Default)]
struct Bookkeeping {
  state: BridgeState,
  demand: Demand,
  /// The running fetch stopped because demand ran out.
  paused: bool,
}

struct PageBridge<I: RemoteIterator, S> {
  iterator: Mutex<I>,
  books: Arc<Mutex<Bookkeeping>>,
  sink: FlowSink<I::Item, I::Error>,
  scheduler: S,
}

impl<I, S> PageBridge<I, S>
where
  I: RemoteIterator,
  S: Spawn + Send + Sync + 'static,
{
  fn books(&self) -> MutexGuard<'_, Bookkeeping> { self.books.lock().unwrap() }

  fn request(self: &Arc<Self>, n: i64) {
    let Some(more) = Demand::from_request(n) else {
      return;
    };
    {
      let mut books = self.books();
      if books.state.is_terminal() || books.demand.is_unbounded() {
        return;
      }
      books.demand.add(more);
      trace!(n, demand = ?books.demand, state = ?books.state, "demand signalled");
      if books.state == BridgeState::Fetching {
        return;
      }
      books.state = BridgeState::Fetching;
    }
    self.clone().drive();
  }

  fn cancel(&self) {
    let mut books = self.books();
    if !books.state.is_terminal() {
      debug!(from = ?books.state, "paginated bridge cancelled");
      books.state = BridgeState::Cancelled;
    }
  }

  /// Runs fetches back to back for as long as each one finishes with demand
  /// left over. Ready fetches are looped here; the first pending one moves
  /// the loop onto the scheduler.
  fn drive(self: Arc<Self>) {
    loop {
      let attempt = self.start_attempt();
      match poll_inline(attempt) {
        Inline::Ready(result) => {
          if !self.finish_attempt(result) {
            return;
          }
        }
        Inline::Pending(attempt) => {
          let bridge = self.clone();
          spawn(&self.scheduler, async move {
            let result = attempt.await;
            if bridge.finish_attempt(result) {
              bridge.drive();
            }
          });
          return;
        }
      }
    }
  }

  fn start_attempt(self: &Arc<Self>) -> BoxFuture<'static, Result<(), I::Error>> {
    self.books().paused = false;
    trace!("starting fetch");
    let bridge = Arc::downgrade(self);
    let callback: ElementCallback<I::Item> = Box::new(move |item| Self::on_element(&bridge, item));
    self.iterator.lock().unwrap().deliver_remaining(callback)
  }

  fn on_element(bridge: &Weak<Self>, item: I::Item) -> bool {
    let Some(bridge) = bridge.upgrade() else {
      return false;
    };
    {
      let mut books = bridge.books();
      if books.state.is_terminal() {
        trace!(state = ?books.state, "bridge terminal, discarding element");
        return false;
      }
      books.demand.take_one();
    }

    if !bridge.sink.next(item) {
      // The consumer cancelled and the cancel hook has not reached us yet.
      let mut books = bridge.books();
      if !books.state.is_terminal() {
        debug!(from = ?books.state, "sink closed, paginated bridge cancelled");
        books.state = BridgeState::Cancelled;
      }
      return false;
    }

    let mut books = bridge.books();
    let more = !books.state.is_terminal() && books.demand.is_positive();
    if !more {
      books.paused = true;
    }
    more
  }

  /// Settles a finished fetch. Returns whether another fetch should start.
  fn finish_attempt(&self, result: Result<(), I::Error>) -> bool {
    let mut books = self.books();
    if books.state.is_terminal() {
      return false;
    }
    match result {
      Err(err) => {
        books.state = BridgeState::Failed;
        drop(books);
        debug!("paginated bridge failed");
        self.sink.error(err);
        false
      }
      Ok(()) if !books.demand.is_positive() => {
        books.state = BridgeState::Idle;
        debug!("demand satisfied, bridge idle");
        false
      }
      Ok(()) if books.paused => {
        trace!(demand = ?books.demand, "demand arrived while pausing, chaining fetch");
        true
      }
      Ok(()) => {
        books.state = BridgeState::Completed;
        drop(books);
        debug!("remote iterator exhausted");
        self.sink.complete();
        false
      }
    }
  }
}
