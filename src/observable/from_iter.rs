use std::{
  convert::Infallible,
  sync::{Arc, Mutex},
};

use crate::{
  demand::Demand,
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  sink::{FlowSink, OverflowStrategy},
  subscription::FlowSubscription,
};

/// Source created by [`from_iter`].
#[derive(Clone)]
pub struct FromIter<It> {
  iter: It,
}

/// Emit the elements of `iter` as they are requested, then complete.
///
/// The iterator is created on subscribe and dropped as soon as the stream
/// completes or is cancelled.
pub fn from_iter<It>(iter: It) -> FromIter<It>
where
  It: IntoIterator,
{
  FromIter { iter }
}

/// Source created by [`defer_iter`].
#[derive(Clone)]
pub struct DeferIter<F> {
  factory: F,
}

/// Like [`from_iter`], but the iterator is produced by `factory` when a
/// subscriber arrives. Use this for iterators that hold a lock, such as a
/// locked view over a cache: the lock is taken on subscribe and released when
/// the stream terminates.
pub fn defer_iter<F, It>(factory: F) -> DeferIter<F>
where
  F: FnOnce() -> It,
  It: IntoIterator,
{
  DeferIter { factory }
}

impl<It: IntoIterator> ObservableType for FromIter<It> {
  type Item = It::Item;
  type Err = Infallible;
}

impl<It, O> CoreObservable<O> for FromIter<It>
where
  It: IntoIterator,
  It::IntoIter: Send + 'static,
  It::Item: Send + 'static,
  O: Observer<It::Item, Infallible> + Send + 'static,
{
  type Unsub = FlowSubscription;

  fn actual_subscribe(self, observer: O) -> FlowSubscription {
    let sink = FlowSink::new(observer, OverflowStrategy::Buffer);
    let pull = Arc::new(Puller {
      state: Mutex::new(PullState {
        iter: Some(self.iter.into_iter()),
        pending: Demand::NONE,
        emitting: false,
      }),
      sink: sink.clone(),
    });

    let c_pull = pull.clone();
    sink.on_request(move |n| c_pull.request(n));
    sink.on_cancel(move || pull.release());
    sink.subscription()
  }
}

impl<F, It> ObservableType for DeferIter<F>
where
  F: FnOnce() -> It,
  It: IntoIterator,
{
  type Item = It::Item;
  type Err = Infallible;
}

impl<F, It, O> CoreObservable<O> for DeferIter<F>
where
  F: FnOnce() -> It,
  It: IntoIterator,
  It::IntoIter: Send + 'static,
  It::Item: Send + 'static,
  O: Observer<It::Item, Infallible> + Send + 'static,
{
  type Unsub = FlowSubscription;

  fn actual_subscribe(self, observer: O) -> FlowSubscription { from_iter((self.factory)()).actual_subscribe(observer) }
}

struct PullState<I: Iterator> {
  iter: Option<I>,
  pending: Demand,
  emitting: bool,
}

struct Puller<I: Iterator> {
  state: Mutex<PullState<I>>,
  sink: FlowSink<I::Item, Infallible>,
}

impl<I> Puller<I>
where
  I: Iterator + Send + 'static,
  I::Item: Send + 'static,
{
  fn request(&self, n: i64) {
    let Some(more) = Demand::from_request(n) else {
      return;
    };
    let mut state = self.state.lock().unwrap();
    if state.iter.is_none() {
      return;
    }
    state.pending.add(more);
    if state.emitting {
      return;
    }
    state.emitting = true;

    loop {
      if !state.pending.take_one() {
        state.emitting = false;
        return;
      }
      let Some(iter) = state.iter.as_mut() else {
        state.emitting = false;
        return;
      };
      // Never pull ahead of demand: an iterator without an exact upper bound
      // reveals its end on the pull after its last element.
      let value = iter.next();
      let exhausted = value.is_none() || iter.size_hint().1 == Some(0);
      let released = if exhausted { state.iter.take() } else { None };
      drop(state);
      drop(released);

      let accepted = value.map_or(false, |v| self.sink.next(v));
      if exhausted {
        self.sink.complete();
      }
      state = self.state.lock().unwrap();
      if exhausted || !accepted {
        state.emitting = false;
        let released = state.iter.take();
        drop(state);
        drop(released);
        return;
      }
    }
  }

  fn release(&self) {
    let released = self.state.lock().unwrap().iter.take();
    drop(released);
  }
}
