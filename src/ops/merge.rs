//! Merge Operator
//!
//! Subscribes to every source at once and forwards their elements, in arrival
//! order, into one backpressured sink. The merged stream completes when all
//! sources have completed and fails on the first error, cancelling the
//! sources still running. Each source is drained eagerly; the consumer's
//! demand is applied by the merged sink.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::{
  demand::UNBOUNDED,
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  sink::{FlowSink, OverflowStrategy},
  subscription::{FlowSubscription, Subscription},
};

/// Source merging several sources of one type.
pub struct Merge<Src> {
  pub(crate) sources: Vec<Src>,
  pub(crate) strategy: OverflowStrategy,
}

impl<Src: Clone> Clone for Merge<Src> {
  fn clone(&self) -> Self { Merge { sources: self.sources.clone(), strategy: self.strategy } }
}

pub(crate) fn merge<Src>(sources: impl IntoIterator<Item = Src>, strategy: OverflowStrategy) -> Merge<Src> {
  Merge { sources: sources.into_iter().collect(), strategy }
}

impl<Src> Merge<Src> {
  pub(crate) fn map_sources(self, f: impl FnMut(Src) -> Src) -> Self {
    Merge { sources: self.sources.into_iter().map(f).collect(), strategy: self.strategy }
  }
}

impl<Src: ObservableType> ObservableType for Merge<Src> {
  type Item = Src::Item;
  type Err = Src::Err;
}

type Cancel = Box<dyn FnOnce() + Send>;

struct Merging {
  /// Sources that have not completed yet.
  remaining: usize,
  /// `None` once the merged stream terminated or was cancelled.
  inners: Option<Vec<Cancel>>,
}

struct Shared<Item, Err> {
  sink: FlowSink<Item, Err>,
  merging: Mutex<Merging>,
}

impl<Item, Err> Shared<Item, Err> {
  fn cancel_inners(&self) {
    let inners = self.merging.lock().unwrap().inners.take();
    for cancel in inners.into_iter().flatten() {
      cancel();
    }
  }
}

/// Observer attached to each merged source.
pub struct MergeObserver<Item, Err> {
  shared: Arc<Shared<Item, Err>>,
}

impl<Item, Err> Observer<Item, Err> for MergeObserver<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.shared.sink.next(value); }

  fn error(self, err: Err) {
    let inners = self.shared.merging.lock().unwrap().inners.take();
    if let Some(inners) = inners {
      debug!(cancelled = inners.len(), "merged source failed");
      for cancel in inners {
        cancel();
      }
      self.shared.sink.error(err);
    }
  }

  fn complete(self) {
    let last = {
      let mut merging = self.shared.merging.lock().unwrap();
      merging.remaining = merging.remaining.saturating_sub(1);
      merging.remaining == 0 && merging.inners.take().is_some()
    };
    if last {
      self.shared.sink.complete();
    }
  }

  fn is_finished(&self) -> bool { self.shared.sink.is_closed() }
}

impl<Src, O> CoreObservable<O> for Merge<Src>
where
  Src: CoreObservable<MergeObserver<<Src as ObservableType>::Item, <Src as ObservableType>::Err>>,
  Src::Unsub: Clone + Send + 'static,
  Src::Item: Send + 'static,
  Src::Err: Send + 'static,
  O: Observer<Src::Item, Src::Err> + Send + 'static,
{
  type Unsub = FlowSubscription;

  fn actual_subscribe(self, observer: O) -> FlowSubscription {
    let sink = FlowSink::new(observer, self.strategy);
    if self.sources.is_empty() {
      sink.complete();
      return sink.subscription();
    }

    let merging = Merging { remaining: self.sources.len(), inners: Some(Vec::with_capacity(self.sources.len())) };
    let shared = Arc::new(Shared { sink: sink.clone(), merging: Mutex::new(merging) });
    let c_shared = shared.clone();
    sink.on_cancel(move || c_shared.cancel_inners());

    for source in self.sources {
      if shared.merging.lock().unwrap().inners.is_none() {
        break;
      }
      let unsub = source.actual_subscribe(MergeObserver { shared: shared.clone() });
      let c_unsub = unsub.clone();
      let cancel: Cancel = Box::new(move || c_unsub.unsubscribe());
      let rejected = match shared.merging.lock().unwrap().inners.as_mut() {
        Some(inners) => {
          inners.push(cancel);
          None
        }
        None => Some(cancel),
      };
      if let Some(cancel) = rejected {
        cancel();
        break;
      }
      unsub.request(UNBOUNDED);
    }
    sink.subscription()
  }
}
