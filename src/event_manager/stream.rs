use std::{convert::Infallible, marker::PhantomData, sync::Arc};

use tracing::debug;

use super::{
  notification::{EntityId, EventVariant, Notification, Scoped},
  EventMultiplexer,
};
use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  sink::FlowSink,
  subscription::{FlowSubscription, Subscription},
};

pub(crate) type Filter<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// A live stream of one notification variant, created by
/// [`EventMultiplexer::on`].
///
/// The stream is cold: each subscription registers its own sink with the
/// multiplexer and is removed again when it is cancelled. It never completes
/// on its own, only when the multiplexer shuts down.
pub struct EventStream<E: Notification, V> {
  manager: Arc<EventMultiplexer<E>>,
  filter: Option<Filter<V>>,
  _variant: PhantomData<fn() -> V>,
}

impl<E: Notification, V> Clone for EventStream<E, V> {
  fn clone(&self) -> Self {
    EventStream { manager: self.manager.clone(), filter: self.filter.clone(), _variant: PhantomData }
  }
}

impl<E, V> EventStream<E, V>
where
  E: Notification,
  V: EventVariant<E>,
{
  pub(crate) fn new(manager: Arc<EventMultiplexer<E>>) -> Self {
    EventStream { manager, filter: None, _variant: PhantomData }
  }

  /// Keep only the notifications matching `predicate`, in addition to any
  /// filter already applied.
  pub fn filter<F>(self, predicate: F) -> Self
  where
    F: Fn(&V) -> bool + Send + Sync + 'static,
  {
    let filter: Filter<V> = match self.filter {
      Some(prev) => Arc::new(move |v: &V| prev(v) && predicate(v)),
      None => Arc::new(predicate),
    };
    EventStream { manager: self.manager, filter: Some(filter), _variant: PhantomData }
  }

  /// Keep only the notifications that belong to entity `id` of scope `S`.
  pub fn within<S: 'static>(self, id: EntityId) -> Self
  where
    V: Scoped<S>,
  {
    self.filter(move |v: &V| <V as Scoped<S>>::scope_id(v) == Some(id))
  }
}

impl<E: Notification, V> ObservableType for EventStream<E, V> {
  type Item = V;
  type Err = Infallible;
}

impl<E, V, O> CoreObservable<O> for EventStream<E, V>
where
  E: Notification,
  V: EventVariant<E>,
  O: Observer<V, Infallible> + Send + 'static,
{
  type Unsub = FlowSubscription;

  fn actual_subscribe(self, observer: O) -> FlowSubscription {
    let sink = FlowSink::new(observer, self.manager.overflow);
    let entry: Arc<dyn DynSink<E>> = Arc::new(VariantSink { sink: sink.clone(), filter: self.filter });

    let kind = <V as EventVariant<E>>::KIND;
    let Some(id) = self.manager.register(kind, entry) else {
      sink.complete();
      return sink.subscription();
    };
    debug!(manager = %self.manager.name, ?kind, id, "event stream subscribed");

    let manager = Arc::downgrade(&self.manager);
    sink.on_cancel(move || {
      if let Some(manager) = manager.upgrade() {
        manager.unregister(kind, id);
      }
    });
    sink.subscription()
  }
}

/// Registry entry of one subscription, erased over the variant type.
pub(crate) trait DynSink<E>: Send + Sync {
  fn deliver(&self, event: &E);
  fn complete(&self);
  fn cancel(&self);
  fn is_closed(&self) -> bool;
}

struct VariantSink<V> {
  sink: FlowSink<V, Infallible>,
  filter: Option<Filter<V>>,
}

impl<E, V> DynSink<E> for VariantSink<V>
where
  E: Notification,
  V: EventVariant<E>,
{
  fn deliver(&self, event: &E) {
    let Some(value) = <V as EventVariant<E>>::extract(event) else {
      return;
    };
    if self.filter.as_ref().map_or(true, |keep| keep(&value)) {
      self.sink.next(value);
    }
  }

  fn complete(&self) { self.sink.complete() }

  fn cancel(&self) { self.sink.subscription().unsubscribe() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}
