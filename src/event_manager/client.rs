use std::sync::Arc;

use super::{
  notification::{EntityId, EventVariant, Notification, RawPayload, Scoped},
  EventMultiplexer, EventStream,
};
use crate::{
  error::ConfigurationError,
  ops::merge::{merge, Merge},
  sink::OverflowStrategy,
};

/// A client that may carry an event multiplexer.
pub trait EventSource<E: Notification> {
  fn event_manager(&self) -> Option<Arc<EventMultiplexer<E>>>;
}

/// Observe notifications straight from a client.
pub trait ClientEventsExt<E: Notification>: EventSource<E> {
  /// A stream of `V` from the client's multiplexer.
  ///
  /// Fails synchronously with [`ConfigurationError::NoEventManager`] when
  /// the client has none installed.
  fn on<V: EventVariant<E>>(&self) -> Result<EventStream<E, V>, ConfigurationError> {
    self
      .event_manager()
      .map(|manager| manager.on::<V>())
      .ok_or(ConfigurationError::NoEventManager)
  }

  /// [`EventMultiplexer::on_raw`] on the client's multiplexer.
  fn on_raw<V>(&self, types: &[&str]) -> Result<EventStream<E, V>, ConfigurationError>
  where
    V: EventVariant<E> + RawPayload,
  {
    self
      .event_manager()
      .map(|manager| manager.on_raw::<V>(types))
      .ok_or(ConfigurationError::NoEventManager)
  }
}

impl<E: Notification, T: EventSource<E> + ?Sized> ClientEventsExt<E> for T {}

/// The live streams of several clients merged into one, created by
/// [`on_all`].
pub type MergedEvents<E, V> = Merge<EventStream<E, V>>;

/// A stream of `V` from every client in `clients`, such as all the shards of
/// one application.
///
/// Each subscription registers with every client's multiplexer. The merged
/// stream completes once all of them have shut down, and it uses the overflow
/// strategy of the first client. Fails synchronously with
/// [`ConfigurationError::NoEventManager`] if any client has no multiplexer.
pub fn on_all<E, V, C>(clients: &[C]) -> Result<MergedEvents<E, V>, ConfigurationError>
where
  E: Notification,
  V: EventVariant<E>,
  C: EventSource<E>,
{
  let managers = clients
    .iter()
    .map(|client| client.event_manager().ok_or(ConfigurationError::NoEventManager))
    .collect::<Result<Vec<_>, _>>()?;
  let overflow = managers.first().map_or(OverflowStrategy::Buffer, |manager| manager.overflow);
  Ok(merge(managers.iter().map(|manager| manager.on::<V>()), overflow))
}

impl<E, V> Merge<EventStream<E, V>>
where
  E: Notification,
  V: EventVariant<E>,
{
  /// [`EventStream::filter`] applied to every client's stream.
  pub fn filter<F>(self, predicate: F) -> Self
  where
    F: Fn(&V) -> bool + Send + Sync + 'static,
  {
    let predicate = Arc::new(predicate);
    self.map_sources(|stream| {
      let predicate = predicate.clone();
      stream.filter(move |v: &V| predicate(v))
    })
  }

  /// [`EventStream::within`] applied to every client's stream.
  pub fn within<S: 'static>(self, id: EntityId) -> Self
  where
    V: Scoped<S>,
  {
    self.map_sources(|stream| stream.within::<S>(id))
  }
}
