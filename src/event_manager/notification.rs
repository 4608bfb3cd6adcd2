use std::{fmt::Debug, hash::Hash};

/// Snowflake id of a remote entity such as a guild, channel or user.
pub type EntityId = u64;

/// Type tag of a notification. Kinds form a tree: a notification is
/// delivered to subscribers of its own kind and of every ancestor kind.
pub trait EventKind: Copy + Eq + Hash + Debug + Send + Sync + 'static {
  /// The enclosing category, or `None` for the root.
  fn parent(&self) -> Option<Self>;
}

/// A notification pushed by the remote gateway.
pub trait Notification: Clone + Send + Sync + 'static {
  type Kind: EventKind;

  fn kind(&self) -> Self::Kind;

  /// Whether this notification announces that the client is shutting down.
  fn is_shutdown(&self) -> bool { false }

  /// Report a subscriber that panicked while handling a notification. The
  /// returned notification is dispatched like any other. `None` only logs
  /// the panic.
  fn from_panic(_message: String) -> Option<Self> { None }
}

/// A typed view over the notifications of one kind.
///
/// `KIND` is where subscribers of this view are registered; `extract` pulls
/// the view out of a delivered notification and returns `None` when the
/// notification does not carry it.
pub trait EventVariant<E: Notification>: Sized + Send + 'static {
  const KIND: E::Kind;

  fn extract(event: &E) -> Option<Self>;
}

/// An untyped gateway payload, tagged with the type name it had on the wire.
pub trait RawPayload {
  fn payload_type(&self) -> &str;
}

/// A notification that belongs to an entity of scope `S`, for example the
/// guild a message was posted in. `S` is a marker type naming the scope.
pub trait Scoped<S> {
  fn scope_id(&self) -> Option<EntityId>;
}
