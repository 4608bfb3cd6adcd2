//! Fan-out of gateway notifications to typed, filtered streams.
//!
//! An [`EventMultiplexer`] is fed every notification the client receives
//! through [`EventMultiplexer::handle`] and hands each one to the live
//! subscriptions registered for its kind or any ancestor kind. Subscriptions
//! are created with [`EventMultiplexer::on`], narrowed with
//! [`EventStream::filter`] and [`EventStream::within`], and removed again
//! when they are cancelled.
//!
//! ```rust
//! use rxremote::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum Kind { Any, Ready }
//!
//! impl EventKind for Kind {
//!   fn parent(&self) -> Option<Kind> { (*self != Kind::Any).then_some(Kind::Any) }
//! }
//!
//! #[derive(Clone)]
//! struct Event(Kind);
//!
//! impl Notification for Event {
//!   type Kind = Kind;
//!   fn kind(&self) -> Kind { self.0 }
//! }
//!
//! struct Ready;
//!
//! impl EventVariant<Event> for Ready {
//!   const KIND: Kind = Kind::Ready;
//!   fn extract(event: &Event) -> Option<Self> { (event.0 == Kind::Ready).then_some(Ready) }
//! }
//!
//! let events = EventMultiplexer::<Event>::new();
//! let seen = Arc::new(Mutex::new(0));
//! let c_seen = seen.clone();
//! events.on::<Ready>().subscribe(move |_| *c_seen.lock().unwrap() += 1);
//!
//! events.handle(Event(Kind::Ready));
//! events.handle(Event(Kind::Any));
//! assert_eq!(*seen.lock().unwrap(), 1);
//! ```

use std::{
  any::Any,
  collections::{HashMap, VecDeque},
  panic::{catch_unwind, AssertUnwindSafe},
  sync::{Arc, Mutex, MutexGuard},
  thread,
};

use tracing::{debug, debug_span, error, trace};

use crate::{sink::OverflowStrategy, subscription::DynamicSubscriptions};

mod client;
mod notification;
mod stream;

pub use client::{on_all, ClientEventsExt, EventSource, MergedEvents};
pub use notification::{EntityId, EventKind, EventVariant, Notification, RawPayload, Scoped};
pub use stream::EventStream;
use stream::DynSink;

type Sinks<E> = DynamicSubscriptions<Arc<dyn DynSink<E>>>;

struct Registry<E: Notification> {
  sinks: HashMap<E::Kind, Sinks<E>>,
  /// Ids are unique across kinds and for the multiplexer's whole lifetime.
  next_id: usize,
  shut_down: bool,
}

struct Queued<E> {
  event: E,
  /// Built by `Notification::from_panic`; a panic while delivering it is
  /// only logged.
  from_panic: bool,
}

struct Dispatch<E> {
  queue: VecDeque<Queued<E>>,
  dispatching: bool,
}

/// Clears the dispatching flag if the dispatch loop unwinds.
struct DispatchLoop<'a, E: Notification>(&'a EventMultiplexer<E>);

impl<E: Notification> Drop for DispatchLoop<'_, E> {
  fn drop(&mut self) {
    if thread::panicking() {
      self.0.dispatch().dispatching = false;
    }
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_owned()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "subscriber panicked".to_owned()
  }
}

/// Routes notifications to the streams subscribed to their kind.
pub struct EventMultiplexer<E: Notification> {
  pub(crate) name: String,
  pub(crate) overflow: OverflowStrategy,
  complete_on_shutdown: bool,
  registry: Mutex<Registry<E>>,
  dispatch: Mutex<Dispatch<E>>,
}

/// Configures an [`EventMultiplexer`].
#[derive(Debug, Clone)]
pub struct EventMultiplexerBuilder {
  name: String,
  overflow: OverflowStrategy,
  complete_on_shutdown: bool,
}

impl Default for EventMultiplexerBuilder {
  fn default() -> Self {
    EventMultiplexerBuilder { name: "events".to_owned(), overflow: OverflowStrategy::Buffer, complete_on_shutdown: true }
  }
}

impl EventMultiplexerBuilder {
  /// Name recorded on the multiplexer's tracing spans.
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// What each stream does with notifications that arrive while its
  /// consumer has no outstanding demand. Defaults to buffering.
  pub fn overflow(mut self, overflow: OverflowStrategy) -> Self {
    self.overflow = overflow;
    self
  }

  /// Whether a shutdown notification completes every stream after it has
  /// been delivered. Enabled by default.
  pub fn complete_on_shutdown(mut self, enabled: bool) -> Self {
    self.complete_on_shutdown = enabled;
    self
  }

  pub fn build<E: Notification>(self) -> Arc<EventMultiplexer<E>> {
    Arc::new(EventMultiplexer {
      name: self.name,
      overflow: self.overflow,
      complete_on_shutdown: self.complete_on_shutdown,
      registry: Mutex::new(Registry { sinks: HashMap::new(), next_id: 0, shut_down: false }),
      dispatch: Mutex::new(Dispatch { queue: VecDeque::new(), dispatching: false }),
    })
  }
}

impl<E: Notification> EventMultiplexer<E> {
  /// A multiplexer with the default configuration.
  pub fn new() -> Arc<Self> { Self::builder().build() }

  pub fn builder() -> EventMultiplexerBuilder { EventMultiplexerBuilder::default() }

  pub fn name(&self) -> &str { &self.name }

  /// A stream of every notification that carries a `V`.
  pub fn on<V: EventVariant<E>>(self: &Arc<Self>) -> EventStream<E, V> { EventStream::new(self.clone()) }

  /// A stream of raw payloads whose wire type is one of `types`. Nothing
  /// arrives unless the client forwards raw payloads at all.
  pub fn on_raw<V>(self: &Arc<Self>, types: &[&str]) -> EventStream<E, V>
  where
    V: EventVariant<E> + RawPayload,
  {
    let types: Vec<String> = types.iter().map(|t| (*t).to_owned()).collect();
    self.on::<V>().filter(move |raw: &V| types.iter().any(|t| t == raw.payload_type()))
  }

  /// Deliver `event` to every matching subscription.
  ///
  /// Notifications are delivered one at a time in the order they were
  /// handed in. A call made while another thread, or a subscriber of this
  /// multiplexer, is already dispatching queues the event and returns; the
  /// running dispatch loop delivers it.
  ///
  /// A subscriber that panics is cancelled and the other subscribers still
  /// receive the notification. The panic is logged and, if
  /// [`Notification::from_panic`] builds one, reported as a notification of
  /// its own.
  pub fn handle(&self, event: E) { self.enqueue(Queued { event, from_panic: false }) }

  fn enqueue(&self, queued: Queued<E>) {
    {
      let mut dispatch = self.dispatch();
      dispatch.queue.push_back(queued);
      if dispatch.dispatching {
        return;
      }
      dispatch.dispatching = true;
    }

    let _span = debug_span!("event_manager", name = %self.name).entered();
    let _guard = DispatchLoop(self);
    loop {
      let queued = {
        let mut dispatch = self.dispatch();
        match dispatch.queue.pop_front() {
          Some(queued) => queued,
          None => {
            dispatch.dispatching = false;
            return;
          }
        }
      };
      self.dispatch_one(&queued);
    }
  }

  /// Complete every live stream. Streams subscribed afterwards complete
  /// immediately.
  pub fn shutdown(&self) {
    let sinks: Vec<_> = {
      let mut registry = self.registry();
      registry.shut_down = true;
      registry.sinks.drain().flat_map(|(_, mut sinks)| sinks.drain().collect::<Vec<_>>()).collect()
    };
    debug!(manager = %self.name, streams = sinks.len(), "event manager shut down");
    for sink in sinks {
      if let Err(panic) = catch_unwind(AssertUnwindSafe(|| sink.complete())) {
        error!(manager = %self.name, message = %panic_message(&*panic), "subscriber panicked on completion");
      }
    }
  }

  /// Number of live subscriptions across all kinds.
  pub fn subscriber_count(&self) -> usize {
    self.registry().sinks.values().map(|sinks| sinks.iter().filter(|s| !s.is_closed()).count()).sum()
  }

  fn dispatch_one(&self, queued: &Queued<E>) {
    let event = &queued.event;
    let kind = event.kind();
    let targets = {
      let mut registry = self.registry();
      let mut targets = Vec::new();
      let mut next = Some(kind);
      while let Some(k) = next {
        let emptied = match registry.sinks.get_mut(&k) {
          Some(sinks) => {
            sinks.retain(|s| !s.is_closed());
            targets.extend(sinks.iter().cloned());
            sinks.is_empty()
          }
          None => false,
        };
        if emptied {
          registry.sinks.remove(&k);
        }
        next = k.parent();
      }
      targets
    };
    trace!(?kind, subscribers = targets.len(), "dispatching notification");

    for sink in &targets {
      let Err(panic) = catch_unwind(AssertUnwindSafe(|| sink.deliver(event))) else {
        continue;
      };
      let message = panic_message(&*panic);
      error!(manager = %self.name, ?kind, %message, "subscriber panicked, cancelling it");
      sink.cancel();
      if queued.from_panic {
        continue;
      }
      if let Some(report) = E::from_panic(message) {
        self.dispatch().queue.push_back(Queued { event: report, from_panic: true });
      }
    }
    if self.complete_on_shutdown && event.is_shutdown() {
      self.shutdown();
    }
  }

  /// Returns `None` once the multiplexer has shut down.
  pub(crate) fn register(&self, kind: E::Kind, sink: Arc<dyn DynSink<E>>) -> Option<usize> {
    let mut registry = self.registry();
    if registry.shut_down {
      return None;
    }
    let id = registry.next_id;
    registry.next_id += 1;
    registry.sinks.entry(kind).or_default().insert(id, sink);
    Some(id)
  }

  pub(crate) fn unregister(&self, kind: E::Kind, id: usize) {
    let removed = {
      let mut registry = self.registry();
      let Some(sinks) = registry.sinks.get_mut(&kind) else {
        return;
      };
      let removed = sinks.remove(id);
      if sinks.is_empty() {
        registry.sinks.remove(&kind);
      }
      removed
    };
    if removed.is_some() {
      debug!(manager = %self.name, ?kind, id, "event stream unsubscribed");
    }
  }

  fn registry(&self) -> MutexGuard<'_, Registry<E>> { self.registry.lock().unwrap() }

  fn dispatch(&self) -> MutexGuard<'_, Dispatch<E>> { self.dispatch.lock().unwrap() }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    observable::Observable,
    observer::ObserverAll,
    subscription::{FlowSubscription, Subscription},
  };
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
  enum Kind {
    Any,
    Message,
    MessageCreated,
    MessageDeleted,
    MemberJoined,
    Raw,
    SubscriberFailed,
    Shutdown,
  }

  impl EventKind for Kind {
    fn parent(&self) -> Option<Kind> {
      match self {
        Kind::Any => None,
        Kind::MessageCreated | Kind::MessageDeleted => Some(Kind::Message),
        _ => Some(Kind::Any),
      }
    }
  }

  #[derive(Clone, Debug, PartialEq)]
  enum Event {
    MessageCreated { guild: Option<u64>, text: &'static str },
    MessageDeleted { guild: Option<u64> },
    MemberJoined { guild: u64, user: u64 },
    Raw { op: &'static str },
    SubscriberFailed(String),
    Shutdown,
  }

  impl Notification for Event {
    type Kind = Kind;

    fn kind(&self) -> Kind {
      match self {
        Event::MessageCreated { .. } => Kind::MessageCreated,
        Event::MessageDeleted { .. } => Kind::MessageDeleted,
        Event::MemberJoined { .. } => Kind::MemberJoined,
        Event::Raw { .. } => Kind::Raw,
        Event::SubscriberFailed(_) => Kind::SubscriberFailed,
        Event::Shutdown => Kind::Shutdown,
      }
    }

    fn is_shutdown(&self) -> bool { matches!(self, Event::Shutdown) }

    fn from_panic(message: String) -> Option<Self> { Some(Event::SubscriberFailed(message)) }
  }

  struct Guild;
  struct User;

  #[derive(Debug, PartialEq)]
  struct Created(&'static str);

  impl EventVariant<Event> for Created {
    const KIND: Kind = Kind::MessageCreated;
    fn extract(event: &Event) -> Option<Self> {
      match event {
        Event::MessageCreated { text, .. } => Some(Created(*text)),
        _ => None,
      }
    }
  }

  /// Any message event, for category subscriptions.
  struct MessageEvent(Option<u64>);

  impl EventVariant<Event> for MessageEvent {
    const KIND: Kind = Kind::Message;
    fn extract(event: &Event) -> Option<Self> {
      match event {
        Event::MessageCreated { guild, .. } | Event::MessageDeleted { guild } => Some(MessageEvent(*guild)),
        _ => None,
      }
    }
  }

  impl Scoped<Guild> for MessageEvent {
    fn scope_id(&self) -> Option<EntityId> { self.0 }
  }

  struct Joined {
    guild: u64,
    user: u64,
  }

  impl EventVariant<Event> for Joined {
    const KIND: Kind = Kind::MemberJoined;
    fn extract(event: &Event) -> Option<Self> {
      match event {
        Event::MemberJoined { guild, user } => Some(Joined { guild: *guild, user: *user }),
        _ => None,
      }
    }
  }

  impl Scoped<Guild> for Joined {
    fn scope_id(&self) -> Option<EntityId> { Some(self.guild) }
  }

  impl Scoped<User> for Joined {
    fn scope_id(&self) -> Option<EntityId> { Some(self.user) }
  }

  struct Raw(&'static str);

  impl EventVariant<Event> for Raw {
    const KIND: Kind = Kind::Raw;
    fn extract(event: &Event) -> Option<Self> {
      match event {
        Event::Raw { op } => Some(Raw(*op)),
        _ => None,
      }
    }
  }

  impl RawPayload for Raw {
    fn payload_type(&self) -> &str { self.0 }
  }

  struct Failed(String);

  impl EventVariant<Event> for Failed {
    const KIND: Kind = Kind::SubscriberFailed;
    fn extract(event: &Event) -> Option<Self> {
      match event {
        Event::SubscriberFailed(message) => Some(Failed(message.clone())),
        _ => None,
      }
    }
  }

  struct AnyEvent(Event);

  impl EventVariant<Event> for AnyEvent {
    const KIND: Kind = Kind::Any;
    fn extract(event: &Event) -> Option<Self> { Some(AnyEvent(event.clone())) }
  }

  fn created(text: &'static str) -> Event { Event::MessageCreated { guild: Some(1), text } }

  #[test]
  fn each_subscriber_sees_its_kind_once() {
    let events = EventMultiplexer::<Event>::new();
    let (a1, a2, b) = (Arc::new(Mutex::new(vec![])), Arc::new(Mutex::new(vec![])), Arc::new(AtomicUsize::new(0)));
    let (c_a1, c_a2, c_b) = (a1.clone(), a2.clone(), b.clone());
    events.on::<Created>().subscribe(move |v| c_a1.lock().unwrap().push(v.0));
    events.on::<Created>().subscribe(move |v| c_a2.lock().unwrap().push(v.0));
    events.on::<Joined>().subscribe(move |_| {
      c_b.fetch_add(1, Ordering::SeqCst);
    });

    events.handle(created("hello"));
    events.handle(created("world"));

    assert_eq!(*a1.lock().unwrap(), vec!["hello", "world"]);
    assert_eq!(*a2.lock().unwrap(), vec!["hello", "world"]);
    assert_eq!(b.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn category_subscription_matches_child_kinds() {
    let events = EventMultiplexer::<Event>::new();
    let messages = Arc::new(AtomicUsize::new(0));
    let everything = Arc::new(AtomicUsize::new(0));
    let (c_messages, c_everything) = (messages.clone(), everything.clone());
    events.on::<MessageEvent>().subscribe(move |_| {
      c_messages.fetch_add(1, Ordering::SeqCst);
    });
    events.on::<AnyEvent>().subscribe(move |_| {
      c_everything.fetch_add(1, Ordering::SeqCst);
    });

    events.handle(created("a"));
    events.handle(Event::MessageDeleted { guild: None });
    events.handle(Event::MemberJoined { guild: 1, user: 2 });

    assert_eq!(messages.load(Ordering::SeqCst), 2);
    assert_eq!(everything.load(Ordering::SeqCst), 3);
  }

  #[test]
  fn scoping_filters_compose() {
    let events = EventMultiplexer::<Event>::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    events
      .on::<Joined>()
      .within::<Guild>(7)
      .within::<User>(42)
      .subscribe(move |j| c_seen.lock().unwrap().push((j.guild, j.user)));

    events.handle(Event::MemberJoined { guild: 7, user: 42 });
    events.handle(Event::MemberJoined { guild: 7, user: 43 });
    events.handle(Event::MemberJoined { guild: 8, user: 42 });

    assert_eq!(*seen.lock().unwrap(), vec![(7, 42)]);
  }

  #[test]
  fn unscoped_notifications_fail_scope_filter() {
    let events = EventMultiplexer::<Event>::new();
    let seen = Arc::new(AtomicUsize::new(0));
    let c_seen = seen.clone();
    events.on::<MessageEvent>().within::<Guild>(1).subscribe(move |_| {
      c_seen.fetch_add(1, Ordering::SeqCst);
    });
    events.handle(Event::MessageDeleted { guild: None });
    events.handle(Event::MessageDeleted { guild: Some(1) });
    assert_eq!(seen.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn unsubscribe_removes_registration() {
    let events = EventMultiplexer::<Event>::new();
    let seen = Arc::new(AtomicUsize::new(0));
    let c_seen = seen.clone();
    let subscription = events.on::<Created>().subscribe(move |_| {
      c_seen.fetch_add(1, Ordering::SeqCst);
    });
    events.handle(created("one"));
    assert_eq!(events.subscriber_count(), 1);

    subscription.unsubscribe();
    assert_eq!(events.subscriber_count(), 0);
    events.handle(created("two"));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn shutdown_event_is_delivered_then_completes() {
    let events = EventMultiplexer::<Event>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    events.on::<AnyEvent>().subscribe_all(
      move |e| l1.lock().unwrap().push(format!("{:?}", e.0)),
      |_| {},
      move || l2.lock().unwrap().push("complete".to_owned()),
    );
    events.handle(Event::Shutdown);
    assert_eq!(*log.lock().unwrap(), vec!["Shutdown", "complete"]);

    let late = Arc::new(AtomicUsize::new(0));
    let c_late = late.clone();
    events.on::<AnyEvent>().subscribe_all(
      |_| {},
      |_| {},
      move || {
        c_late.fetch_add(1, Ordering::SeqCst);
      },
    );
    assert_eq!(late.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn shutdown_completion_can_be_disabled() {
    let events = EventMultiplexer::<Event>::builder().name("gateway").complete_on_shutdown(false).build::<Event>();
    assert_eq!(events.name(), "gateway");
    let completed = Arc::new(AtomicUsize::new(0));
    let c_completed = completed.clone();
    events.on::<AnyEvent>().subscribe_all(
      |_| {},
      |_| {},
      move || {
        c_completed.fetch_add(1, Ordering::SeqCst);
      },
    );
    events.handle(Event::Shutdown);
    assert_eq!(completed.load(Ordering::SeqCst), 0);
    events.shutdown();
    assert_eq!(completed.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn reentrant_handle_keeps_arrival_order() {
    let events = EventMultiplexer::<Event>::new();
    let order = Arc::new(Mutex::new(vec![]));
    let (c_order, c_events) = (order.clone(), events.clone());
    events.on::<Created>().subscribe(move |v| {
      c_order.lock().unwrap().push(v.0);
      if v.0 == "first" {
        c_events.handle(created("from inside"));
      }
    });
    let c_order = order.clone();
    events.on::<Created>().subscribe(move |v| c_order.lock().unwrap().push(v.0));

    events.handle(created("first"));
    assert_eq!(*order.lock().unwrap(), vec!["first", "first", "from inside", "from inside"]);
  }

  #[test]
  fn slow_consumer_gets_buffered_notifications() {
    let events = EventMultiplexer::<Event>::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let subscription: FlowSubscription = events.on::<Created>().subscribe_flow(ObserverAll::new(
      move |v: Created| c_seen.lock().unwrap().push(v.0),
      |_| {},
      || {},
    ));
    events.handle(created("a"));
    events.handle(created("b"));
    events.handle(created("c"));
    assert!(seen.lock().unwrap().is_empty());
    subscription.request(2);
    assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
  }

  #[test]
  fn raw_events_filtered_by_type() {
    let events = EventMultiplexer::<Event>::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    events
      .on_raw::<Raw>(&["GUILD_CREATE", "READY"])
      .subscribe(move |raw| c_seen.lock().unwrap().push(raw.0));

    for op in ["READY", "TYPING_START", "GUILD_CREATE"] {
      events.handle(Event::Raw { op });
    }
    assert_eq!(*seen.lock().unwrap(), vec!["READY", "GUILD_CREATE"]);
  }

  /// Drops into the multiplexer while its owning stream is being cancelled.
  struct ResubscribeOnDrop {
    events: Arc<EventMultiplexer<Event>>,
    late: Arc<Mutex<Option<FlowSubscription>>>,
    late_seen: Arc<AtomicUsize>,
  }

  impl Drop for ResubscribeOnDrop {
    fn drop(&mut self) {
      // Prunes the cancelled stream, which empties its kind entry.
      self.events.handle(created("prune"));
      let seen = self.late_seen.clone();
      let late = self.events.on::<Created>().subscribe(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
      });
      *self.late.lock().unwrap() = Some(late.into_inner());
    }
  }

  #[test]
  fn stale_cancel_does_not_remove_a_newer_subscriber() {
    let events = EventMultiplexer::<Event>::new();
    let late = Arc::new(Mutex::new(None));
    let late_seen = Arc::new(AtomicUsize::new(0));
    let guard = ResubscribeOnDrop { events: events.clone(), late: late.clone(), late_seen: late_seen.clone() };
    let first = events.on::<Created>().subscribe(move |_| {
      let _held = &guard;
    });

    first.unsubscribe();
    let late = late.lock().unwrap().take().unwrap();
    assert!(!late.is_closed());
    assert_eq!(events.subscriber_count(), 1);

    events.handle(created("after"));
    assert_eq!(late_seen.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn panicking_subscriber_is_isolated() {
    let events = EventMultiplexer::<Event>::new();
    let healthy = Arc::new(Mutex::new(vec![]));
    let failures = Arc::new(Mutex::new(vec![]));
    let (c_healthy, c_failures) = (healthy.clone(), failures.clone());
    events.on::<Created>().subscribe(|v| {
      if v.0 == "boom" {
        panic!("subscriber blew up");
      }
    });
    events.on::<Created>().subscribe(move |v| c_healthy.lock().unwrap().push(v.0));
    events.on::<Failed>().subscribe(move |f| c_failures.lock().unwrap().push(f.0));

    events.handle(created("boom"));
    events.handle(created("after"));
    events.handle(created("boom"));

    assert_eq!(*healthy.lock().unwrap(), vec!["boom", "after", "boom"]);
    assert_eq!(*failures.lock().unwrap(), vec!["subscriber blew up".to_owned()]);
    assert_eq!(events.subscriber_count(), 2);
  }

  #[test]
  fn panicking_failure_subscriber_is_not_reported_again() {
    let events = EventMultiplexer::<Event>::new();
    let reports = Arc::new(AtomicUsize::new(0));
    let c_reports = reports.clone();
    events.on::<Created>().subscribe(|_| {
      panic!("first");
    });
    events.on::<Failed>().subscribe(move |_| {
      c_reports.fetch_add(1, Ordering::SeqCst);
      panic!("second");
    });

    events.handle(created("a"));
    assert_eq!(reports.load(Ordering::SeqCst), 1);
    assert_eq!(events.subscriber_count(), 0);

    let seen = Arc::new(AtomicUsize::new(0));
    let c_seen = seen.clone();
    events.on::<Created>().subscribe(move |_| {
      c_seen.fetch_add(1, Ordering::SeqCst);
    });
    events.handle(created("b"));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
  }
}
