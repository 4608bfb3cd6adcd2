//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Attachments
pub use crate::attachment::{Attachment, AttachmentError, AttachmentExt, AttachmentStream};
// Demand accounting
pub use crate::demand::{Demand, UNBOUNDED};
// Errors
pub use crate::error::ConfigurationError;
// Event multiplexer
pub use crate::event_manager::{
  on_all, ClientEventsExt, EntityId, EventKind, EventMultiplexer, EventMultiplexerBuilder, EventSource, EventStream,
  EventVariant, MergedEvents, Notification, RawPayload, Scoped,
};
// Core traits and sources
pub use crate::observable::*;
// Observer trait
pub use crate::observer::{BoxedObserver, Observer, ObserverAll, ObserverN};
// Operators
pub use crate::ops::into_stream::IntoStream;
pub use crate::ops::merge::Merge;
#[cfg(feature = "timer")]
pub use crate::ops::timeout::TimeoutEmpty;
// Schedulers
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::{default_runtime, ThreadPool};
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::scheduler::{BlockingSpawn, ElasticPool};
// Sink
pub use crate::sink::{FlowSink, OverflowStrategy};
// Subscription
pub use crate::subscription::*;
