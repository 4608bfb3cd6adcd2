//! # rxremote: backpressured reactive streams over remote API clients
//!
//! Adapts a future- and callback-based remote client into cold, push-based
//! sources that only fetch what their consumer asked for.
//!
//! ## Quick Start
//!
//! ```rust
//! use futures::future::{ready, BoxFuture, FutureExt};
//! use rxremote::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! /// A "remote" listing of 25 ids, served 10 per page.
//! struct Ids {
//!   next: u32,
//! }
//!
//! impl RemoteIterator for Ids {
//!   type Item = u32;
//!   type Error = ();
//!
//!   fn deliver_remaining(&mut self, mut callback: ElementCallback<u32>) -> BoxFuture<'static, Result<(), ()>> {
//!     while self.next < 25 {
//!       self.next += 1;
//!       if !callback(self.next) {
//!         break;
//!       }
//!     }
//!     ready(Ok(())).boxed()
//!   }
//! }
//!
//! let seen = Arc::new(Mutex::new(vec![]));
//! let c_seen = seen.clone();
//! let subscription = from_pages(Ids { next: 0 }, default_runtime())
//!   .subscribe_flow(ObserverN(move |id| c_seen.lock().unwrap().push(id)));
//!
//! subscription.request(3);
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
//! assert_eq!(subscription.state(), BridgeState::Idle);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Subscribe helpers and operators shared by every source |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` signals |
//! | [`Subscription`] | Signals demand with `request` and cancels with `unsubscribe` |
//! | [`FlowSink`] | The backpressured delivery endpoint behind every bridge |
//! | [`EventMultiplexer`] | Routes gateway notifications to typed streams |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): the process-wide `ThreadPool` runtime
//! - **`timer`** (default): the `timeout_empty` operator
//! - **`tokio-scheduler`**: run bridges on a Tokio runtime
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subscription`]: subscription::Subscription
//! [`FlowSink`]: sink::FlowSink
//! [`EventMultiplexer`]: event_manager::EventMultiplexer

pub mod attachment;
pub mod demand;
pub mod error;
pub mod event_manager;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod sink;
pub mod subscription;

pub use prelude::*;
