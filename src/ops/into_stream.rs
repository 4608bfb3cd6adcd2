//! IntoStream Operator
//!
//! Converts a backpressured source into a [`futures::Stream`] of
//! `Result<Item, Err>`. The stream requests one element from the source each
//! time it is polled with nothing buffered, so a slow consumer never makes the
//! source fetch ahead.
//!
//! # Example
//!
//! ```rust
//! use futures::{executor::block_on, StreamExt};
//! use rxremote::prelude::*;
//!
//! let values: Vec<_> = block_on(from_iter(vec![1, 2, 3]).into_stream().collect());
//! assert_eq!(values, vec![Ok(1), Ok(2), Ok(3)]);
//! ```

use std::{
  collections::VecDeque,
  pin::Pin,
  sync::{Arc, Mutex},
  task::{Context, Poll, Waker},
};

use futures::Stream;

use crate::{
  observable::{CoreObservable, ObservableType},
  observer::Observer,
  subscription::Subscription,
};

/// State shared between the source's observer and the stream consumer.
#[doc(hidden)]
pub struct IntoStreamState<Item, Err> {
  /// Items and errors waiting to be polled.
  queue: VecDeque<Result<Item, Err>>,
  waker: Option<Waker>,
  /// One element was requested and has not arrived yet.
  outstanding: bool,
  /// The source completed or failed.
  is_closed: bool,
}

impl<Item, Err> Default for IntoStreamState<Item, Err> {
  fn default() -> Self { Self { queue: VecDeque::new(), waker: None, outstanding: false, is_closed: false } }
}

trait StreamControl: Send {
  fn request(&self, n: i64);
  fn cancel(self: Box<Self>);
}

impl<U: Subscription + Send> StreamControl for U {
  fn request(&self, n: i64) { Subscription::request(self, n) }
  fn cancel(self: Box<Self>) { (*self).unsubscribe() }
}

/// A `Stream` that yields the signals of a source.
///
/// Created by [`Observable::into_stream`](crate::observable::Observable::into_stream).
///
/// - `Ok(item)` for each element.
/// - `Err(err)` when the source fails; the stream ends after it.
/// - `None` once the source completed.
///
/// Dropping the stream cancels the source.
pub struct IntoStream<Item, Err> {
  state: Arc<Mutex<IntoStreamState<Item, Err>>>,
  control: Option<Box<dyn StreamControl>>,
}

impl<Item, Err> IntoStream<Item, Err> {
  pub fn new<S>(source: S) -> Self
  where
    S: CoreObservable<IntoStreamObserver<Item, Err>> + ObservableType<Item = Item, Err = Err>,
    S::Unsub: Send + 'static,
  {
    let state = Arc::new(Mutex::new(IntoStreamState::default()));
    let unsub = source.actual_subscribe(IntoStreamObserver { state: state.clone() });
    IntoStream { state, control: Some(Box::new(unsub)) }
  }
}

impl<Item, Err> Stream for IntoStream<Item, Err> {
  type Item = Result<Item, Err>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    loop {
      let mut state = this.state.lock().unwrap();
      if let Some(item) = state.queue.pop_front() {
        return Poll::Ready(Some(item));
      }
      if state.is_closed {
        return Poll::Ready(None);
      }
      state.waker = Some(cx.waker().clone());
      if state.outstanding {
        return Poll::Pending;
      }
      state.outstanding = true;
      drop(state);

      // The source may answer synchronously, so look at the queue again.
      if let Some(control) = &this.control {
        control.request(1);
      }
    }
  }
}

impl<Item, Err> Drop for IntoStream<Item, Err> {
  fn drop(&mut self) {
    if let Some(control) = self.control.take() {
      control.cancel();
    }
  }
}

/// Observer feeding an [`IntoStream`].
#[doc(hidden)]
pub struct IntoStreamObserver<Item, Err> {
  state: Arc<Mutex<IntoStreamState<Item, Err>>>,
}

impl<Item, Err> IntoStreamObserver<Item, Err> {
  fn push(&self, signal: Option<Result<Item, Err>>) {
    let waker = {
      let mut state = self.state.lock().unwrap();
      match signal {
        Some(Ok(value)) => {
          state.queue.push_back(Ok(value));
          state.outstanding = false;
        }
        Some(Err(err)) => {
          state.queue.push_back(Err(err));
          state.is_closed = true;
        }
        None => state.is_closed = true,
      }
      state.waker.take()
    };
    if let Some(waker) = waker {
      waker.wake();
    }
  }
}

impl<Item, Err> Observer<Item, Err> for IntoStreamObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.push(Some(Ok(value))) }

  fn error(self, err: Err) { self.push(Some(Err(err))) }

  fn complete(self) { self.push(None) }

  fn is_finished(&self) -> bool { self.state.lock().unwrap().is_closed }
}
