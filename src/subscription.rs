//! Subscription handles.
//!
//! A subscription is the consumer's side of a bridge: it signals demand with
//! `request` and cancels with `unsubscribe`.

use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

mod dynamic;
pub use dynamic::DynamicSubscriptions;

/// Handle returned from subscribing to a backpressured source.
pub trait Subscription {
  /// Signal demand for `n` more elements. `n <= 0` is ignored and
  /// [`UNBOUNDED`](crate::demand::UNBOUNDED) removes the limit.
  fn request(&self, n: i64);

  /// Cancel the subscription. Cancellation is not an error: the observer
  /// receives no further signal at all.
  fn unsubscribe(self);

  fn is_closed(&self) -> bool;
}

/// Object-safe demand and cancellation hooks behind a [`FlowSubscription`].
pub trait FlowControl: Send + Sync {
  fn request(&self, n: i64);
  fn cancel(&self);
  fn is_closed(&self) -> bool;
}

/// Cloneable, thread-safe subscription handle shared by every bridge.
#[derive(Clone)]
pub struct FlowSubscription(Arc<dyn FlowControl>);

impl FlowSubscription {
  pub fn new<C: FlowControl + 'static>(control: C) -> Self { FlowSubscription(Arc::new(control)) }

  pub fn from_arc(control: Arc<dyn FlowControl>) -> Self { FlowSubscription(control) }
}

impl Subscription for FlowSubscription {
  #[inline]
  fn request(&self, n: i64) { self.0.request(n) }

  #[inline]
  fn unsubscribe(self) { self.0.cancel() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl Debug for FlowSubscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FlowSubscription")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

/// Wrapper around a subscription which provides the
/// `unsubscribe_when_dropped()` method.
pub struct SubscriptionWrapper<T: Subscription>(pub(crate) T);

impl<T: Subscription> SubscriptionWrapper<T> {
  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<T> { SubscriptionGuard(Some(self.0)) }

  /// Consumes this wrapper and returns the underlying subscription.
  pub fn into_inner(self) -> T { self.0 }
}

impl<T: Subscription> Subscription for SubscriptionWrapper<T> {
  #[inline]
  fn request(&self, n: i64) { self.0.request(n) }
  #[inline]
  fn unsubscribe(self) { self.0.unsubscribe() }
  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(Option<T>);

impl<T: Subscription> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(Some(subscription)) }

  pub fn request(&self, n: i64) {
    if let Some(inner) = &self.0 {
      inner.request(n);
    }
  }

  pub fn is_closed(&self) -> bool { self.0.as_ref().map_or(true, |s| s.is_closed()) }
}

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) {
    if let Some(inner) = self.0.take() {
      inner.unsubscribe()
    }
  }
}
