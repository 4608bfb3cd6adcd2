//! Observer trait and implementations
//!
//! The Observer trait defines the consumer side of every bridge. It provides
//! three signals: `next` (for values), `error` (for a remote failure), and
//! `complete` (for successful termination).

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: the consumer of data pushed by a bridge.
///
/// Bridges call the methods from whatever thread the underlying remote
/// primitive completes on, but never concurrently for the same observer.
pub trait Observer<Item, Err> {
  /// Receive the next value.
  fn next(&mut self, value: Item);

  /// Handle a remote failure.
  ///
  /// This consumes the observer, as no more values can be emitted after an
  /// error.
  fn error(self, err: Err);

  /// Handle successful completion.
  ///
  /// This consumes the observer, as no more values can be emitted after
  /// completion.
  fn complete(self);

  /// Whether the observer will ignore further values. A sink stops
  /// delivering to a finished observer and cancels its upstream.
  fn is_finished(&self) -> bool { false }
}

// ============================================================================
// DynObserver Trait - Object-safe Observer
// ============================================================================

/// Helper trait to enable object-safe Observers (Box<dyn Observer>)
///
/// Standard Observer trait is not object-safe because `error` and `complete`
/// take `self` by value. DynObserver mirrors the interface but adapts it for
/// vtables.
pub trait DynObserver<Item, Err> {
  fn box_next(&mut self, value: Item);
  fn box_error(self: Box<Self>, err: Err);
  fn box_complete(self: Box<Self>);
  fn box_is_finished(&self) -> bool;
}

impl<T, Item, Err> DynObserver<Item, Err> for T
where
  T: Observer<Item, Err>,
{
  fn box_next(&mut self, value: Item) { self.next(value); }
  fn box_error(self: Box<Self>, err: Err) { (*self).error(err); }
  fn box_complete(self: Box<Self>) { (*self).complete(); }
  fn box_is_finished(&self) -> bool { self.is_finished() }
}

/// Boxed observer that can be moved across threads.
pub type BoxedObserver<Item, Err> = Box<dyn DynObserver<Item, Err> + Send>;

impl<Item, Err> Observer<Item, Err> for BoxedObserver<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { (**self).box_next(value) }

  #[inline]
  fn error(self, err: Err) { self.box_error(err) }

  #[inline]
  fn complete(self) { self.box_complete() }

  #[inline]
  fn is_finished(&self) -> bool { (**self).box_is_finished() }
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Observer built from a `next` closure. Errors and completion are ignored.
#[derive(Clone)]
pub struct ObserverN<N>(pub N);

impl<Item, Err, N> Observer<Item, Err> for ObserverN<N>
where
  N: FnMut(Item),
{
  #[inline(always)]
  fn next(&mut self, value: Item) { (self.0)(value); }
  #[inline(always)]
  fn error(self, _err: Err) {}
  #[inline(always)]
  fn complete(self) {}
}

/// Observer built from `next`, `error` and `complete` closures.
#[derive(Clone)]
pub struct ObserverAll<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<N, E, C> ObserverAll<N, E, C> {
  #[inline(always)]
  pub fn new(next: N, error: E, complete: C) -> Self { ObserverAll { next, error, complete } }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for ObserverAll<N, E, C>
where
  N: FnMut(Item),
  E: FnOnce(Err),
  C: FnOnce(),
{
  #[inline(always)]
  fn next(&mut self, value: Item) { (self.next)(value); }
  #[inline(always)]
  fn error(self, err: Err) { (self.error)(err); }
  #[inline(always)]
  fn complete(self) { (self.complete)(); }
}
