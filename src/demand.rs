//! Outstanding consumer demand.
//!
//! Demand follows the Reactive Streams accounting rules: requests are
//! additive, a request of `i64::MAX` (or any sum that overflows) means
//! "unbounded", and unbounded demand is never decremented.

/// The request amount that stands for unlimited demand.
pub const UNBOUNDED: i64 = i64::MAX;

/// Outstanding element count a consumer is willing to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demand {
  Bounded(u64),
  Unbounded,
}

impl Default for Demand {
  fn default() -> Self { Demand::NONE }
}

impl Demand {
  /// No outstanding demand.
  pub const NONE: Demand = Demand::Bounded(0);

  /// Converts a raw `request(n)` amount. Returns `None` for `n <= 0`, which
  /// callers treat as a no-op.
  pub fn from_request(n: i64) -> Option<Demand> {
    match n {
      n if n <= 0 => None,
      UNBOUNDED => Some(Demand::Unbounded),
      n => Some(Demand::Bounded(n as u64)),
    }
  }

  /// Adds `other` to this demand, saturating into `Unbounded`.
  pub fn add(&mut self, other: Demand) {
    *self = match (*self, other) {
      (Demand::Bounded(a), Demand::Bounded(b)) => match a.checked_add(b) {
        Some(sum) if sum < UNBOUNDED as u64 => Demand::Bounded(sum),
        _ => Demand::Unbounded,
      },
      _ => Demand::Unbounded,
    }
  }

  /// Consumes one unit of demand. Returns `false` if there was none.
  pub fn take_one(&mut self) -> bool {
    match self {
      Demand::Unbounded => true,
      Demand::Bounded(0) => false,
      Demand::Bounded(n) => {
        *n -= 1;
        true
      }
    }
  }

  #[inline]
  pub fn is_positive(&self) -> bool { !matches!(self, Demand::Bounded(0)) }

  #[inline]
  pub fn is_unbounded(&self) -> bool { matches!(self, Demand::Unbounded) }

  /// Whether `len` queued elements already cover this demand.
  #[inline]
  pub fn is_covered_by(&self, len: usize) -> bool {
    match self {
      Demand::Unbounded => false,
      Demand::Bounded(n) => len as u64 >= *n,
    }
  }
}
