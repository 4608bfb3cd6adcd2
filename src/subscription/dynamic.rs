use smallvec::SmallVec;

/// A container for items tracked by a numeric id.
///
/// Used by the event multiplexer to hold the live sinks of one notification
/// kind: sinks are inserted on subscribe, removed by id on unsubscribe, and
/// pruned in bulk once they report closed. Ids are handed out by the owner,
/// so they stay unique even when a container is dropped and created again.
///
/// # Examples
///
/// ```rust
/// use rxremote::subscription::DynamicSubscriptions;
///
/// let mut subs: DynamicSubscriptions<&str> = DynamicSubscriptions::default();
///
/// subs.insert(7, "a");
/// subs.insert(8, "b");
/// assert_eq!(subs.len(), 2);
///
/// assert_eq!(subs.remove(7), Some("a"));
/// assert_eq!(subs.remove(7), None);
/// assert_eq!(subs.len(), 1);
/// ```
pub struct DynamicSubscriptions<U> {
  items: SmallVec<[(usize, U); 2]>,
}

impl<U> Default for DynamicSubscriptions<U> {
  fn default() -> Self { Self { items: SmallVec::new() } }
}

impl<U> DynamicSubscriptions<U> {
  /// Track `item` under `id`. The caller keeps ids unique.
  #[inline]
  pub fn insert(&mut self, id: usize, item: U) { self.items.push((id, item)); }

  /// Remove an item by ID.
  pub fn remove(&mut self, id: usize) -> Option<U> {
    self
      .items
      .iter()
      .position(|(i, _)| *i == id)
      .map(|pos| self.items.remove(pos).1)
  }

  /// Keep only the items matching `keep`, in their original order.
  #[inline]
  pub fn retain(&mut self, mut keep: impl FnMut(&U) -> bool) { self.items.retain(|(_, item)| keep(item)); }

  #[inline]
  pub fn contains(&self, id: usize) -> bool { self.items.iter().any(|(i, _)| *i == id) }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Drain all items.
  #[inline]
  pub fn drain(&mut self) -> impl Iterator<Item = U> + '_ { self.items.drain(..).map(|(_, item)| item) }

  /// Iterate over all items in insertion order.
  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = &U> { self.items.iter().map(|(_, item)| item) }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn remove_only_touches_its_id() {
    let mut subs = DynamicSubscriptions::default();
    subs.insert(0, 1);
    subs.insert(1, 2);
    assert_eq!(subs.remove(0), Some(1));
    assert_eq!(subs.remove(0), None);
    assert!(subs.contains(1));
    assert!(!subs.contains(0));
  }

  #[test]
  fn retain_keeps_order() {
    let mut subs = DynamicSubscriptions::default();
    for v in 0..6 {
      subs.insert(v, v);
    }
    subs.retain(|v| v % 2 == 0);
    assert_eq!(subs.iter().copied().collect::<Vec<_>>(), vec![0, 2, 4]);
    assert_eq!(subs.drain().count(), 3);
    assert!(subs.is_empty());
  }
}
