//! Reference-counted object arena.
//!
//! Objects shared between a name table and binding points live here. The name table and every
//! binding hold a reference (an [`Id`] plus a count); the object is dropped when the last one is
//! released. Counts are plain integers: contexts are single-threaded.

use std::fmt;
use std::marker::PhantomData;

/// Index of an object in an [`Arena`].
pub struct Id<T> {
  index: usize,
  _t: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
  fn new(index: usize) -> Self {
    Id {
      index,
      _t: PhantomData,
    }
  }
}

impl<T> Clone for Id<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
  fn eq(&self, rhs: &Self) -> bool {
    self.index == rhs.index
  }
}

impl<T> Eq for Id<T> {}

impl<T> fmt::Debug for Id<T> {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "Id({})", self.index)
  }
}

#[derive(Debug)]
struct Entry<T> {
  refs: usize,
  value: T,
}

/// Arena of reference-counted objects.
#[derive(Debug)]
pub struct Arena<T> {
  slots: Vec<Option<Entry<T>>>,
  free: Vec<usize>,
}

impl<T> Default for Arena<T> {
  fn default() -> Self {
    Arena {
      slots: Vec::new(),
      free: Vec::new(),
    }
  }
}

impl<T> Arena<T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert an object holding a single reference.
  pub fn insert(&mut self, value: T) -> Id<T> {
    let entry = Some(Entry { refs: 1, value });

    match self.free.pop() {
      Some(index) => {
        self.slots[index] = entry;
        Id::new(index)
      }

      None => {
        self.slots.push(entry);
        Id::new(self.slots.len() - 1)
      }
    }
  }

  pub fn get(&self, id: Id<T>) -> Option<&T> {
    self
      .slots
      .get(id.index)
      .and_then(Option::as_ref)
      .map(|entry| &entry.value)
  }

  pub fn get_mut(&mut self, id: Id<T>) -> Option<&mut T> {
    self
      .slots
      .get_mut(id.index)
      .and_then(Option::as_mut)
      .map(|entry| &mut entry.value)
  }

  /// Take a new reference.
  pub fn retain(&mut self, id: Id<T>) {
    if let Some(Some(entry)) = self.slots.get_mut(id.index) {
      entry.refs += 1;
    }
  }

  /// Drop a reference, returning the object if it was the last one.
  pub fn release(&mut self, id: Id<T>) -> Option<T> {
    let slot = self.slots.get_mut(id.index)?;
    let entry = slot.as_mut()?;
    entry.refs -= 1;

    if entry.refs > 0 {
      return None;
    }

    self.free.push(id.index);
    slot.take().map(|entry| entry.value)
  }

  /// Move a reference from `from` to `to`, as when a binding point changes.
  pub fn rebind(&mut self, from: Id<T>, to: Id<T>) -> Option<T> {
    self.retain(to);
    self.release(from)
  }

  pub fn ref_count(&self, id: Id<T>) -> usize {
    match self.slots.get(id.index) {
      Some(Some(entry)) => entry.refs,
      _ => 0,
    }
  }

  /// Number of live objects.
  pub fn len(&self) -> usize {
    self.slots.len() - self.free.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
    self
      .slots
      .iter()
      .enumerate()
      .filter_map(|(i, slot)| slot.as_ref().map(|entry| (Id::new(i), &entry.value)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn last_release_frees() {
    let mut arena = Arena::new();
    let id = arena.insert("storage");
    arena.retain(id);

    assert_eq!(arena.release(id), None);
    assert_eq!(arena.get(id), Some(&"storage"));
    assert_eq!(arena.release(id), Some("storage"));
    assert_eq!(arena.get(id), None);
    assert!(arena.is_empty());
  }

  #[test]
  fn freed_slots_are_recycled() {
    let mut arena = Arena::new();
    let a = arena.insert(1);
    let _ = arena.insert(2);
    arena.release(a);

    let c = arena.insert(3);
    assert_eq!(c, a);
    assert_eq!(arena.get(c), Some(&3));
    assert_eq!(arena.len(), 2);
  }

  #[test]
  fn rebind_moves_one_reference() {
    let mut arena = Arena::new();
    let a = arena.insert('a');
    let b = arena.insert('b');
    arena.retain(a);

    assert_eq!(arena.rebind(a, b), None);
    assert_eq!(arena.ref_count(a), 1);
    assert_eq!(arena.ref_count(b), 2);
  }
}
