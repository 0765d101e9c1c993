//! Name tables.
//!
//! Maps the small integer names handed out to applications onto values. Name `0` is reserved and
//! never stored.

use std::collections::BTreeMap;

/// Table of named values.
#[derive(Clone, Debug)]
pub struct NameTable<T> {
  entries: BTreeMap<u32, T>,
}

impl<T> Default for NameTable<T> {
  fn default() -> Self {
    NameTable {
      entries: BTreeMap::new(),
    }
  }
}

impl<T> NameTable<T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a value, returning the one previously stored under that name.
  pub fn insert(&mut self, name: u32, value: T) -> Option<T> {
    debug_assert!(name != 0, "name 0 is reserved");
    self.entries.insert(name, value)
  }

  pub fn lookup(&self, name: u32) -> Option<&T> {
    self.entries.get(&name)
  }

  pub fn lookup_mut(&mut self, name: u32) -> Option<&mut T> {
    self.entries.get_mut(&name)
  }

  pub fn contains(&self, name: u32) -> bool {
    self.entries.contains_key(&name)
  }

  pub fn remove(&mut self, name: u32) -> Option<T> {
    self.entries.remove(&name)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
    self.entries.iter().map(|(name, value)| (*name, value))
  }

  /// Find `n` consecutive free names and return the first one.
  ///
  /// Names above the highest one in use are preferred; holes left by removed names are only
  /// searched once the name space is exhausted at the top.
  pub fn find_free_key_block(&self, n: u32) -> Option<u32> {
    if n == 0 {
      return None;
    }

    let max_key = self.entries.keys().next_back().copied().unwrap_or(0);

    if let Some(last) = max_key.checked_add(n) {
      return Some(last - n + 1);
    }

    // first fit among the holes
    let mut free_start = 1u32;

    for &key in self.entries.keys() {
      if key - free_start >= n {
        return Some(free_start);
      }

      free_start = key.checked_add(1)?;
    }

    None
  }
}
