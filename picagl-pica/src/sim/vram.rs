//! VRAM allocation.

use std::collections::BTreeMap;

use picagl::backend::BackendError;

/// GPU address of the first VRAM byte.
pub const VRAM_BASE: u32 = 0x1F00_0000;

/// Size of the VRAM bank, in bytes.
pub const VRAM_SIZE: usize = 6 * 1024 * 1024;

/// Allocations are aligned on 128 bytes, which satisfies every surface and texture format.
const ALIGN: usize = 0x80;

/// First-fit allocator over the VRAM address range.
#[derive(Debug)]
pub struct VramAllocator {
  /// Live allocations, keyed by offset, with their size.
  blocks: BTreeMap<usize, usize>,
  size: usize,
}

impl VramAllocator {
  pub fn new(size: usize) -> Self {
    VramAllocator {
      blocks: BTreeMap::new(),
      size,
    }
  }

  pub fn alloc(&mut self, size: usize) -> Result<u32, BackendError> {
    let rounded = size.max(1).checked_add(ALIGN - 1).map(|s| s & !(ALIGN - 1));
    let out_of_vram = BackendError::OutOfVram {
      requested: size,
      available: self.available(),
    };
    let rounded = rounded.ok_or_else(|| out_of_vram.clone())?;

    let mut cursor = 0;

    for (&offset, &len) in &self.blocks {
      if offset - cursor >= rounded {
        break;
      }

      cursor = offset + round_up(len);
    }

    if self.size.saturating_sub(cursor) < rounded {
      return Err(out_of_vram);
    }

    self.blocks.insert(cursor, size);
    Ok(VRAM_BASE + cursor as u32)
  }

  /// Free an allocation; unknown addresses are ignored.
  pub fn free(&mut self, addr: u32) -> bool {
    addr
      .checked_sub(VRAM_BASE)
      .and_then(|offset| self.blocks.remove(&(offset as usize)))
      .is_some()
  }

  /// Size of the allocation starting at `addr`.
  pub fn allocation_size(&self, addr: u32) -> Option<usize> {
    let offset = addr.checked_sub(VRAM_BASE)? as usize;
    self.blocks.get(&offset).copied()
  }

  /// Whether `addr..addr + len` lies in a single allocation.
  pub fn contains(&self, addr: u32, len: usize) -> bool {
    let offset = match addr.checked_sub(VRAM_BASE) {
      Some(offset) => offset as usize,
      None => return false,
    };

    self
      .blocks
      .range(..=offset)
      .next_back()
      .map_or(false, |(&start, &size)| offset + len <= start + size)
  }

  /// Bytes not covered by any allocation.
  pub fn available(&self) -> usize {
    self.size - self.blocks.values().map(|&len| round_up(len)).sum::<usize>()
  }

  pub fn allocations(&self) -> usize {
    self.blocks.len()
  }
}

fn round_up(len: usize) -> usize {
  (len.max(1) + ALIGN - 1) & !(ALIGN - 1)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_fit_reuses_holes() {
    let mut vram = VramAllocator::new(0x1000);
    let a = vram.alloc(0x100).unwrap();
    let b = vram.alloc(0x10).unwrap();
    let c = vram.alloc(0x100).unwrap();

    assert_eq!(a, VRAM_BASE);
    assert_eq!(b, VRAM_BASE + 0x100);
    assert_eq!(c, VRAM_BASE + 0x180);

    assert!(vram.free(b));
    assert!(!vram.free(b));
    assert_eq!(vram.alloc(0x80).unwrap(), b);
    assert_eq!(vram.alloc(0x81).unwrap(), VRAM_BASE + 0x280);
  }

  #[test]
  fn exhaustion_reports_what_is_left() {
    let mut vram = VramAllocator::new(0x400);
    vram.alloc(0x300).unwrap();

    assert_eq!(
      vram.alloc(0x200),
      Err(BackendError::OutOfVram {
        requested: 0x200,
        available: 0x100,
      })
    );
    assert_eq!(vram.allocations(), 1);
  }

  #[test]
  fn ranges() {
    let mut vram = VramAllocator::new(0x1000);
    let a = vram.alloc(0x100).unwrap();

    assert!(vram.contains(a, 0x100));
    assert!(vram.contains(a + 0x80, 0x80));
    assert!(!vram.contains(a + 0x80, 0x81));
    assert!(!vram.contains(VRAM_BASE - 4, 4));
    assert_eq!(vram.allocation_size(a), Some(0x100));
  }
}
