//! Command buffers.
//!
//! A command buffer is a fixed-capacity list of 32-bit words holding register-write records in
//! the format the GPU command processor fetches:
//!
//! ```text
//! param0 | header | param1 … paramN | padding
//! ```
//!
//! where `header` packs the register id (bits 0-15), a byte-enable mask (bits 16-19), the number
//! of extra parameters (bits 20-27) and whether the parameters go to consecutive registers
//! (bit 31). Records are padded to 8 bytes.
//!
//! The buffer is filled by the host and handed over to the GPU as a _run_ once finalized; the
//! write cursor then goes back to zero. Room for the finalizing record is always kept, so a full
//! buffer can still be finalized and run.

use std::error;
use std::fmt;

use crate::error::GlError;
use crate::regs;
use crate::state::Cached;

/// Maximum number of parameters of a single record.
const MAX_PARAMS: usize = 256;

/// Words reserved at the end of every buffer for the finalizing record.
const FINALIZE_WORDS: usize = 2;

/// Byte-enable mask writing the whole register.
pub const FULL_MASK: u8 = 0xF;

/// Errors that can happen while appending records.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandBufferError {
  /// The record does not fit in the remaining capacity.
  Full { needed: usize, available: usize },
}

impl fmt::Display for CommandBufferError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      CommandBufferError::Full { needed, available } => write!(
        f,
        "command buffer full (needed {} words, {} available)",
        needed, available
      ),
    }
  }
}

impl error::Error for CommandBufferError {}

impl From<CommandBufferError> for GlError {
  fn from(e: CommandBufferError) -> Self {
    log::warn!("{}", e);
    GlError::OutOfMemory
  }
}

/// Fixed-capacity command buffer.
#[derive(Clone, Debug)]
pub struct CommandBuffer {
  words: Vec<u32>,
  capacity: usize,
}

impl CommandBuffer {
  pub fn new(capacity: usize) -> Self {
    CommandBuffer {
      words: Vec::with_capacity(capacity),
      capacity,
    }
  }

  /// Write cursor, in words.
  pub fn cursor(&self) -> usize {
    self.words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.words.is_empty()
  }

  /// Capacity, in words.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn words(&self) -> &[u32] {
    &self.words
  }

  /// Records appended since the last run was taken.
  pub fn records(&self) -> Records {
    Records::new(&self.words)
  }

  fn append(
    &mut self,
    reg: u16,
    mask: u8,
    params: &[u32],
    consecutive: bool,
    limit: usize,
  ) -> Result<(), CommandBufferError> {
    // records are either appended whole or not at all
    let needed = params
      .chunks(MAX_PARAMS)
      .map(|chunk| {
        let len = 1 + chunk.len();
        len + len % 2
      })
      .sum::<usize>();
    let available = limit.saturating_sub(self.words.len());

    if needed > available {
      return Err(CommandBufferError::Full { needed, available });
    }

    for (i, chunk) in params.chunks(MAX_PARAMS).enumerate() {
      let reg = if consecutive {
        reg + (i * MAX_PARAMS) as u16
      } else {
        reg
      };

      let header = reg as u32
        | ((mask & 0xF) as u32) << 16
        | ((chunk.len() - 1) as u32) << 20
        | (consecutive as u32) << 31;

      self.words.push(chunk[0]);
      self.words.push(header);
      self.words.extend_from_slice(&chunk[1..]);

      if chunk.len() % 2 == 0 {
        self.words.push(0);
      }
    }

    Ok(())
  }

  // capacity left to records, the finalizing one aside
  fn record_limit(&self) -> usize {
    self.capacity.saturating_sub(FINALIZE_WORDS)
  }

  /// Single register write.
  pub fn write(&mut self, reg: u16, value: u32) -> Result<(), CommandBufferError> {
    self.append(reg, FULL_MASK, &[value], false, self.record_limit())
  }

  /// Register write where only the bytes enabled in `mask` are updated.
  pub fn write_masked(&mut self, reg: u16, mask: u8, value: u32) -> Result<(), CommandBufferError> {
    self.append(reg, mask, &[value], false, self.record_limit())
  }

  /// Write `values` to `reg`, `reg + 1`, ….
  pub fn write_incremental(&mut self, reg: u16, values: &[u32]) -> Result<(), CommandBufferError> {
    if values.is_empty() {
      return Ok(());
    }

    self.append(reg, FULL_MASK, values, true, self.record_limit())
  }

  /// Write every value of `values` to the same register, in order.
  pub fn write_repeated(&mut self, reg: u16, values: &[u32]) -> Result<(), CommandBufferError> {
    if values.is_empty() {
      return Ok(());
    }

    self.append(reg, FULL_MASK, values, false, self.record_limit())
  }

  /// Terminate the pending records so that they can be run.
  pub fn finalize(&mut self) -> Result<(), CommandBufferError> {
    self.append(regs::FINALIZE, FULL_MASK, &[regs::FINALIZE_MAGIC], false, self.capacity)
  }

  /// Drop every record appended after `cursor`.
  pub(crate) fn truncate(&mut self, cursor: usize) {
    self.words.truncate(cursor);
  }

  /// Take the pending records out as a run, resetting the cursor to zero.
  pub fn take_run(&mut self) -> Vec<u32> {
    std::mem::replace(&mut self.words, Vec::with_capacity(self.capacity))
  }
}

/// Decoded register-write record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Record<'a> {
  pub reg: u16,
  pub mask: u8,
  pub consecutive: bool,
  first: u32,
  rest: &'a [u32],
}

impl<'a> Record<'a> {
  /// Number of parameters.
  pub fn len(&self) -> usize {
    1 + self.rest.len()
  }

  pub fn is_empty(&self) -> bool {
    false
  }

  /// Parameters along with the register each one targets.
  pub fn writes(&self) -> impl Iterator<Item = (u16, u32)> + 'a {
    let (reg, consecutive, rest) = (self.reg, self.consecutive, self.rest);

    std::iter::once(self.first)
      .chain(rest.iter().copied())
      .enumerate()
      .map(move |(i, value)| {
        if consecutive {
          (reg + i as u16, value)
        } else {
          (reg, value)
        }
      })
  }
}

/// Iterator over the records of a list of command words.
///
/// Iteration stops at the first truncated record.
#[derive(Clone, Debug)]
pub struct Records<'a> {
  words: &'a [u32],
}

impl<'a> Records<'a> {
  pub fn new(words: &'a [u32]) -> Self {
    Records { words }
  }
}

impl<'a> Iterator for Records<'a> {
  type Item = Record<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    let words = self.words;

    if words.len() < 2 {
      return None;
    }

    let (first, header) = (words[0], words[1]);
    let extra = ((header >> 20) & 0xFF) as usize;
    let len = 2 + extra;
    let padded = len + len % 2;

    if words.len() < len {
      self.words = &[];
      return None;
    }

    let record = Record {
      reg: (header & 0xFFFF) as u16,
      mask: ((header >> 16) & 0xF) as u8,
      consecutive: header >> 31 == 1,
      first,
      rest: &words[2..len],
    };

    self.words = &words[padded.min(words.len())..];
    Some(record)
  }
}

/// Shadow copy of the registers last written by a context.
///
/// Lets the emitter skip writes that would not change anything. The whole shadow is invalidated
/// whenever the GPU might have lost or changed its registers behind our back.
#[derive(Debug)]
pub(crate) struct RegisterShadow {
  regs: Vec<Cached<u32>>,
}

impl RegisterShadow {
  pub(crate) fn new() -> Self {
    RegisterShadow {
      regs: (0..0x300).map(|_| Cached::empty()).collect(),
    }
  }

  pub(crate) fn invalidate(&mut self) {
    for reg in &mut self.regs {
      reg.invalidate();
    }
  }
}

/// Appends records on behalf of the state resolution.
pub(crate) struct Emitter<'a> {
  cmd: &'a mut CommandBuffer,
  shadow: &'a mut RegisterShadow,
}

impl<'a> Emitter<'a> {
  pub(crate) fn new(cmd: &'a mut CommandBuffer, shadow: &'a mut RegisterShadow) -> Self {
    Emitter { cmd, shadow }
  }

  pub(crate) fn cmd(&mut self) -> &mut CommandBuffer {
    &mut *self.cmd
  }

  /// Write a register unless it is known to already hold `value`.
  pub(crate) fn write(&mut self, reg: u16, value: u32) -> Result<(), CommandBufferError> {
    match self.shadow.regs.get_mut(reg as usize) {
      Some(cached) if !cached.is_invalid(&value) => Ok(()),

      Some(cached) => {
        self.cmd.write(reg, value)?;
        cached.set(value);
        Ok(())
      }

      None => self.cmd.write(reg, value),
    }
  }

  /// Write a register whose write has a side effect.
  pub(crate) fn trigger(&mut self, reg: u16, value: u32) -> Result<(), CommandBufferError> {
    self.cmd.write(reg, value)
  }

  /// Partial write; the register value becomes unknown.
  pub(crate) fn write_masked(&mut self, reg: u16, mask: u8, value: u32) -> Result<(), CommandBufferError> {
    self.cmd.write_masked(reg, mask, value)?;

    if let Some(cached) = self.shadow.regs.get_mut(reg as usize) {
      cached.invalidate();
    }

    Ok(())
  }

  /// Upload consecutive float vector uniforms, starting at `index`.
  ///
  /// Vectors must already be in device layout.
  pub(crate) fn float_uniforms(
    &mut self,
    regs: &regs::ShaderRegs,
    index: u8,
    vectors: &[[f32; 4]],
  ) -> Result<(), CommandBufferError> {
    let words: Vec<u32> = vectors.iter().flatten().map(|x| x.to_bits()).collect();

    self
      .cmd
      .write(regs.float_uniform_config, regs::float_uniform_config(index))?;
    self.cmd.write_repeated(regs.float_uniform_data, &words)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn single_write_layout() {
    let mut cmd = CommandBuffer::new(16);
    cmd.write(0x0107, 0xDEAD).unwrap();

    assert_eq!(cmd.words(), &[0xDEAD, 0x000F_0107]);
  }

  #[test]
  fn masked_write_layout() {
    let mut cmd = CommandBuffer::new(16);
    cmd.write_masked(regs::PRIMITIVE_CONFIG, 0x2, 0x100).unwrap();

    assert_eq!(cmd.words(), &[0x100, 0x0002_025E]);
  }

  #[test]
  fn records_are_padded() {
    let mut cmd = CommandBuffer::new(16);
    cmd.write_incremental(0x0041, &[1, 2]).unwrap();
    cmd.write(0x0010, 3).unwrap();

    assert_eq!(cmd.words(), &[1, 0x801F_0041, 2, 0, 3, 0x000F_0010]);

    let writes: Vec<_> = cmd.records().flat_map(|r| r.writes().collect::<Vec<_>>()).collect();
    assert_eq!(writes, vec![(0x41, 1), (0x42, 2), (0x10, 3)]);
  }

  #[test]
  fn repeated_writes_target_one_register() {
    let mut cmd = CommandBuffer::new(16);
    cmd.write_repeated(0x02C1, &[1, 2, 3]).unwrap();

    let writes: Vec<_> = cmd.records().flat_map(|r| r.writes().collect::<Vec<_>>()).collect();
    assert_eq!(writes, vec![(0x2C1, 1), (0x2C1, 2), (0x2C1, 3)]);
  }

  #[test]
  fn long_lists_are_split() {
    let mut cmd = CommandBuffer::new(1024);
    let values: Vec<u32> = (0..300).collect();
    cmd.write_repeated(0x02CC, &values).unwrap();

    assert_eq!(cmd.records().count(), 2);
    let decoded: Vec<u32> = cmd.records().flat_map(|r| r.writes().map(|(_, v)| v).collect::<Vec<_>>()).collect();
    assert_eq!(decoded, values);
  }

  #[test]
  fn full_buffer_rejects_without_writing() {
    let mut cmd = CommandBuffer::new(5);
    cmd.write(1, 1).unwrap();

    assert_eq!(
      cmd.write(2, 2),
      Err(CommandBufferError::Full {
        needed: 2,
        available: 1
      })
    );
    assert_eq!(cmd.cursor(), 2);

    // the finalizing record always fits
    cmd.finalize().unwrap();
    assert_eq!(cmd.cursor(), 4);
  }

  #[test]
  fn split_lists_are_appended_whole_or_not_at_all() {
    let mut cmd = CommandBuffer::new(300);
    let values: Vec<u32> = (0..300).collect();

    assert_eq!(
      cmd.write_repeated(0x02CC, &values),
      Err(CommandBufferError::Full {
        needed: 304,
        available: 298
      })
    );
    assert!(cmd.is_empty());

    cmd.write(1, 1).unwrap();
    cmd.write(2, 2).unwrap();
    cmd.truncate(2);
    assert_eq!(cmd.words(), &[1, 0x000F_0001]);
  }

  #[test]
  fn take_run_resets_cursor() {
    let mut cmd = CommandBuffer::new(16);
    cmd.write(1, 1).unwrap();
    cmd.finalize().unwrap();

    let run = cmd.take_run();
    assert_eq!(run.len(), 4);
    assert_eq!(run[2], regs::FINALIZE_MAGIC);
    assert_eq!(cmd.cursor(), 0);
  }

  #[test]
  fn shadow_skips_redundant_writes() {
    let mut cmd = CommandBuffer::new(64);
    let mut shadow = RegisterShadow::new();

    {
      let mut emit = Emitter::new(&mut cmd, &mut shadow);
      emit.write(0x40, 2).unwrap();
      emit.write(0x40, 2).unwrap();
      emit.write(0x40, 1).unwrap();
    }
    assert_eq!(cmd.records().count(), 2);

    shadow.invalidate();
    Emitter::new(&mut cmd, &mut shadow).write(0x40, 1).unwrap();
    assert_eq!(cmd.records().count(), 3);
  }
}
