//! DVLB shader binaries.
//!
//! A DVLB file bundles one shader program (DVLP: code and operand descriptors) with one or more
//! entry points (DVLE: shader type, `main` offset and symbol tables). All values are
//! little-endian.
//!
//! ```text
//! DVLB | n | DVLE offsets[n] | DVLP … | DVLE … | DVLE …
//! ```
//!
//! Offsets stored in a DVLP or DVLE are relative to the beginning of that block.

use std::error;
use std::fmt;

use picagl::backend::BackendError;

const DVLB_MAGIC: u32 = 0x424C_5644;
const DVLP_MAGIC: u32 = 0x504C_5644;
const DVLE_MAGIC: u32 = 0x454C_5644;

const DVLP_HEADER_SIZE: usize = 6 * 4;
const DVLE_HEADER_SIZE: usize = 16 * 4;

/// First float uniform register; float uniform locations are relative to it.
const FLOAT_UNIFORM_FIRST: u16 = 0x10;
const FLOAT_UNIFORM_LAST: u16 = 0x6F;

/// Programmable stage an entry point is for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ShaderType {
  Vertex,
  Geometry,
}

/// Uniform declared by an entry point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Uniform {
  pub name: String,
  /// First input register.
  pub start: u16,
  /// Last input register.
  pub end: u16,
}

impl Uniform {
  /// Float uniform location, if the uniform lives in the float uniform registers.
  pub fn location(&self) -> Option<i32> {
    if (FLOAT_UNIFORM_FIRST..=FLOAT_UNIFORM_LAST).contains(&self.start) {
      Some((self.start - FLOAT_UNIFORM_FIRST) as i32)
    } else {
      None
    }
  }
}

/// Entry point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dvle {
  pub kind: ShaderType,
  /// Offset of `main` in the code, in words.
  pub main: u32,
  pub end_main: u32,
  pub uniforms: Vec<Uniform>,
}

/// Parsed DVLB.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dvlb {
  pub code: Vec<u32>,
  pub opdescs: Vec<u32>,
  pub entries: Vec<Dvle>,
}

/// Reasons a binary is rejected.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DvlbError {
  /// A read went past the end of the binary.
  Truncated { offset: usize, len: usize },
  /// A block does not start with its magic number.
  BadMagic { offset: usize, expected: u32, found: u32 },
  InvalidShaderType(u8),
  /// A uniform name points outside of the symbol table.
  InvalidSymbol(u32),
  NoEntryPoint,
}

impl fmt::Display for DvlbError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      DvlbError::Truncated { offset, len } => {
        write!(f, "truncated binary ({} bytes needed at {:#x})", len, offset)
      }

      DvlbError::BadMagic {
        offset,
        expected,
        found,
      } => write!(
        f,
        "bad magic at {:#x} (expected {:#010x}, found {:#010x})",
        offset, expected, found
      ),

      DvlbError::InvalidShaderType(ty) => write!(f, "invalid shader type {}", ty),

      DvlbError::InvalidSymbol(offset) => write!(f, "invalid symbol offset {:#x}", offset),

      DvlbError::NoEntryPoint => f.write_str("no entry point"),
    }
  }
}

impl error::Error for DvlbError {}

impl From<DvlbError> for BackendError {
  fn from(e: DvlbError) -> Self {
    BackendError::InvalidShaderBinary(e.to_string())
  }
}

struct Reader<'a> {
  bytes: &'a [u8],
}

impl<'a> Reader<'a> {
  fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], DvlbError> {
    offset
      .checked_add(len)
      .and_then(|end| self.bytes.get(offset..end))
      .ok_or(DvlbError::Truncated { offset, len })
  }

  fn u8(&self, offset: usize) -> Result<u8, DvlbError> {
    Ok(self.slice(offset, 1)?[0])
  }

  fn u16(&self, offset: usize) -> Result<u16, DvlbError> {
    let b = self.slice(offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
  }

  fn u32(&self, offset: usize) -> Result<u32, DvlbError> {
    let b = self.slice(offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
  }

  fn words(&self, offset: usize, count: usize, stride: usize) -> Result<Vec<u32>, DvlbError> {
    // fail before allocating for absurd counts
    self.slice(offset, count.saturating_mul(stride))?;
    (0..count).map(|i| self.u32(offset + i * stride)).collect()
  }

  fn magic(&self, offset: usize, expected: u32) -> Result<(), DvlbError> {
    let found = self.u32(offset)?;

    if found == expected {
      Ok(())
    } else {
      Err(DvlbError::BadMagic {
        offset,
        expected,
        found,
      })
    }
  }
}

impl Dvlb {
  pub fn parse(bytes: &[u8]) -> Result<Self, DvlbError> {
    let r = Reader { bytes };
    r.magic(0, DVLB_MAGIC)?;

    let entry_count = r.u32(4)? as usize;
    let entry_offsets = r.words(8, entry_count, 4)?;
    let dvlp = 8 + entry_count * 4;
    r.magic(dvlp, DVLP_MAGIC)?;

    let code_offset = dvlp + r.u32(dvlp + 8)? as usize;
    let code_size = r.u32(dvlp + 12)? as usize;
    let opdescs_offset = dvlp + r.u32(dvlp + 16)? as usize;
    let opdescs_count = r.u32(dvlp + 20)? as usize;

    let code = r.words(code_offset, code_size, 4)?;
    // descriptors are 8 bytes, the second word is unused
    let opdescs = r.words(opdescs_offset, opdescs_count, 8)?;

    let entries = entry_offsets
      .into_iter()
      .map(|offset| parse_dvle(&r, offset as usize))
      .collect::<Result<_, _>>()?;

    Ok(Dvlb {
      code,
      opdescs,
      entries,
    })
  }

  /// First entry point, which is the one programs are loaded from.
  pub fn main_entry(&self) -> Result<&Dvle, DvlbError> {
    self.entries.first().ok_or(DvlbError::NoEntryPoint)
  }
}

fn parse_dvle(r: &Reader, base: usize) -> Result<Dvle, DvlbError> {
  r.magic(base, DVLE_MAGIC)?;

  let kind = match r.u8(base + 6)? {
    0 => ShaderType::Vertex,
    1 => ShaderType::Geometry,
    ty => return Err(DvlbError::InvalidShaderType(ty)),
  };

  let main = r.u32(base + 0x08)?;
  let end_main = r.u32(base + 0x0C)?;
  let uniforms_offset = base + r.u32(base + 0x30)? as usize;
  let uniforms_count = r.u32(base + 0x34)? as usize;
  let symbols_offset = base + r.u32(base + 0x38)? as usize;
  let symbols_size = r.u32(base + 0x3C)? as usize;

  let symbols = r.slice(symbols_offset, symbols_size)?;
  r.slice(uniforms_offset, uniforms_count.saturating_mul(8))?;

  let uniforms = (0..uniforms_count)
    .map(|i| {
      let entry = uniforms_offset + i * 8;
      let symbol = r.u32(entry)?;
      let name = symbol_name(symbols, symbol)?;

      Ok(Uniform {
        name,
        start: r.u16(entry + 4)?,
        end: r.u16(entry + 6)?,
      })
    })
    .collect::<Result<_, _>>()?;

  Ok(Dvle {
    kind,
    main,
    end_main,
    uniforms,
  })
}

fn symbol_name(symbols: &[u8], offset: u32) -> Result<String, DvlbError> {
  let bytes = symbols
    .get(offset as usize..)
    .ok_or(DvlbError::InvalidSymbol(offset))?;
  let len = bytes
    .iter()
    .position(|&b| b == 0)
    .ok_or(DvlbError::InvalidSymbol(offset))?;

  Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
}

/// Assemble DVLB binaries.
///
/// Mostly useful to feed tests with shaders without going through a shader assembler.
#[derive(Clone, Debug, Default)]
pub struct DvlbBuilder {
  code: Vec<u32>,
  opdescs: Vec<u32>,
  entries: Vec<Dvle>,
}

impl DvlbBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn code(mut self, code: &[u32]) -> Self {
    self.code = code.to_vec();
    self
  }

  pub fn opdescs(mut self, opdescs: &[u32]) -> Self {
    self.opdescs = opdescs.to_vec();
    self
  }

  /// Add an entry point; uniforms are `(name, first register, last register)`.
  pub fn entry(mut self, kind: ShaderType, main: u32, uniforms: &[(&str, u16, u16)]) -> Self {
    self.entries.push(Dvle {
      kind,
      main,
      end_main: self.code.len() as u32,
      uniforms: uniforms
        .iter()
        .map(|&(name, start, end)| Uniform {
          name: name.to_owned(),
          start,
          end,
        })
        .collect(),
    });
    self
  }

  pub fn build(&self) -> Vec<u8> {
    let mut out = Vec::new();
    push_u32(&mut out, DVLB_MAGIC);
    push_u32(&mut out, self.entries.len() as u32);

    let entries_at = out.len();
    out.resize(out.len() + self.entries.len() * 4, 0);

    let dvlp = out.len();
    let code_offset = DVLP_HEADER_SIZE;
    let opdescs_offset = code_offset + self.code.len() * 4;
    push_u32(&mut out, DVLP_MAGIC);
    push_u32(&mut out, 0);
    push_u32(&mut out, code_offset as u32);
    push_u32(&mut out, self.code.len() as u32);
    push_u32(&mut out, opdescs_offset as u32);
    push_u32(&mut out, self.opdescs.len() as u32);
    debug_assert_eq!(out.len() - dvlp, DVLP_HEADER_SIZE);

    for &word in &self.code {
      push_u32(&mut out, word);
    }

    for &desc in &self.opdescs {
      push_u32(&mut out, desc);
      push_u32(&mut out, 0);
    }

    for (i, entry) in self.entries.iter().enumerate() {
      let base = out.len();
      out[entries_at + i * 4..entries_at + i * 4 + 4].copy_from_slice(&(base as u32).to_le_bytes());

      let mut symbols = Vec::new();
      let mut table = Vec::new();

      for uniform in &entry.uniforms {
        push_u32(&mut table, symbols.len() as u32);
        table.extend_from_slice(&uniform.start.to_le_bytes());
        table.extend_from_slice(&uniform.end.to_le_bytes());
        symbols.extend_from_slice(uniform.name.as_bytes());
        symbols.push(0);
      }

      let kind = match entry.kind {
        ShaderType::Vertex => 0,
        ShaderType::Geometry => 1,
      };

      push_u32(&mut out, DVLE_MAGIC);
      out.extend_from_slice(&0x1002_u16.to_le_bytes());
      out.extend_from_slice(&[kind, 0]);
      push_u32(&mut out, entry.main);
      push_u32(&mut out, entry.end_main);

      // constant, label and output tables: empty
      for _ in 4..12 {
        push_u32(&mut out, 0);
      }

      push_u32(&mut out, DVLE_HEADER_SIZE as u32);
      push_u32(&mut out, entry.uniforms.len() as u32);
      push_u32(&mut out, (DVLE_HEADER_SIZE + table.len()) as u32);
      push_u32(&mut out, symbols.len() as u32);
      debug_assert_eq!(out.len() - base, DVLE_HEADER_SIZE);

      out.extend_from_slice(&table);
      out.extend_from_slice(&symbols);

      while out.len() % 4 != 0 {
        out.push(0);
      }
    }

    out
  }
}

fn push_u32(out: &mut Vec<u8>, word: u32) {
  out.extend_from_slice(&word.to_le_bytes());
}
