//! Shader programs and uniforms.
//!
//! Programs are opaque backend handles. Uniform values are tracked in a [`UniformTable`] keyed by
//! float uniform register and only uploaded when they changed. The matrices the fixed-function
//! emulation needs go through _privileged_ uniforms, whose locations are looked up by name every
//! time the program changes.

use log::debug;
use picagl_layout::{DeviceLayout, M44};

use crate::backend::{BinaryFormat, ProgramHandle, ShaderBackend};
use crate::error::{gl_err, GlError, GlResult};
use crate::linear::transpose;
use crate::name_table::NameTable;
use crate::regs::FLOAT_UNIFORMS;

pub const PROJECTION_UNIFORM: &str = "projection";
pub const MODELVIEW_UNIFORM: &str = "modelview";
pub const TEXTURE_UNIFORM: &str = "texture";

/// Locations of the privileged uniforms in the current program.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Privileged {
  pub projection: Option<i32>,
  pub modelview: Option<i32>,
  pub texture: Option<i32>,
}

impl Privileged {
  /// Look the privileged uniforms up in `program`.
  pub fn query<B>(backend: &B, program: ProgramHandle) -> Self
  where
    B: ?Sized + ShaderBackend,
  {
    Privileged {
      projection: backend.uniform_location(program, PROJECTION_UNIFORM),
      modelview: backend.uniform_location(program, MODELVIEW_UNIFORM),
      texture: backend.uniform_location(program, TEXTURE_UNIFORM),
    }
  }
}

/// Value of a uniform at a given location, in device layout.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformSlot {
  pub location: i32,
  pub values: Vec<[f32; 4]>,
  pub changed: bool,
}

/// Uniform values set by the application.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformTable {
  slots: Vec<UniformSlot>,
}

impl UniformTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set the vectors starting at `location`, allocating a slot on first use.
  pub fn set(&mut self, location: i32, values: Vec<[f32; 4]>) {
    match self.slots.iter_mut().find(|slot| slot.location == location) {
      Some(slot) => {
        slot.values = values;
        slot.changed = true;
      }

      None => self.slots.push(UniformSlot {
        location,
        values,
        changed: true,
      }),
    }
  }

  pub fn get(&self, location: i32) -> Option<&UniformSlot> {
    self.slots.iter().find(|slot| slot.location == location)
  }

  /// Force every value to be uploaded again.
  pub fn mark_all_changed(&mut self) {
    for slot in &mut self.slots {
      slot.changed = true;
    }
  }

  pub fn has_changes(&self) -> bool {
    self.slots.iter().any(|slot| slot.changed)
  }

  pub(crate) fn changed_mut(&mut self) -> impl Iterator<Item = &mut UniformSlot> {
    self.slots.iter_mut().filter(|slot| slot.changed)
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }
}

#[derive(Debug)]
struct ProgramObject {
  handle: ProgramHandle,
  linked: bool,
  delete_pending: bool,
}

/// Programs and program binding shared by a group of contexts.
#[derive(Debug, Default)]
pub struct ProgramStore {
  programs: NameTable<ProgramObject>,
  current: Option<u32>,
  pub uniforms: UniformTable,
  pub privileged: Privileged,
}

impl ProgramStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn create<B>(&mut self, backend: &mut B) -> GlResult<u32>
  where
    B: ?Sized + ShaderBackend,
  {
    let name = match self.programs.find_free_key_block(1) {
      Some(name) => name,
      None => return gl_err!(GlError::OutOfMemory, "create_program: no free names"),
    };

    let handle = backend.create_program()?;
    self.programs.insert(
      name,
      ProgramObject {
        handle,
        linked: false,
        delete_pending: false,
      },
    );

    Ok(name)
  }

  pub fn is_program(&self, name: u32) -> bool {
    name != 0 && self.programs.contains(name)
  }

  fn object(&self, name: u32, caller: &str) -> GlResult<&ProgramObject> {
    match self.programs.lookup(name) {
      Some(obj) => Ok(obj),
      None => gl_err!(GlError::InvalidValue, "{}: {} is not a program", caller, name),
    }
  }

  /// Load a precompiled binary; the program is usable once this succeeds.
  pub fn binary<B>(&mut self, name: u32, format: u32, binary: &[u8], backend: &mut B) -> GlResult<()>
  where
    B: ?Sized + ShaderBackend,
  {
    let format = match BinaryFormat::from_gl(format) {
      Some(format) => format,
      None => return gl_err!(GlError::InvalidEnum, "program_binary: format {:#x}", format),
    };

    let handle = self.object(name, "program_binary")?.handle;
    backend.program_binary(handle, format, binary)?;

    if let Some(obj) = self.programs.lookup_mut(name) {
      obj.linked = true;
    }

    Ok(())
  }

  /// Delete a program; the current program is only deleted once replaced.
  pub fn delete<B>(&mut self, name: u32, backend: &mut B) -> GlResult<()>
  where
    B: ?Sized + ShaderBackend,
  {
    if name == 0 {
      return Ok(());
    }

    self.object(name, "delete_program")?;

    if self.current == Some(name) {
      if let Some(obj) = self.programs.lookup_mut(name) {
        obj.delete_pending = true;
      }
    } else if let Some(obj) = self.programs.remove(name) {
      backend.delete_program(obj.handle);
    }

    Ok(())
  }

  /// Validate a program switch; `Ok(false)` means it would be a no-op.
  pub fn check_use(&self, name: u32) -> GlResult<bool> {
    if name == 0 || self.current == Some(name) {
      return Ok(false);
    }

    if !self.object(name, "use_program")?.linked {
      return gl_err!(GlError::InvalidOperation, "use_program: {} has no binary", name);
    }

    Ok(true)
  }

  /// Make a program validated with [`ProgramStore::check_use`] current.
  pub fn make_current<B>(&mut self, name: u32, backend: &mut B)
  where
    B: ?Sized + ShaderBackend,
  {
    if let Some(old) = self.current.replace(name) {
      if self.programs.lookup(old).map_or(false, |obj| obj.delete_pending) {
        if let Some(obj) = self.programs.remove(old) {
          debug!("deleting program {} now that it is no longer current", old);
          backend.delete_program(obj.handle);
        }
      }
    }
  }

  pub fn current(&self) -> Option<u32> {
    self.current
  }

  pub fn current_handle(&self) -> Option<ProgramHandle> {
    self
      .current
      .and_then(|name| self.programs.lookup(name))
      .map(|obj| obj.handle)
  }

  /// Location of a uniform in a program; `-1` if it has none.
  pub fn uniform_location<B>(&self, name: u32, uniform: &str, backend: &B) -> GlResult<i32>
  where
    B: ?Sized + ShaderBackend,
  {
    let obj = self.object(name, "get_uniform_location")?;

    if !obj.linked {
      return gl_err!(GlError::InvalidOperation, "get_uniform_location: {} has no binary", name);
    }

    Ok(backend.uniform_location(obj.handle, uniform).unwrap_or(-1))
  }

  /// Store vectors (host layout) starting at `location`.
  pub fn set_vectors(&mut self, location: i32, vectors: &[[f32; 4]]) -> GlResult<()> {
    self.check_location(location, vectors.len())?;

    let values = vectors.iter().map(|v| v.device_encode()).collect();
    self.uniforms.set(location, values);
    Ok(())
  }

  /// Store column-major matrices (row-major if `transpose`) starting at `location`.
  pub fn set_matrices(&mut self, location: i32, transposed: bool, matrices: &[M44]) -> GlResult<()> {
    self.check_location(location, matrices.len() * 4)?;

    let values = matrices
      .iter()
      .flat_map(|m| {
        let m = if transposed { transpose(m) } else { *m };
        m.device_encode()
      })
      .collect();
    self.uniforms.set(location, values);
    Ok(())
  }

  fn check_location(&self, location: i32, vectors: usize) -> GlResult<()> {
    if self.current.is_none() {
      return gl_err!(GlError::InvalidOperation, "uniform: no current program");
    }

    if location < 0 || location as usize + vectors > FLOAT_UNIFORMS {
      return gl_err!(GlError::InvalidValue, "uniform: location {}", location);
    }

    Ok(())
  }

  /// Handles of every program, to release them with the last context.
  pub fn handles(&self) -> impl Iterator<Item = ProgramHandle> + '_ {
    self.programs.iter().map(|(_, obj)| obj.handle)
  }
}
