//! Texture objects and texture units.
//!
//! Texture images are specified as linear RGBA8 pixels and tiled into VRAM lazily, right before a
//! draw samples them. Each texture carries its own [`SamplerState`], used by a unit with no
//! sampler object bound.

use crate::arena::{Arena, Id};
use crate::error::{gl_err, GlError, GlResult};
use crate::name_table::NameTable;
use crate::regs;
use crate::sampler::{SamplerId, SamplerState};

pub(crate) const GL_TEXTURE_2D: u32 = 0x0DE1;
const GL_RGBA: u32 = 0x1908;
const GL_UNSIGNED_BYTE: u32 = 0x1401;

const GL_REPLACE: u32 = 0x1E01;
const GL_MODULATE: u32 = 0x2100;

/// `GL_TEXTURE0`; unit `i` is selected with `GL_TEXTURE0 + i`.
pub const GL_TEXTURE0: u32 = 0x84C0;

pub type TextureId = Id<TextureObject>;

/// Texture environment mode of a unit.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TexEnvMode {
  Replace,
  Modulate,
}

impl TexEnvMode {
  pub fn from_gl(mode: u32) -> Option<Self> {
    match mode {
      GL_REPLACE => Some(TexEnvMode::Replace),
      GL_MODULATE => Some(TexEnvMode::Modulate),
      _ => None,
    }
  }

  pub fn to_pica(self) -> u32 {
    match self {
      TexEnvMode::Replace => regs::combine::REPLACE,
      TexEnvMode::Modulate => regs::combine::MODULATE,
    }
  }
}

/// Level 0 image of a texture.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
  pub width: u16,
  pub height: u16,
  /// Linear RGBA8 pixels, row by row.
  pub pixels: Vec<u8>,
}

/// Texture object.
#[derive(Debug)]
pub struct TextureObject {
  name: u32,
  image: Option<Image>,
  /// Whether `image` changed since it was last tiled.
  needs_tiling: bool,
  /// VRAM address of the tiled image.
  vram: Option<u32>,
  pub sampler: SamplerState,
}

impl TextureObject {
  fn new(name: u32) -> Self {
    TextureObject {
      name,
      image: None,
      needs_tiling: false,
      vram: None,
      sampler: SamplerState::default(),
    }
  }

  pub fn name(&self) -> u32 {
    self.name
  }

  pub fn image(&self) -> Option<&Image> {
    self.image.as_ref()
  }

  pub fn needs_tiling(&self) -> bool {
    self.needs_tiling
  }

  pub fn vram(&self) -> Option<u32> {
    self.vram
  }

  /// Record the location of the freshly tiled image.
  pub(crate) fn set_tiled(&mut self, vram: u32) {
    self.vram = Some(vram);
    self.needs_tiling = false;
  }
}

/// Texture unit state of a context.
#[derive(Debug)]
pub struct TextureUnit {
  pub texture: TextureId,
  /// Sampler object overriding the texture's own sampler state.
  pub sampler: Option<SamplerId>,
  pub env_mode: TexEnvMode,
}

/// Texture objects shared by a group of contexts.
///
/// Name `0` is the default texture, which is never deleted.
#[derive(Debug)]
pub struct TextureStore {
  objects: Arena<TextureObject>,
  names: NameTable<TextureId>,
  default: TextureId,
  /// VRAM of dropped textures, to be given back to the backend.
  orphaned_vram: Vec<u32>,
}

impl Default for TextureStore {
  fn default() -> Self {
    Self::new()
  }
}

impl TextureStore {
  pub fn new() -> Self {
    let mut objects = Arena::new();
    let default = objects.insert(TextureObject::new(0));

    TextureStore {
      objects,
      names: NameTable::new(),
      default,
      orphaned_vram: Vec::new(),
    }
  }

  pub fn new_units(&mut self, count: usize) -> Vec<TextureUnit> {
    (0..count)
      .map(|_| {
        self.objects.retain(self.default);

        TextureUnit {
          texture: self.default,
          sampler: None,
          env_mode: TexEnvMode::Modulate,
        }
      })
      .collect()
  }

  /// Drop the texture references of a context's units.
  pub fn release_units(&mut self, units: &mut [TextureUnit]) {
    for unit in units {
      let old = std::mem::replace(&mut unit.texture, self.default);
      self.release(old);
    }
  }

  fn release(&mut self, id: TextureId) {
    if let Some(obj) = self.objects.release(id) {
      self.orphaned_vram.extend(obj.vram);
    }
  }

  /// VRAM no longer referenced by any texture.
  pub fn take_orphaned_vram(&mut self) -> Vec<u32> {
    std::mem::take(&mut self.orphaned_vram)
  }

  pub fn gen_textures(&mut self, n: i32) -> GlResult<Vec<u32>> {
    if n < 0 {
      return gl_err!(GlError::InvalidValue, "gen_textures: n < 0");
    }

    if n == 0 {
      return Ok(Vec::new());
    }

    let first = match self.names.find_free_key_block(n as u32) {
      Some(first) => first,
      None => return gl_err!(GlError::OutOfMemory, "gen_textures: no free names"),
    };

    let names: Vec<u32> = (first..first + n as u32).collect();

    for &name in &names {
      let id = self.objects.insert(TextureObject::new(name));
      self.names.insert(name, id);
    }

    Ok(names)
  }

  pub fn is_texture(&self, name: u32) -> bool {
    name != 0 && self.names.contains(name)
  }

  pub fn get(&self, id: TextureId) -> Option<&TextureObject> {
    self.objects.get(id)
  }

  pub fn get_mut(&mut self, id: TextureId) -> Option<&mut TextureObject> {
    self.objects.get_mut(id)
  }

  /// Object a bind of `name` would select; `None` if binding it creates a new object.
  pub fn lookup(&self, target: u32, name: u32) -> GlResult<Option<TextureId>> {
    check_target(target, "bind_texture")?;

    if name == 0 {
      return Ok(Some(self.default));
    }

    Ok(self.names.lookup(name).copied())
  }

  /// Bind `name` to a unit, creating the object for a never generated name.
  pub fn bind(&mut self, unit: &mut TextureUnit, target: u32, name: u32) -> GlResult<()> {
    let id = match self.lookup(target, name)? {
      Some(id) => id,

      None => {
        let id = self.objects.insert(TextureObject::new(name));
        self.names.insert(name, id);
        id
      }
    };

    self.objects.retain(id);
    let old = std::mem::replace(&mut unit.texture, id);
    self.release(old);

    Ok(())
  }

  /// Remove a name, unbinding it from `units` first.
  ///
  /// Returns whether a unit was unbound.
  pub fn delete(&mut self, units: &mut [TextureUnit], name: u32) -> bool {
    if name == 0 {
      return false;
    }

    let id = match self.names.remove(name) {
      Some(id) => id,
      None => return false,
    };

    let mut unbound = false;

    for unit in units {
      if unit.texture == id {
        unit.texture = self.default;
        self.objects.retain(self.default);
        self.release(id);
        unbound = true;
      }
    }

    self.release(id);
    unbound
  }

  /// Specify the level 0 image of the texture bound to `unit`.
  #[allow(clippy::too_many_arguments)]
  pub fn tex_image_2d(
    &mut self,
    unit: &TextureUnit,
    target: u32,
    level: i32,
    width: i32,
    height: i32,
    format: u32,
    ty: u32,
    pixels: Option<&[u8]>,
  ) -> GlResult<()> {
    check_target(target, "tex_image_2d")?;

    if format != GL_RGBA || ty != GL_UNSIGNED_BYTE {
      return gl_err!(GlError::InvalidEnum, "tex_image_2d: format {:#x} type {:#x}", format, ty);
    }

    if level != 0 {
      return gl_err!(GlError::InvalidValue, "tex_image_2d: level {}", level);
    }

    let valid_dim = |d: i32| (8..=1024).contains(&d) && (d as u32).is_power_of_two();
    if !valid_dim(width) || !valid_dim(height) {
      return gl_err!(GlError::InvalidValue, "tex_image_2d: {}x{}", width, height);
    }

    let size = width as usize * height as usize * 4;

    let pixels = match pixels {
      Some(pixels) if pixels.len() < size => {
        return gl_err!(GlError::InvalidValue, "tex_image_2d: not enough pixels")
      }
      Some(pixels) => pixels[..size].to_vec(),
      None => vec![0; size],
    };

    let obj = match self.objects.get_mut(unit.texture) {
      Some(obj) => obj,
      None => return gl_err!(GlError::InvalidOperation, "tex_image_2d: no texture bound"),
    };

    obj.image = Some(Image {
      width: width as u16,
      height: height as u16,
      pixels,
    });
    obj.needs_tiling = true;

    Ok(())
  }

  /// VRAM held by live texture objects.
  pub fn resident_vram(&self) -> impl Iterator<Item = u32> + '_ {
    self.objects.iter().filter_map(|(_, obj)| obj.vram)
  }

  /// Number of texture objects alive, the default one excluded.
  pub fn live_objects(&self) -> usize {
    self.objects.len() - 1
  }
}

fn check_target(target: u32, caller: &str) -> GlResult<()> {
  if target != GL_TEXTURE_2D {
    return gl_err!(GlError::InvalidEnum, "{}: target {:#x}", caller, target);
  }

  Ok(())
}
