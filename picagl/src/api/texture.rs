use crate::backend::Backend;
use crate::context::Gl;
use crate::error::{gl_err, GlError, GlResult};
use crate::sampler::SamplerParam;
use crate::state::NewState;
use crate::texture::{TexEnvMode, GL_TEXTURE0, GL_TEXTURE_2D};

impl<'a, B> Gl<'a, B>
where
  B: ?Sized + Backend,
{
  // hand VRAM of textures nobody references anymore back to the backend
  fn free_orphaned_vram(&mut self) {
    let orphaned = self.ctx.shared.borrow_mut().textures.take_orphaned_vram();

    for addr in orphaned {
      self.backend.free_vram(addr);
    }
  }

  pub fn gen_textures(&mut self, n: i32) -> GlResult<Vec<u32>> {
    let r = self.ctx.shared.borrow_mut().textures.gen_textures(n);
    self.latch(r)
  }

  pub fn is_texture(&self, name: u32) -> bool {
    self.ctx.shared.borrow().textures.is_texture(name)
  }

  /// Delete textures; units of this context bound to them fall back to the default texture.
  pub fn delete_textures(&mut self, names: &[u32]) {
    for &name in names {
      if name == 0 {
        continue;
      }

      let id = self.ctx.shared.borrow().textures.lookup(GL_TEXTURE_2D, name).ok().flatten();
      if id.map_or(false, |id| self.ctx.units.iter().any(|unit| unit.texture == id)) {
        self.flush_vertices(NewState::TEXTURE);
      }

      let mut shared = self.ctx.shared.borrow_mut();
      shared.textures.delete(&mut self.ctx.units, name);
    }

    self.free_orphaned_vram();
  }

  /// Select the unit texture calls apply to (`GL_TEXTURE0 + i`).
  pub fn active_texture(&mut self, texture: u32) -> GlResult<()> {
    let unit = texture.wrapping_sub(GL_TEXTURE0) as usize;

    if unit >= self.ctx.units.len() {
      return self.latch(gl_err!(GlError::InvalidEnum, "active_texture: {:#x}", texture));
    }

    if unit != self.ctx.active_unit {
      self.ctx.active_unit = unit;
      self.ctx.matrices.set_texture_unit(unit);
      self.touch(NewState::TEXTURE_MATRIX);
    }

    Ok(())
  }

  /// Bind a texture to the active unit.
  pub fn bind_texture(&mut self, target: u32, name: u32) -> GlResult<()> {
    let unit = self.ctx.active_unit;
    let r = self.ctx.shared.borrow().textures.lookup(target, name);

    let r = r.and_then(|id| {
      if id == Some(self.ctx.units[unit].texture) {
        return Ok(());
      }

      self.flush_vertices(NewState::TEXTURE);

      let mut shared = self.ctx.shared.borrow_mut();
      shared.textures.bind(&mut self.ctx.units[unit], target, name)
    });

    self.free_orphaned_vram();
    self.latch(r)
  }

  /// Specify the image of the texture bound to the active unit; pixels are linear RGBA8 rows.
  #[allow(clippy::too_many_arguments)]
  pub fn tex_image_2d(
    &mut self,
    target: u32,
    level: i32,
    width: i32,
    height: i32,
    format: u32,
    ty: u32,
    pixels: Option<&[u8]>,
  ) -> GlResult<()> {
    self.flush_vertices(NewState::TEXTURE);

    let r = {
      let mut shared = self.ctx.shared.borrow_mut();
      let unit = &self.ctx.units[self.ctx.active_unit];
      shared
        .textures
        .tex_image_2d(unit, target, level, width, height, format, ty, pixels)
    };

    self.latch(r)
  }

  fn tex_parameter(&mut self, target: u32, param: GlResult<SamplerParam>) -> GlResult<()> {
    let r = param.and_then(|param| {
      if target != GL_TEXTURE_2D {
        return gl_err!(GlError::InvalidEnum, "tex_parameter: target {:#x}", target);
      }

      let id = self.ctx.units[self.ctx.active_unit].texture;
      let changed = match self.ctx.shared.borrow().textures.get(id) {
        Some(texture) => texture.sampler.check(&param)?,
        None => return gl_err!(GlError::InvalidOperation, "tex_parameter: no texture bound"),
      };

      if changed {
        self.flush_vertices(NewState::TEXTURE);

        let max_anisotropy = self.ctx.config().limits.max_texture_max_anisotropy;
        if let Some(texture) = self.ctx.shared.borrow_mut().textures.get_mut(id) {
          texture.sampler.apply(param, max_anisotropy);
        }
      }

      Ok(())
    });

    self.latch(r)
  }

  pub fn tex_parameter_i(&mut self, target: u32, pname: u32, param: i32) -> GlResult<()> {
    self.tex_parameter(target, SamplerParam::from_i(pname, param))
  }

  pub fn tex_parameter_f(&mut self, target: u32, pname: u32, param: f32) -> GlResult<()> {
    self.tex_parameter(target, SamplerParam::from_f(pname, param))
  }

  pub fn tex_parameter_iv(&mut self, target: u32, pname: u32, params: &[i32]) -> GlResult<()> {
    self.tex_parameter(target, SamplerParam::from_iv(pname, params))
  }

  pub fn tex_parameter_fv(&mut self, target: u32, pname: u32, params: &[f32]) -> GlResult<()> {
    self.tex_parameter(target, SamplerParam::from_fv(pname, params))
  }

  pub fn tex_parameter_iiv(&mut self, target: u32, pname: u32, params: &[i32]) -> GlResult<()> {
    self.tex_parameter(target, SamplerParam::from_iiv(pname, params))
  }

  pub fn tex_parameter_iuiv(&mut self, target: u32, pname: u32, params: &[u32]) -> GlResult<()> {
    self.tex_parameter(target, SamplerParam::from_iuiv(pname, params))
  }

  pub fn get_tex_parameter(&mut self, target: u32, pname: u32) -> GlResult<SamplerParam> {
    let r = if target != GL_TEXTURE_2D {
      gl_err!(GlError::InvalidEnum, "get_tex_parameter: target {:#x}", target)
    } else {
      let id = self.ctx.units[self.ctx.active_unit].texture;
      match self.ctx.shared.borrow().textures.get(id) {
        Some(texture) => texture.sampler.parameter(pname),
        None => gl_err!(GlError::InvalidOperation, "get_tex_parameter: no texture bound"),
      }
    };

    self.latch(r)
  }

  /// Texture environment mode of the active unit (`GL_REPLACE` or `GL_MODULATE`).
  pub fn tex_env_mode(&mut self, mode: u32) -> GlResult<()> {
    let mode = match TexEnvMode::from_gl(mode) {
      Some(mode) => mode,
      None => return self.latch(gl_err!(GlError::InvalidEnum, "tex_env_mode: {:#x}", mode)),
    };

    let unit = self.ctx.active_unit;
    if self.ctx.units[unit].env_mode != mode {
      self.flush_vertices(NewState::TEXTURE);
      self.ctx.units[unit].env_mode = mode;
    }

    Ok(())
  }
}
