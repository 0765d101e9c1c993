//! State resolution.
//!
//! Walks the dirty-state bitmask and re-derives the GPU configuration of every changed category,
//! in dependency order:
//!
//! 1. program binding (privileged uniform locations are looked up again) and changed uniforms;
//! 2. transform matrices;
//! 3. texture units and texture combiners;
//! 4. rasterization and per-fragment operations;
//! 5. framebuffer, viewport and scissor.
//!
//! A category whose bit is clear costs nothing, and register writes that would not change a
//! register are skipped, so resolving twice in a row emits nothing the second time. The bitmask is
//! only cleared once every category made it to the command buffer.

use log::trace;
use picagl_layout::{f32_to_f24, f32_to_f31, pack_rgba8, DeviceLayout};

use crate::backend::Backend;
use crate::command::Emitter;
use crate::context::{Context, Gl, SharedState};
use crate::error::GlResult;
use crate::linear::{self, M44};
use crate::program::Privileged;
use crate::raster::{RasterState, Rect};
use crate::regs::{self, texenv_src, VSH};
use crate::state::NewState;
use crate::texture::{TexEnvMode, TextureUnit};

impl<'a, B> Gl<'a, B>
where
  B: ?Sized + Backend,
{
  /// Resolve every pending state change into register writes.
  pub fn resolve_state(&mut self) -> GlResult<()> {
    let r = self.ctx.emit_all(&mut *self.backend, resolve);
    self.latch(r)
  }
}

pub(crate) fn resolve<B>(ctx: &mut Context, backend: &mut B) -> GlResult<()>
where
  B: ?Sized + Backend,
{
  let Context {
    ref shared,
    ref mut new_state,
    ref mut matrices,
    ref units,
    active_unit,
    ref raster,
    ref framebuffer,
    ref mut cmd,
    ref mut shadow,
    ..
  } = *ctx;

  let mut shared = shared.borrow_mut();
  let shared = &mut *shared;
  let mut bits = *new_state;

  if bits.is_empty() && !shared.programs.uniforms.has_changes() {
    return Ok(());
  }

  trace!("resolving {:?}", bits);
  let mut em = Emitter::new(cmd, shadow);

  // 1. program
  if bits.contains(NewState::PROGRAM) {
    shared.programs.privileged = match shared.programs.current_handle() {
      Some(handle) => {
        backend.use_program(handle, em.cmd())?;
        Privileged::query(&*backend, handle)
      }

      None => Privileged::default(),
    };

    bits |= NewState::TRANSFORM;
  }

  for slot in shared.programs.uniforms.changed_mut() {
    em.float_uniforms(&VSH, slot.location as u8, &slot.values)?;
    slot.changed = false;
  }

  // 2. transform
  if bits.intersects(NewState::TRANSFORM) {
    let privileged = shared.programs.privileged;

    if bits.contains(NewState::PROJECTION) {
      if let Some(location) = privileged.projection {
        // the panel is mounted rotated; the fix-up never reaches the stored matrix
        let projection = linear::mul(&linear::SCREEN_ROTATION, matrices.projection().top());
        upload_matrix(&mut em, location, &projection)?;
      }
    }

    if bits.contains(NewState::MODELVIEW) {
      if let Some(location) = privileged.modelview {
        upload_matrix(&mut em, location, matrices.modelview().top())?;
      }
    }

    if bits.contains(NewState::TEXTURE_MATRIX) {
      if let (Some(location), Some(stack)) = (privileged.texture, matrices.texture(active_unit)) {
        upload_matrix(&mut em, location, stack.top())?;
      }
    }

    matrices.model_project();
  }

  // 3. texture
  if bits.contains(NewState::TEXTURE) {
    let enabled = resolve_texture_units(&mut em, shared, units, backend)?;
    resolve_texture_env(&mut em, units, enabled)?;
  }

  // 4. rasterization
  resolve_raster(&mut em, raster, bits)?;

  // 5. framebuffer
  if bits.contains(NewState::BUFFERS) {
    let [width, height] = [framebuffer.color.width, framebuffer.color.height];
    let dim = regs::framebuffer_dim(width, height);

    em.trigger(regs::FRAMEBUFFER_INVALIDATE, 1)?;
    em.write(regs::DEPTHBUFFER_LOC, framebuffer.depth.addr >> 3)?;
    em.write(regs::COLORBUFFER_LOC, framebuffer.color.addr >> 3)?;
    em.write(regs::FRAMEBUFFER_DIM, dim)?;
    em.write(regs::RENDERBUF_DIM, dim)?;
    // D24S8 and RGBA8
    em.write(regs::DEPTHBUFFER_FORMAT, 3)?;
    em.write(regs::COLORBUFFER_FORMAT, 0x0002)?;
    em.write(regs::COLORBUFFER_READ, 0xF)?;
    em.write(regs::COLORBUFFER_WRITE, 0xF)?;
    em.write(regs::DEPTHBUFFER_READ, 0x3)?;
    em.write(regs::DEPTHBUFFER_WRITE, 0x3)?;
  }

  if bits.contains(NewState::VIEWPORT) {
    let [x, y, width, height] = to_gpu_rect(&raster.viewport);

    em.write(regs::VIEWPORT_WIDTH, f32_to_f24(width as f32 / 2.))?;
    em.write(regs::VIEWPORT_INVW, f32_to_f31(2. / width as f32) << 1)?;
    em.write(regs::VIEWPORT_HEIGHT, f32_to_f24(height as f32 / 2.))?;
    em.write(regs::VIEWPORT_INVH, f32_to_f31(2. / height as f32) << 1)?;
    em.write(regs::VIEWPORT_XY, regs::xy(x, y))?;
  }

  if bits.contains(NewState::SCISSOR) {
    if raster.scissor_test {
      let [x, y, width, height] = to_gpu_rect(&raster.scissor);
      em.write(regs::SCISSORTEST_MODE, 3)?;
      em.write(regs::SCISSORTEST_POS, regs::xy(x, y))?;
      em.write(
        regs::SCISSORTEST_DIM,
        regs::xy((x + width).saturating_sub(1), (y + height).saturating_sub(1)),
      )?;
    } else {
      let (width, height) = (framebuffer.color.width as u32, framebuffer.color.height as u32);
      em.write(regs::SCISSORTEST_MODE, 0)?;
      em.write(regs::SCISSORTEST_POS, 0)?;
      em.write(regs::SCISSORTEST_DIM, regs::xy(width - 1, height - 1))?;
    }
  }

  *new_state = NewState::empty();
  backend.update_state(bits);

  Ok(())
}

fn upload_matrix(em: &mut Emitter, location: i32, m: &M44) -> GlResult<()> {
  em.float_uniforms(&VSH, location as u8, &m.device_encode())?;
  Ok(())
}

// Tile changed images, then program every unit. Returns the enabled units bitmask.
fn resolve_texture_units<B>(
  em: &mut Emitter,
  shared: &mut SharedState,
  units: &[TextureUnit],
  backend: &mut B,
) -> GlResult<u32>
where
  B: ?Sized + Backend,
{
  let mut enabled = 0;

  for (i, (unit, unit_regs)) in units.iter().zip(regs::TEXUNITS.iter()).enumerate() {
    let texture = match shared.textures.get_mut(unit.texture) {
      Some(texture) => texture,
      None => continue,
    };

    if texture.needs_tiling() {
      if let Some(image) = texture.image() {
        let vram = backend.tile(&image.pixels, image.width, image.height, texture.vram())?;
        texture.set_tiled(vram);
      }
    }

    let (image, vram) = match (texture.image(), texture.vram()) {
      (Some(image), Some(vram)) => (image, vram),
      _ => continue,
    };

    let sampler = match unit.sampler.and_then(|id| shared.samplers.get(id)) {
      Some(sampler) => &sampler.state,
      None => &texture.sampler,
    };

    em.write(unit_regs.border_color, sampler.border_color.to_pica())?;
    em.write(unit_regs.dim, (image.width as u32) << 16 | image.height as u32)?;
    em.write(unit_regs.param, sampler.param_to_pica())?;
    em.write(unit_regs.lod, sampler.lod_to_pica())?;
    em.write(unit_regs.addr, vram >> 3)?;
    // RGBA8
    em.write(unit_regs.format, 0)?;

    enabled |= 1 << i;
  }

  em.write_masked(regs::TEXUNIT_CONFIG, 0b0101, enabled | 1 << 16)?;
  Ok(enabled)
}

// One combiner stage per texture unit; stages of disabled units pass their input through.
fn resolve_texture_env(em: &mut Emitter, units: &[TextureUnit], enabled: u32) -> GlResult<()> {
  for (stage, &base) in regs::TEXENV.iter().enumerate() {
    let previous = if stage == 0 {
      texenv_src::PRIMARY_COLOR
    } else {
      texenv_src::PREVIOUS
    };

    let mode = units
      .get(stage)
      .filter(|_| enabled & (1 << stage) != 0)
      .map(|unit| unit.env_mode);

    let (sources, combiner) = match mode {
      Some(mode) => {
        let texture = texenv_src::TEXTURE0 + stage as u32;
        let sources = match mode {
          TexEnvMode::Replace => texture,
          TexEnvMode::Modulate => texture | previous << 4,
        };

        (sources, mode.to_pica())
      }

      None => (previous, regs::combine::REPLACE),
    };

    em.write(base + regs::TEXENV_SOURCE, sources | sources << 16)?;
    em.write(base + regs::TEXENV_OPERAND, 0)?;
    em.write(base + regs::TEXENV_COMBINER, combiner | combiner << 16)?;
    em.write(base + regs::TEXENV_COLOR, 0)?;
    em.write(base + regs::TEXENV_SCALE, 0)?;
  }

  Ok(())
}

fn resolve_raster(em: &mut Emitter, raster: &RasterState, bits: NewState) -> GlResult<()> {
  if bits.contains(NewState::POLYGON) {
    let offset = if raster.polygon_offset.enabled {
      raster.polygon_offset.units / 16_777_215.
    } else {
      0.
    };

    em.write(regs::FACECULLING_CONFIG, raster.cull.to_pica())?;
    em.write(regs::DEPTHMAP_ENABLE, 1)?;
    em.write(regs::DEPTHMAP_SCALE, f32_to_f24(-1.))?;
    em.write(regs::DEPTHMAP_OFFSET, f32_to_f24(offset))?;
  }

  if bits.contains(NewState::COLOR) {
    em.write_masked(regs::COLOR_OPERATION, 0x2, 0x0100)?;
    em.write(regs::BLEND_FUNC, raster.blend.to_pica())?;
    em.write(regs::BLEND_COLOR, pack_rgba8(raster.blend.color))?;
    em.write(regs::FRAGOP_ALPHA_TEST, raster.alpha_test.to_pica())?;
  }

  if bits.intersects(NewState::DEPTH | NewState::COLOR) {
    em.write(regs::DEPTH_COLOR_MASK, raster.depth_color_mask_to_pica())?;
  }

  if bits.contains(NewState::STENCIL) {
    em.write(regs::STENCIL_TEST, raster.stencil.test_to_pica())?;
    em.write(regs::STENCIL_OP, raster.stencil.op_to_pica())?;
  }

  Ok(())
}

// GL window rectangles have their axes swapped on the GPU, whose framebuffers are in portrait.
fn to_gpu_rect(rect: &Rect) -> [u32; 4] {
  [rect.y.max(0) as u32, rect.x.max(0) as u32, rect.height, rect.width]
}
