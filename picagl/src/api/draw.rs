use picagl_layout::pack_rgba8;

use crate::backend::{Backend, MemoryFill};
use crate::command::Emitter;
use crate::context::{Context, Gl};
use crate::error::{gl_err, GlError, GlResult};
use crate::raster::ClearMask;
use crate::regs::{self, primitive};

const GL_TRIANGLES: u32 = 0x0004;
const GL_TRIANGLE_STRIP: u32 = 0x0005;
const GL_TRIANGLE_FAN: u32 = 0x0006;

fn primitive_to_pica(mode: u32) -> Option<u32> {
  match mode {
    GL_TRIANGLES => Some(primitive::TRIANGLES),
    GL_TRIANGLE_STRIP => Some(primitive::TRIANGLE_STRIP),
    GL_TRIANGLE_FAN => Some(primitive::TRIANGLE_FAN),
    _ => None,
  }
}

/// Depth/stencil fill word: 24-bit depth, stencil in the top byte.
fn depth_stencil_word(depth: f32, stencil: i32) -> u32 {
  (stencil as u32 & 0xFF) << 24 | (depth.clamp(0., 1.) * 16_777_215.) as u32
}

impl<'a, B> Gl<'a, B>
where
  B: ?Sized + Backend,
{
  /// Clear buffers with the memory fill engine.
  ///
  /// Commands recorded so far are run first, and the fill is waited on before returning.
  pub fn clear(&mut self, mask: u32) -> GlResult<()> {
    let mask = match ClearMask::from_bits(mask) {
      Some(mask) => mask,
      None => return self.latch(gl_err!(GlError::InvalidValue, "clear: mask {:#x}", mask)),
    };

    let r = self.clear_buffers(mask);
    self.latch(r)
  }

  fn clear_buffers(&mut self, mask: ClearMask) -> GlResult<()> {
    let raster = &self.ctx.raster;
    let framebuffer = self.ctx.framebuffer;
    let mut fills = Vec::with_capacity(2);

    if mask.contains(ClearMask::COLOR) {
      fills.push(MemoryFill {
        surface: framebuffer.color,
        value: pack_rgba8(raster.clear_color).swap_bytes(),
      });
    }

    if mask.intersects(ClearMask::DEPTH | ClearMask::STENCIL) {
      fills.push(MemoryFill {
        surface: framebuffer.depth,
        value: depth_stencil_word(raster.clear_depth, raster.clear_stencil),
      });
    }

    if fills.is_empty() {
      return Ok(());
    }

    self.ctx.dispatch(&mut *self.backend)?;
    self.ctx.wait_idle()?;
    self.backend.memory_fill(&fills)?.wait()?;

    Ok(())
  }

  /// Draw `count` vertices starting at `first`, resolving pending state first.
  pub fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) -> GlResult<()> {
    let r = self.draw(mode, first, count);
    self.latch(r)
  }

  fn draw(&mut self, mode: u32, first: i32, count: i32) -> GlResult<()> {
    let primitive = match primitive_to_pica(mode) {
      Some(primitive) => primitive,
      None => return gl_err!(GlError::InvalidEnum, "draw_arrays: mode {:#x}", mode),
    };

    if first < 0 || count < 0 {
      return gl_err!(GlError::InvalidValue, "draw_arrays: first {} count {}", first, count);
    }

    if count == 0 {
      return Ok(());
    }

    // state and draw sequence go in together, or not at all
    self.ctx.emit_all(&mut *self.backend, |ctx, backend| {
      crate::resolve::resolve(ctx, backend)?;
      emit_draw(ctx, primitive, first as u32, count as u32)
    })
  }
}

fn emit_draw(ctx: &mut Context, primitive: u32, first: u32, count: u32) -> GlResult<()> {
  let mut em = Emitter::new(&mut ctx.cmd, &mut ctx.shadow);
  em.write_masked(regs::PRIMITIVE_CONFIG, 0x2, primitive)?;
  em.trigger(regs::RESTART_PRIMITIVE, 1)?;
  em.write(regs::INDEXBUFFER_CONFIG, 0x8000_0000)?;
  em.write(regs::NUMVERTICES, count)?;
  em.write(regs::VERTEX_OFFSET, first)?;
  em.write_masked(regs::GEOSTAGE_CONFIG2, 0x1, 1)?;
  em.write_masked(regs::START_DRAW_FUNC0, 0x1, 0)?;
  em.trigger(regs::DRAWARRAYS, 1)?;
  em.write_masked(regs::START_DRAW_FUNC0, 0x1, 1)?;
  em.write_masked(regs::GEOSTAGE_CONFIG2, 0x1, 0)?;
  em.trigger(regs::VTX_FUNC, 1)?;

  Ok(())
}
