use crate::backend::Backend;
use crate::context::Gl;
use crate::error::{gl_err, GlError, GlResult};
use crate::raster::{Capability, Comparison, Equation, Face, Factor, FrontFace, PolygonMode, RasterState, Rect, StencilOp};
use crate::state::NewState;

const GL_FRONT_AND_BACK: u32 = 0x0408;

// parse a GL enum or bail out with a latched InvalidEnum
macro_rules! parse {
  ($gl:expr, $ty:ty, $value:expr, $caller:literal) => {
    match <$ty>::from_gl($value) {
      Some(v) => v,
      None => return $gl.latch(gl_err!(GlError::InvalidEnum, concat!($caller, ": {:#x}"), $value)),
    }
  };
}

impl<'a, B> Gl<'a, B>
where
  B: ?Sized + Backend,
{
  // apply `f` to a copy of the state; batched geometry is only flushed if something changed
  fn set_raster<F>(&mut self, dirty: NewState, f: F)
  where
    F: FnOnce(&mut RasterState),
  {
    let mut raster = self.ctx.raster.clone();
    f(&mut raster);

    if raster != self.ctx.raster {
      self.flush_vertices(dirty);
      self.ctx.raster = raster;
    }
  }

  fn window_rect(&mut self, x: i32, y: i32, width: i32, height: i32, caller: &str) -> GlResult<Rect> {
    if width < 0 || height < 0 {
      return self.latch(gl_err!(GlError::InvalidValue, "{}: {}x{}", caller, width, height));
    }

    Ok(Rect {
      x,
      y,
      width: width as u32,
      height: height as u32,
    })
  }

  pub fn enable(&mut self, cap: u32) -> GlResult<()> {
    let cap = parse!(self, Capability, cap, "enable");
    self.set_raster(cap.dirty_state(), |raster| raster.set_enabled(cap, true));
    Ok(())
  }

  pub fn disable(&mut self, cap: u32) -> GlResult<()> {
    let cap = parse!(self, Capability, cap, "disable");
    self.set_raster(cap.dirty_state(), |raster| raster.set_enabled(cap, false));
    Ok(())
  }

  pub fn is_enabled(&mut self, cap: u32) -> GlResult<bool> {
    let cap = parse!(self, Capability, cap, "is_enabled");
    Ok(self.ctx.raster.is_enabled(cap))
  }

  pub fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) -> GlResult<()> {
    let rect = self.window_rect(x, y, width, height, "viewport")?;
    self.set_raster(NewState::VIEWPORT, |raster| raster.viewport = rect);
    Ok(())
  }

  pub fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) -> GlResult<()> {
    let rect = self.window_rect(x, y, width, height, "scissor")?;
    self.set_raster(NewState::SCISSOR, |raster| raster.scissor = rect);
    Ok(())
  }

  pub fn cull_face(&mut self, mode: u32) -> GlResult<()> {
    let face = parse!(self, Face, mode, "cull_face");
    self.set_raster(NewState::POLYGON, |raster| raster.cull.face = face);
    Ok(())
  }

  pub fn front_face(&mut self, mode: u32) -> GlResult<()> {
    let front_face = parse!(self, FrontFace, mode, "front_face");
    self.set_raster(NewState::POLYGON, |raster| raster.cull.front_face = front_face);
    Ok(())
  }

  /// Only `units` reaches the hardware; `factor` is recorded.
  pub fn polygon_offset(&mut self, factor: f32, units: f32) {
    self.set_raster(NewState::POLYGON, |raster| {
      raster.polygon_offset.factor = factor;
      raster.polygon_offset.units = units;
    });
  }

  pub fn polygon_mode(&mut self, face: u32, mode: u32) -> GlResult<()> {
    if face != GL_FRONT_AND_BACK {
      return self.latch(gl_err!(GlError::InvalidEnum, "polygon_mode: face {:#x}", face));
    }

    let mode = parse!(self, PolygonMode, mode, "polygon_mode");
    self.set_raster(NewState::POLYGON, |raster| raster.polygon_mode = mode);
    Ok(())
  }

  pub fn depth_func(&mut self, func: u32) -> GlResult<()> {
    let func = parse!(self, Comparison, func, "depth_func");
    self.set_raster(NewState::DEPTH, |raster| raster.depth.func = func);
    Ok(())
  }

  pub fn depth_mask(&mut self, write: bool) {
    self.set_raster(NewState::DEPTH, |raster| raster.depth.write = write);
  }

  pub fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
    self.set_raster(NewState::COLOR, |raster| raster.color_mask = [r, g, b, a]);
  }

  pub fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
    self.ctx.raster.clear_color = [r, g, b, a].map(|c| c.clamp(0., 1.));
  }

  pub fn clear_depth(&mut self, depth: f32) {
    self.ctx.raster.clear_depth = depth.clamp(0., 1.);
  }

  pub fn clear_stencil(&mut self, stencil: i32) {
    self.ctx.raster.clear_stencil = stencil;
  }

  pub fn blend_equation(&mut self, mode: u32) -> GlResult<()> {
    self.blend_equation_separate(mode, mode)
  }

  pub fn blend_equation_separate(&mut self, rgb: u32, alpha: u32) -> GlResult<()> {
    let rgb = parse!(self, Equation, rgb, "blend_equation");
    let alpha = parse!(self, Equation, alpha, "blend_equation");

    self.set_raster(NewState::COLOR, |raster| {
      raster.blend.equation_rgb = rgb;
      raster.blend.equation_alpha = alpha;
    });
    Ok(())
  }

  pub fn blend_func(&mut self, src: u32, dst: u32) -> GlResult<()> {
    self.blend_func_separate(src, dst, src, dst)
  }

  pub fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) -> GlResult<()> {
    let src_rgb = parse!(self, Factor, src_rgb, "blend_func");
    let dst_rgb = parse!(self, Factor, dst_rgb, "blend_func");
    let src_alpha = parse!(self, Factor, src_alpha, "blend_func");
    let dst_alpha = parse!(self, Factor, dst_alpha, "blend_func");

    self.set_raster(NewState::COLOR, |raster| {
      raster.blend.src_rgb = src_rgb;
      raster.blend.dst_rgb = dst_rgb;
      raster.blend.src_alpha = src_alpha;
      raster.blend.dst_alpha = dst_alpha;
    });
    Ok(())
  }

  pub fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
    let color = [r, g, b, a].map(|c| c.clamp(0., 1.));
    self.set_raster(NewState::COLOR, |raster| raster.blend.color = color);
  }

  pub fn alpha_func(&mut self, func: u32, reference: f32) -> GlResult<()> {
    let func = parse!(self, Comparison, func, "alpha_func");

    self.set_raster(NewState::COLOR, |raster| {
      raster.alpha_test.func = func;
      raster.alpha_test.reference = reference.clamp(0., 1.);
    });
    Ok(())
  }

  pub fn stencil_func(&mut self, func: u32, reference: i32, mask: u32) -> GlResult<()> {
    let func = parse!(self, Comparison, func, "stencil_func");

    self.set_raster(NewState::STENCIL, |raster| {
      raster.stencil.func = func;
      raster.stencil.reference = reference;
      raster.stencil.value_mask = mask;
    });
    Ok(())
  }

  pub fn stencil_op(&mut self, fail: u32, depth_fail: u32, depth_pass: u32) -> GlResult<()> {
    let fail = parse!(self, StencilOp, fail, "stencil_op");
    let depth_fail = parse!(self, StencilOp, depth_fail, "stencil_op");
    let depth_pass = parse!(self, StencilOp, depth_pass, "stencil_op");

    self.set_raster(NewState::STENCIL, |raster| {
      raster.stencil.fail = fail;
      raster.stencil.depth_fail = depth_fail;
      raster.stencil.depth_pass = depth_pass;
    });
    Ok(())
  }

  pub fn stencil_mask(&mut self, mask: u32) {
    self.set_raster(NewState::STENCIL, |raster| raster.stencil.write_mask = mask);
  }
}
