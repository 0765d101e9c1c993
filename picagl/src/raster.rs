//! Rasterization and per-fragment operation state.
//!
//! Every enum here is parsed from its GL value and knows its hardware encoding.

use bitflags::bitflags;

use crate::regs;
use crate::state::NewState;

/// Comparison functions, used by depth, alpha and stencil tests and sampler comparisons.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Comparison {
  Never,
  Less,
  Equal,
  LessOrEqual,
  Greater,
  NotEqual,
  GreaterOrEqual,
  Always,
}

impl Comparison {
  pub fn from_gl(func: u32) -> Option<Self> {
    match func {
      0x0200 => Some(Comparison::Never),
      0x0201 => Some(Comparison::Less),
      0x0202 => Some(Comparison::Equal),
      0x0203 => Some(Comparison::LessOrEqual),
      0x0204 => Some(Comparison::Greater),
      0x0205 => Some(Comparison::NotEqual),
      0x0206 => Some(Comparison::GreaterOrEqual),
      0x0207 => Some(Comparison::Always),
      _ => None,
    }
  }

  pub fn to_gl(self) -> u32 {
    match self {
      Comparison::Never => 0x0200,
      Comparison::Less => 0x0201,
      Comparison::Equal => 0x0202,
      Comparison::LessOrEqual => 0x0203,
      Comparison::Greater => 0x0204,
      Comparison::NotEqual => 0x0205,
      Comparison::GreaterOrEqual => 0x0206,
      Comparison::Always => 0x0207,
    }
  }

  pub fn to_pica(self) -> u32 {
    match self {
      Comparison::Never => regs::func::NEVER,
      Comparison::Less => regs::func::LESS,
      Comparison::Equal => regs::func::EQUAL,
      Comparison::LessOrEqual => regs::func::LEQUAL,
      Comparison::Greater => regs::func::GREATER,
      Comparison::NotEqual => regs::func::NOTEQUAL,
      Comparison::GreaterOrEqual => regs::func::GEQUAL,
      Comparison::Always => regs::func::ALWAYS,
    }
  }
}

/// Faces selected for culling.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Face {
  Front,
  Back,
  /// Accepted, but the hardware can only cull one winding; culls as [`Face::Back`].
  FrontAndBack,
}

impl Face {
  pub fn from_gl(face: u32) -> Option<Self> {
    match face {
      0x0404 => Some(Face::Front),
      0x0405 => Some(Face::Back),
      0x0408 => Some(Face::FrontAndBack),
      _ => None,
    }
  }
}

/// Winding of front-facing triangles.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FrontFace {
  Cw,
  Ccw,
}

impl FrontFace {
  pub fn from_gl(mode: u32) -> Option<Self> {
    match mode {
      0x0900 => Some(FrontFace::Cw),
      0x0901 => Some(FrontFace::Ccw),
      _ => None,
    }
  }
}

/// Polygon rasterization mode. Only [`PolygonMode::Fill`] is rasterized by the hardware.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PolygonMode {
  Point,
  Line,
  Fill,
}

impl PolygonMode {
  pub fn from_gl(mode: u32) -> Option<Self> {
    match mode {
      0x1B00 => Some(PolygonMode::Point),
      0x1B01 => Some(PolygonMode::Line),
      0x1B02 => Some(PolygonMode::Fill),
      _ => None,
    }
  }
}

/// Blending equation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Equation {
  Additive,
  Subtract,
  ReverseSubtract,
  Min,
  Max,
}

impl Equation {
  pub fn from_gl(mode: u32) -> Option<Self> {
    match mode {
      0x8006 => Some(Equation::Additive),
      0x800A => Some(Equation::Subtract),
      0x800B => Some(Equation::ReverseSubtract),
      0x8007 => Some(Equation::Min),
      0x8008 => Some(Equation::Max),
      _ => None,
    }
  }

  pub fn to_pica(self) -> u32 {
    match self {
      Equation::Additive => 0,
      Equation::Subtract => 1,
      Equation::ReverseSubtract => 2,
      Equation::Min => 3,
      Equation::Max => 4,
    }
  }
}

/// Blending factor.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Factor {
  Zero,
  One,
  SrcColor,
  SrcColorComplement,
  DstColor,
  DstColorComplement,
  SrcAlpha,
  SrcAlphaComplement,
  DstAlpha,
  DstAlphaComplement,
  ConstantColor,
  ConstantColorComplement,
  ConstantAlpha,
  ConstantAlphaComplement,
  SrcAlphaSaturate,
}

impl Factor {
  pub fn from_gl(factor: u32) -> Option<Self> {
    match factor {
      0x0000 => Some(Factor::Zero),
      0x0001 => Some(Factor::One),
      0x0300 => Some(Factor::SrcColor),
      0x0301 => Some(Factor::SrcColorComplement),
      0x0302 => Some(Factor::SrcAlpha),
      0x0303 => Some(Factor::SrcAlphaComplement),
      0x0304 => Some(Factor::DstAlpha),
      0x0305 => Some(Factor::DstAlphaComplement),
      0x0306 => Some(Factor::DstColor),
      0x0307 => Some(Factor::DstColorComplement),
      0x0308 => Some(Factor::SrcAlphaSaturate),
      0x8001 => Some(Factor::ConstantColor),
      0x8002 => Some(Factor::ConstantColorComplement),
      0x8003 => Some(Factor::ConstantAlpha),
      0x8004 => Some(Factor::ConstantAlphaComplement),
      _ => None,
    }
  }

  pub fn to_pica(self) -> u32 {
    match self {
      Factor::Zero => 0,
      Factor::One => 1,
      Factor::SrcColor => 2,
      Factor::SrcColorComplement => 3,
      Factor::DstColor => 4,
      Factor::DstColorComplement => 5,
      Factor::SrcAlpha => 6,
      Factor::SrcAlphaComplement => 7,
      Factor::DstAlpha => 8,
      Factor::DstAlphaComplement => 9,
      Factor::ConstantColor => 10,
      Factor::ConstantColorComplement => 11,
      Factor::ConstantAlpha => 12,
      Factor::ConstantAlphaComplement => 13,
      Factor::SrcAlphaSaturate => 14,
    }
  }
}

/// Stencil buffer operation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StencilOp {
  Keep,
  Zero,
  Replace,
  Incr,
  Decr,
  Invert,
  IncrWrap,
  DecrWrap,
}

impl StencilOp {
  pub fn from_gl(op: u32) -> Option<Self> {
    match op {
      0x1E00 => Some(StencilOp::Keep),
      0x0000 => Some(StencilOp::Zero),
      0x1E01 => Some(StencilOp::Replace),
      0x1E02 => Some(StencilOp::Incr),
      0x1E03 => Some(StencilOp::Decr),
      0x150A => Some(StencilOp::Invert),
      0x8507 => Some(StencilOp::IncrWrap),
      0x8508 => Some(StencilOp::DecrWrap),
      _ => None,
    }
  }

  pub fn to_pica(self) -> u32 {
    match self {
      StencilOp::Keep => 0,
      StencilOp::Zero => 1,
      StencilOp::Replace => 2,
      StencilOp::Incr => 3,
      StencilOp::Decr => 4,
      StencilOp::Invert => 5,
      StencilOp::IncrWrap => 6,
      StencilOp::DecrWrap => 7,
    }
  }
}

bitflags! {
  /// Buffers touched by a clear.
  #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
  pub struct ClearMask: u32 {
    const DEPTH = 0x0100;
    const STENCIL = 0x0400;
    const COLOR = 0x4000;
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CullState {
  pub enabled: bool,
  pub face: Face,
  pub front_face: FrontFace,
}

impl CullState {
  /// Hardware culling mode.
  pub fn to_pica(&self) -> u32 {
    if !self.enabled {
      return regs::cull::NONE;
    }

    match (self.face, self.front_face) {
      (Face::Front, FrontFace::Ccw) => regs::cull::CCW,
      (Face::Front, FrontFace::Cw) => regs::cull::CW,
      (_, FrontFace::Ccw) => regs::cull::CW,
      (_, FrontFace::Cw) => regs::cull::CCW,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolygonOffset {
  pub enabled: bool,
  pub factor: f32,
  pub units: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthState {
  pub test: bool,
  pub func: Comparison,
  pub write: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendState {
  pub enabled: bool,
  pub equation_rgb: Equation,
  pub equation_alpha: Equation,
  pub src_rgb: Factor,
  pub dst_rgb: Factor,
  pub src_alpha: Factor,
  pub dst_alpha: Factor,
  pub color: [f32; 4],
}

impl BlendState {
  /// `BLEND_FUNC` register value. Disabled blending is emitted as `src * 1 + dst * 0`.
  pub fn to_pica(&self) -> u32 {
    let (eq_rgb, eq_alpha, src_rgb, dst_rgb, src_alpha, dst_alpha) = if self.enabled {
      (
        self.equation_rgb,
        self.equation_alpha,
        self.src_rgb,
        self.dst_rgb,
        self.src_alpha,
        self.dst_alpha,
      )
    } else {
      (
        Equation::Additive,
        Equation::Additive,
        Factor::One,
        Factor::Zero,
        Factor::One,
        Factor::Zero,
      )
    };

    eq_rgb.to_pica()
      | eq_alpha.to_pica() << 8
      | src_rgb.to_pica() << 16
      | dst_rgb.to_pica() << 20
      | src_alpha.to_pica() << 24
      | dst_alpha.to_pica() << 28
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlphaTest {
  pub enabled: bool,
  pub func: Comparison,
  /// Reference value in `[0; 1]`.
  pub reference: f32,
}

impl AlphaTest {
  pub fn to_pica(&self) -> u32 {
    let reference = (self.reference.clamp(0., 1.) * 255.) as u32;
    self.enabled as u32 | self.func.to_pica() << 4 | reference << 8
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StencilState {
  pub enabled: bool,
  pub func: Comparison,
  pub reference: i32,
  pub value_mask: u32,
  pub write_mask: u32,
  pub fail: StencilOp,
  pub depth_fail: StencilOp,
  pub depth_pass: StencilOp,
}

impl StencilState {
  pub fn test_to_pica(&self) -> u32 {
    self.enabled as u32
      | self.func.to_pica() << 4
      | (self.write_mask & 0xFF) << 8
      | (self.reference as u32 & 0xFF) << 16
      | (self.value_mask & 0xFF) << 24
  }

  pub fn op_to_pica(&self) -> u32 {
    self.fail.to_pica() | self.depth_fail.to_pica() << 4 | self.depth_pass.to_pica() << 8
  }
}

/// Rectangle in window coordinates (origin at the lower left corner).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Rect {
  pub x: i32,
  pub y: i32,
  pub width: u32,
  pub height: u32,
}

/// Rasterization and fragment state of a context.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterState {
  pub cull: CullState,
  pub polygon_offset: PolygonOffset,
  pub polygon_mode: PolygonMode,
  pub depth: DepthState,
  pub color_mask: [bool; 4],
  pub blend: BlendState,
  pub alpha_test: AlphaTest,
  pub stencil: StencilState,
  pub clear_color: [f32; 4],
  pub clear_depth: f32,
  pub clear_stencil: i32,
  pub viewport: Rect,
  pub scissor_test: bool,
  pub scissor: Rect,
}

impl RasterState {
  /// Initial state of a context drawing to a `width`×`height` window.
  pub fn new(width: u32, height: u32) -> Self {
    let window = Rect {
      x: 0,
      y: 0,
      width,
      height,
    };

    RasterState {
      cull: CullState {
        enabled: false,
        face: Face::Back,
        front_face: FrontFace::Ccw,
      },
      polygon_offset: PolygonOffset {
        enabled: false,
        factor: 0.,
        units: 0.,
      },
      polygon_mode: PolygonMode::Fill,
      depth: DepthState {
        test: false,
        func: Comparison::Less,
        write: true,
      },
      color_mask: [true; 4],
      blend: BlendState {
        enabled: false,
        equation_rgb: Equation::Additive,
        equation_alpha: Equation::Additive,
        src_rgb: Factor::One,
        dst_rgb: Factor::Zero,
        src_alpha: Factor::One,
        dst_alpha: Factor::Zero,
        color: [0.; 4],
      },
      alpha_test: AlphaTest {
        enabled: false,
        func: Comparison::Always,
        reference: 0.,
      },
      stencil: StencilState {
        enabled: false,
        func: Comparison::Always,
        reference: 0,
        value_mask: 0xFF,
        write_mask: 0xFF,
        fail: StencilOp::Keep,
        depth_fail: StencilOp::Keep,
        depth_pass: StencilOp::Keep,
      },
      clear_color: [0.; 4],
      clear_depth: 1.,
      clear_stencil: 0,
      viewport: window,
      scissor_test: false,
      scissor: window,
    }
  }

  /// `DEPTH_COLOR_MASK` register value.
  pub fn depth_color_mask_to_pica(&self) -> u32 {
    let [r, g, b, a] = self.color_mask;
    let depth_func = if self.depth.test {
      self.depth.func
    } else {
      Comparison::Always
    };

    self.depth.test as u32
      | depth_func.to_pica() << 4
      | (r as u32) << 8
      | (g as u32) << 9
      | (b as u32) << 10
      | (a as u32) << 11
      | ((self.depth.test && self.depth.write) as u32) << 12
  }
}


/// Capabilities toggled with `enable`/`disable`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Capability {
  CullFace,
  PolygonOffsetFill,
  DepthTest,
  Blend,
  AlphaTest,
  StencilTest,
  ScissorTest,
}

impl Capability {
  pub fn from_gl(cap: u32) -> Option<Self> {
    match cap {
      0x0B44 => Some(Capability::CullFace),
      0x8037 => Some(Capability::PolygonOffsetFill),
      0x0B71 => Some(Capability::DepthTest),
      0x0BE2 => Some(Capability::Blend),
      0x0BC0 => Some(Capability::AlphaTest),
      0x0B90 => Some(Capability::StencilTest),
      0x0C11 => Some(Capability::ScissorTest),
      _ => None,
    }
  }

  /// State category the capability belongs to.
  pub fn dirty_state(self) -> NewState {
    match self {
      Capability::CullFace | Capability::PolygonOffsetFill => NewState::POLYGON,
      Capability::DepthTest => NewState::DEPTH,
      Capability::Blend | Capability::AlphaTest => NewState::COLOR,
      Capability::StencilTest => NewState::STENCIL,
      Capability::ScissorTest => NewState::SCISSOR,
    }
  }
}

impl RasterState {
  pub fn is_enabled(&self, cap: Capability) -> bool {
    match cap {
      Capability::CullFace => self.cull.enabled,
      Capability::PolygonOffsetFill => self.polygon_offset.enabled,
      Capability::DepthTest => self.depth.test,
      Capability::Blend => self.blend.enabled,
      Capability::AlphaTest => self.alpha_test.enabled,
      Capability::StencilTest => self.stencil.enabled,
      Capability::ScissorTest => self.scissor_test,
    }
  }

  fn flag_mut(&mut self, cap: Capability) -> &mut bool {
    match cap {
      Capability::CullFace => &mut self.cull.enabled,
      Capability::PolygonOffsetFill => &mut self.polygon_offset.enabled,
      Capability::DepthTest => &mut self.depth.test,
      Capability::Blend => &mut self.blend.enabled,
      Capability::AlphaTest => &mut self.alpha_test.enabled,
      Capability::StencilTest => &mut self.stencil.enabled,
      Capability::ScissorTest => &mut self.scissor_test,
    }
  }

  pub fn set_enabled(&mut self, cap: Capability, enabled: bool) {
    *self.flag_mut(cap) = enabled;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn comparisons() {
    assert_eq!(Comparison::from_gl(0x0203), Some(Comparison::LessOrEqual));
    assert_eq!(Comparison::from_gl(0x0208), None);
    assert_eq!(Comparison::Always.to_pica(), regs::func::ALWAYS);
    assert_eq!(Comparison::GreaterOrEqual.to_gl(), 0x0206);
  }

  #[test]
  fn cull_mode_follows_winding() {
    let mut cull = CullState {
      enabled: false,
      face: Face::Back,
      front_face: FrontFace::Ccw,
    };
    assert_eq!(cull.to_pica(), regs::cull::NONE);

    cull.enabled = true;
    assert_eq!(cull.to_pica(), regs::cull::CW);

    cull.face = Face::Front;
    assert_eq!(cull.to_pica(), regs::cull::CCW);

    cull.front_face = FrontFace::Cw;
    assert_eq!(cull.to_pica(), regs::cull::CW);
  }

  #[test]
  fn disabled_blending_is_replace() {
    let state = RasterState::new(400, 240);
    assert_eq!(state.blend.to_pica(), 0x0101_0000);

    let mut blend = state.blend;
    blend.enabled = true;
    blend.src_rgb = Factor::SrcAlpha;
    blend.dst_rgb = Factor::SrcAlphaComplement;
    assert_eq!(blend.to_pica(), 0x0176_0000);
  }

  #[test]
  fn depth_color_mask() {
    let mut state = RasterState::new(400, 240);
    assert_eq!(state.depth_color_mask_to_pica(), 0x0F10);

    state.depth.test = true;
    assert_eq!(state.depth_color_mask_to_pica(), 0x1F41);
  }
}
