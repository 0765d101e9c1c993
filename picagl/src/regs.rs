//! PICA200 register addresses and bit-field helpers.
//!
//! Addresses are the hardware's; changing any of them breaks binary compatibility with the GPU.

// --- Command list control (0x0000-0x003F) ---

/// Marks the end of a command list; written with [`FINALIZE_MAGIC`].
pub const FINALIZE: u16 = 0x0010;
pub const FINALIZE_MAGIC: u32 = 0x1234_5678;

// --- Rasterizer (0x0040-0x007F) ---

pub const FACECULLING_CONFIG: u16 = 0x0040;
/// Half viewport width (f24).
pub const VIEWPORT_WIDTH: u16 = 0x0041;
/// Inverse half viewport width (f31, shifted left once).
pub const VIEWPORT_INVW: u16 = 0x0042;
pub const VIEWPORT_HEIGHT: u16 = 0x0043;
pub const VIEWPORT_INVH: u16 = 0x0044;
pub const DEPTHMAP_SCALE: u16 = 0x004D;
pub const DEPTHMAP_OFFSET: u16 = 0x004E;
pub const EARLYDEPTH_CLEAR: u16 = 0x0063;
pub const SCISSORTEST_MODE: u16 = 0x0065;
pub const SCISSORTEST_POS: u16 = 0x0066;
pub const SCISSORTEST_DIM: u16 = 0x0067;
pub const VIEWPORT_XY: u16 = 0x0068;
pub const DEPTHMAP_ENABLE: u16 = 0x006D;
pub const RENDERBUF_DIM: u16 = 0x006E;

// --- Texturing (0x0080-0x00FF) ---

/// Unit enable bits (byte 0) and texture cache clear (bit 16).
pub const TEXUNIT_CONFIG: u16 = 0x0080;

/// Per-unit texture registers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TexUnitRegs {
  pub border_color: u16,
  pub dim: u16,
  pub param: u16,
  pub lod: u16,
  pub addr: u16,
  pub format: u16,
}

pub const TEXUNITS: [TexUnitRegs; 3] = [
  TexUnitRegs {
    border_color: 0x0081,
    dim: 0x0082,
    param: 0x0083,
    lod: 0x0084,
    addr: 0x0085,
    format: 0x008E,
  },
  TexUnitRegs {
    border_color: 0x0091,
    dim: 0x0092,
    param: 0x0093,
    lod: 0x0094,
    addr: 0x0095,
    format: 0x0096,
  },
  TexUnitRegs {
    border_color: 0x0099,
    dim: 0x009A,
    param: 0x009B,
    lod: 0x009C,
    addr: 0x009D,
    format: 0x009E,
  },
];

/// First register (source) of every texture combiner stage; operand, combiner, color and scale
/// follow.
pub const TEXENV: [u16; 6] = [0x00C0, 0x00C8, 0x00D0, 0x00D8, 0x00F0, 0x00F8];

pub const TEXENV_SOURCE: u16 = 0;
pub const TEXENV_OPERAND: u16 = 1;
pub const TEXENV_COMBINER: u16 = 2;
pub const TEXENV_COLOR: u16 = 3;
pub const TEXENV_SCALE: u16 = 4;

// --- Framebuffer operations (0x0100-0x013F) ---

/// Fragment operation mode; byte 1 selects blending (`0x01`) or logic ops (`0x00`).
pub const COLOR_OPERATION: u16 = 0x0100;
pub const BLEND_FUNC: u16 = 0x0101;
pub const LOGIC_OP: u16 = 0x0102;
pub const BLEND_COLOR: u16 = 0x0103;
pub const FRAGOP_ALPHA_TEST: u16 = 0x0104;
pub const STENCIL_TEST: u16 = 0x0105;
pub const STENCIL_OP: u16 = 0x0106;
pub const DEPTH_COLOR_MASK: u16 = 0x0107;
pub const FRAMEBUFFER_INVALIDATE: u16 = 0x0110;
pub const FRAMEBUFFER_FLUSH: u16 = 0x0111;
pub const COLORBUFFER_READ: u16 = 0x0112;
pub const COLORBUFFER_WRITE: u16 = 0x0113;
pub const DEPTHBUFFER_READ: u16 = 0x0114;
pub const DEPTHBUFFER_WRITE: u16 = 0x0115;
pub const DEPTHBUFFER_FORMAT: u16 = 0x0116;
pub const COLORBUFFER_FORMAT: u16 = 0x0117;
pub const DEPTHBUFFER_LOC: u16 = 0x011C;
pub const COLORBUFFER_LOC: u16 = 0x011D;
pub const FRAMEBUFFER_DIM: u16 = 0x011E;

// --- Geometry pipeline (0x0200-0x027F) ---

pub const INDEXBUFFER_CONFIG: u16 = 0x0227;
pub const NUMVERTICES: u16 = 0x0228;
pub const VERTEX_OFFSET: u16 = 0x022A;
pub const DRAWARRAYS: u16 = 0x022E;
pub const VTX_FUNC: u16 = 0x0231;
pub const START_DRAW_FUNC0: u16 = 0x0245;
pub const GEOSTAGE_CONFIG2: u16 = 0x0253;
pub const PRIMITIVE_CONFIG: u16 = 0x025E;
pub const RESTART_PRIMITIVE: u16 = 0x025F;

// --- Shader units (0x0280-0x02DF) ---

/// Register block of one programmable shader stage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ShaderRegs {
  pub entrypoint: u16,
  pub code_transfer_end: u16,
  pub float_uniform_config: u16,
  pub float_uniform_data: u16,
  pub code_transfer_config: u16,
  pub code_transfer_data: u16,
  pub opdescs_config: u16,
  pub opdescs_data: u16,
}

pub const GSH: ShaderRegs = ShaderRegs {
  entrypoint: 0x028A,
  code_transfer_end: 0x028F,
  float_uniform_config: 0x0290,
  float_uniform_data: 0x0291,
  code_transfer_config: 0x029B,
  code_transfer_data: 0x029C,
  opdescs_config: 0x02A5,
  opdescs_data: 0x02A6,
};

pub const VSH: ShaderRegs = ShaderRegs {
  entrypoint: 0x02BA,
  code_transfer_end: 0x02BF,
  float_uniform_config: 0x02C0,
  float_uniform_data: 0x02C1,
  code_transfer_config: 0x02CB,
  code_transfer_data: 0x02CC,
  opdescs_config: 0x02D5,
  opdescs_data: 0x02D6,
};

/// Number of float uniform vector registers per shader unit.
pub const FLOAT_UNIFORMS: usize = 96;

/// Float uniform upload config: 32-bit floats starting at register `index`.
pub fn float_uniform_config(index: u8) -> u32 {
  0x8000_0000 | index as u32
}

// --- Bit fields ---

/// Hardware comparison function encoding.
pub mod func {
  pub const NEVER: u32 = 0;
  pub const ALWAYS: u32 = 1;
  pub const EQUAL: u32 = 2;
  pub const NOTEQUAL: u32 = 3;
  pub const LESS: u32 = 4;
  pub const LEQUAL: u32 = 5;
  pub const GREATER: u32 = 6;
  pub const GEQUAL: u32 = 7;
}

/// `FACECULLING_CONFIG` values.
pub mod cull {
  pub const NONE: u32 = 0;
  /// Culls counter-clockwise triangles.
  pub const CCW: u32 = 1;
  /// Culls clockwise triangles.
  pub const CW: u32 = 2;
}

/// `PRIMITIVE_CONFIG` byte 1.
pub mod primitive {
  pub const TRIANGLES: u32 = 0x0000;
  pub const TRIANGLE_STRIP: u32 = 0x0100;
  pub const TRIANGLE_FAN: u32 = 0x0200;
}

/// Texture combiner sources.
pub mod texenv_src {
  pub const PRIMARY_COLOR: u32 = 0x0;
  pub const TEXTURE0: u32 = 0x3;
  pub const PREVIOUS: u32 = 0xF;
}

/// Texture combiner functions.
pub mod combine {
  pub const REPLACE: u32 = 0x0;
  pub const MODULATE: u32 = 0x1;
}

/// Pack the texture unit parameter register.
pub fn texture_param(mag_linear: bool, min_linear: bool, mip_linear: bool, wrap_s: u32, wrap_t: u32) -> u32 {
  (mag_linear as u32) << 1
    | (min_linear as u32) << 2
    | (wrap_t & 0x3) << 8
    | (wrap_s & 0x3) << 12
    | (mip_linear as u32) << 24
}

/// Pack the framebuffer dimension register.
pub fn framebuffer_dim(width: u16, height: u16) -> u32 {
  width as u32 | ((height as u32 - 1) << 12) | 1 << 24
}

/// Pack a `(x, y)` pair of 16-bit coordinates.
pub fn xy(x: u32, y: u32) -> u32 {
  (y << 16) | (x & 0xFFFF)
}
