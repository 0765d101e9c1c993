#![allow(dead_code)]

use picagl::config::{ContextConfig, Screen};
use picagl::{ContextId, ContextRegistry};
use picagl_pica::dvlb::{DvlbBuilder, ShaderType};
use picagl_pica::Pica200;

pub const GL_TRIANGLES: u32 = 0x0004;
pub const GL_TEXTURE_2D: u32 = 0x0DE1;
pub const GL_TEXTURE0: u32 = 0x84C0;
pub const GL_RGBA: u32 = 0x1908;
pub const GL_UNSIGNED_BYTE: u32 = 0x1401;
pub const GL_PROJECTION: u32 = 0x1701;
pub const GL_MODELVIEW: u32 = 0x1700;
pub const GL_LESS: u32 = 0x0201;
pub const GL_GREATER: u32 = 0x0204;
pub const GL_BLEND: u32 = 0x0BE2;
pub const GL_NEAREST: i32 = 0x2600;
pub const GL_TEXTURE_MAG_FILTER: u32 = 0x2800;
pub const GL_COLOR_BUFFER_BIT: u32 = 0x4000;
pub const GL_DEPTH_BUFFER_BIT: u32 = 0x0100;
pub const GL_STENCIL_BUFFER_BIT: u32 = 0x0400;

pub const GL_ARRAY_BUFFER: u32 = 0x8892;
pub const GL_COPY_READ_BUFFER: u32 = 0x8F36;
pub const GL_COPY_WRITE_BUFFER: u32 = 0x8F37;
pub const GL_STATIC_DRAW: u32 = 0x88E4;
pub const GL_MAP_READ_BIT: u32 = 0x0001;
pub const GL_MAP_WRITE_BIT: u32 = 0x0002;
pub const GL_MAP_UNSYNCHRONIZED_BIT: u32 = 0x0020;
pub const GL_DYNAMIC_STORAGE_BIT: u32 = 0x0100;
pub const GL_BUFFER_SIZE: u32 = 0x8764;

pub const VERTEX_SHADER_BINARY: u32 = 0x01;

pub fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

pub fn registry() -> ContextRegistry<Pica200> {
  init_logger();
  ContextRegistry::new(Pica200::new().expect("simulated GPU"))
}

/// Registry with one current context on the top screen.
pub fn current_context() -> (ContextRegistry<Pica200>, ContextId) {
  let mut registry = registry();
  let id = registry
    .create_context(ContextConfig::new(Screen::Top), None)
    .expect("context");
  registry.make_current(id).expect("make current");

  (registry, id)
}

/// Vertex shader binary declaring `projection` and `modelview` at the given float registers.
pub fn shader(projection: u16, modelview: u16) -> Vec<u8> {
  DvlbBuilder::new()
    .code(&[0x4C00_0000, 0x4C20_0001, 0x8800_0000])
    .opdescs(&[0x0000_036F])
    .entry(
      ShaderType::Vertex,
      0,
      &[
        ("projection", 0x10 + projection, 0x13 + projection),
        ("modelview", 0x10 + modelview, 0x13 + modelview),
        ("tint", 0x10 + 20, 0x10 + 20),
      ],
    )
    .build()
}
