//! Context configuration.

/// Screen a context presents to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Screen {
  /// 400×240 top screen.
  Top,
  /// 320×240 bottom screen.
  Bottom,
}

impl Screen {
  /// Framebuffer dimensions in GPU orientation (`[width, height]`).
  ///
  /// Panels are mounted rotated by 90 degrees, so the GPU sees them in portrait.
  pub fn framebuffer_size(self) -> [u16; 2] {
    match self {
      Screen::Top => [240, 400],
      Screen::Bottom => [240, 320],
    }
  }

  /// Dimensions as the application sees them (`[width, height]`).
  pub fn size(self) -> [u16; 2] {
    let [w, h] = self.framebuffer_size();
    [h, w]
  }
}

/// Implementation limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limits {
  pub max_modelview_stack_depth: usize,
  pub max_projection_stack_depth: usize,
  pub max_texture_stack_depth: usize,
  /// Texture units whose state is emitted.
  pub texture_units: usize,
  pub max_texture_max_anisotropy: f32,
  pub vertex_attribs: usize,
}

impl Default for Limits {
  fn default() -> Self {
    Limits {
      max_modelview_stack_depth: 32,
      max_projection_stack_depth: 32,
      max_texture_stack_depth: 10,
      texture_units: 3,
      max_texture_max_anisotropy: 16.,
      vertex_attribs: 12,
    }
  }
}

/// Configuration a context is created with.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextConfig {
  /// Screen presented by `flush_context` and `swap_buffers`.
  pub screen: Screen,
  /// Capacity of the context command buffer, in 32-bit words.
  pub command_buffer_words: usize,
  pub limits: Limits,
}

impl ContextConfig {
  pub fn new(screen: Screen) -> Self {
    ContextConfig {
      screen,
      ..ContextConfig::default()
    }
  }

  pub fn with_command_buffer_words(self, command_buffer_words: usize) -> Self {
    ContextConfig {
      command_buffer_words,
      ..self
    }
  }

  pub fn with_limits(self, limits: Limits) -> Self {
    ContextConfig { limits, ..self }
  }
}

impl Default for ContextConfig {
  fn default() -> Self {
    ContextConfig {
      screen: Screen::Top,
      command_buffer_words: 0x40000,
      limits: Limits::default(),
    }
  }
}
