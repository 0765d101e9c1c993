//! Sampler objects and sampler parameter state.
//!
//! [`SamplerState`] is the parameter record shared by sampler objects and by the built-in sampler
//! of every texture. Setters are split in two steps so that the caller can flush batched geometry
//! in between: [`SamplerState::check`] validates a parameter and tells whether it would change
//! anything, then [`SamplerState::apply`] stores it.

use picagl_layout::pack_rgba8;

use crate::arena::{Arena, Id};
use crate::error::{gl_err, GlError, GlResult};
use crate::name_table::NameTable;
use crate::raster::Comparison;
use crate::regs;

const GL_TEXTURE_MAG_FILTER: u32 = 0x2800;
const GL_TEXTURE_MIN_FILTER: u32 = 0x2801;
const GL_TEXTURE_WRAP_S: u32 = 0x2802;
const GL_TEXTURE_WRAP_T: u32 = 0x2803;
const GL_TEXTURE_WRAP_R: u32 = 0x8072;
const GL_TEXTURE_BORDER_COLOR: u32 = 0x1004;
const GL_TEXTURE_MIN_LOD: u32 = 0x813A;
const GL_TEXTURE_MAX_LOD: u32 = 0x813B;
const GL_TEXTURE_LOD_BIAS: u32 = 0x8501;
const GL_TEXTURE_COMPARE_MODE: u32 = 0x884C;
const GL_TEXTURE_COMPARE_FUNC: u32 = 0x884D;
const GL_TEXTURE_MAX_ANISOTROPY: u32 = 0x84FE;

const GL_NONE: u32 = 0;

pub type SamplerId = Id<SamplerObject>;

/// Texture coordinate wrapping.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Wrap {
  /// Behaves as [`Wrap::ClampToEdge`] on this hardware.
  Clamp,
  ClampToEdge,
  ClampToBorder,
  Repeat,
  MirroredRepeat,
}

impl Wrap {
  pub fn from_gl(wrap: u32) -> Option<Self> {
    match wrap {
      0x2900 => Some(Wrap::Clamp),
      0x812F => Some(Wrap::ClampToEdge),
      0x812D => Some(Wrap::ClampToBorder),
      0x2901 => Some(Wrap::Repeat),
      0x8370 => Some(Wrap::MirroredRepeat),
      _ => None,
    }
  }

  pub fn to_gl(self) -> u32 {
    match self {
      Wrap::Clamp => 0x2900,
      Wrap::ClampToEdge => 0x812F,
      Wrap::ClampToBorder => 0x812D,
      Wrap::Repeat => 0x2901,
      Wrap::MirroredRepeat => 0x8370,
    }
  }

  pub fn to_pica(self) -> u32 {
    match self {
      Wrap::Clamp | Wrap::ClampToEdge => 0,
      Wrap::ClampToBorder => 1,
      Wrap::Repeat => 2,
      Wrap::MirroredRepeat => 3,
    }
  }
}

/// Minification filter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MinFilter {
  Nearest,
  Linear,
  NearestMipmapNearest,
  LinearMipmapNearest,
  NearestMipmapLinear,
  LinearMipmapLinear,
}

impl MinFilter {
  pub fn from_gl(filter: u32) -> Option<Self> {
    match filter {
      0x2600 => Some(MinFilter::Nearest),
      0x2601 => Some(MinFilter::Linear),
      0x2700 => Some(MinFilter::NearestMipmapNearest),
      0x2701 => Some(MinFilter::LinearMipmapNearest),
      0x2702 => Some(MinFilter::NearestMipmapLinear),
      0x2703 => Some(MinFilter::LinearMipmapLinear),
      _ => None,
    }
  }

  pub fn to_gl(self) -> u32 {
    match self {
      MinFilter::Nearest => 0x2600,
      MinFilter::Linear => 0x2601,
      MinFilter::NearestMipmapNearest => 0x2700,
      MinFilter::LinearMipmapNearest => 0x2701,
      MinFilter::NearestMipmapLinear => 0x2702,
      MinFilter::LinearMipmapLinear => 0x2703,
    }
  }

  fn is_linear(self) -> bool {
    matches!(
      self,
      MinFilter::Linear | MinFilter::LinearMipmapNearest | MinFilter::LinearMipmapLinear
    )
  }

  fn is_mip_linear(self) -> bool {
    matches!(self, MinFilter::NearestMipmapLinear | MinFilter::LinearMipmapLinear)
  }
}

/// Magnification filter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MagFilter {
  Nearest,
  Linear,
}

impl MagFilter {
  pub fn from_gl(filter: u32) -> Option<Self> {
    match filter {
      0x2600 => Some(MagFilter::Nearest),
      0x2601 => Some(MagFilter::Linear),
      _ => None,
    }
  }

  pub fn to_gl(self) -> u32 {
    match self {
      MagFilter::Nearest => 0x2600,
      MagFilter::Linear => 0x2601,
    }
  }
}

/// Depth comparison mode. The hardware has no shadow comparison.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CompareMode {
  None,
}

/// Border color, in the representation it was specified with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BorderColor {
  F([f32; 4]),
  I([i32; 4]),
  Ui([u32; 4]),
}

impl BorderColor {
  /// `0xAABBGGRR` hardware color.
  pub fn to_pica(&self) -> u32 {
    match *self {
      BorderColor::F(color) => pack_rgba8(color),
      BorderColor::I(color) => pack_rgba8(color.map(|c| c.clamp(0, 255) as f32 / 255.)),
      BorderColor::Ui(color) => pack_rgba8(color.map(|c| c.min(255) as f32 / 255.)),
    }
  }
}

/// A single sampler parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SamplerParam {
  WrapS(Wrap),
  WrapT(Wrap),
  WrapR(Wrap),
  MinFilter(MinFilter),
  MagFilter(MagFilter),
  MinLod(f32),
  MaxLod(f32),
  LodBias(f32),
  CompareMode(CompareMode),
  CompareFunc(Comparison),
  MaxAnisotropy(f32),
  BorderColor(BorderColor),
}

impl SamplerParam {
  // enum-valued parameters use `int`, the others `float`
  fn parse(pname: u32, int: i32, float: f32) -> GlResult<Self> {
    let as_enum = int as u32;

    let param = match pname {
      GL_TEXTURE_WRAP_S => Wrap::from_gl(as_enum).map(SamplerParam::WrapS),
      GL_TEXTURE_WRAP_T => Wrap::from_gl(as_enum).map(SamplerParam::WrapT),
      GL_TEXTURE_WRAP_R => Wrap::from_gl(as_enum).map(SamplerParam::WrapR),
      GL_TEXTURE_MIN_FILTER => MinFilter::from_gl(as_enum).map(SamplerParam::MinFilter),
      GL_TEXTURE_MAG_FILTER => MagFilter::from_gl(as_enum).map(SamplerParam::MagFilter),
      GL_TEXTURE_COMPARE_MODE => (as_enum == GL_NONE).then(|| SamplerParam::CompareMode(CompareMode::None)),
      GL_TEXTURE_COMPARE_FUNC => Comparison::from_gl(as_enum).map(SamplerParam::CompareFunc),
      GL_TEXTURE_MIN_LOD => return Ok(SamplerParam::MinLod(float)),
      GL_TEXTURE_MAX_LOD => return Ok(SamplerParam::MaxLod(float)),
      GL_TEXTURE_LOD_BIAS => return Ok(SamplerParam::LodBias(float)),
      GL_TEXTURE_MAX_ANISOTROPY => return Ok(SamplerParam::MaxAnisotropy(float)),
      _ => return gl_err!(GlError::InvalidEnum, "sampler parameter: pname {:#x}", pname),
    };

    match param {
      Some(param) => Ok(param),
      None => gl_err!(GlError::InvalidEnum, "sampler parameter {:#x}: param {:#x}", pname, int),
    }
  }

  fn first<T: Copy>(pname: u32, params: &[T]) -> GlResult<T> {
    match params.first() {
      Some(param) => Ok(*param),
      None => gl_err!(GlError::InvalidValue, "sampler parameter {:#x}: no value", pname),
    }
  }

  fn four<T: Copy>(params: &[T]) -> GlResult<[T; 4]> {
    match params {
      [a, b, c, d, ..] => Ok([*a, *b, *c, *d]),
      _ => gl_err!(GlError::InvalidValue, "border color: expected 4 components"),
    }
  }

  pub fn from_i(pname: u32, param: i32) -> GlResult<Self> {
    Self::parse(pname, param, param as f32)
  }

  pub fn from_f(pname: u32, param: f32) -> GlResult<Self> {
    Self::parse(pname, param as i32, param)
  }

  /// Vector form; integer border colors are normalized to `[-1; 1]`.
  pub fn from_iv(pname: u32, params: &[i32]) -> GlResult<Self> {
    if pname == GL_TEXTURE_BORDER_COLOR {
      let color = Self::four(params)?.map(|c| ((2. * c as f64 + 1.) / 4_294_967_295.) as f32);
      return Ok(SamplerParam::BorderColor(BorderColor::F(color)));
    }

    Self::from_i(pname, Self::first(pname, params)?)
  }

  pub fn from_fv(pname: u32, params: &[f32]) -> GlResult<Self> {
    if pname == GL_TEXTURE_BORDER_COLOR {
      return Ok(SamplerParam::BorderColor(BorderColor::F(Self::four(params)?)));
    }

    Self::from_f(pname, Self::first(pname, params)?)
  }

  /// Pure-integer form; border colors keep their integer representation.
  pub fn from_iiv(pname: u32, params: &[i32]) -> GlResult<Self> {
    if pname == GL_TEXTURE_BORDER_COLOR {
      return Ok(SamplerParam::BorderColor(BorderColor::I(Self::four(params)?)));
    }

    Self::from_i(pname, Self::first(pname, params)?)
  }

  pub fn from_iuiv(pname: u32, params: &[u32]) -> GlResult<Self> {
    if pname == GL_TEXTURE_BORDER_COLOR {
      return Ok(SamplerParam::BorderColor(BorderColor::Ui(Self::four(params)?)));
    }

    Self::from_i(pname, Self::first(pname, params)? as i32)
  }
}

/// Filtering, wrapping and level-of-detail state.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplerState {
  pub wrap_s: Wrap,
  pub wrap_t: Wrap,
  pub wrap_r: Wrap,
  pub min_filter: MinFilter,
  pub mag_filter: MagFilter,
  pub border_color: BorderColor,
  pub min_lod: f32,
  pub max_lod: f32,
  pub lod_bias: f32,
  pub compare_mode: CompareMode,
  pub compare_func: Comparison,
  pub max_anisotropy: f32,
}

impl Default for SamplerState {
  fn default() -> Self {
    SamplerState {
      wrap_s: Wrap::Repeat,
      wrap_t: Wrap::Repeat,
      wrap_r: Wrap::Repeat,
      min_filter: MinFilter::NearestMipmapLinear,
      mag_filter: MagFilter::Linear,
      border_color: BorderColor::F([0.; 4]),
      min_lod: -1000.,
      max_lod: 1000.,
      lod_bias: 0.,
      compare_mode: CompareMode::None,
      compare_func: Comparison::LessOrEqual,
      max_anisotropy: 1.,
    }
  }
}

impl SamplerState {
  /// Validate `param`; `Ok(false)` means setting it would be a no-op.
  ///
  /// Border colors always count as a change.
  pub fn check(&self, param: &SamplerParam) -> GlResult<bool> {
    let changed = match *param {
      SamplerParam::WrapS(wrap) => self.wrap_s != wrap,
      SamplerParam::WrapT(wrap) => self.wrap_t != wrap,
      SamplerParam::WrapR(wrap) => self.wrap_r != wrap,
      SamplerParam::MinFilter(filter) => self.min_filter != filter,
      SamplerParam::MagFilter(filter) => self.mag_filter != filter,
      SamplerParam::MinLod(lod) => self.min_lod != lod,
      SamplerParam::MaxLod(lod) => self.max_lod != lod,
      SamplerParam::LodBias(bias) => self.lod_bias != bias,
      SamplerParam::CompareMode(mode) => self.compare_mode != mode,
      SamplerParam::CompareFunc(func) => self.compare_func != func,

      SamplerParam::MaxAnisotropy(aniso) => {
        if self.max_anisotropy == aniso {
          false
        } else if aniso < 1. || aniso.is_nan() {
          return gl_err!(GlError::InvalidValue, "max anisotropy {} < 1", aniso);
        } else {
          true
        }
      }

      SamplerParam::BorderColor(_) => true,
    };

    Ok(changed)
  }

  /// Store a parameter previously validated with [`SamplerState::check`].
  pub fn apply(&mut self, param: SamplerParam, max_anisotropy: f32) {
    match param {
      SamplerParam::WrapS(wrap) => self.wrap_s = wrap,
      SamplerParam::WrapT(wrap) => self.wrap_t = wrap,
      SamplerParam::WrapR(wrap) => self.wrap_r = wrap,
      SamplerParam::MinFilter(filter) => self.min_filter = filter,
      SamplerParam::MagFilter(filter) => self.mag_filter = filter,
      SamplerParam::MinLod(lod) => self.min_lod = lod,
      SamplerParam::MaxLod(lod) => self.max_lod = lod,
      SamplerParam::LodBias(bias) => self.lod_bias = bias,
      SamplerParam::CompareMode(mode) => self.compare_mode = mode,
      SamplerParam::CompareFunc(func) => self.compare_func = func,
      SamplerParam::MaxAnisotropy(aniso) => self.max_anisotropy = aniso.min(max_anisotropy),
      SamplerParam::BorderColor(color) => self.border_color = color,
    }
  }

  /// Current value of a parameter.
  pub fn parameter(&self, pname: u32) -> GlResult<SamplerParam> {
    let param = match pname {
      GL_TEXTURE_WRAP_S => SamplerParam::WrapS(self.wrap_s),
      GL_TEXTURE_WRAP_T => SamplerParam::WrapT(self.wrap_t),
      GL_TEXTURE_WRAP_R => SamplerParam::WrapR(self.wrap_r),
      GL_TEXTURE_MIN_FILTER => SamplerParam::MinFilter(self.min_filter),
      GL_TEXTURE_MAG_FILTER => SamplerParam::MagFilter(self.mag_filter),
      GL_TEXTURE_MIN_LOD => SamplerParam::MinLod(self.min_lod),
      GL_TEXTURE_MAX_LOD => SamplerParam::MaxLod(self.max_lod),
      GL_TEXTURE_LOD_BIAS => SamplerParam::LodBias(self.lod_bias),
      GL_TEXTURE_COMPARE_MODE => SamplerParam::CompareMode(self.compare_mode),
      GL_TEXTURE_COMPARE_FUNC => SamplerParam::CompareFunc(self.compare_func),
      GL_TEXTURE_MAX_ANISOTROPY => SamplerParam::MaxAnisotropy(self.max_anisotropy),
      GL_TEXTURE_BORDER_COLOR => SamplerParam::BorderColor(self.border_color),
      _ => return gl_err!(GlError::InvalidEnum, "get sampler parameter: pname {:#x}", pname),
    };

    Ok(param)
  }

  /// Texture unit parameter register.
  pub fn param_to_pica(&self) -> u32 {
    regs::texture_param(
      self.mag_filter == MagFilter::Linear,
      self.min_filter.is_linear(),
      self.min_filter.is_mip_linear(),
      self.wrap_s.to_pica(),
      self.wrap_t.to_pica(),
    )
  }

  /// Texture unit LOD register: signed 4.8 fixed-point bias, then max and min levels.
  pub fn lod_to_pica(&self) -> u32 {
    let bias = ((self.lod_bias.clamp(-16., 15.99) * 256.) as i32 as u32) & 0x1FFF;
    let max = self.max_lod.clamp(0., 15.) as u32;
    let min = self.min_lod.clamp(0., 15.) as u32;

    bias | max << 16 | min << 24
  }
}

/// Sampler object.
#[derive(Debug)]
pub struct SamplerObject {
  name: u32,
  pub state: SamplerState,
}

impl SamplerObject {
  pub fn name(&self) -> u32 {
    self.name
  }
}

/// Sampler objects shared by a group of contexts.
///
/// Texture units reference samplers through `Option<SamplerId>` slots; `None` selects the bound
/// texture's own sampler state.
#[derive(Debug, Default)]
pub struct SamplerStore {
  objects: Arena<SamplerObject>,
  names: NameTable<SamplerId>,
}

impl SamplerStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reserve `n` names and create their objects.
  pub fn gen_samplers(&mut self, n: i32) -> GlResult<Vec<u32>> {
    if n < 0 {
      return gl_err!(GlError::InvalidValue, "gen_samplers: n < 0");
    }

    if n == 0 {
      return Ok(Vec::new());
    }

    let first = match self.names.find_free_key_block(n as u32) {
      Some(first) => first,
      None => return gl_err!(GlError::OutOfMemory, "gen_samplers: no free names"),
    };

    let names: Vec<u32> = (first..first + n as u32).collect();

    for &name in &names {
      let id = self.objects.insert(SamplerObject {
        name,
        state: SamplerState::default(),
      });
      self.names.insert(name, id);
    }

    Ok(names)
  }

  pub fn is_sampler(&self, name: u32) -> bool {
    name != 0 && self.names.contains(name)
  }

  /// Object named `name`.
  pub fn id(&self, name: u32) -> Option<SamplerId> {
    self.names.lookup(name).copied()
  }

  /// Resolve a name for binding: `0` unbinds, unknown names are rejected.
  pub fn resolve(&self, name: u32, caller: &str) -> GlResult<Option<SamplerId>> {
    if name == 0 {
      return Ok(None);
    }

    match self.id(name) {
      Some(id) => Ok(Some(id)),
      None => gl_err!(GlError::InvalidOperation, "{}: {} is not a sampler", caller, name),
    }
  }

  pub fn get(&self, id: SamplerId) -> Option<&SamplerObject> {
    self.objects.get(id)
  }

  pub fn get_mut(&mut self, id: SamplerId) -> Option<&mut SamplerObject> {
    self.objects.get_mut(id)
  }

  /// Object named `name`, for parameter queries and updates.
  pub fn named_mut(&mut self, name: u32, caller: &str) -> GlResult<&mut SamplerObject> {
    match self.names.lookup(name).copied() {
      Some(id) => match self.objects.get_mut(id) {
        Some(obj) => Ok(obj),
        None => gl_err!(GlError::InvalidOperation, "{}: {} is not a sampler", caller, name),
      },

      None => gl_err!(GlError::InvalidOperation, "{}: {} is not a sampler", caller, name),
    }
  }

  /// Point a unit slot at `sampler`, moving one reference.
  pub fn bind_slot(&mut self, slot: &mut Option<SamplerId>, sampler: Option<SamplerId>) {
    if let Some(id) = sampler {
      self.objects.retain(id);
    }

    if let Some(old) = std::mem::replace(slot, sampler) {
      self.objects.release(old);
    }
  }

  /// Remove a name; the object lives on while units still reference it.
  pub fn remove(&mut self, name: u32) {
    if let Some(id) = self.names.remove(name) {
      self.objects.release(id);
    }
  }

  /// Number of sampler objects alive.
  pub fn live_objects(&self) -> usize {
    self.objects.len()
  }
}
