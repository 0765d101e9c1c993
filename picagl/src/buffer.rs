//! Buffer objects.
//!
//! Buffers are reference-counted: the name table holds one reference and so does every binding
//! point (context targets, vertex attributes, element array) currently pointing at them. Unbound
//! binding points reference the _null buffer_, a pinned object named `0`.
//!
//! Deleting a name removes it from the table right away and re-points the binding points of the
//! calling context to the null buffer. Bindings held by other contexts sharing the store keep the
//! storage alive until they are changed; the object is flagged _delete pending_ so that binding
//! the same name again never resurrects it.

use bitflags::bitflags;
use log::debug;

use crate::arena::{Arena, Id};
use crate::error::{gl_err, GlError, GlResult};
use crate::name_table::NameTable;

const GL_ARRAY_BUFFER: u32 = 0x8892;
const GL_ELEMENT_ARRAY_BUFFER: u32 = 0x8893;
const GL_COPY_READ_BUFFER: u32 = 0x8F36;
const GL_COPY_WRITE_BUFFER: u32 = 0x8F37;

const GL_STATIC_DRAW: u32 = 0x88E4;
const GL_DYNAMIC_DRAW: u32 = 0x88E8;

const GL_READ_ONLY: u32 = 0x88B8;
const GL_WRITE_ONLY: u32 = 0x88B9;
const GL_READ_WRITE: u32 = 0x88BA;

const GL_BUFFER_SIZE: u32 = 0x8764;
const GL_BUFFER_USAGE: u32 = 0x8765;
const GL_BUFFER_ACCESS: u32 = 0x88BB;
const GL_BUFFER_MAPPED: u32 = 0x88BC;
const GL_BUFFER_ACCESS_FLAGS: u32 = 0x911F;
const GL_BUFFER_MAP_LENGTH: u32 = 0x9120;
const GL_BUFFER_MAP_OFFSET: u32 = 0x9121;
const GL_BUFFER_IMMUTABLE_STORAGE: u32 = 0x821F;
const GL_BUFFER_STORAGE_FLAGS: u32 = 0x8220;

const GL_R8: u32 = 0x8229;
const GL_RG8: u32 = 0x822B;
const GL_RGBA8: u32 = 0x8058;
const GL_R32F: u32 = 0x822E;
const GL_RG32F: u32 = 0x8230;
const GL_RGBA32F: u32 = 0x8814;

pub type BufferId = Id<BufferObject>;

/// Buffer binding targets.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BufferTarget {
  /// Vertex attribute data.
  Array,
  /// Vertex indices; part of the vertex array state.
  ElementArray,
  CopyRead,
  CopyWrite,
}

impl BufferTarget {
  pub fn from_gl(target: u32) -> Option<Self> {
    match target {
      GL_ARRAY_BUFFER => Some(BufferTarget::Array),
      GL_ELEMENT_ARRAY_BUFFER => Some(BufferTarget::ElementArray),
      GL_COPY_READ_BUFFER => Some(BufferTarget::CopyRead),
      GL_COPY_WRITE_BUFFER => Some(BufferTarget::CopyWrite),
      _ => None,
    }
  }
}

bitflags! {
  /// Storage flags of a buffer.
  #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
  pub struct StorageFlags: u32 {
    const MAP_READ = 0x0001;
    const MAP_WRITE = 0x0002;
    const DYNAMIC_STORAGE = 0x0100;
    const CLIENT_STORAGE = 0x0200;
  }
}

bitflags! {
  /// Access requested when mapping a buffer range.
  #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
  pub struct MapAccess: u32 {
    const READ = 0x0001;
    const WRITE = 0x0002;
    const INVALIDATE_RANGE = 0x0004;
    const INVALIDATE_BUFFER = 0x0008;
    const FLUSH_EXPLICIT = 0x0010;
    const UNSYNCHRONIZED = 0x0020;
  }
}

/// Usage hint given when (re)specifying a mutable buffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Usage {
  StaticDraw,
  DynamicDraw,
}

impl Usage {
  pub fn from_gl(usage: u32) -> Option<Self> {
    match usage {
      GL_STATIC_DRAW => Some(Usage::StaticDraw),
      GL_DYNAMIC_DRAW => Some(Usage::DynamicDraw),
      _ => None,
    }
  }

  pub fn to_gl(self) -> u32 {
    match self {
      Usage::StaticDraw => GL_STATIC_DRAW,
      Usage::DynamicDraw => GL_DYNAMIC_DRAW,
    }
  }
}

/// Mapping slots; a buffer can be mapped once per slot.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MapSlot {
  /// Mapping made on behalf of the application.
  User,
  /// Mapping made by the implementation itself.
  Internal,
}

impl MapSlot {
  fn index(self) -> usize {
    match self {
      MapSlot::User => 0,
      MapSlot::Internal => 1,
    }
  }
}

/// Mapped range of a buffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Mapping {
  pub offset: usize,
  pub length: usize,
  pub access: MapAccess,
}

impl Mapping {
  fn overlaps(&self, offset: usize, size: usize) -> bool {
    offset < self.offset + self.length && self.offset < offset + size
  }
}

/// Buffer object.
#[derive(Debug)]
pub struct BufferObject {
  name: u32,
  data: Vec<u8>,
  usage: Usage,
  immutable: bool,
  storage_flags: StorageFlags,
  mappings: [Option<Mapping>; 2],
  delete_pending: bool,
}

impl BufferObject {
  fn new(name: u32) -> Self {
    BufferObject {
      name,
      data: Vec::new(),
      usage: Usage::StaticDraw,
      immutable: false,
      storage_flags: StorageFlags::MAP_READ | StorageFlags::MAP_WRITE | StorageFlags::DYNAMIC_STORAGE,
      mappings: [None; 2],
      delete_pending: false,
    }
  }

  pub fn name(&self) -> u32 {
    self.name
  }

  pub fn size(&self) -> usize {
    self.data.len()
  }

  pub fn data(&self) -> &[u8] {
    &self.data
  }

  pub fn usage(&self) -> Usage {
    self.usage
  }

  pub fn is_immutable(&self) -> bool {
    self.immutable
  }

  pub fn storage_flags(&self) -> StorageFlags {
    self.storage_flags
  }

  pub fn mapping(&self, slot: MapSlot) -> Option<&Mapping> {
    self.mappings[slot.index()].as_ref()
  }

  pub fn is_mapped(&self, slot: MapSlot) -> bool {
    self.mapping(slot).is_some()
  }

  pub fn is_delete_pending(&self) -> bool {
    self.delete_pending
  }

  fn unmap_all(&mut self) {
    self.mappings = [None; 2];
  }

  // the previous contents are always dropped before the new storage is allocated
  fn reallocate(&mut self, size: usize, data: Option<&[u8]>) -> GlResult<()> {
    self.data = Vec::new();

    let mut storage = Vec::new();
    if storage.try_reserve_exact(size).is_err() {
      return gl_err!(GlError::OutOfMemory, "buffer {}: cannot allocate {} bytes", self.name, size);
    }

    match data {
      Some(data) => storage.extend_from_slice(&data[..size]),
      None => storage.resize(size, 0),
    }

    self.data = storage;
    Ok(())
  }

  // validate a sub-range against the buffer size and its user mapping
  fn check_range(&self, offset: isize, size: isize, mapped_range: bool, caller: &str) -> GlResult<(usize, usize)> {
    if size < 0 || offset < 0 {
      return gl_err!(GlError::InvalidValue, "{}: negative offset or size", caller);
    }

    let (offset, size) = (offset as usize, size as usize);

    match offset.checked_add(size) {
      Some(end) if end <= self.size() => (),
      _ => {
        return gl_err!(
          GlError::InvalidValue,
          "{}: range {}+{} exceeds buffer size {}",
          caller,
          offset,
          size,
          self.size()
        )
      }
    }

    if let Some(mapping) = self.mapping(MapSlot::User) {
      if !mapped_range || mapping.overlaps(offset, size) {
        return gl_err!(GlError::InvalidOperation, "{}: range is mapped", caller);
      }
    }

    Ok((offset, size))
  }
}

/// Vertex attribute pointing into a buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexAttrib {
  pub buffer: BufferId,
  pub size: u8,
  pub stride: usize,
  pub offset: usize,
}

/// Buffer binding points of a context.
#[derive(Debug)]
pub struct BufferBindings {
  array: BufferId,
  element_array: BufferId,
  copy_read: BufferId,
  copy_write: BufferId,
  attribs: Vec<VertexAttrib>,
}

impl BufferBindings {
  fn get(&self, target: BufferTarget) -> BufferId {
    match target {
      BufferTarget::Array => self.array,
      BufferTarget::ElementArray => self.element_array,
      BufferTarget::CopyRead => self.copy_read,
      BufferTarget::CopyWrite => self.copy_write,
    }
  }

  fn get_mut(&mut self, target: BufferTarget) -> &mut BufferId {
    match target {
      BufferTarget::Array => &mut self.array,
      BufferTarget::ElementArray => &mut self.element_array,
      BufferTarget::CopyRead => &mut self.copy_read,
      BufferTarget::CopyWrite => &mut self.copy_write,
    }
  }

  fn all_mut(&mut self) -> impl Iterator<Item = &mut BufferId> {
    [
      &mut self.array,
      &mut self.element_array,
      &mut self.copy_read,
      &mut self.copy_write,
    ]
    .into_iter()
    .chain(self.attribs.iter_mut().map(|attrib| &mut attrib.buffer))
  }

  pub fn attribs(&self) -> &[VertexAttrib] {
    &self.attribs
  }
}

/// Buffer objects shared by a group of contexts.
#[derive(Debug)]
pub struct BufferStore {
  objects: Arena<BufferObject>,
  // `None` marks a name that was generated but never bound
  names: NameTable<Option<BufferId>>,
  null: BufferId,
}

impl Default for BufferStore {
  fn default() -> Self {
    Self::new()
  }
}

impl BufferStore {
  pub fn new() -> Self {
    let mut objects = Arena::new();
    let null = objects.insert(BufferObject::new(0));

    BufferStore {
      objects,
      names: NameTable::new(),
      null,
    }
  }

  /// Create the binding points of a new context, all pointing at the null buffer.
  pub fn new_bindings(&mut self, vertex_attribs: usize) -> BufferBindings {
    let null = self.null;
    let bindings = BufferBindings {
      array: null,
      element_array: null,
      copy_read: null,
      copy_write: null,
      attribs: vec![
        VertexAttrib {
          buffer: null,
          size: 4,
          stride: 0,
          offset: 0,
        };
        vertex_attribs
      ],
    };

    for _ in 0..4 + vertex_attribs {
      self.objects.retain(null);
    }

    bindings
  }

  /// Drop every reference held by a context's binding points.
  pub fn release_bindings(&mut self, bindings: &mut BufferBindings) {
    let null = self.null;

    for binding in bindings.all_mut() {
      let old = std::mem::replace(binding, null);
      self.objects.release(old);
    }
  }

  /// Number of buffer objects with live storage.
  pub fn live_objects(&self) -> usize {
    self.objects.len() - 1
  }

  pub fn object(&self, id: BufferId) -> Option<&BufferObject> {
    self.objects.get(id)
  }

  /// Object currently named `name`.
  pub fn lookup(&self, name: u32) -> Option<&BufferObject> {
    match self.names.lookup(name) {
      Some(Some(id)) => self.objects.get(*id),
      _ => None,
    }
  }

  fn reserve_names(&mut self, n: i32, caller: &str) -> GlResult<Vec<u32>> {
    if n < 0 {
      return gl_err!(GlError::InvalidValue, "{}: n < 0", caller);
    }

    if n == 0 {
      return Ok(Vec::new());
    }

    match self.names.find_free_key_block(n as u32) {
      Some(first) => Ok((first..first + n as u32).collect()),
      None => gl_err!(GlError::OutOfMemory, "{}: no free names", caller),
    }
  }

  /// Reserve `n` names; objects are only allocated when first bound.
  pub fn gen_buffers(&mut self, n: i32) -> GlResult<Vec<u32>> {
    let names = self.reserve_names(n, "gen_buffers")?;

    for &name in &names {
      self.names.insert(name, None);
    }

    Ok(names)
  }

  /// Reserve `n` names and allocate their objects right away.
  pub fn create_buffers(&mut self, n: i32) -> GlResult<Vec<u32>> {
    let names = self.reserve_names(n, "create_buffers")?;

    for &name in &names {
      let id = self.objects.insert(BufferObject::new(name));
      self.names.insert(name, Some(id));
    }

    Ok(names)
  }

  /// Whether `name` designates an allocated buffer object.
  pub fn is_buffer(&self, name: u32) -> bool {
    name != 0 && matches!(self.names.lookup(name), Some(Some(_)))
  }

  pub fn bind(&mut self, bindings: &mut BufferBindings, target: u32, name: u32) -> GlResult<()> {
    let target = parse_target(target, "bind_buffer")?;
    let current = bindings.get(target);

    if let Some(obj) = self.objects.get(current) {
      if obj.name == name && !obj.delete_pending {
        return Ok(());
      }
    }

    let new = if name == 0 {
      self.null
    } else {
      match self.names.lookup(name) {
        Some(Some(id)) => *id,

        _ => {
          let id = self.objects.insert(BufferObject::new(name));
          self.names.insert(name, Some(id));
          id
        }
      }
    };

    let slot = bindings.get_mut(target);
    let old = std::mem::replace(slot, new);
    self.objects.rebind(old, new);

    Ok(())
  }

  /// Name of the buffer bound to `target`; `0` when unbound.
  pub fn binding(&self, bindings: &BufferBindings, target: u32) -> GlResult<u32> {
    let target = parse_target(target, "get_buffer_binding")?;
    Ok(self.objects.get(bindings.get(target)).map_or(0, |obj| obj.name))
  }

  pub fn delete_buffers(&mut self, bindings: &mut BufferBindings, names: &[u32]) {
    let null = self.null;

    for &name in names {
      if name == 0 {
        continue;
      }

      let id = match self.names.lookup(name) {
        Some(Some(id)) => *id,

        Some(None) => {
          self.names.remove(name);
          continue;
        }

        None => continue,
      };

      if let Some(obj) = self.objects.get_mut(id) {
        obj.unmap_all();
        obj.delete_pending = true;
      }

      for binding in bindings.all_mut() {
        if *binding == id {
          *binding = null;
          self.objects.rebind(id, null);
        }
      }

      self.names.remove(name);

      if self.objects.release(id).is_some() {
        debug!("buffer {} freed", name);
      }
    }
  }

  // buffer bound to a target, which must not be the null buffer
  fn bound_mut(&mut self, bindings: &BufferBindings, target: u32, caller: &str) -> GlResult<&mut BufferObject> {
    let target = parse_target(target, caller)?;
    let id = bindings.get(target);

    if id == self.null {
      return gl_err!(GlError::InvalidOperation, "{}: no buffer bound", caller);
    }

    match self.objects.get_mut(id) {
      Some(obj) => Ok(obj),
      None => gl_err!(GlError::InvalidOperation, "{}: no buffer bound", caller),
    }
  }

  /// Allocate immutable storage.
  pub fn buffer_storage(
    &mut self,
    bindings: &BufferBindings,
    target: u32,
    size: isize,
    data: Option<&[u8]>,
    flags: u32,
  ) -> GlResult<()> {
    let obj = self.bound_mut(bindings, target, "buffer_storage")?;

    if size <= 0 {
      return gl_err!(GlError::InvalidValue, "buffer_storage: size <= 0");
    }

    let flags = match StorageFlags::from_bits(flags) {
      Some(flags) => flags,
      None => return gl_err!(GlError::InvalidValue, "buffer_storage: flags {:#x}", flags),
    };

    if obj.immutable {
      return gl_err!(GlError::InvalidOperation, "buffer_storage: immutable buffer");
    }

    if data.map_or(false, |data| data.len() < size as usize) {
      return gl_err!(GlError::InvalidValue, "buffer_storage: not enough data");
    }

    obj.unmap_all();
    obj.reallocate(size as usize, data)?;
    obj.immutable = true;
    obj.storage_flags = flags;

    Ok(())
  }

  /// (Re)specify mutable storage.
  pub fn buffer_data(
    &mut self,
    bindings: &BufferBindings,
    target: u32,
    size: isize,
    data: Option<&[u8]>,
    usage: u32,
  ) -> GlResult<()> {
    let obj = self.bound_mut(bindings, target, "buffer_data")?;

    if size < 0 {
      return gl_err!(GlError::InvalidValue, "buffer_data: size < 0");
    }

    let usage = match Usage::from_gl(usage) {
      Some(usage) => usage,
      None => return gl_err!(GlError::InvalidEnum, "buffer_data: usage {:#x}", usage),
    };

    if obj.immutable && !obj.storage_flags.contains(StorageFlags::DYNAMIC_STORAGE) {
      return gl_err!(GlError::InvalidOperation, "buffer_data: immutable without dynamic storage");
    }

    if data.map_or(false, |data| data.len() < size as usize) {
      return gl_err!(GlError::InvalidValue, "buffer_data: not enough data");
    }

    obj.unmap_all();
    obj.usage = usage;
    obj.reallocate(size as usize, data)
  }

  pub fn buffer_sub_data(&mut self, bindings: &BufferBindings, target: u32, offset: isize, data: &[u8]) -> GlResult<()> {
    let obj = self.bound_mut(bindings, target, "buffer_sub_data")?;
    let (offset, size) = obj.check_range(offset, data.len() as isize, true, "buffer_sub_data")?;

    if obj.immutable && !obj.storage_flags.contains(StorageFlags::DYNAMIC_STORAGE) {
      return gl_err!(GlError::InvalidOperation, "buffer_sub_data: immutable without dynamic storage");
    }

    if size > 0 {
      obj.data[offset..offset + size].copy_from_slice(data);
    }

    Ok(())
  }

  pub fn get_buffer_sub_data(
    &mut self,
    bindings: &BufferBindings,
    target: u32,
    offset: isize,
    out: &mut [u8],
  ) -> GlResult<()> {
    let obj = self.bound_mut(bindings, target, "get_buffer_sub_data")?;
    let (offset, size) = obj.check_range(offset, out.len() as isize, false, "get_buffer_sub_data")?;

    out.copy_from_slice(&obj.data[offset..offset + size]);
    Ok(())
  }

  /// Fill a range with a repeated element of the given internal format; zeroes without `data`.
  pub fn clear_buffer_sub_data(
    &mut self,
    bindings: &BufferBindings,
    target: u32,
    internal_format: u32,
    offset: isize,
    size: isize,
    data: Option<&[u8]>,
  ) -> GlResult<()> {
    let obj = self.bound_mut(bindings, target, "clear_buffer_sub_data")?;

    let element_size = match internal_format {
      GL_R8 => 1,
      GL_RG8 => 2,
      GL_RGBA8 | GL_R32F => 4,
      GL_RG32F => 8,
      GL_RGBA32F => 16,
      _ => {
        return gl_err!(
          GlError::InvalidEnum,
          "clear_buffer_sub_data: internal format {:#x}",
          internal_format
        )
      }
    };

    let (offset, size) = obj.check_range(offset, size, true, "clear_buffer_sub_data")?;

    if offset % element_size != 0 || size % element_size != 0 {
      return gl_err!(GlError::InvalidValue, "clear_buffer_sub_data: unaligned range");
    }

    if data.map_or(false, |data| data.len() != element_size) {
      return gl_err!(GlError::InvalidValue, "clear_buffer_sub_data: element size mismatch");
    }

    let zero = [0; 16];
    let element = data.unwrap_or(&zero[..element_size]);

    for chunk in obj.data[offset..offset + size].chunks_exact_mut(element_size) {
      chunk.copy_from_slice(element);
    }

    Ok(())
  }

  pub fn map_buffer_range(
    &mut self,
    bindings: &BufferBindings,
    target: u32,
    offset: isize,
    length: isize,
    access: u32,
    slot: MapSlot,
  ) -> GlResult<Mapping> {
    let obj = self.bound_mut(bindings, target, "map_buffer_range")?;

    if offset < 0 || length < 0 {
      return gl_err!(GlError::InvalidValue, "map_buffer_range: negative offset or length");
    }

    if length == 0 {
      return gl_err!(GlError::InvalidOperation, "map_buffer_range: length = 0");
    }

    let access = match MapAccess::from_bits(access) {
      Some(access) => access,
      None => return gl_err!(GlError::InvalidValue, "map_buffer_range: access {:#x}", access),
    };

    if !access.intersects(MapAccess::READ | MapAccess::WRITE) {
      return gl_err!(GlError::InvalidOperation, "map_buffer_range: neither read nor write");
    }

    if access.contains(MapAccess::READ)
      && access.intersects(MapAccess::INVALIDATE_RANGE | MapAccess::INVALIDATE_BUFFER | MapAccess::UNSYNCHRONIZED)
    {
      return gl_err!(GlError::InvalidOperation, "map_buffer_range: read with invalidate/unsynchronized");
    }

    if access.contains(MapAccess::FLUSH_EXPLICIT) && !access.contains(MapAccess::WRITE) {
      return gl_err!(GlError::InvalidOperation, "map_buffer_range: flush explicit without write");
    }

    if (access.contains(MapAccess::READ) && !obj.storage_flags.contains(StorageFlags::MAP_READ))
      || (access.contains(MapAccess::WRITE) && !obj.storage_flags.contains(StorageFlags::MAP_WRITE))
    {
      return gl_err!(GlError::InvalidOperation, "map_buffer_range: access not allowed by storage flags");
    }

    let (offset, length) = (offset as usize, length as usize);

    if offset.checked_add(length).map_or(true, |end| end > obj.size()) {
      return gl_err!(GlError::InvalidValue, "map_buffer_range: range exceeds buffer size");
    }

    if obj.is_mapped(slot) {
      return gl_err!(GlError::InvalidOperation, "map_buffer_range: already mapped");
    }

    let mapping = Mapping { offset, length, access };
    obj.mappings[slot.index()] = Some(mapping);
    Ok(mapping)
  }

  /// Map the whole buffer with a legacy access enum.
  pub fn map_buffer(&mut self, bindings: &BufferBindings, target: u32, access: u32) -> GlResult<Mapping> {
    let access = match access {
      GL_READ_ONLY => MapAccess::READ,
      GL_WRITE_ONLY => MapAccess::WRITE,
      GL_READ_WRITE => MapAccess::READ | MapAccess::WRITE,
      _ => return gl_err!(GlError::InvalidEnum, "map_buffer: access {:#x}", access),
    };

    let size = self.bound_mut(bindings, target, "map_buffer")?.size();
    self.map_buffer_range(bindings, target, 0, size as isize, access.bits(), MapSlot::User)
  }

  pub fn unmap_buffer(&mut self, bindings: &BufferBindings, target: u32, slot: MapSlot) -> GlResult<()> {
    let obj = self.bound_mut(bindings, target, "unmap_buffer")?;

    if obj.mappings[slot.index()].take().is_none() {
      return gl_err!(GlError::InvalidOperation, "unmap_buffer: not mapped");
    }

    Ok(())
  }

  pub fn flush_mapped_buffer_range(
    &mut self,
    bindings: &BufferBindings,
    target: u32,
    offset: isize,
    length: isize,
  ) -> GlResult<()> {
    let obj = self.bound_mut(bindings, target, "flush_mapped_buffer_range")?;

    if offset < 0 || length < 0 {
      return gl_err!(GlError::InvalidValue, "flush_mapped_buffer_range: negative offset or length");
    }

    let mapping = match obj.mapping(MapSlot::User) {
      Some(mapping) => *mapping,
      None => return gl_err!(GlError::InvalidOperation, "flush_mapped_buffer_range: not mapped"),
    };

    if !mapping.access.contains(MapAccess::FLUSH_EXPLICIT) {
      return gl_err!(GlError::InvalidOperation, "flush_mapped_buffer_range: not mapped for explicit flush");
    }

    if (offset as usize).checked_add(length as usize).map_or(true, |end| end > mapping.length) {
      return gl_err!(GlError::InvalidValue, "flush_mapped_buffer_range: range exceeds mapping");
    }

    // storage is host memory; writes are visible as soon as they are made
    Ok(())
  }

  /// Read the user-mapped range of the buffer bound to `target`.
  pub fn read_mapped<R>(&mut self, bindings: &BufferBindings, target: u32, f: impl FnOnce(&[u8]) -> R) -> GlResult<R> {
    let obj = self.bound_mut(bindings, target, "read_mapped")?;

    match obj.mapping(MapSlot::User).copied() {
      Some(m) if m.access.contains(MapAccess::READ) => {
        let (offset, length) = (m.offset, m.length);
        Ok(f(&obj.data[offset..offset + length]))
      }

      _ => gl_err!(GlError::InvalidOperation, "read_mapped: not mapped for reading"),
    }
  }

  /// Write through the user-mapped range of the buffer bound to `target`.
  pub fn write_mapped<R>(
    &mut self,
    bindings: &BufferBindings,
    target: u32,
    f: impl FnOnce(&mut [u8]) -> R,
  ) -> GlResult<R> {
    let obj = self.bound_mut(bindings, target, "write_mapped")?;

    match obj.mapping(MapSlot::User).copied() {
      Some(m) if m.access.contains(MapAccess::WRITE) => {
        let (offset, length) = (m.offset, m.length);
        Ok(f(&mut obj.data[offset..offset + length]))
      }

      _ => gl_err!(GlError::InvalidOperation, "write_mapped: not mapped for writing"),
    }
  }

  pub fn copy_buffer_sub_data(
    &mut self,
    bindings: &BufferBindings,
    read_target: u32,
    write_target: u32,
    read_offset: isize,
    write_offset: isize,
    size: isize,
  ) -> GlResult<()> {
    let src = bindings.get(parse_target(read_target, "copy_buffer_sub_data")?);
    let dst = bindings.get(parse_target(write_target, "copy_buffer_sub_data")?);

    if src == self.null || dst == self.null {
      return gl_err!(GlError::InvalidOperation, "copy_buffer_sub_data: no buffer bound");
    }

    let (src_size, src_mapped) = self.objects.get(src).map_or((0, false), |o| (o.size(), o.is_mapped(MapSlot::User)));
    let (dst_size, dst_mapped) = self.objects.get(dst).map_or((0, false), |o| (o.size(), o.is_mapped(MapSlot::User)));

    if src_mapped || dst_mapped {
      return gl_err!(GlError::InvalidOperation, "copy_buffer_sub_data: buffer mapped");
    }

    if read_offset < 0 || write_offset < 0 || size < 0 {
      return gl_err!(GlError::InvalidValue, "copy_buffer_sub_data: negative offset or size");
    }

    let (r, w, size) = (read_offset as usize, write_offset as usize, size as usize);

    if r + size > src_size || w + size > dst_size {
      return gl_err!(GlError::InvalidValue, "copy_buffer_sub_data: range exceeds buffer size");
    }

    if src == dst && r < w + size && w < r + size {
      return gl_err!(GlError::InvalidValue, "copy_buffer_sub_data: overlapping ranges");
    }

    if src == dst {
      if let Some(obj) = self.objects.get_mut(src) {
        obj.data.copy_within(r..r + size, w);
      }

      return Ok(());
    }

    // both objects are mapped internally for the duration of the copy
    let src_data = match self.objects.get_mut(src) {
      Some(obj) => {
        obj.mappings[MapSlot::Internal.index()] = Some(Mapping {
          offset: r,
          length: size,
          access: MapAccess::READ,
        });
        std::mem::take(&mut obj.data)
      }

      None => Vec::new(),
    };

    if let Some(obj) = self.objects.get_mut(dst) {
      obj.data[w..w + size].copy_from_slice(&src_data[r..r + size]);
    }

    if let Some(obj) = self.objects.get_mut(src) {
      obj.data = src_data;
      obj.mappings[MapSlot::Internal.index()] = None;
    }

    Ok(())
  }

  pub fn get_buffer_parameter(&mut self, bindings: &BufferBindings, target: u32, pname: u32) -> GlResult<i64> {
    let obj = self.bound_mut(bindings, target, "get_buffer_parameter")?;
    let mapping = obj.mapping(MapSlot::User).copied();

    let value = match pname {
      GL_BUFFER_SIZE => obj.size() as i64,
      GL_BUFFER_USAGE => obj.usage.to_gl() as i64,
      GL_BUFFER_ACCESS => {
        let access = mapping.map_or(MapAccess::READ | MapAccess::WRITE, |m| m.access);

        match (access.contains(MapAccess::READ), access.contains(MapAccess::WRITE)) {
          (true, false) => GL_READ_ONLY as i64,
          (false, true) => GL_WRITE_ONLY as i64,
          _ => GL_READ_WRITE as i64,
        }
      }
      GL_BUFFER_MAPPED => mapping.is_some() as i64,
      GL_BUFFER_ACCESS_FLAGS => mapping.map_or(0, |m| m.access.bits() as i64),
      GL_BUFFER_MAP_OFFSET => mapping.map_or(0, |m| m.offset as i64),
      GL_BUFFER_MAP_LENGTH => mapping.map_or(0, |m| m.length as i64),
      GL_BUFFER_IMMUTABLE_STORAGE => obj.immutable as i64,
      GL_BUFFER_STORAGE_FLAGS => obj.storage_flags.bits() as i64,
      _ => return gl_err!(GlError::InvalidEnum, "get_buffer_parameter: pname {:#x}", pname),
    };

    Ok(value)
  }

  /// Point vertex attribute `index` at the buffer bound to the array target.
  pub fn vertex_attrib_pointer(
    &mut self,
    bindings: &mut BufferBindings,
    index: u32,
    size: i32,
    stride: i32,
    offset: usize,
  ) -> GlResult<()> {
    if index as usize >= bindings.attribs.len() {
      return gl_err!(GlError::InvalidValue, "vertex_attrib_pointer: index {}", index);
    }

    if !(1..=4).contains(&size) || stride < 0 {
      return gl_err!(GlError::InvalidValue, "vertex_attrib_pointer: size {} stride {}", size, stride);
    }

    let array = bindings.array;
    let attrib = &mut bindings.attribs[index as usize];
    let old = std::mem::replace(&mut attrib.buffer, array);
    attrib.size = size as u8;
    attrib.stride = stride as usize;
    attrib.offset = offset;
    self.objects.rebind(old, array);

    Ok(())
  }
}

fn parse_target(target: u32, caller: &str) -> GlResult<BufferTarget> {
  match BufferTarget::from_gl(target) {
    Some(target) => Ok(target),
    None => gl_err!(GlError::InvalidEnum, "{}: target {:#x}", caller, target),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn store() -> (BufferStore, BufferBindings) {
    let mut store = BufferStore::new();
    let bindings = store.new_bindings(4);
    (store, bindings)
  }

  fn bound(store: &mut BufferStore, bindings: &mut BufferBindings) -> u32 {
    let name = store.gen_buffers(1).unwrap()[0];
    store.bind(bindings, GL_ARRAY_BUFFER, name).unwrap();
    name
  }

  #[test]
  fn gen_defers_allocation_until_bind() {
    let (mut store, mut bindings) = store();
    let names = store.gen_buffers(2).unwrap();

    assert_eq!(names, vec![1, 2]);
    assert!(!store.is_buffer(1));
    assert_eq!(store.live_objects(), 0);

    store.bind(&mut bindings, GL_ARRAY_BUFFER, 1).unwrap();
    assert!(store.is_buffer(1));
    assert_eq!(store.live_objects(), 1);
  }

  #[test]
  fn create_allocates_immediately() {
    let (mut store, _) = store();
    let names = store.create_buffers(3).unwrap();

    assert!(names.iter().all(|&name| store.is_buffer(name)));
    assert_eq!(store.create_buffers(-1), Err(GlError::InvalidValue));
    assert!(!store.is_buffer(0));
  }

  #[test]
  fn bind_rejects_unknown_targets() {
    let (mut store, mut bindings) = store();
    assert_eq!(store.bind(&mut bindings, 0x1234, 1), Err(GlError::InvalidEnum));
    assert_eq!(store.live_objects(), 0);
  }

  #[test]
  fn delete_unbinds_and_frees_name() {
    let (mut store, mut bindings) = store();
    let name = bound(&mut store, &mut bindings);

    store.delete_buffers(&mut bindings, &[name]);

    assert_eq!(store.binding(&bindings, GL_ARRAY_BUFFER), Ok(0));
    assert!(!store.is_buffer(name));
    assert_eq!(store.live_objects(), 0);
  }

  #[test]
  fn storage_outlives_name_while_referenced() {
    let mut store = BufferStore::new();
    let mut ctx_a = store.new_bindings(4);
    let mut ctx_b = store.new_bindings(4);
    let name = bound(&mut store, &mut ctx_a);
    store.bind(&mut ctx_b, GL_ARRAY_BUFFER, name).unwrap();
    store.vertex_attrib_pointer(&mut ctx_b, 0, 3, 12, 0).unwrap();

    store.delete_buffers(&mut ctx_a, &[name]);
    assert!(!store.is_buffer(name));
    assert_eq!(store.live_objects(), 1);

    // binding the name again creates a new object rather than resurrecting the old one
    store.bind(&mut ctx_b, GL_ARRAY_BUFFER, name).unwrap();
    assert_eq!(store.live_objects(), 2);

    store.bind(&mut ctx_b, GL_ARRAY_BUFFER, 0).unwrap();
    store.release_bindings(&mut ctx_b);
    assert_eq!(store.live_objects(), 1);
  }

  #[test]
  fn immutable_storage() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);

    store
      .buffer_storage(&bindings, GL_ARRAY_BUFFER, 64, Some(&[7; 64]), StorageFlags::DYNAMIC_STORAGE.bits())
      .unwrap();
    assert_eq!(store.buffer_sub_data(&bindings, GL_ARRAY_BUFFER, 0, &[1; 32]), Ok(()));
    assert_eq!(
      store.buffer_storage(&bindings, GL_ARRAY_BUFFER, 128, None, 0),
      Err(GlError::InvalidOperation)
    );

    let mut out = [0; 64];
    store.get_buffer_sub_data(&bindings, GL_ARRAY_BUFFER, 0, &mut out).unwrap();
    assert_eq!(&out[..32], &[1; 32][..]);
    assert_eq!(&out[32..], &[7; 32][..]);
  }

  #[test]
  fn failed_storage_allocation_keeps_buffer_mutable() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);

    assert_eq!(
      store.buffer_storage(&bindings, GL_ARRAY_BUFFER, isize::MAX, None, 0),
      Err(GlError::OutOfMemory)
    );

    store.buffer_data(&bindings, GL_ARRAY_BUFFER, 8, Some(&[3; 8]), GL_STATIC_DRAW).unwrap();
    store
      .buffer_storage(&bindings, GL_ARRAY_BUFFER, 16, Some(&[5; 16]), StorageFlags::DYNAMIC_STORAGE.bits())
      .unwrap();

    let mut out = [0; 16];
    store.get_buffer_sub_data(&bindings, GL_ARRAY_BUFFER, 0, &mut out).unwrap();
    assert_eq!(out, [5; 16]);
  }

  #[test]
  fn immutable_without_dynamic_storage_rejects_sub_data() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);

    store
      .buffer_storage(&bindings, GL_ARRAY_BUFFER, 16, None, StorageFlags::MAP_READ.bits())
      .unwrap();
    assert_eq!(
      store.buffer_sub_data(&bindings, GL_ARRAY_BUFFER, 0, &[1; 4]),
      Err(GlError::InvalidOperation)
    );
    assert_eq!(
      store.buffer_data(&bindings, GL_ARRAY_BUFFER, 16, None, GL_STATIC_DRAW),
      Err(GlError::InvalidOperation)
    );
  }

  #[test]
  fn dynamic_immutable_data_keeps_storage_flags() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);
    store
      .buffer_storage(&bindings, GL_ARRAY_BUFFER, 16, None, StorageFlags::DYNAMIC_STORAGE.bits())
      .unwrap();

    store.buffer_data(&bindings, GL_ARRAY_BUFFER, 8, None, GL_DYNAMIC_DRAW).unwrap();
    let obj = store.lookup(1).unwrap();
    assert_eq!(obj.size(), 8);
    assert!(obj.is_immutable());
    assert_eq!(obj.storage_flags(), StorageFlags::DYNAMIC_STORAGE);
  }

  #[test]
  fn storage_argument_checks() {
    let (mut store, mut bindings) = store();
    assert_eq!(
      store.buffer_storage(&bindings, GL_ARRAY_BUFFER, 16, None, 0),
      Err(GlError::InvalidOperation)
    );

    bound(&mut store, &mut bindings);
    assert_eq!(store.buffer_storage(&bindings, GL_ARRAY_BUFFER, 0, None, 0), Err(GlError::InvalidValue));
    assert_eq!(
      store.buffer_storage(&bindings, GL_ARRAY_BUFFER, 16, None, 0x40),
      Err(GlError::InvalidValue)
    );
    assert_eq!(
      store.buffer_data(&bindings, GL_ARRAY_BUFFER, 16, None, 0x88E0),
      Err(GlError::InvalidEnum)
    );
    assert_eq!(store.buffer_data(&bindings, GL_ARRAY_BUFFER, -1, None, GL_STATIC_DRAW), Err(GlError::InvalidValue));
  }

  #[test]
  fn sub_data_range_checks() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);
    store.buffer_data(&bindings, GL_ARRAY_BUFFER, 8, None, GL_DYNAMIC_DRAW).unwrap();

    assert_eq!(store.buffer_sub_data(&bindings, GL_ARRAY_BUFFER, -1, &[0]), Err(GlError::InvalidValue));
    assert_eq!(store.buffer_sub_data(&bindings, GL_ARRAY_BUFFER, 6, &[0; 4]), Err(GlError::InvalidValue));
    assert_eq!(store.buffer_sub_data(&bindings, GL_ARRAY_BUFFER, 8, &[]), Ok(()));

    store
      .map_buffer_range(&bindings, GL_ARRAY_BUFFER, 0, 4, MapAccess::WRITE.bits(), MapSlot::User)
      .unwrap();
    assert_eq!(store.buffer_sub_data(&bindings, GL_ARRAY_BUFFER, 2, &[1; 2]), Err(GlError::InvalidOperation));
    assert_eq!(store.buffer_sub_data(&bindings, GL_ARRAY_BUFFER, 4, &[1; 2]), Ok(()));

    let mut out = [0; 2];
    assert_eq!(
      store.get_buffer_sub_data(&bindings, GL_ARRAY_BUFFER, 4, &mut out),
      Err(GlError::InvalidOperation)
    );
  }

  #[test]
  fn map_access_rules() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);
    store.buffer_data(&bindings, GL_ARRAY_BUFFER, 16, None, GL_STATIC_DRAW).unwrap();

    let map = |store: &mut BufferStore, offset, length, access: MapAccess| {
      store.map_buffer_range(&bindings, GL_ARRAY_BUFFER, offset, length, access.bits(), MapSlot::User)
    };

    assert_eq!(
      map(&mut store, 0, 16, MapAccess::READ | MapAccess::WRITE | MapAccess::UNSYNCHRONIZED),
      Err(GlError::InvalidOperation)
    );
    assert!(!store.lookup(1).unwrap().is_mapped(MapSlot::User));

    assert_eq!(map(&mut store, -1, 4, MapAccess::READ), Err(GlError::InvalidValue));
    assert_eq!(map(&mut store, 0, 0, MapAccess::READ), Err(GlError::InvalidOperation));
    assert_eq!(map(&mut store, 0, 4, MapAccess::INVALIDATE_RANGE), Err(GlError::InvalidOperation));
    assert_eq!(
      map(&mut store, 0, 4, MapAccess::READ | MapAccess::FLUSH_EXPLICIT),
      Err(GlError::InvalidOperation)
    );
    assert_eq!(map(&mut store, 8, 9, MapAccess::READ), Err(GlError::InvalidValue));
    assert_eq!(
      store.map_buffer_range(&bindings, GL_ARRAY_BUFFER, 0, 4, 0x100, MapSlot::User),
      Err(GlError::InvalidValue)
    );

    let mapping = map(&mut store, 4, 8, MapAccess::WRITE | MapAccess::FLUSH_EXPLICIT).unwrap();
    assert_eq!(mapping.offset, 4);
    assert_eq!(map(&mut store, 0, 4, MapAccess::READ), Err(GlError::InvalidOperation));

    // the internal slot is independent
    assert!(store
      .map_buffer_range(&bindings, GL_ARRAY_BUFFER, 0, 4, MapAccess::READ.bits(), MapSlot::Internal)
      .is_ok());
  }

  #[test]
  fn storage_flags_restrict_mapping() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);
    store
      .buffer_storage(&bindings, GL_ARRAY_BUFFER, 16, None, StorageFlags::MAP_READ.bits())
      .unwrap();

    assert_eq!(
      store.map_buffer_range(&bindings, GL_ARRAY_BUFFER, 0, 4, MapAccess::WRITE.bits(), MapSlot::User),
      Err(GlError::InvalidOperation)
    );
    assert!(store.map_buffer(&bindings, GL_ARRAY_BUFFER, GL_READ_ONLY).is_ok());
  }

  #[test]
  fn mapped_access_and_unmap() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);
    store.buffer_data(&bindings, GL_ARRAY_BUFFER, 8, None, GL_DYNAMIC_DRAW).unwrap();

    assert_eq!(store.unmap_buffer(&bindings, GL_ARRAY_BUFFER, MapSlot::User), Err(GlError::InvalidOperation));

    store.map_buffer(&bindings, GL_ARRAY_BUFFER, GL_WRITE_ONLY).unwrap();
    store
      .write_mapped(&bindings, GL_ARRAY_BUFFER, |bytes| bytes.copy_from_slice(&[9; 8]))
      .unwrap();
    assert_eq!(store.read_mapped(&bindings, GL_ARRAY_BUFFER, |_| ()), Err(GlError::InvalidOperation));
    assert_eq!(store.get_buffer_parameter(&bindings, GL_ARRAY_BUFFER, GL_BUFFER_MAPPED), Ok(1));
    assert_eq!(
      store.get_buffer_parameter(&bindings, GL_ARRAY_BUFFER, GL_BUFFER_ACCESS),
      Ok(GL_WRITE_ONLY as i64)
    );

    store.unmap_buffer(&bindings, GL_ARRAY_BUFFER, MapSlot::User).unwrap();
    assert_eq!(store.lookup(1).unwrap().data(), &[9; 8]);
  }

  #[test]
  fn explicit_flush_rules() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);
    store.buffer_data(&bindings, GL_ARRAY_BUFFER, 16, None, GL_DYNAMIC_DRAW).unwrap();

    assert_eq!(
      store.flush_mapped_buffer_range(&bindings, GL_ARRAY_BUFFER, 0, 4),
      Err(GlError::InvalidOperation)
    );

    store
      .map_buffer_range(&bindings, GL_ARRAY_BUFFER, 0, 8, MapAccess::WRITE.bits(), MapSlot::User)
      .unwrap();
    assert_eq!(
      store.flush_mapped_buffer_range(&bindings, GL_ARRAY_BUFFER, 0, 4),
      Err(GlError::InvalidOperation)
    );
    store.unmap_buffer(&bindings, GL_ARRAY_BUFFER, MapSlot::User).unwrap();

    let access = MapAccess::WRITE | MapAccess::FLUSH_EXPLICIT;
    store
      .map_buffer_range(&bindings, GL_ARRAY_BUFFER, 0, 8, access.bits(), MapSlot::User)
      .unwrap();
    assert_eq!(store.flush_mapped_buffer_range(&bindings, GL_ARRAY_BUFFER, 4, 4), Ok(()));
    assert_eq!(
      store.flush_mapped_buffer_range(&bindings, GL_ARRAY_BUFFER, 4, 8),
      Err(GlError::InvalidValue)
    );
  }

  #[test]
  fn respecifying_storage_unmaps() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);
    store.buffer_data(&bindings, GL_ARRAY_BUFFER, 8, None, GL_DYNAMIC_DRAW).unwrap();
    store.map_buffer(&bindings, GL_ARRAY_BUFFER, GL_READ_WRITE).unwrap();

    store.buffer_data(&bindings, GL_ARRAY_BUFFER, 4, Some(&[1, 2, 3, 4]), GL_STATIC_DRAW).unwrap();
    assert!(!store.lookup(1).unwrap().is_mapped(MapSlot::User));
    assert_eq!(store.lookup(1).unwrap().data(), &[1, 2, 3, 4]);
  }

  #[test]
  fn copy_between_and_within_buffers() {
    let (mut store, mut bindings) = store();
    let names = store.create_buffers(2).unwrap();
    store.bind(&mut bindings, GL_COPY_READ_BUFFER, names[0]).unwrap();
    store.bind(&mut bindings, GL_COPY_WRITE_BUFFER, names[1]).unwrap();
    store
      .buffer_data(&bindings, GL_COPY_READ_BUFFER, 8, Some(&[1, 2, 3, 4, 5, 6, 7, 8]), GL_STATIC_DRAW)
      .unwrap();
    store.buffer_data(&bindings, GL_COPY_WRITE_BUFFER, 4, None, GL_STATIC_DRAW).unwrap();

    store
      .copy_buffer_sub_data(&bindings, GL_COPY_READ_BUFFER, GL_COPY_WRITE_BUFFER, 2, 0, 4)
      .unwrap();
    assert_eq!(store.lookup(names[1]).unwrap().data(), &[3, 4, 5, 6]);
    assert!(!store.lookup(names[0]).unwrap().is_mapped(MapSlot::Internal));

    assert_eq!(
      store.copy_buffer_sub_data(&bindings, GL_COPY_READ_BUFFER, GL_COPY_READ_BUFFER, 0, 2, 4),
      Err(GlError::InvalidValue)
    );
    assert_eq!(
      store.copy_buffer_sub_data(&bindings, GL_COPY_READ_BUFFER, GL_COPY_READ_BUFFER, 0, 4, 4),
      Ok(())
    );
    assert_eq!(store.lookup(names[0]).unwrap().data(), &[1, 2, 3, 4, 1, 2, 3, 4]);

    assert_eq!(
      store.copy_buffer_sub_data(&bindings, GL_COPY_READ_BUFFER, GL_COPY_WRITE_BUFFER, 6, 0, 4),
      Err(GlError::InvalidValue)
    );

    store.map_buffer(&bindings, GL_COPY_WRITE_BUFFER, GL_READ_ONLY).unwrap();
    assert_eq!(
      store.copy_buffer_sub_data(&bindings, GL_COPY_READ_BUFFER, GL_COPY_WRITE_BUFFER, 0, 0, 4),
      Err(GlError::InvalidOperation)
    );
  }

  #[test]
  fn clear_sub_data() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);
    store.buffer_data(&bindings, GL_ARRAY_BUFFER, 8, Some(&[0xFF; 8]), GL_STATIC_DRAW).unwrap();

    assert_eq!(
      store.clear_buffer_sub_data(&bindings, GL_ARRAY_BUFFER, GL_RGBA8, 2, 4, None),
      Err(GlError::InvalidValue)
    );
    assert_eq!(
      store.clear_buffer_sub_data(&bindings, GL_ARRAY_BUFFER, 0x1234, 0, 4, None),
      Err(GlError::InvalidEnum)
    );

    store
      .clear_buffer_sub_data(&bindings, GL_ARRAY_BUFFER, GL_RG8, 2, 4, Some(&[1, 2]))
      .unwrap();
    assert_eq!(store.lookup(1).unwrap().data(), &[0xFF, 0xFF, 1, 2, 1, 2, 0xFF, 0xFF]);
  }

  #[test]
  fn parameters() {
    let (mut store, mut bindings) = store();
    bound(&mut store, &mut bindings);
    store
      .buffer_storage(&bindings, GL_ARRAY_BUFFER, 32, None, (StorageFlags::MAP_READ | StorageFlags::MAP_WRITE).bits())
      .unwrap();

    let param = |store: &mut BufferStore, pname| store.get_buffer_parameter(&bindings, GL_ARRAY_BUFFER, pname);
    assert_eq!(param(&mut store, GL_BUFFER_SIZE), Ok(32));
    assert_eq!(param(&mut store, GL_BUFFER_IMMUTABLE_STORAGE), Ok(1));
    assert_eq!(param(&mut store, GL_BUFFER_STORAGE_FLAGS), Ok(3));
    assert_eq!(param(&mut store, GL_BUFFER_MAPPED), Ok(0));
    assert_eq!(param(&mut store, 0xFFFF), Err(GlError::InvalidEnum));

    store
      .map_buffer_range(&bindings, GL_ARRAY_BUFFER, 8, 16, MapAccess::READ.bits(), MapSlot::User)
      .unwrap();
    assert_eq!(param(&mut store, GL_BUFFER_MAP_OFFSET), Ok(8));
    assert_eq!(param(&mut store, GL_BUFFER_MAP_LENGTH), Ok(16));
    assert_eq!(param(&mut store, GL_BUFFER_ACCESS_FLAGS), Ok(1));
  }

  #[test]
  fn vertex_attribs_hold_references() {
    let (mut store, mut bindings) = store();
    let name = bound(&mut store, &mut bindings);

    assert_eq!(store.vertex_attrib_pointer(&mut bindings, 4, 3, 0, 0), Err(GlError::InvalidValue));
    assert_eq!(store.vertex_attrib_pointer(&mut bindings, 0, 5, 0, 0), Err(GlError::InvalidValue));

    store.vertex_attrib_pointer(&mut bindings, 1, 2, 8, 4).unwrap();
    let id = bindings.attribs()[1].buffer;
    assert_eq!(store.object(id).map(BufferObject::name), Some(name));

    store.bind(&mut bindings, GL_ARRAY_BUFFER, 0).unwrap();
    assert_eq!(store.live_objects(), 1);

    store.delete_buffers(&mut bindings, &[name]);
    assert_eq!(store.live_objects(), 0);
  }

  proptest! {
    #[test]
    fn data_round_trip(data in proptest::collection::vec(any::<u8>(), 1..512)) {
      let (mut store, mut bindings) = store();
      bound(&mut store, &mut bindings);
      store
        .buffer_data(&bindings, GL_ARRAY_BUFFER, data.len() as isize, Some(&data), GL_STATIC_DRAW)
        .unwrap();

      let mut out = vec![0; data.len()];
      store.get_buffer_sub_data(&bindings, GL_ARRAY_BUFFER, 0, &mut out).unwrap();
      prop_assert_eq!(out, data);
    }
  }
}
