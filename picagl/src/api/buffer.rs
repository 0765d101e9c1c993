use crate::backend::Backend;
use crate::buffer::{BufferBindings, BufferStore, MapSlot, Mapping};
use crate::context::Gl;
use crate::error::GlResult;
use crate::state::NewState;

impl<'a, B> Gl<'a, B>
where
  B: ?Sized + Backend,
{
  fn with_buffers<T, F>(&mut self, f: F) -> GlResult<T>
  where
    F: FnOnce(&mut BufferStore, &mut BufferBindings) -> GlResult<T>,
  {
    let r = {
      let mut shared = self.ctx.shared.borrow_mut();
      f(&mut shared.buffers, &mut self.ctx.buffers)
    };

    self.latch(r)
  }

  /// Reserve `n` buffer names; objects are only created when first bound.
  pub fn gen_buffers(&mut self, n: i32) -> GlResult<Vec<u32>> {
    self.with_buffers(|store, _| store.gen_buffers(n))
  }

  /// Reserve `n` buffer names and create their objects right away.
  pub fn create_buffers(&mut self, n: i32) -> GlResult<Vec<u32>> {
    self.with_buffers(|store, _| store.create_buffers(n))
  }

  pub fn is_buffer(&self, name: u32) -> bool {
    self.ctx.shared.borrow().buffers.is_buffer(name)
  }

  pub fn bind_buffer(&mut self, target: u32, name: u32) -> GlResult<()> {
    self.with_buffers(|store, bindings| store.bind(bindings, target, name))?;
    self.touch(NewState::BUFFER_OBJECT);
    Ok(())
  }

  /// Name bound to `target`, `0` for none.
  pub fn get_buffer_binding(&mut self, target: u32) -> GlResult<u32> {
    self.with_buffers(|store, bindings| store.binding(bindings, target))
  }

  pub fn delete_buffers(&mut self, names: &[u32]) {
    self.flush_vertices(NewState::BUFFER_OBJECT);
    let _ = self.with_buffers(|store, bindings| {
      store.delete_buffers(bindings, names);
      Ok(())
    });
  }

  pub fn buffer_storage(&mut self, target: u32, size: isize, data: Option<&[u8]>, flags: u32) -> GlResult<()> {
    self.with_buffers(|store, bindings| store.buffer_storage(bindings, target, size, data, flags))
  }

  pub fn buffer_data(&mut self, target: u32, size: isize, data: Option<&[u8]>, usage: u32) -> GlResult<()> {
    self.with_buffers(|store, bindings| store.buffer_data(bindings, target, size, data, usage))
  }

  pub fn buffer_sub_data(&mut self, target: u32, offset: isize, data: &[u8]) -> GlResult<()> {
    self.with_buffers(|store, bindings| store.buffer_sub_data(bindings, target, offset, data))
  }

  /// Read `out.len()` bytes starting at `offset`.
  pub fn get_buffer_sub_data(&mut self, target: u32, offset: isize, out: &mut [u8]) -> GlResult<()> {
    self.with_buffers(|store, bindings| store.get_buffer_sub_data(bindings, target, offset, out))
  }

  pub fn clear_buffer_sub_data(
    &mut self,
    target: u32,
    internal_format: u32,
    offset: isize,
    size: isize,
    data: Option<&[u8]>,
  ) -> GlResult<()> {
    self.with_buffers(|store, bindings| {
      store.clear_buffer_sub_data(bindings, target, internal_format, offset, size, data)
    })
  }

  /// Map a range of the buffer bound to `target`.
  ///
  /// The mapped bytes are reached with [`Gl::read_mapped`] and [`Gl::write_mapped`] until
  /// [`Gl::unmap_buffer`].
  pub fn map_buffer_range(&mut self, target: u32, offset: isize, length: isize, access: u32) -> GlResult<Mapping> {
    self.with_buffers(|store, bindings| {
      store.map_buffer_range(bindings, target, offset, length, access, MapSlot::User)
    })
  }

  /// Map the whole buffer with a `GL_READ_ONLY`, `GL_WRITE_ONLY` or `GL_READ_WRITE` access.
  pub fn map_buffer(&mut self, target: u32, access: u32) -> GlResult<Mapping> {
    self.with_buffers(|store, bindings| store.map_buffer(bindings, target, access))
  }

  pub fn unmap_buffer(&mut self, target: u32) -> GlResult<()> {
    self.with_buffers(|store, bindings| store.unmap_buffer(bindings, target, MapSlot::User))
  }

  pub fn flush_mapped_buffer_range(&mut self, target: u32, offset: isize, length: isize) -> GlResult<()> {
    self.with_buffers(|store, bindings| store.flush_mapped_buffer_range(bindings, target, offset, length))
  }

  pub fn read_mapped<R>(&mut self, target: u32, f: impl FnOnce(&[u8]) -> R) -> GlResult<R> {
    self.with_buffers(|store, bindings| store.read_mapped(bindings, target, f))
  }

  pub fn write_mapped<R>(&mut self, target: u32, f: impl FnOnce(&mut [u8]) -> R) -> GlResult<R> {
    self.with_buffers(|store, bindings| store.write_mapped(bindings, target, f))
  }

  pub fn copy_buffer_sub_data(
    &mut self,
    read_target: u32,
    write_target: u32,
    read_offset: isize,
    write_offset: isize,
    size: isize,
  ) -> GlResult<()> {
    self.with_buffers(|store, bindings| {
      store.copy_buffer_sub_data(bindings, read_target, write_target, read_offset, write_offset, size)
    })
  }

  pub fn get_buffer_parameter(&mut self, target: u32, pname: u32) -> GlResult<i64> {
    self.with_buffers(|store, bindings| store.get_buffer_parameter(bindings, target, pname))
  }

  /// Source attribute `index` from the buffer currently bound to `GL_ARRAY_BUFFER`.
  pub fn vertex_attrib_pointer(&mut self, index: u32, size: i32, stride: i32, offset: usize) -> GlResult<()> {
    self.with_buffers(|store, bindings| store.vertex_attrib_pointer(bindings, index, size, stride, offset))?;
    self.touch(NewState::ARRAY);
    Ok(())
  }
}
