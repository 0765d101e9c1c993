#![cfg(feature = "sim")]

mod common;

use common::*;
use picagl::config::{ContextConfig, Screen};
use picagl::GlError;
use pretty_assertions::assert_eq;

#[test]
fn immutable_storage_scenario() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();
  let buffers = gl.gen_buffers(1).unwrap();

  gl.bind_buffer(GL_ARRAY_BUFFER, buffers[0]).unwrap();
  gl.buffer_storage(
    GL_ARRAY_BUFFER,
    16,
    Some(&[1; 16][..]),
    GL_MAP_READ_BIT | GL_MAP_WRITE_BIT,
  )
  .unwrap();
  assert_eq!(gl.get_buffer_parameter(GL_ARRAY_BUFFER, GL_BUFFER_SIZE), Ok(16));

  // no dynamic storage: contents only change through mappings
  assert_eq!(
    gl.buffer_sub_data(GL_ARRAY_BUFFER, 0, &[2; 4]),
    Err(GlError::InvalidOperation)
  );
  assert_eq!(
    gl.buffer_storage(GL_ARRAY_BUFFER, 8, None, 0),
    Err(GlError::InvalidOperation)
  );

  gl.map_buffer_range(GL_ARRAY_BUFFER, 4, 8, GL_MAP_WRITE_BIT).unwrap();
  gl.write_mapped(GL_ARRAY_BUFFER, |bytes| bytes.copy_from_slice(&[9; 8]))
    .unwrap();
  gl.unmap_buffer(GL_ARRAY_BUFFER).unwrap();

  let mut out = [0; 16];
  gl.get_buffer_sub_data(GL_ARRAY_BUFFER, 0, &mut out).unwrap();
  assert_eq!(out, [1, 1, 1, 1, 9, 9, 9, 9, 9, 9, 9, 9, 1, 1, 1, 1]);
}

#[test]
fn unsynchronized_read_mapping_is_rejected() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();
  let buffers = gl.gen_buffers(1).unwrap();

  gl.bind_buffer(GL_ARRAY_BUFFER, buffers[0]).unwrap();
  gl.buffer_data(GL_ARRAY_BUFFER, 32, None, GL_STATIC_DRAW).unwrap();

  let access = GL_MAP_READ_BIT | GL_MAP_WRITE_BIT | GL_MAP_UNSYNCHRONIZED_BIT;
  assert_eq!(
    gl.map_buffer_range(GL_ARRAY_BUFFER, 0, 32, access),
    Err(GlError::InvalidOperation)
  );
  assert_eq!(gl.get_error(), Some(GlError::InvalidOperation));

  // the failed call left the buffer unmapped
  gl.map_buffer_range(GL_ARRAY_BUFFER, 0, 32, GL_MAP_READ_BIT).unwrap();
}

#[test]
fn data_round_trip_through_copies() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();
  let buffers = gl.create_buffers(2).unwrap();
  let data: Vec<u8> = (0..64).collect();

  gl.bind_buffer(GL_COPY_READ_BUFFER, buffers[0]).unwrap();
  gl.bind_buffer(GL_COPY_WRITE_BUFFER, buffers[1]).unwrap();
  gl.buffer_data(GL_COPY_READ_BUFFER, 64, Some(&data[..]), GL_STATIC_DRAW)
    .unwrap();
  gl.buffer_data(GL_COPY_WRITE_BUFFER, 64, None, GL_STATIC_DRAW).unwrap();
  gl.copy_buffer_sub_data(GL_COPY_READ_BUFFER, GL_COPY_WRITE_BUFFER, 0, 0, 64)
    .unwrap();

  let mut out = vec![0; 64];
  gl.get_buffer_sub_data(GL_COPY_WRITE_BUFFER, 0, &mut out).unwrap();
  assert_eq!(out, data);

  assert_eq!(
    gl.copy_buffer_sub_data(GL_COPY_READ_BUFFER, GL_COPY_WRITE_BUFFER, 60, 0, 8),
    Err(GlError::InvalidValue)
  );
}

#[test]
fn deleted_buffer_lives_on_in_sharing_context() {
  let mut registry = registry();
  let a = registry.create_context(ContextConfig::new(Screen::Top), None).unwrap();
  let b = registry.create_context(ContextConfig::new(Screen::Top), Some(a)).unwrap();

  registry.make_current(a).unwrap();
  let mut gl = registry.current().unwrap();
  let buffers = gl.gen_buffers(1).unwrap();
  gl.bind_buffer(GL_ARRAY_BUFFER, buffers[0]).unwrap();
  gl.buffer_data(GL_ARRAY_BUFFER, 4, Some(&[7; 4][..]), GL_STATIC_DRAW)
    .unwrap();
  drop(gl);

  registry.make_current(b).unwrap();
  let mut gl = registry.current().unwrap();
  assert!(gl.is_buffer(buffers[0]));
  gl.bind_buffer(GL_ARRAY_BUFFER, buffers[0]).unwrap();
  drop(gl);

  registry.make_current(a).unwrap();
  let mut gl = registry.current().unwrap();
  gl.delete_buffers(&buffers);
  assert!(!gl.is_buffer(buffers[0]));
  assert_eq!(gl.get_buffer_binding(GL_ARRAY_BUFFER), Ok(0));
  drop(gl);

  registry.make_current(b).unwrap();
  let mut gl = registry.current().unwrap();
  assert_eq!(gl.get_buffer_binding(GL_ARRAY_BUFFER), Ok(buffers[0]));

  let mut out = [0; 4];
  gl.get_buffer_sub_data(GL_ARRAY_BUFFER, 0, &mut out).unwrap();
  assert_eq!(out, [7; 4]);
}
