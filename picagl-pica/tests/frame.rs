#![cfg(feature = "sim")]

mod common;

use common::*;
use picagl::config::{ContextConfig, Screen};
use picagl::state::NewState;
use picagl::GlError;
use pretty_assertions::assert_eq;

#[test]
fn clear_fills_color_and_depth_buffers() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();

  gl.clear_color(0., 1., 0., 1.);
  gl.clear_depth(0.5);
  gl.clear_stencil(3);
  gl.clear(GL_COLOR_BUFFER_BIT | GL_DEPTH_BUFFER_BIT | GL_STENCIL_BUFFER_BIT)
    .unwrap();

  let framebuffer = *gl.context().framebuffer();
  drop(gl);

  let gpu = registry.backend();
  let color = gpu.read_vram(framebuffer.color.addr, framebuffer.color.len()).unwrap();
  let depth = gpu.read_vram(framebuffer.depth.addr, 8).unwrap();

  assert_eq!(color.len(), 240 * 400 * 4);
  assert!(color.chunks_exact(4).all(|texel| texel == [0xFF, 0x00, 0xFF, 0x00]));
  assert_eq!(depth, [0xFF, 0xFF, 0x7F, 0x03].repeat(2));
  assert_eq!(gpu.counters().memory_fills, 1);
}

#[test]
fn clear_runs_pending_commands_first() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();

  gl.draw_arrays(GL_TRIANGLES, 0, 3).unwrap();
  gl.clear(GL_COLOR_BUFFER_BIT).unwrap();
  assert!(gl.context().command_buffer().is_empty());

  assert_eq!(gl.clear(0x1), Err(GlError::InvalidValue));
  drop(gl);

  assert_eq!(registry.backend().snapshot().unwrap().draws, 1);

  // nothing to fill: no memory fill at all
  registry.current().unwrap().clear(0).unwrap();
  assert_eq!(registry.backend().counters().memory_fills, 1);
}

#[test]
fn frames_reach_the_screen() {
  let (mut registry, id) = current_context();
  let mut gl = registry.current().unwrap();
  gl.clear_color(1., 1., 1., 0.);
  gl.clear(GL_COLOR_BUFFER_BIT).unwrap();
  gl.draw_arrays(GL_TRIANGLES, 0, 3).unwrap();
  drop(gl);

  registry.flush_context(id).unwrap();
  assert!(registry.current().unwrap().context().command_buffer().is_empty());
  assert!(registry.backend().read_screen(Screen::Top).unwrap().is_empty());

  registry.swap_buffers(id).unwrap();
  let screen = registry.backend().read_screen(Screen::Top).unwrap();
  assert_eq!(screen.len(), 240 * 400 * 4);
  assert_eq!(&screen[..4], &[0x00, 0xFF, 0xFF, 0xFF]);
  assert!(registry.backend().read_screen(Screen::Bottom).unwrap().is_empty());

  let counters = registry.backend().counters();
  assert_eq!(counters.display_transfers, 1);
  assert_eq!(counters.presents, 1);
  assert_eq!(registry.backend().snapshot().unwrap().draws, 1);
}

#[test]
fn full_command_buffers_are_run_early() {
  let mut registry = registry();
  let config = ContextConfig::new(Screen::Top).with_command_buffer_words(1024);
  let id = registry.create_context(config, None).unwrap();
  registry.make_current(id).unwrap();

  let mut gl = registry.current().unwrap();

  for _ in 0..200 {
    gl.draw_arrays(GL_TRIANGLES, 0, 3).unwrap();
    assert!(gl.context().command_buffer().cursor() <= 1022);
  }

  gl.finish().unwrap();
  assert_eq!(gl.get_error(), None);
  drop(gl);

  assert_eq!(registry.backend().snapshot().unwrap().draws, 200);
  assert!(registry.backend().counters().dispatches > 1);
}

#[test]
fn oversized_draws_leave_nothing_behind() {
  let mut registry = registry();
  let config = ContextConfig::new(Screen::Top).with_command_buffer_words(64);
  let id = registry.create_context(config, None).unwrap();
  registry.make_current(id).unwrap();

  let mut gl = registry.current().unwrap();
  assert_eq!(gl.draw_arrays(GL_TRIANGLES, 0, 3), Err(GlError::OutOfMemory));
  assert_eq!(gl.get_error(), Some(GlError::OutOfMemory));
  assert!(gl.context().command_buffer().is_empty());
  assert_eq!(gl.context().new_state(), NewState::all());

  // the context keeps working
  gl.finish().unwrap();
  gl.clear(GL_COLOR_BUFFER_BIT).unwrap();
  drop(gl);

  assert_eq!(registry.backend().snapshot().unwrap().draws, 0);
}
