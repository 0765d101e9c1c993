#![cfg(feature = "sim")]

mod common;

use common::*;
use picagl::linear::{self, IDENTITY, SCREEN_ROTATION};
use picagl::regs;
use picagl::state::NewState;
use picagl::GlError;
use pretty_assertions::assert_eq;

#[test]
fn second_resolution_emits_nothing() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();

  gl.resolve_state().unwrap();
  let cursor = gl.context().command_buffer().cursor();
  assert!(cursor > 0);
  assert!(gl.context().new_state().is_empty());

  gl.resolve_state().unwrap();
  assert_eq!(gl.context().command_buffer().cursor(), cursor);
}

#[test]
fn state_changed_back_emits_nothing() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();
  gl.resolve_state().unwrap();
  let cursor = gl.context().command_buffer().cursor();

  gl.depth_func(GL_GREATER).unwrap();
  gl.depth_func(GL_LESS).unwrap();
  assert!(gl.context().new_state().contains(NewState::DEPTH));

  gl.resolve_state().unwrap();
  assert_eq!(gl.context().command_buffer().cursor(), cursor);

  gl.depth_func(GL_GREATER).unwrap();
  gl.resolve_state().unwrap();
  assert!(gl.context().command_buffer().cursor() > cursor);
}

#[test]
fn resolution_reports_resolved_categories() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();
  gl.resolve_state().unwrap();

  gl.enable(GL_BLEND).unwrap();
  gl.resolve_state().unwrap();
  drop(gl);

  let counters = registry.backend().counters();
  assert_eq!(counters.state_updates, 2);
  assert_eq!(counters.last_update, NewState::COLOR);
}

#[test]
fn program_switch_queries_matrix_locations_again() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();

  let a = gl.create_program().unwrap();
  gl.program_binary(a, VERTEX_SHADER_BINARY, &shader(0, 4)).unwrap();
  let b = gl.create_program().unwrap();
  gl.program_binary(b, VERTEX_SHADER_BINARY, &shader(8, 12)).unwrap();

  gl.matrix_mode(GL_MODELVIEW).unwrap();
  gl.translate(1., 2., 3.).unwrap();

  gl.use_program(a).unwrap();
  gl.draw_arrays(GL_TRIANGLES, 0, 3).unwrap();
  gl.use_program(b).unwrap();
  gl.draw_arrays(GL_TRIANGLES, 0, 3).unwrap();
  gl.finish().unwrap();
  drop(gl);

  let snapshot = registry.backend().snapshot().unwrap();
  let modelview = linear::translation(1., 2., 3.);
  let projection = linear::mul(&SCREEN_ROTATION, &IDENTITY);

  assert_eq!(snapshot.vsh.matrix(0), Some(projection));
  assert_eq!(snapshot.vsh.matrix(4), Some(modelview));
  assert_eq!(snapshot.vsh.matrix(8), Some(projection));
  assert_eq!(snapshot.vsh.matrix(12), Some(modelview));
  assert_eq!(snapshot.draws, 2);
}

#[test]
fn uniforms_are_uploaded_once() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();

  let program = gl.create_program().unwrap();
  gl.program_binary(program, VERTEX_SHADER_BINARY, &shader(0, 4)).unwrap();
  assert_eq!(gl.uniform4f(20, 1., 2., 3., 4.), Err(GlError::InvalidOperation));

  gl.use_program(program).unwrap();
  let tint = gl.get_uniform_location(program, "tint").unwrap();
  assert_eq!(tint, 20);
  assert_eq!(gl.get_uniform_location(program, "missing"), Ok(-1));
  assert_eq!(gl.uniform4f(-1, 0., 0., 0., 0.), Err(GlError::InvalidValue));

  gl.resolve_state().unwrap();
  drop(gl);
  let flushes = registry.backend().counters().flush_vertices;

  let mut gl = registry.current().unwrap();
  gl.uniform4f(tint, 1., 2., 3., 4.).unwrap();
  gl.resolve_state().unwrap();
  let cursor = gl.context().command_buffer().cursor();
  gl.resolve_state().unwrap();
  assert_eq!(gl.context().command_buffer().cursor(), cursor);
  gl.finish().unwrap();
  drop(gl);

  assert_eq!(registry.backend().counters().flush_vertices, flushes);
  let snapshot = registry.backend().snapshot().unwrap();
  assert_eq!(snapshot.vsh.uniform(20), Some([1., 2., 3., 4.]));
}

#[test]
fn sampler_parameters_flush_only_on_change() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();
  let samplers = gl.gen_samplers(1).unwrap();
  drop(gl);

  let before = registry.backend().counters().flush_vertices;
  let mut gl = registry.current().unwrap();

  gl.sampler_parameter_i(samplers[0], GL_TEXTURE_MAG_FILTER, GL_NEAREST)
    .unwrap();
  gl.sampler_parameter_i(samplers[0], GL_TEXTURE_MAG_FILTER, GL_NEAREST)
    .unwrap();
  assert_eq!(
    gl.sampler_parameter_i(samplers[0], GL_TEXTURE_MAG_FILTER, 0x1234),
    Err(GlError::InvalidEnum)
  );
  assert_eq!(gl.get_error(), Some(GlError::InvalidEnum));

  gl.bind_sampler(0, samplers[0]).unwrap();
  gl.bind_sampler(0, samplers[0]).unwrap();
  assert_eq!(gl.bind_sampler(7, samplers[0]), Err(GlError::InvalidValue));
  drop(gl);

  assert_eq!(registry.backend().counters().flush_vertices, before + 2);
}

#[test]
fn bind_samplers_keeps_valid_bindings_of_a_failing_batch() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();
  let samplers = gl.gen_samplers(2).unwrap();

  assert_eq!(
    gl.bind_samplers(0, 3, Some(&[samplers[0], 999, samplers[1]][..])),
    Err(GlError::InvalidOperation)
  );
  assert_eq!(gl.get_error(), Some(GlError::InvalidOperation));

  let bound: Vec<bool> = gl
    .context()
    .texture_units()
    .iter()
    .map(|unit| unit.sampler.is_some())
    .collect();
  assert_eq!(bound, vec![true, false, true]);

  // unbinding the range goes through every unit
  gl.bind_samplers(0, 3, None).unwrap();
  assert!(gl.context().texture_units().iter().all(|unit| unit.sampler.is_none()));
  assert_eq!(gl.bind_samplers(2, 2, None), Err(GlError::InvalidOperation));
}

#[test]
fn textures_are_tiled_before_drawing() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();
  let textures = gl.gen_textures(1).unwrap();
  let pixels = vec![0x80; 8 * 8 * 4];

  gl.active_texture(GL_TEXTURE0).unwrap();
  gl.bind_texture(GL_TEXTURE_2D, textures[0]).unwrap();
  gl.tex_image_2d(GL_TEXTURE_2D, 0, 8, 8, GL_RGBA, GL_UNSIGNED_BYTE, Some(&pixels[..]))
    .unwrap();
  gl.draw_arrays(GL_TRIANGLES, 0, 3).unwrap();
  gl.draw_arrays(GL_TRIANGLES, 3, 3).unwrap();
  gl.finish().unwrap();
  drop(gl);

  assert_eq!(registry.backend().counters().tilings, 1);

  let snapshot = registry.backend().snapshot().unwrap();
  let addr = snapshot.reg(regs::TEXUNITS[0].addr) << 3;
  assert_eq!(snapshot.reg(regs::TEXUNITS[0].dim), 8 << 16 | 8);
  assert_eq!(snapshot.reg(regs::TEXUNIT_CONFIG) & 0x7, 1);
  assert_eq!(registry.backend().read_vram(addr, 8).unwrap(), vec![0x80; 8]);
}

#[test]
fn draw_validation() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();

  assert_eq!(gl.draw_arrays(0x0001, 0, 3), Err(GlError::InvalidEnum));
  assert_eq!(gl.draw_arrays(GL_TRIANGLES, -1, 3), Err(GlError::InvalidValue));

  let cursor = gl.context().command_buffer().cursor();
  gl.draw_arrays(GL_TRIANGLES, 0, 0).unwrap();
  assert_eq!(gl.context().command_buffer().cursor(), cursor);
}

#[test]
fn matrix_stack_bounds() {
  let (mut registry, _) = current_context();
  let mut gl = registry.current().unwrap();
  gl.matrix_mode(GL_PROJECTION).unwrap();

  assert_eq!(gl.pop_matrix(), Err(GlError::StackUnderflow));

  for _ in 1..32 {
    gl.push_matrix().unwrap();
  }

  assert_eq!(gl.push_matrix(), Err(GlError::StackOverflow));
  assert_eq!(gl.get_error(), Some(GlError::StackOverflow));
  assert_eq!(gl.get_error(), None);
}
