use crate::backend::Backend;
use crate::context::Gl;
use crate::error::{gl_err, GlError, GlResult};
use crate::sampler::SamplerParam;
use crate::state::NewState;

impl<'a, B> Gl<'a, B>
where
  B: ?Sized + Backend,
{
  pub fn gen_samplers(&mut self, n: i32) -> GlResult<Vec<u32>> {
    let r = self.ctx.shared.borrow_mut().samplers.gen_samplers(n);
    self.latch(r)
  }

  /// Same as [`Gl::gen_samplers`]: sampler objects are always created with their name.
  pub fn create_samplers(&mut self, n: i32) -> GlResult<Vec<u32>> {
    self.gen_samplers(n)
  }

  pub fn is_sampler(&self, name: u32) -> bool {
    self.ctx.shared.borrow().samplers.is_sampler(name)
  }

  /// Delete samplers, unbinding them from the units of this context first.
  pub fn delete_samplers(&mut self, names: &[u32]) {
    for &name in names {
      let id = match self.ctx.shared.borrow().samplers.id(name) {
        Some(id) => id,
        None => continue,
      };

      for unit in 0..self.ctx.units.len() {
        if self.ctx.units[unit].sampler == Some(id) {
          self.flush_vertices(NewState::TEXTURE);

          let mut shared = self.ctx.shared.borrow_mut();
          shared.samplers.bind_slot(&mut self.ctx.units[unit].sampler, None);
        }
      }

      self.ctx.shared.borrow_mut().samplers.remove(name);
    }
  }

  fn bind_sampler_unit(&mut self, unit: usize, name: u32, caller: &str) -> GlResult<()> {
    let sampler = self.ctx.shared.borrow().samplers.resolve(name, caller)?;

    if self.ctx.units[unit].sampler == sampler {
      return Ok(());
    }

    self.flush_vertices(NewState::TEXTURE);

    let mut shared = self.ctx.shared.borrow_mut();
    shared.samplers.bind_slot(&mut self.ctx.units[unit].sampler, sampler);
    Ok(())
  }

  /// Bind a sampler to texture unit `unit`; `0` goes back to the texture's own sampler state.
  pub fn bind_sampler(&mut self, unit: u32, name: u32) -> GlResult<()> {
    let r = if unit as usize >= self.ctx.units.len() {
      gl_err!(GlError::InvalidValue, "bind_sampler: unit {}", unit)
    } else {
      self.bind_sampler_unit(unit as usize, name, "bind_sampler")
    };

    self.latch(r)
  }

  /// Bind `count` samplers to the units starting at `first`; `None` unbinds them.
  ///
  /// Each binding is applied on its own: an invalid name is reported but the other units of the
  /// range are still bound.
  pub fn bind_samplers(&mut self, first: u32, count: usize, names: Option<&[u32]>) -> GlResult<()> {
    let first = first as usize;

    if first.saturating_add(count) > self.ctx.units.len() {
      return self.latch(gl_err!(
        GlError::InvalidOperation,
        "bind_samplers: {}+{} exceeds the unit count",
        first,
        count
      ));
    }

    if let Some(names) = names {
      if names.len() < count {
        return self.latch(gl_err!(GlError::InvalidValue, "bind_samplers: {} names for {}", names.len(), count));
      }
    }

    let mut result = Ok(());

    for i in 0..count {
      let name = names.map_or(0, |names| names[i]);
      let r = self.bind_sampler_unit(first + i, name, "bind_samplers");

      if r.is_err() {
        result = self.latch(r);
      }
    }

    result
  }

  fn sampler_parameter(&mut self, name: u32, param: GlResult<SamplerParam>) -> GlResult<()> {
    let r = param.and_then(|param| {
      let changed = {
        let mut shared = self.ctx.shared.borrow_mut();
        shared.samplers.named_mut(name, "sampler_parameter")?.state.check(&param)?
      };

      if changed {
        self.flush_vertices(NewState::TEXTURE);

        let max_anisotropy = self.ctx.config().limits.max_texture_max_anisotropy;
        let mut shared = self.ctx.shared.borrow_mut();
        shared
          .samplers
          .named_mut(name, "sampler_parameter")?
          .state
          .apply(param, max_anisotropy);
      }

      Ok(())
    });

    self.latch(r)
  }

  pub fn sampler_parameter_i(&mut self, name: u32, pname: u32, param: i32) -> GlResult<()> {
    self.sampler_parameter(name, SamplerParam::from_i(pname, param))
  }

  pub fn sampler_parameter_f(&mut self, name: u32, pname: u32, param: f32) -> GlResult<()> {
    self.sampler_parameter(name, SamplerParam::from_f(pname, param))
  }

  pub fn sampler_parameter_iv(&mut self, name: u32, pname: u32, params: &[i32]) -> GlResult<()> {
    self.sampler_parameter(name, SamplerParam::from_iv(pname, params))
  }

  pub fn sampler_parameter_fv(&mut self, name: u32, pname: u32, params: &[f32]) -> GlResult<()> {
    self.sampler_parameter(name, SamplerParam::from_fv(pname, params))
  }

  pub fn sampler_parameter_iiv(&mut self, name: u32, pname: u32, params: &[i32]) -> GlResult<()> {
    self.sampler_parameter(name, SamplerParam::from_iiv(pname, params))
  }

  pub fn sampler_parameter_iuiv(&mut self, name: u32, pname: u32, params: &[u32]) -> GlResult<()> {
    self.sampler_parameter(name, SamplerParam::from_iuiv(pname, params))
  }

  pub fn get_sampler_parameter(&mut self, name: u32, pname: u32) -> GlResult<SamplerParam> {
    let r = {
      let mut shared = self.ctx.shared.borrow_mut();
      shared
        .samplers
        .named_mut(name, "get_sampler_parameter")
        .and_then(|obj| obj.state.parameter(pname))
    };

    self.latch(r)
  }
}
