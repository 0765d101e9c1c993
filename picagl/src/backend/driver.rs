//! Driver hooks.

use crate::state::NewState;

/// Backend-specific reactions to state changes.
pub trait Driver {
  /// Called once a state resolution is done, with the categories it resolved.
  fn update_state(&mut self, new_state: NewState) {
    let _ = new_state;
  }

  /// Called before any state change that must not apply to already batched geometry.
  fn flush_vertices(&mut self) {}
}
