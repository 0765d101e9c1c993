//! OS lifecycle hook.

use crate::backend::BackendError;

/// Lifecycle signal sent by the OS.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LifecycleEvent {
  /// The process is about to lose the GPU.
  Suspend,
  /// The process is getting the GPU back; its registers must be considered lost.
  Resume,
}

/// Subscription to the OS lifecycle signals.
pub trait LifecycleHook {
  fn hook(&mut self) -> Result<(), BackendError>;

  fn unhook(&mut self);

  /// Next pending signal, if any.
  fn poll_lifecycle(&mut self) -> Option<LifecycleEvent>;
}
