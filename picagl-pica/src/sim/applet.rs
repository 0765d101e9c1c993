//! Simulated applet manager.
//!
//! The OS notifies the process that it is about to lose or get back the GPU (home menu, sleep
//! mode…). Here, the notifications are sent by hand through an [`Applet`] handle.

use std::sync::mpsc;

use log::debug;
use picagl::backend::LifecycleEvent;

/// Sending side of the lifecycle signals, as the OS would use it.
#[derive(Clone, Debug)]
pub struct Applet {
  events: mpsc::Sender<LifecycleEvent>,
}

impl Applet {
  /// Notify that the process is about to be suspended.
  pub fn suspend(&self) {
    self.send(LifecycleEvent::Suspend);
  }

  /// Notify that the process gets the GPU back.
  pub fn resume(&self) {
    self.send(LifecycleEvent::Resume);
  }

  fn send(&self, event: LifecycleEvent) {
    debug!("applet signal: {:?}", event);
    // nobody listening means the backend is gone; the signal is moot
    let _ = self.events.send(event);
  }
}

/// Receiving side, owned by the backend.
#[derive(Debug)]
pub(crate) struct AppletHook {
  sender: mpsc::Sender<LifecycleEvent>,
  events: mpsc::Receiver<LifecycleEvent>,
  hooked: bool,
}

impl AppletHook {
  pub(crate) fn new() -> Self {
    let (sender, events) = mpsc::channel();

    AppletHook {
      sender,
      events,
      hooked: false,
    }
  }

  pub(crate) fn applet(&self) -> Applet {
    Applet {
      events: self.sender.clone(),
    }
  }

  pub(crate) fn is_hooked(&self) -> bool {
    self.hooked
  }

  pub(crate) fn set_hooked(&mut self, hooked: bool) {
    self.hooked = hooked;
  }

  /// Next signal; signals are only delivered while hooked and stay queued otherwise.
  pub(crate) fn poll(&mut self) -> Option<LifecycleEvent> {
    if self.hooked {
      self.events.try_recv().ok()
    } else {
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signals_wait_for_the_hook() {
    let mut hook = AppletHook::new();
    let applet = hook.applet();

    applet.suspend();
    assert_eq!(hook.poll(), None);

    hook.set_hooked(true);
    applet.resume();
    assert_eq!(hook.poll(), Some(LifecycleEvent::Suspend));
    assert_eq!(hook.poll(), Some(LifecycleEvent::Resume));
    assert_eq!(hook.poll(), None);
  }
}
