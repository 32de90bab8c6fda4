use std::cell::Cell;
use std::rc::Rc;

/// Shared stop flag for the capture session and its render loop.
///
/// Clones observe the same flag. Stopping is permanent.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Rc<Cell<bool>>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.get()
    }
}
