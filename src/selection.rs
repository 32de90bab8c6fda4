//! Current filter choice, read by the render loop on every tick.

use std::cell::RefCell;
use std::rc::Rc;

/// Read-only view of the two filter selectors.
pub trait SelectionSource {
    fn convolution(&self) -> String;
    fn color(&self) -> String;
}

impl<T: SelectionSource + ?Sized> SelectionSource for Rc<T> {
    fn convolution(&self) -> String {
        (**self).convolution()
    }

    fn color(&self) -> String {
        (**self).color()
    }
}

/// In-memory selection, changeable through a shared reference.
#[derive(Debug, Default)]
pub struct FilterSelection {
    convolution: RefCell<String>,
    color: RefCell<String>,
}

impl FilterSelection {
    pub fn new(convolution: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            convolution: RefCell::new(convolution.into()),
            color: RefCell::new(color.into()),
        }
    }

    pub fn select_convolution(&self, name: impl Into<String>) {
        *self.convolution.borrow_mut() = name.into();
    }

    pub fn select_color(&self, name: impl Into<String>) {
        *self.color.borrow_mut() = name.into();
    }
}

impl SelectionSource for FilterSelection {
    fn convolution(&self) -> String {
        self.convolution.borrow().clone()
    }

    fn color(&self) -> String {
        self.color.borrow().clone()
    }
}
