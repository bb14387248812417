//! The shared handle to the active graphics device.
//!
//! Every GPU-owning wrapper keeps a [`Context`] so it can release its handle
//! on drop. The engine runs on a single rendering thread, hence `Rc`.

use std::{fmt::Debug, ops::Deref, rc::Rc};

use crate::device::GraphicsDevice;

#[derive(Clone)]
pub struct Context {
    device: Rc<dyn GraphicsDevice>,
}

impl Context {
    pub fn new<D: GraphicsDevice + 'static>(device: D) -> Self {
        Self {
            device: Rc::new(device),
        }
    }

    /// Shares a device the caller keeps its own (typed) handle to, e.g. to
    /// submit frames on a `WgpuDevice` or inspect a `HeadlessDevice`.
    pub fn from_shared(device: Rc<dyn GraphicsDevice>) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }
}

impl Deref for Context {
    type Target = dyn GraphicsDevice;

    fn deref(&self) -> &Self::Target {
        self.device.as_ref()
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Context")
    }
}
