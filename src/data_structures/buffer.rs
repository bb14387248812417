//! Device-resident vertex and index data.

use crate::{
    context::Context,
    device::{BufferId, BufferKind},
    error::DeviceError,
};

/// An immutable block of device memory.
///
/// A buffer is owned by exactly one value and cannot be cloned; containers
/// that need to share geometry share themselves (`Rc<Mesh>`), not the handle.
/// The device buffer is released when the wrapper is dropped.
pub struct GpuBuffer {
    ctx: Context,
    id: BufferId,
    kind: BufferKind,
    byte_length: usize,
}

impl GpuBuffer {
    pub fn create(ctx: &Context, kind: BufferKind, contents: &[u8]) -> Result<Self, DeviceError> {
        let id = ctx.create_buffer(kind, contents)?;
        log::debug!("created {:?} {} ({} bytes)", kind, id, contents.len());
        Ok(Self {
            ctx: ctx.clone(),
            id,
            kind,
            byte_length: contents.len(),
        })
    }

    /// Uploads a slice of plain-old-data values, e.g. vertices or `u32` indices.
    pub fn from_slice<T: bytemuck::Pod>(
        ctx: &Context,
        kind: BufferKind,
        data: &[T],
    ) -> Result<Self, DeviceError> {
        Self::create(ctx, kind, bytemuck::cast_slice(data))
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        log::debug!("releasing {}", self.id);
        self.ctx.destroy_buffer(self.id);
    }
}

impl std::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("byte_length", &self.byte_length)
            .finish()
    }
}
