//! Device textures and the decoded images they are created from.
//!
//! This module provides [`Texture`], an owned handle to a device image, and
//! [`ImageData`], the decoded pixels handed to the device. Textures are shared
//! between meshes through `Rc<Texture>`; the device image is released when the
//! last reference goes away.

use std::path::Path;

use crate::{
    context::Context,
    device::TextureId,
    error::{DeviceError, ResourceError},
    resources::image::{FileImageDecoder, ImageDecoder},
};

/// What a texture is sampled for. Decides the uniform name it binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
}

impl TextureKind {
    /// Prefix of the sampler uniform, completed by a 1-based counter.
    pub fn uniform_prefix(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "material.texture_diffuse_",
            TextureKind::Specular => "material.texture_specular_",
        }
    }
}

/// Decoded, tightly packed 8-bit RGB pixels, bottom row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// A single-colour image.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Byte length `pixels` must have, `None` if it does not fit in memory.
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(3)
    }

    /// Checks that the image is non-empty and `pixels` holds exactly one RGB triple per texel.
    pub fn validate(&self) -> Result<(), DeviceError> {
        let invalid = |reason: String| DeviceError::Allocation {
            what: "texture",
            reason,
        };
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!("empty image {}x{}", self.width, self.height)));
        }
        match self.expected_len() {
            Some(len) if len == self.pixels.len() => Ok(()),
            Some(len) => Err(invalid(format!(
                "{}x{} image needs {} bytes of RGB data, got {}",
                self.width,
                self.height,
                len,
                self.pixels.len()
            ))),
            None => Err(invalid(format!(
                "{}x{} image is too large",
                self.width, self.height
            ))),
        }
    }
}

#[derive(Debug)]
pub struct Texture {
    ctx: Context,
    id: TextureId,
    width: u32,
    height: u32,
    kind: TextureKind,
}

impl Texture {
    pub fn create(ctx: &Context, image: &ImageData, kind: TextureKind) -> Result<Self, DeviceError> {
        image.validate()?;
        let id = ctx.create_texture(image)?;
        log::debug!("created {:?} {} ({}x{})", kind, id, image.width, image.height);
        Ok(Self {
            ctx: ctx.clone(),
            id,
            width: image.width,
            height: image.height,
            kind,
        })
    }

    /// Decodes an image file (flipped so the first row is the bottom one) and uploads it.
    pub fn load(ctx: &Context, path: impl AsRef<Path>, kind: TextureKind) -> Result<Self, ResourceError> {
        Self::load_with(ctx, &FileImageDecoder, path.as_ref(), kind)
    }

    pub fn load_with(
        ctx: &Context,
        decoder: &dyn ImageDecoder,
        path: &Path,
        kind: TextureKind,
    ) -> Result<Self, ResourceError> {
        let image = decoder.decode(path)?;
        Ok(Self::create(ctx, &image, kind)?)
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        log::debug!("releasing {}", self.id);
        self.ctx.destroy_texture(self.id);
    }
}
