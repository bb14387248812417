//! The image decode boundary.

use std::path::Path;

use ::image::ImageReader;

use crate::{data_structures::texture::ImageData, error::ResourceError};

/// Turns an image file into RGB pixels, bottom row first.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<ImageData, ResourceError>;
}

/// Decodes with the `image` crate, guessing the format from the contents.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileImageDecoder;

impl ImageDecoder for FileImageDecoder {
    fn decode(&self, path: &Path) -> Result<ImageData, ResourceError> {
        let io_error = |source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        };
        let image = ImageReader::open(path)
            .map_err(io_error)?
            .with_guessed_format()
            .map_err(io_error)?
            .decode()
            .map_err(|source| ResourceError::Image {
                path: path.to_path_buf(),
                source,
            })?;

        let rgb = image.flipv().to_rgb8();
        Ok(ImageData {
            width: rgb.width(),
            height: rgb.height(),
            pixels: rgb.into_raw(),
        })
    }
}
