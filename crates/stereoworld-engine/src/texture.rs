//! CPU-side image decoding.

use std::path::Path;

use stereoworld_scene::texture::TextureEntry;

use crate::error::RenderError;

/// Decoded RGBA8 pixels, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// 1x1 image of a single colour.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self { width: 1, height: 1, pixels: rgba.to_vec() }
    }
}

/// Decodes `path` into RGBA8.
pub fn decode_file(path: &Path) -> Result<ImageData, RenderError> {
    let img = image::open(path).map_err(|source| RenderError::TextureDecode {
        path: path.to_path_buf(),
        source,
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ImageData { width, height, pixels: rgba.into_raw() })
}

/// Where material images come from.
pub trait ImageSource {
    fn load(&mut self, entry: &TextureEntry) -> Result<ImageData, RenderError>;
}

/// Reads images from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskImages;

impl ImageSource for DiskImages {
    fn load(&mut self, entry: &TextureEntry) -> Result<ImageData, RenderError> {
        let image = decode_file(&entry.path)?;
        log::debug!(
            "decoded {:?} texture {} ({}x{})",
            entry.role,
            entry.path.display(),
            image.width,
            image.height
        );
        Ok(image)
    }
}
