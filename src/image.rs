//! LC-3 object image format.
//!
//! An image is a flat binary file of big-endian 16-bit words:
//! - word 0: the origin address
//! - words 1..: contents, loaded contiguously from the origin
//!
//! A trailing odd byte is ignored.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A parsed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Address the first content word is loaded at.
    pub origin: u16,
    /// Content words, already in host order.
    pub words: Vec<u16>,
}

impl Image {
    /// Parse an image from raw file bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let mut words = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

        let origin = words.next().ok_or(ImageError::MissingOrigin)?;

        Ok(Self {
            origin,
            words: words.collect(),
        })
    }

    /// Serialize back to the on-disk format.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    /// Get the number of content words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if the image has no content.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image, ImageError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = Image::from_bytes(&bytes)?;

    log::info!(
        "loaded {}: {} words at {:#06x}",
        path.display(),
        image.len(),
        image.origin
    );
    Ok(image)
}

/// Errors that can occur while loading an image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image is shorter than its origin word")]
    MissingOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_big_endian() {
        let image = Image::from_bytes(&[0x30, 0x00, 0xF0, 0x25, 0x00, 0x41]).unwrap();

        assert_eq!(image.origin, 0x3000);
        assert_eq!(image.words, vec![0xF025, 0x0041]);
    }

    #[test]
    fn test_origin_only() {
        let image = Image::from_bytes(&[0x40, 0x00]).unwrap();
        assert_eq!(image.origin, 0x4000);
        assert!(image.is_empty());
    }

    #[test]
    fn test_odd_trailing_byte_ignored() {
        let image = Image::from_bytes(&[0x30, 0x00, 0x12, 0x34, 0x56]).unwrap();
        assert_eq!(image.words, vec![0x1234]);
    }

    #[test]
    fn test_missing_origin() {
        assert!(matches!(Image::from_bytes(&[]), Err(ImageError::MissingOrigin)));
        assert!(matches!(Image::from_bytes(&[0x30]), Err(ImageError::MissingOrigin)));
    }

    #[test]
    fn test_to_bytes() {
        let image = Image {
            origin: 0x3000,
            words: vec![0xABCD],
        };
        assert_eq!(image.to_bytes(), vec![0x30, 0x00, 0xAB, 0xCD]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_image("/nonexistent/dir/program.obj").unwrap_err();
        assert!(matches!(err, ImageError::Io { .. }));
        assert!(err.to_string().contains("program.obj"));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("lc3-image-test-{}.obj", std::process::id()));
        std::fs::write(&path, [0x30, 0x00, 0xF0, 0x25]).unwrap();

        let image = load_image(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(image.origin, 0x3000);
        assert_eq!(image.words, vec![0xF025]);
    }
}
