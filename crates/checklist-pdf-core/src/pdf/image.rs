//! Raster images (photos, signature pads) prepared for embedding.

use lopdf::{Object, Stream};

use crate::error::{Error, Result};

/// Upper bound on accepted image payloads.
pub const MAX_IMAGE_BYTES: usize = 10_000_000;

/// A decoded image flattened to 8-bit RGB on a white background.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl RasterImage {
    /// Decode PNG or JPEG bytes. Transparent pixels are composited onto white
    /// so signature pads exported with alpha keep a clean background.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(Error::ImageDecode(format!(
                "Image too large ({} bytes, limit {MAX_IMAGE_BYTES})",
                bytes.len()
            )));
        }

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| Error::ImageDecode(format!("Failed to decode image: {e}")))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::ImageDecode("Image has no pixels".to_string()));
        }

        let mut rgb = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            rgb.extend_from_slice(&[over_white(r, a), over_white(g, a), over_white(b, a)]);
        }

        Ok(Self { width, height, rgb })
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Image XObject stream, DeviceRGB 8 bits per component.
    pub fn to_xobject(&self) -> Stream {
        let dict = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(self.width))),
            ("Height", Object::Integer(i64::from(self.height))),
            ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
        ]);
        Stream::new(dict, self.rgb.clone()).with_compression(true)
    }
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn over_white(channel: u8, alpha: u8) -> u8 {
    let c = u32::from(channel);
    let a = u32::from(alpha);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let image = RasterImage::decode(&png(4, 3, [10, 20, 30, 255])).unwrap();
        assert_eq!((image.width(), image.height()), (4, 3));
        assert_eq!(&image.rgb[..3], &[10, 20, 30]);
        assert_eq!(image.rgb.len(), 4 * 3 * 3);
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let image = RasterImage::decode(&png(1, 1, [0, 0, 0, 0])).unwrap();
        assert_eq!(image.rgb, vec![255, 255, 255]);
    }

    #[test]
    fn test_invalid_bytes_rejected() {
        assert!(matches!(
            RasterImage::decode(b"not an image"),
            Err(Error::ImageDecode(_))
        ));
    }

    #[test]
    fn test_xobject_dictionary() {
        let image = RasterImage::decode(&png(2, 2, [1, 2, 3, 255])).unwrap();
        let stream = image.to_xobject();
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 2);
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceRGB"
        );
    }
}
