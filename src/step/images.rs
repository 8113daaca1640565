//! Image step: re-encode rasters, minify SVG, pass through everything else.
//!
//! Re-encoding goes through decoded pixels, which loses everything but the
//! pixels. Rasters carrying orientation, color profiles or animation are
//! therefore copied as they are.

use super::{SourceFile, StagedFile, StepError, Transform, read, svg};
use crate::config::ImagesConfig;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use rayon::prelude::*;
use std::path::Path;

pub struct ImageOptimize {
    jpeg_quality: u8,
    png_level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Jpeg,
    Png,
    Svg,
    Passthrough,
}

impl Kind {
    fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("jpg" | "jpeg") => Self::Jpeg,
            Some("png") => Self::Png,
            Some("svg") => Self::Svg,
            _ => Self::Passthrough,
        }
    }
}

impl ImageOptimize {
    pub fn new(config: &ImagesConfig) -> Self {
        Self {
            jpeg_quality: config.jpeg_quality,
            png_level: config.png_level,
        }
    }

    /// Optimized bytes, or the original when optimization does not shrink it.
    fn optimize(&self, path: &Path, original: Vec<u8>) -> Result<Vec<u8>, StepError> {
        let kind = Kind::of(path);
        if carries_metadata(kind, &original) {
            crate::debug!("images"; "{}: metadata present, copied", path.display());
            return Ok(original);
        }

        let optimized = match kind {
            Kind::Jpeg => self.encode_jpeg(path, &decode(path, &original, ImageFormat::Jpeg)?)?,
            Kind::Png => self.encode_png(path, &decode(path, &original, ImageFormat::Png)?)?,
            Kind::Svg => svg::minify(&original).map_err(|e| StepError::invalid(path, e))?,
            Kind::Passthrough => return Ok(original),
        };

        if optimized.len() < original.len() {
            Ok(optimized)
        } else {
            Ok(original)
        }
    }

    fn encode_jpeg(&self, path: &Path, img: &DynamicImage) -> Result<Vec<u8>, StepError> {
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, self.jpeg_quality);
        img.write_with_encoder(encoder)
            .map_err(|e| StepError::tool("jpeg", path, e))?;
        Ok(out)
    }

    fn encode_png(&self, path: &Path, img: &DynamicImage) -> Result<Vec<u8>, StepError> {
        let (compression, filter) = png_settings(self.png_level);
        let mut out = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut out, compression, filter);
        img.write_with_encoder(encoder)
            .map_err(|e| StepError::tool("png", path, e))?;
        Ok(out)
    }
}

/// Map the `0..=7` effort level onto the encoder's presets.
fn png_settings(level: u8) -> (CompressionType, FilterType) {
    match level {
        0 => (CompressionType::Fast, FilterType::NoFilter),
        1..=2 => (CompressionType::Fast, FilterType::Adaptive),
        3..=4 => (CompressionType::Default, FilterType::Adaptive),
        _ => (CompressionType::Best, FilterType::Adaptive),
    }
}

/// PNG chunks a pixel round trip would drop.
const PNG_KEEP_CHUNKS: [&[u8; 4]; 6] = [b"iCCP", b"sRGB", b"gAMA", b"cHRM", b"eXIf", b"acTL"];

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Whether the file holds data besides pixels that re-encoding would lose.
fn carries_metadata(kind: Kind, bytes: &[u8]) -> bool {
    match kind {
        Kind::Jpeg => jpeg_has_metadata(bytes),
        Kind::Png => png_has_metadata(bytes),
        Kind::Svg | Kind::Passthrough => false,
    }
}

/// APP1 (Exif, XMP), APP2 (ICC profile) or APP14 (Adobe color transform)
/// before the first scan.
fn jpeg_has_metadata(bytes: &[u8]) -> bool {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return false;
    }
    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xFF {
            return false;
        }
        let marker = bytes[i + 1];
        match marker {
            // fill byte
            0xFF => {
                i += 1;
                continue;
            }
            // standalone markers carry no length
            0x01 | 0xD0..=0xD7 => {
                i += 2;
                continue;
            }
            // start of scan, end of image
            0xDA | 0xD9 => return false,
            0xE1 | 0xE2 | 0xEE => return true,
            _ => {}
        }
        let len = usize::from(u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]));
        if len < 2 {
            return false;
        }
        i += 2 + len;
    }
    false
}

fn png_has_metadata(bytes: &[u8]) -> bool {
    let Some(mut rest) = bytes.strip_prefix(PNG_SIGNATURE) else {
        return false;
    };
    while rest.len() >= 12 {
        let (head, tail) = rest.split_at(8);
        let len = u32::from_be_bytes([head[0], head[1], head[2], head[3]]) as usize;
        let kind = &head[4..8];
        if PNG_KEEP_CHUNKS.iter().any(|keep| kind == keep.as_slice()) {
            return true;
        }
        if kind == b"IEND" {
            return false;
        }
        // data plus crc
        let Some(next) = len.checked_add(4).and_then(|skip| tail.get(skip..)) else {
            return false;
        };
        rest = next;
    }
    false
}

fn decode(path: &Path, bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, StepError> {
    image::load_from_memory_with_format(bytes, format).map_err(|e| StepError::invalid(path, e))
}

impl Transform for ImageOptimize {
    fn transform(&self, files: &[SourceFile]) -> Result<Vec<StagedFile>, StepError> {
        files
            .par_iter()
            .map(|file| {
                let bytes = self.optimize(&file.path, read(&file.path)?)?;
                Ok(StagedFile::new(file.rel.clone(), bytes))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
    use std::fs;
    use std::io::Cursor;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn step() -> ImageOptimize {
        ImageOptimize::new(&ImagesConfig::default())
    }

    fn write_source(dir: &Path, rel: &str, bytes: &[u8]) -> SourceFile {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        SourceFile {
            path,
            rel: PathBuf::from(rel),
        }
    }

    /// Gradient PNG encoded without compression effort.
    fn raw_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        let mut out = Vec::new();
        PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
            .unwrap();
        out
    }

    #[test]
    fn test_png_keeps_pixels_and_never_grows() {
        let dir = TempDir::new().unwrap();
        let original = raw_png(64, 64);
        let file = write_source(dir.path(), "icons/grad.png", &original);

        let staged = step().transform(&[file]).unwrap();
        assert_eq!(staged[0].rel, PathBuf::from("icons/grad.png"));
        assert!(staged[0].bytes.len() <= original.len());

        let before = image::load_from_memory(&original).unwrap();
        let after = image::load_from_memory(&staged[0].bytes).unwrap();
        assert_eq!(before.dimensions(), after.dimensions());
        assert_eq!(before.to_rgba8(), after.to_rgba8());
    }

    #[test]
    fn test_jpeg_reencoded_within_dimensions() {
        let dir = TempDir::new().unwrap();
        let img = RgbImage::from_fn(32, 16, |x, _| Rgb([(x * 8) as u8, 40, 200]));
        let mut original = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut original), ImageFormat::Jpeg)
            .unwrap();
        let file = write_source(dir.path(), "photo.jpg", &original);

        let staged = step().transform(&[file]).unwrap();
        assert!(staged[0].bytes.len() <= original.len());
        let after = image::load_from_memory(&staged[0].bytes).unwrap();
        assert_eq!(after.dimensions(), (32, 16));
    }

    /// Quality 100 JPEG with an Exif block (orientation 6) after SOI.
    fn jpeg_with_exif() -> Vec<u8> {
        let img = RgbImage::from_fn(48, 32, |x, y| Rgb([(x * 5) as u8, (y * 7) as u8, 90]));
        let mut plain = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut plain, 100))
            .unwrap();

        // little-endian TIFF header with one IFD entry: Orientation = 6
        let mut tiff = b"II*\0\x08\0\0\0\x01\0".to_vec();
        tiff.extend_from_slice(&[0x12, 0x01, 3, 0, 1, 0, 0, 0, 6, 0, 0, 0, 0, 0, 0, 0]);
        let mut app1 = b"Exif\0\0".to_vec();
        app1.extend_from_slice(&tiff);

        let mut out = plain[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&app1);
        out.extend_from_slice(&plain[2..]);
        out
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = !0u32;
        for &byte in data {
            crc ^= u32::from(byte);
            for _ in 0..8 {
                crc = if crc & 1 == 1 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }

    /// Insert a chunk right after IHDR (signature 8 + IHDR 25 bytes).
    fn with_png_chunk(png: &[u8], kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut chunk = (data.len() as u32).to_be_bytes().to_vec();
        chunk.extend_from_slice(kind);
        chunk.extend_from_slice(data);
        let mut crc_input = kind.to_vec();
        crc_input.extend_from_slice(data);
        chunk.extend_from_slice(&crc32(&crc_input).to_be_bytes());

        let mut out = png[..33].to_vec();
        out.extend_from_slice(&chunk);
        out.extend_from_slice(&png[33..]);
        out
    }

    #[test]
    fn test_jpeg_with_exif_copied() {
        let dir = TempDir::new().unwrap();
        let original = jpeg_with_exif();
        assert!(jpeg_has_metadata(&original));
        let file = write_source(dir.path(), "rotated.jpg", &original);

        let staged = step().transform(&[file]).unwrap();
        assert_eq!(staged[0].bytes, original);
    }

    #[test]
    fn test_png_with_gamma_copied() {
        let dir = TempDir::new().unwrap();
        let original = with_png_chunk(&raw_png(64, 64), b"gAMA", &45455u32.to_be_bytes());
        assert!(png_has_metadata(&original));
        let file = write_source(dir.path(), "gamma.png", &original);

        let staged = step().transform(&[file]).unwrap();
        assert_eq!(staged[0].bytes, original);
    }

    #[test]
    fn test_metadata_scan_ignores_plain_files() {
        assert!(!png_has_metadata(&raw_png(8, 8)));
        let mut plain = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(8, 8))
            .write_with_encoder(JpegEncoder::new_with_quality(&mut plain, 80))
            .unwrap();
        assert!(!jpeg_has_metadata(&plain));
        assert!(!jpeg_has_metadata(b"\xFF\xD8"));
        assert!(!png_has_metadata(b"not a png"));
    }

    #[test]
    fn test_svg_minified() {
        let dir = TempDir::new().unwrap();
        let file = write_source(
            dir.path(),
            "logo.svg",
            b"<svg>\n  <!-- logo -->\n  <circle r=\"4\"/>\n</svg>\n",
        );
        let staged = step().transform(&[file]).unwrap();
        assert_eq!(staged[0].bytes, b"<svg><circle r=\"4\"/></svg>");
    }

    #[test]
    fn test_passthrough_untouched() {
        let dir = TempDir::new().unwrap();
        let manifest = br#"{ "name": "site",   "icons": [] }"#;
        let file = write_source(dir.path(), "site.webmanifest", manifest);
        let staged = step().transform(&[file]).unwrap();
        assert_eq!(staged[0].bytes, manifest);
    }

    #[test]
    fn test_gif_copied_unchanged() {
        let dir = TempDir::new().unwrap();
        // 1x1 GIF89a
        let gif = b"GIF89a\x01\0\x01\0\x80\0\0\0\0\0\xff\xff\xff!\xf9\x04\x01\0\0\0\0,\0\0\0\0\x01\0\x01\0\0\x02\x02D\x01\0;";
        let file = write_source(dir.path(), "spinner.gif", gif);
        let staged = step().transform(&[file]).unwrap();
        assert_eq!(staged[0].bytes, gif);
    }

    #[test]
    fn test_corrupt_png_names_file() {
        let dir = TempDir::new().unwrap();
        let file = write_source(dir.path(), "bad.png", b"not a png");
        let err = step().transform(&[file]).unwrap_err();
        assert!(matches!(err, StepError::Source { .. }));
        assert!(err.path().ends_with("bad.png"));
    }

    #[test]
    fn test_png_settings() {
        assert!(matches!(png_settings(0), (CompressionType::Fast, FilterType::NoFilter)));
        assert!(matches!(png_settings(5), (CompressionType::Best, _)));
        assert!(matches!(png_settings(7), (CompressionType::Best, _)));
    }
}
