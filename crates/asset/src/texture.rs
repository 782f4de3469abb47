//! Texture decoding and CPU-side preparation before GPU upload.
//!
//! An image is decoded at its native channel count, the count picks the
//! [`PixelFormat`], and a full box-filtered mip chain is built so the renderer
//! only has to copy bytes. Color bytes are treated as sRGB: the mip filter
//! averages them in linear space, and every format uploads as sRGB RGBA.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use image::GenericImageView;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode texture {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("texture {path:?} has unsupported channel count {channels}")]
    UnsupportedChannels { path: PathBuf, channels: u8 },
    #[error("texture {path:?} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("GPU texture allocation failed for {path:?}: {reason}")]
    Allocation { path: PathBuf, reason: String },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// 8-bit-per-channel layouts, one per supported channel count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(Self::R8),
            2 => Some(Self::Rg8),
            3 => Some(Self::Rgb8),
            4 => Some(Self::Rgba8),
            _ => None,
        }
    }

    pub fn channels(self) -> u8 {
        match self {
            Self::R8 => 1,
            Self::Rg8 => 2,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }

    /// Bytes per pixel as stored on the GPU. Every format is widened to RGBA there.
    #[inline]
    pub const fn upload_bytes_per_pixel(self) -> u32 {
        4
    }

    /// Index of the alpha channel within a pixel, if there is one.
    pub fn alpha_index(self) -> Option<usize> {
        match self {
            Self::Rg8 => Some(1),
            Self::Rgba8 => Some(3),
            Self::R8 | Self::Rgb8 => None,
        }
    }
}

/// Raw decoder output. Lives only until it has been turned into [`TextureData`].
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl DecodedImage {
    /// Decode `path` keeping its native channel count.
    /// Wider-than-8-bit samples are narrowed to 8 bits.
    pub fn open(path: impl AsRef<Path>, flip_vertically: bool) -> TextureResult<Self> {
        let path = path.as_ref();
        log::info!("Attempting to load texture {:?}", path);

        let img = image::open(path).map_err(|source| {
            log::error!("Texture failed to decode at {:?}: {}", path, source);
            TextureError::Decode {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let img = if flip_vertically { img.flipv() } else { img };

        let channels = img.color().channel_count();
        let (width, height) = img.dimensions();
        let data = match channels {
            1 => img.into_luma8().into_raw(),
            2 => img.into_luma_alpha8().into_raw(),
            3 => img.into_rgb8().into_raw(),
            4 => img.into_rgba8().into_raw(),
            _ => img.into_bytes(),
        };

        log::info!(
            "Decoded texture {:?}: {}x{}, {} channel(s)",
            path,
            width,
            height,
            channels
        );
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }
}

/// One level of a mip chain, tightly packed rows.
#[derive(Clone, Debug, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl MipLevel {
    /// Bytes ready for upload as RGBA. Gray is replicated into RGB, missing alpha is opaque.
    pub fn upload_bytes(&self, format: PixelFormat) -> Cow<'_, [u8]> {
        let widen: fn(&[u8]) -> [u8; 4] = match format {
            PixelFormat::Rgba8 => return Cow::Borrowed(&self.data),
            PixelFormat::R8 => |px| [px[0], px[0], px[0], u8::MAX],
            PixelFormat::Rg8 => |px| [px[0], px[0], px[0], px[1]],
            PixelFormat::Rgb8 => |px| [px[0], px[1], px[2], u8::MAX],
        };
        let channels = format.channels() as usize;
        Cow::Owned(
            self.data
                .chunks_exact(channels)
                .flat_map(widen)
                .collect(),
        )
    }
}

/// Decoded texture with its format and complete mip chain (level 0 first).
#[derive(Clone, Debug)]
pub struct TextureData {
    pub label: String,
    pub format: PixelFormat,
    pub mips: Vec<MipLevel>,
}

impl TextureData {
    /// Decode `path` and prepare it for upload.
    pub fn load(path: impl AsRef<Path>, flip_vertically: bool) -> TextureResult<Self> {
        let path = path.as_ref();
        let decoded = DecodedImage::open(path, flip_vertically)?;
        Self::from_decoded(path, decoded)
    }

    /// Pick the format from the channel count and build the mip chain.
    /// On an unsupported count or a buffer that does not match the declared
    /// size the decoded buffer is dropped here.
    pub fn from_decoded(path: impl AsRef<Path>, decoded: DecodedImage) -> TextureResult<Self> {
        let path = path.as_ref();
        let Some(format) = PixelFormat::from_channels(decoded.channels) else {
            log::error!(
                "Texture {:?} has unsupported number of components: {}",
                path,
                decoded.channels
            );
            return Err(TextureError::UnsupportedChannels {
                path: path.to_path_buf(),
                channels: decoded.channels,
            });
        };

        let expected = decoded.width as usize * decoded.height as usize * decoded.channels as usize;
        let reason = if decoded.width == 0 || decoded.height == 0 {
            Some(format!("empty image {}x{}", decoded.width, decoded.height))
        } else if decoded.data.len() != expected {
            Some(format!(
                "expected {} bytes for {}x{}x{}, got {}",
                expected,
                decoded.width,
                decoded.height,
                decoded.channels,
                decoded.data.len()
            ))
        } else {
            None
        };
        if let Some(reason) = reason {
            log::error!("Texture {:?} rejected: {}", path, reason);
            return Err(TextureError::Malformed {
                path: path.to_path_buf(),
                reason,
            });
        }

        let base = MipLevel {
            width: decoded.width,
            height: decoded.height,
            data: decoded.data,
        };
        Ok(Self {
            label: path.display().to_string(),
            format,
            mips: build_mip_chain(base, format),
        })
    }

    /// 1x1 RGBA texture of a single color.
    pub fn solid(label: &str, rgba: [u8; 4]) -> Self {
        Self {
            label: label.to_owned(),
            format: PixelFormat::Rgba8,
            mips: vec![MipLevel {
                width: 1,
                height: 1,
                data: rgba.to_vec(),
            }],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.mips[0].width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.mips[0].height
    }

    #[inline]
    pub fn mip_level_count(&self) -> u32 {
        self.mips.len() as u32
    }

    /// Every level has `width * height * channels` bytes and sizes halve down to 1x1.
    pub fn is_valid(&self) -> bool {
        let bpp = self.format.channels() as usize;
        let Some(base) = self.mips.first() else {
            return false;
        };
        base.width > 0
            && base.height > 0
            && self.mips.len() as u32 == mip_level_count(base.width, base.height)
            && self
                .mips
                .iter()
                .all(|m| m.data.len() == m.width as usize * m.height as usize * bpp)
    }
}

/// `floor(log2(max(w, h))) + 1`.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Base level followed by 2x2 box-filtered reductions down to 1x1.
/// `base.data` must hold `width * height * format.channels()` bytes.
pub fn build_mip_chain(base: MipLevel, format: PixelFormat) -> Vec<MipLevel> {
    let count = mip_level_count(base.width, base.height) as usize;
    let mut chain = Vec::with_capacity(count);
    chain.push(base);
    while chain.len() < count {
        let next = downsample(&chain[chain.len() - 1], format);
        chain.push(next);
    }
    chain
}

fn downsample(src: &MipLevel, format: PixelFormat) -> MipLevel {
    let channels = format.channels() as usize;
    let alpha = format.alpha_index();
    let width = (src.width / 2).max(1);
    let height = (src.height / 2).max(1);
    let (sw, sh) = (src.width as usize, src.height as usize);
    let mut data = Vec::with_capacity(width as usize * height as usize * channels);

    for y in 0..height as usize {
        let y0 = (y * 2).min(sh - 1);
        let y1 = (y * 2 + 1).min(sh - 1);
        for x in 0..width as usize {
            let x0 = (x * 2).min(sw - 1);
            let x1 = (x * 2 + 1).min(sw - 1);
            for c in 0..channels {
                let texel = |px: usize, py: usize| src.data[(py * sw + px) * channels + c];
                let quad = [texel(x0, y0), texel(x1, y0), texel(x0, y1), texel(x1, y1)];
                if alpha == Some(c) {
                    let sum: u32 = quad.iter().map(|&v| v as u32).sum();
                    data.push(((sum + 2) / 4) as u8);
                } else {
                    let sum: f32 = quad.iter().map(|&v| srgb_to_linear(v)).sum();
                    data.push(linear_to_srgb(sum / 4.0));
                }
            }
        }
    }

    MipLevel {
        width,
        height,
        data,
    }
}

fn srgb_to_linear(v: u8) -> f32 {
    let c = v as f32 / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let s = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (s * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ColorType;

    fn tmp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("courseview-{}-{}", std::process::id(), name))
    }

    fn write_png(name: &str, w: u32, h: u32, color: ColorType, data: &[u8]) -> PathBuf {
        let path = tmp_path(name);
        image::save_buffer(&path, data, w, h, color).expect("write test png");
        path
    }

    #[test]
    fn channel_count_maps_to_format() {
        assert_eq!(PixelFormat::from_channels(1), Some(PixelFormat::R8));
        assert_eq!(PixelFormat::from_channels(2), Some(PixelFormat::Rg8));
        assert_eq!(PixelFormat::from_channels(3), Some(PixelFormat::Rgb8));
        assert_eq!(PixelFormat::from_channels(4), Some(PixelFormat::Rgba8));
        assert_eq!(PixelFormat::from_channels(0), None);
        assert_eq!(PixelFormat::from_channels(5), None);
        assert_eq!(PixelFormat::Rgb8.upload_bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Rg8.upload_bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Rg8.alpha_index(), Some(1));
        assert_eq!(PixelFormat::Rgb8.alpha_index(), None);
    }

    #[test]
    fn loads_one_to_four_channel_pngs() {
        let cases = [
            ("l8.png", ColorType::L8, PixelFormat::R8),
            ("la8.png", ColorType::La8, PixelFormat::Rg8),
            ("rgb8.png", ColorType::Rgb8, PixelFormat::Rgb8),
            ("rgba8.png", ColorType::Rgba8, PixelFormat::Rgba8),
        ];
        for (name, color, expected) in cases {
            let channels = expected.channels() as usize;
            let data: Vec<u8> = (0..(8 * 4 * channels)).map(|i| i as u8).collect();
            let path = write_png(name, 8, 4, color, &data);

            let tex = TextureData::load(&path, false).expect("load png");
            assert_eq!(tex.format, expected, "{name}");
            assert_eq!((tex.width(), tex.height()), (8, 4));
            assert_eq!(tex.mip_level_count(), 4);
            assert_eq!(tex.mips[0].data, data);
            assert!(tex.is_valid());
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn sixteen_bit_keeps_channel_count() {
        let raw: Vec<u8> = vec![0x12, 0x34, 0xff, 0xff, 0x00, 0x00, 0x80, 0x00];
        let path = write_png("la16.png", 2, 1, ColorType::La16, &raw);
        let decoded = DecodedImage::open(&path, false).expect("decode 16-bit");
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.data.len(), 2 * 2);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn flip_reverses_rows() {
        let path = write_png("flip.png", 1, 2, ColorType::L8, &[10, 200]);
        let upright = DecodedImage::open(&path, false).unwrap();
        let flipped = DecodedImage::open(&path, true).unwrap();
        assert_eq!(upright.data, [10, 200]);
        assert_eq!(flipped.data, [200, 10]);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let path = tmp_path("corrupt.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = TextureData::load(&path, false).unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }), "{err}");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let err = TextureData::load(tmp_path("does-not-exist.png"), true).unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn five_channels_are_rejected() {
        let decoded = DecodedImage {
            width: 2,
            height: 2,
            channels: 5,
            data: vec![0; 20],
        };
        let err = TextureData::from_decoded("exotic.bin", decoded).unwrap_err();
        match err {
            TextureError::UnsupportedChannels { channels, path } => {
                assert_eq!(channels, 5);
                assert_eq!(path, PathBuf::from("exotic.bin"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_buffer_is_malformed() {
        let decoded = DecodedImage {
            width: 4,
            height: 4,
            channels: 1,
            data: vec![0; 3],
        };
        let err = TextureData::from_decoded("short.bin", decoded).unwrap_err();
        assert!(matches!(err, TextureError::Malformed { .. }), "{err}");
    }

    #[test]
    fn long_buffer_is_malformed() {
        let decoded = DecodedImage {
            width: 2,
            height: 2,
            channels: 3,
            data: vec![0; 2 * 2 * 3 + 1],
        };
        let err = TextureData::from_decoded("long.bin", decoded).unwrap_err();
        match err {
            TextureError::Malformed { path, reason } => {
                assert_eq!(path, PathBuf::from("long.bin"));
                assert!(reason.contains("expected 12 bytes"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_sized_image_is_malformed() {
        let decoded = DecodedImage {
            width: 0,
            height: 4,
            channels: 4,
            data: Vec::new(),
        };
        let err = TextureData::from_decoded("empty.bin", decoded).unwrap_err();
        assert!(matches!(err, TextureError::Malformed { .. }), "{err}");
    }

    #[test]
    fn mip_count_matches_largest_side() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 1), 2);
        assert_eq!(mip_level_count(3, 1), 2);
        assert_eq!(mip_level_count(256, 64), 9);
        assert_eq!(mip_level_count(1000, 7), 10);
    }

    #[test]
    fn box_filter_averages_color_in_linear_space() {
        let base = MipLevel {
            width: 2,
            height: 2,
            data: vec![0, 255, 0, 255],
        };
        let chain = build_mip_chain(base, PixelFormat::R8);
        assert_eq!(chain.len(), 2);
        assert_eq!((chain[1].width, chain[1].height), (1, 1));
        // Half linear intensity is ~188 in sRGB; a byte average would give 128.
        let v = chain[1].data[0];
        assert!((187..=189).contains(&v), "got {v}");
    }

    #[test]
    fn box_filter_averages_alpha_directly() {
        let base = MipLevel {
            width: 2,
            height: 2,
            data: vec![255, 0, 255, 255, 255, 0, 255, 255],
        };
        let chain = build_mip_chain(base, PixelFormat::Rg8);
        assert_eq!(chain[1].data, vec![255, 128]);
    }

    #[test]
    fn srgb_endpoints_survive_conversion() {
        for v in [0u8, 1, 10, 128, 200, 255] {
            assert_eq!(linear_to_srgb(srgb_to_linear(v)), v);
        }
    }

    #[test]
    fn chain_of_non_square_texture_shrinks_to_one_pixel() {
        let base = MipLevel {
            width: 5,
            height: 2,
            data: vec![255; 5 * 2 * 2],
        };
        let chain = build_mip_chain(base, PixelFormat::Rg8);
        let sizes: Vec<(u32, u32)> = chain.iter().map(|m| (m.width, m.height)).collect();
        assert_eq!(sizes, [(5, 2), (2, 1), (1, 1)]);
        assert!(chain.iter().all(|m| m.data.iter().all(|&b| b == 255)));
    }

    #[test]
    fn every_format_is_widened_to_rgba_for_upload() {
        let level = MipLevel {
            width: 2,
            height: 1,
            data: vec![1, 2, 3, 4, 5, 6],
        };
        assert_eq!(
            level.upload_bytes(PixelFormat::Rgb8).as_ref(),
            &[1, 2, 3, 255, 4, 5, 6, 255]
        );
        let gray = MipLevel { width: 2, height: 1, data: vec![128, 7] };
        assert_eq!(
            gray.upload_bytes(PixelFormat::R8).as_ref(),
            &[128, 128, 128, 255, 7, 7, 7, 255]
        );
        let gray_alpha = MipLevel { width: 1, height: 1, data: vec![128, 64] };
        assert_eq!(gray_alpha.upload_bytes(PixelFormat::Rg8).as_ref(), &[128, 128, 128, 64]);
        let rgba = MipLevel { width: 1, height: 1, data: vec![9, 8, 7, 6] };
        assert!(matches!(rgba.upload_bytes(PixelFormat::Rgba8), Cow::Borrowed(_)));
    }

    #[test]
    fn solid_texture_is_valid() {
        let tex = TextureData::solid("white", [255; 4]);
        assert!(tex.is_valid());
        assert_eq!(tex.mip_level_count(), 1);
    }
}
