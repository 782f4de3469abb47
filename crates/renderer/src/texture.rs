//! GPU-side textures: upload of prepared [`TextureData`] and the path-based loader.

use std::path::{Path, PathBuf};

use asset::texture::{PixelFormat, TextureData, TextureError, TextureResult};
use wgpu::{
    AddressMode, Device, ErrorFilter, Extent3d, FilterMode, Origin3d, Queue, Sampler,
    SamplerDescriptor, TexelCopyBufferLayout, TexelCopyTextureInfo, Texture, TextureAspect,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Storage for every [`PixelFormat`]. Gray and RGB are widened on upload so all
/// textures decode from sRGB the same way.
pub const TEXTURE_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

/// Sampled 2D texture with its full mip chain. Releases the GPU memory on drop.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: Texture,
    pub view: TextureView,
    pub sampler: Sampler,
    pub format: PixelFormat,
}

impl GpuTexture {
    /// Allocate, upload every mip level and attach a trilinear repeating sampler.
    pub fn upload(device: &Device, queue: &Queue, data: &TextureData) -> TextureResult<Self> {
        if !data.is_valid() {
            log::error!("Refusing to upload malformed texture '{}'", data.label);
            return Err(TextureError::Malformed {
                path: PathBuf::from(&data.label),
                reason: "mip chain does not match its declared sizes".to_owned(),
            });
        }

        let size = Extent3d {
            width: data.width(),
            height: data.height(),
            depth_or_array_layers: 1,
        };

        device.push_error_scope(ErrorFilter::OutOfMemory);
        device.push_error_scope(ErrorFilter::Validation);
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(&data.label),
            size,
            mip_level_count: data.mip_level_count(),
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let bpp = data.format.upload_bytes_per_pixel();
        for (level, mip) in data.mips.iter().enumerate() {
            let bytes = mip.upload_bytes(data.format);
            queue.write_texture(
                TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: Origin3d::ZERO,
                    aspect: TextureAspect::All,
                },
                &bytes,
                // Rows are tightly packed; write_texture needs no 256-byte padding.
                TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(mip.width * bpp),
                    rows_per_image: Some(mip.height),
                },
                Extent3d {
                    width: mip.width,
                    height: mip.height,
                    depth_or_array_layers: 1,
                },
            );
        }
        let invalid = pollster::block_on(device.pop_error_scope());
        let oom = pollster::block_on(device.pop_error_scope());
        if let Some(err) = invalid.or(oom) {
            texture.destroy();
            log::error!("Failed to allocate or fill GPU texture for '{}': {}", data.label, err);
            return Err(TextureError::Allocation {
                path: PathBuf::from(&data.label),
                reason: err.to_string(),
            });
        }

        let view = texture.create_view(&TextureViewDescriptor::default());
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some(&data.label),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Linear,
            ..Default::default()
        });

        log::info!(
            "Configured texture '{}': {}x{} {:?}, {} mip level(s)",
            data.label,
            size.width,
            size.height,
            data.format,
            data.mip_level_count()
        );
        Ok(Self {
            texture,
            view,
            sampler,
            format: data.format,
        })
    }

    /// Opaque white, used by models whose own texture failed to load.
    pub fn white(device: &Device, queue: &Queue) -> TextureResult<Self> {
        Self::upload(device, queue, &TextureData::solid("white fallback", [255; 4]))
    }

    #[inline]
    pub fn mip_level_count(&self) -> u32 {
        self.texture.mip_level_count()
    }
}

/// Decode `path` and upload it. Nothing is left allocated on failure.
pub fn load_texture(
    device: &Device,
    queue: &Queue,
    path: impl AsRef<Path>,
    flip_vertically: bool,
) -> TextureResult<GpuTexture> {
    let data = TextureData::load(path, flip_vertically)?;
    GpuTexture::upload(device, queue, &data)
}

/// Depth attachment sized to the surface.
pub fn create_depth_view(device: &Device, width: u32, height: u32) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
