//! Needs a GPU adapter. Run with `--features gpu-tests`; skips when none is found.
#![cfg(feature = "gpu-tests")]

use std::path::PathBuf;

use asset::texture::{DecodedImage, MipLevel, PixelFormat, TextureData, TextureError};
use renderer::texture::{GpuTexture, TEXTURE_FORMAT, load_texture};

fn gpu() -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok()?;
        adapter.request_device(&Default::default()).await.ok()
    })
}

fn tmp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("courseview-gpu-{}-{}", std::process::id(), name))
}

#[test]
fn uploads_every_supported_channel_count() {
    let Some((device, queue)) = gpu() else {
        eprintln!("no GPU adapter, skipping");
        return;
    };
    for channels in 1..=4u8 {
        let decoded = DecodedImage {
            width: 16,
            height: 8,
            channels,
            data: vec![200; 16 * 8 * channels as usize],
        };
        let data = TextureData::from_decoded("synthetic", decoded).unwrap();
        let tex = GpuTexture::upload(&device, &queue, &data).expect("upload");
        assert_eq!(tex.format, PixelFormat::from_channels(channels).unwrap());
        assert_eq!(tex.texture.format(), TEXTURE_FORMAT);
        assert_eq!(tex.mip_level_count(), 5);
        assert_eq!(tex.texture.width(), 16);
    }
}

#[test]
fn loads_png_from_disk() {
    let Some((device, queue)) = gpu() else {
        return;
    };
    let path = tmp_path("rgb.png");
    image::save_buffer(&path, &[9u8; 4 * 4 * 3], 4, 4, image::ColorType::Rgb8).unwrap();
    let tex = load_texture(&device, &queue, &path, true).expect("load");
    assert_eq!(tex.texture.format(), wgpu::TextureFormat::Rgba8UnormSrgb);
    assert_eq!(tex.mip_level_count(), 3);
    let _ = std::fs::remove_file(path);
}

#[test]
fn undecodable_file_fails_before_allocation() {
    let Some((device, queue)) = gpu() else {
        return;
    };
    let err = load_texture(&device, &queue, tmp_path("missing.png"), false).unwrap_err();
    assert!(matches!(err, TextureError::Decode { .. }));
}

#[test]
fn oversized_texture_is_an_allocation_error() {
    let Some((device, queue)) = gpu() else {
        return;
    };
    let side = device.limits().max_texture_dimension_2d + 1;
    let data = TextureData::from_decoded(
        "huge",
        DecodedImage {
            width: side,
            height: 1,
            channels: 1,
            data: vec![0; side as usize],
        },
    )
    .unwrap();
    let err = GpuTexture::upload(&device, &queue, &data).unwrap_err();
    assert!(matches!(err, TextureError::Allocation { .. }), "{err}");
}

#[test]
fn mismatched_level_size_is_rejected_before_allocation() {
    let Some((device, queue)) = gpu() else {
        return;
    };
    let data = TextureData {
        label: "oversized level".to_owned(),
        format: PixelFormat::Rgba8,
        mips: vec![MipLevel {
            width: 1,
            height: 1,
            data: vec![0; 8],
        }],
    };
    let err = GpuTexture::upload(&device, &queue, &data).unwrap_err();
    assert!(matches!(err, TextureError::Malformed { .. }), "{err}");
}
