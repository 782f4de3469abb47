//! Command-line flags.
//!
//! Accepted:
//! `--gpu-backend=auto|vulkan|dx12|metal|gl`, `--size=WxH`, `--width=N`, `--height=N`,
//! `--assets=DIR`, `--shader=PATH`, `--show-fps[=on|off]`.

use std::path::PathBuf;

use platform::ViewerConfig;

fn parse_backend(val: &str) -> wgpu::Backends {
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{}', falling back to auto.", other);
            wgpu::Backends::all()
        }
    }
}

fn parse_size(val: &str) -> Option<(u32, u32)> {
    let (w, h) = val.split_once('x').or_else(|| val.split_once('X'))?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

fn non_empty_path(val: &str) -> Option<PathBuf> {
    (!val.is_empty()).then(|| PathBuf::from(val))
}

/// Later flags override earlier ones; unparsable values are ignored.
pub fn from_args(args: &[String]) -> ViewerConfig {
    let mut cfg = ViewerConfig::default();
    for arg in args {
        let (flag, val) = match arg.split_once('=') {
            Some((flag, val)) => (flag, Some(val)),
            None => (arg.as_str(), None),
        };
        match (flag, val) {
            ("--gpu-backend", Some(v)) => cfg.backends = parse_backend(v),
            ("--size", Some(v)) => match parse_size(v) {
                Some((w, h)) => (cfg.width, cfg.height) = (w, h),
                None => log::warn!("Ignoring malformed --size={}", v),
            },
            ("--width", Some(v)) => cfg.width = v.parse().unwrap_or(cfg.width),
            ("--height", Some(v)) => cfg.height = v.parse().unwrap_or(cfg.height),
            ("--assets", Some(v)) => {
                if let Some(dir) = non_empty_path(v) {
                    cfg.assets_dir = dir;
                }
            }
            ("--shader", Some(v)) => cfg.shader_path = non_empty_path(v).or(cfg.shader_path),
            ("--show-fps", None) => cfg.show_fps = true,
            ("--show-fps", Some(v)) => {
                cfg.show_fps = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes")
            }
            _ => {}
        }
    }
    cfg.width = cfg.width.max(1);
    cfg.height = cfg.height.max(1);
    cfg
}
