//! Renderer: wgpu init, depth, lit textured models drawn per scene instance.
//! wgpu = 26.x, winit = 0.30.x

pub mod model;
pub mod texture;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use bytemuck::{Pod, Zeroable};
use corelib::{Mat4, camera::Camera, light::PointLight, scene::ModelId, scene::Scene};
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device, DeviceDescriptor,
    ErrorFilter, Features, FragmentState, Instance, InstanceDescriptor, Limits, LoadOp,
    Operations, PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    SamplerBindingType, ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface,
    SurfaceConfiguration, SurfaceError, TextureSampleType, TextureUsages, TextureView,
    TextureViewDimension, VertexState,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::model::{GpuModel, ModelVertex};
use crate::texture::{DEPTH_FORMAT, GpuTexture, create_depth_view};

/// Shader used when no override is given.
pub const DEFAULT_SHADER: &str = include_str!("shaders/scene.wgsl");

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

/// Per-frame UBO (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FrameUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    light_pos: [f32; 4],
    light_color: [f32; 4],
    view_pos: [f32; 4],
}

impl FrameUniform {
    fn new(camera: &Camera, light: &PointLight, width: u32, height: u32) -> Self {
        Self {
            view: camera.view().to_cols_array_2d(),
            projection: camera.proj(width, height).to_cols_array_2d(),
            light_pos: light.position.extend(1.0).to_array(),
            light_color: light.color.extend(1.0).to_array(),
            view_pos: camera.position.extend(1.0).to_array(),
        }
    }
}

/// Per-instance UBO.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
}

struct ObjectSlot {
    buf: Buffer,
    bg: BindGroup,
}

pub struct Renderer {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    pipeline: RenderPipeline,

    frame_buf: Buffer,
    frame_bg: BindGroup,
    object_bgl: BindGroupLayout,
    material_bgl: BindGroupLayout,
    objects: Vec<ObjectSlot>,

    models: Vec<GpuModel>,

    depth_view: TextureView,

    width: u32,
    height: u32,
}

impl Renderer {
    /// Create the GPU context for `window` and build the scene pipeline from `shader_src`.
    /// Every failure here is fatal for the application.
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        shader_src: &str,
    ) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        let info = adapter.get_info();
        log::info!("Using adapter '{}' ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Courseview Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, width, height);

        // ==== Bind group layouts ====
        let frame_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Frame BGL"),
            entries: &[uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT)],
        });
        let object_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Object BGL"),
            entries: &[uniform_entry(0, ShaderStages::VERTEX)],
        });
        let material_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let frame_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame UBO"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame BG"),
            layout: &frame_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buf.as_entire_binding(),
            }],
        });

        // ==== Shader & pipeline ====
        device.push_error_scope(ErrorFilter::Validation);
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Scene WGSL"),
            source: ShaderSource::Wgsl(shader_src.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Scene PipelineLayout"),
            bind_group_layouts: &[&frame_bgl, &object_bgl, &material_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[ModelVertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // Both faces are drawn.
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        if let Some(err) = device.pop_error_scope().await {
            bail!("Failed to build shader program: {err}");
        }
        log::info!("Shader program ready ({:?} surface)", surface_format);

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            frame_buf,
            frame_bg,
            object_bgl,
            material_bgl,
            objects: Vec::new(),
            models: Vec::new(),
            depth_view,
            width,
            height,
        })
    }

    /// Load an OBJ and its diffuse texture.
    /// A texture that fails to load degrades to white; a bad mesh is an error.
    pub fn load_model(&mut self, mesh_path: &Path, texture_path: &Path) -> Result<ModelId> {
        let mesh = asset::obj::load_obj_from_path(mesh_path)?;
        if !mesh.is_valid() {
            bail!("Model {} has no drawable geometry", mesh_path.display());
        }

        let texture = match texture::load_texture(&self.device, &self.queue, texture_path, true) {
            Ok(tex) => tex,
            Err(err) => {
                log::warn!("{err}; drawing {} untextured", mesh_path.display());
                GpuTexture::white(&self.device, &self.queue)?
            }
        };

        let label = mesh_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| mesh_path.display().to_string());
        let id = ModelId(self.models.len() as u32);
        self.models.push(GpuModel::new(
            &self.device,
            &self.material_bgl,
            &label,
            &mesh,
            texture,
        ));
        Ok(id)
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, self.width, self.height);
    }

    /// Render one frame: upload uniforms, clear, draw every scene instance.
    pub fn render(
        &mut self,
        camera: &Camera,
        light: &PointLight,
        scene: &Scene,
    ) -> Result<(), SurfaceError> {
        let frame_u = FrameUniform::new(camera, light, self.width, self.height);
        self.queue
            .write_buffer(&self.frame_buf, 0, bytemuck::bytes_of(&frame_u));

        self.ensure_object_slots(scene.len());
        for (slot, inst) in self.objects.iter().zip(scene.instances()) {
            let object_u = ObjectUniform {
                model: inst.transform.matrix().to_cols_array_2d(),
                normal: Mat4::from_mat3(inst.transform.normal_matrix()).to_cols_array_2d(),
            };
            self.queue
                .write_buffer(&slot.buf, 0, bytemuck::bytes_of(&object_u));
        }

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.frame_bg, &[]);
            for (slot, inst) in self.objects.iter().zip(scene.instances()) {
                let Some(model) = self.models.get(inst.model.0 as usize) else {
                    log::debug!("Instance refers to unknown model {:?}", inst.model);
                    continue;
                };
                rpass.set_bind_group(1, &slot.bg, &[]);
                model.draw(&mut rpass);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }

    fn ensure_object_slots(&mut self, count: usize) {
        while self.objects.len() < count {
            let idx = self.objects.len();
            let buf = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Object UBO {idx}")),
                size: std::mem::size_of::<ObjectUniform>() as u64,
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bg = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Object BG {idx}")),
                layout: &self.object_bgl,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buf.as_entire_binding(),
                }],
            });
            self.objects.push(ObjectSlot { buf, bg });
        }
    }
}

fn uniform_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
