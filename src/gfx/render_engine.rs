//! wgpu rendering engine
//!
//! Implements [`RenderBackend`] on top of wgpu. The core drives it like an
//! immediate-mode API; the engine records the calls into one pending pass per
//! target and turns each into a real render pass when the target changes, a
//! pixel is read back, the GUI overlay is drawn or the frame is presented.
//!
//! Per-draw state lives in a dynamic-offset uniform buffer, one 256-byte slot
//! per submitted draw. Camera and light matrices live in a global uniform
//! written once per pass. Changing a global after draws were recorded closes
//! the pass and continues in a new one, so every draw sees the state it was
//! submitted with.

use std::{collections::HashMap, num::NonZeroU64, sync::Arc};

use cgmath::{Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    config::EditorConfig,
    error::{EditorError, Result},
    geometry::MeshData,
    render::{
        uniforms, validate_rgba, ClearValue, MeshHandle, RenderBackend, RowOrder, TargetId,
        TextureId, TextureSlot, UniformValue,
    },
};

use super::{
    pipeline_manager::{PipelineConfig, PipelineManager},
    texture_resource::{MaterialKey, TextureResource},
};

const SHADOW_PIPELINE: &str = "Shadow";
const PICK_PIPELINE: &str = "Pick";
const PBR_PIPELINE: &str = "PBR";
const WIREFRAME_PIPELINE: &str = "PBR Wireframe";

/// Byte distance between per-draw uniform slots. Matches the default offset alignment.
const DRAW_STRIDE: u64 = 256;
const INITIAL_DRAW_CAPACITY: usize = 64;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct GlobalUniform {
    view_proj: [[f32; 4]; 4],
    light_space: [[f32; 4]; 4],
    view_pos: [f32; 4],
    light_pos: [f32; 4],
}

impl Default for GlobalUniform {
    fn default() -> Self {
        Self {
            view_proj: Matrix4::<f32>::identity().into(),
            light_space: Matrix4::<f32>::identity().into(),
            view_pos: [0.0, 0.0, 0.0, 1.0],
            light_pos: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Per-draw uniform block. Exactly one [`DRAW_STRIDE`] slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    pick_color: [f32; 4],
    base_color: [f32; 4],
    emissive: [f32; 4],
    reflectance: [f32; 4],
    /// roughness, metalness, opacity, is_picked
    params: [f32; 4],
    tex_scale: [f32; 4],
    _padding: [[f32; 4]; 2],
}

impl Default for DrawUniform {
    fn default() -> Self {
        Self {
            model: Matrix4::<f32>::identity().into(),
            normal_matrix: Matrix4::<f32>::identity().into(),
            pick_color: [1.0; 4],
            base_color: [1.0; 4],
            emissive: [0.0, 0.0, 0.0, 1.0],
            reflectance: [1.0; 4],
            params: [0.5, 0.0, 1.0, 0.0],
            tex_scale: [1.0, 1.0, 0.0, 0.0],
            _padding: [[0.0; 4]; 2],
        }
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

#[derive(Debug, Clone, Copy)]
struct RecordedDraw {
    mesh: u64,
    index_count: u32,
    textures: MaterialKey,
}

/// Calls recorded against one target, not yet encoded.
struct PendingPass {
    target: TargetId,
    clear: Option<ClearValue>,
    draws: Vec<RecordedDraw>,
    uniforms: Vec<DrawUniform>,
}

impl PendingPass {
    fn new(target: TargetId) -> Self {
        Self {
            target,
            clear: None,
            draws: Vec::new(),
            uniforms: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.clear.is_none() && self.draws.is_empty()
    }
}

pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    format: wgpu::TextureFormat,
    present_modes: Vec<wgpu::PresentMode>,
    adapter_name: String,
    pipeline_manager: PipelineManager,

    depth_texture: TextureResource,
    pick_target: TextureResource,
    pick_depth: TextureResource,
    shadow_map: TextureResource,
    readback_buffer: wgpu::Buffer,

    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    draw_layout: wgpu::BindGroupLayout,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_capacity: usize,
    material_layout: wgpu::BindGroupLayout,
    material_bind_groups: HashMap<MaterialKey, wgpu::BindGroup>,
    shadow_bind_group: wgpu::BindGroup,
    fallback_texture: TextureResource,

    meshes: HashMap<u64, GpuMesh>,
    next_mesh_id: u64,
    textures: Vec<TextureResource>,

    globals: GlobalUniform,
    current: DrawUniform,
    bound_textures: MaterialKey,
    pass: Option<PendingPass>,
    frame: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,

    wireframe: bool,
}

impl RenderEngine {
    /// Creates the device, surface, targets and pipelines for `window`.
    ///
    /// Fails when no adapter or device is available, the surface cannot be
    /// created or a pipeline does not validate.
    pub async fn new(window: Arc<Window>, editor_config: &EditorConfig) -> Result<Self> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let info = adapter.get_info();
        log::info!("Using adapter '{}' ({:?})", info.name, info.backend);

        let wireframe_supported = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        let required_features = if wireframe_supported {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            log::info!("Adapter lacks line polygon mode; wireframe view disabled");
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Editor Device"),
                required_features,
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or(EditorError::SurfaceUnsupported)?;
        let present_modes = capabilities.present_modes.clone();

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: present_mode(editor_config.vsync, &present_modes),
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!("Surface {:?} at {}x{}", format, width, height);

        let depth_texture = TextureResource::create_depth_texture(&device, width, height, "Depth Texture");
        let pick_target = TextureResource::create_pick_target(&device, width, height);
        let pick_depth = TextureResource::create_depth_texture(&device, width, height, "Picking Depth");
        let shadow_map = TextureResource::create_shadow_map(&device, editor_config.shadow_map_size);

        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pick Readback Buffer"),
            size: wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let global_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Global Layout"),
            entries: &[uniform_entry(0, false)],
        });
        let global_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Global Uniform Buffer"),
            contents: bytemuck::bytes_of(&GlobalUniform::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global Bind Group"),
            layout: &global_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: global_buffer.as_entire_binding(),
            }],
        });

        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Layout"),
            entries: &[uniform_entry(0, true)],
        });
        let (draw_buffer, draw_bind_group) =
            create_draw_buffer(&device, &draw_layout, INITIAL_DRAW_CAPACITY);

        let mut material_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..TextureSlot::ALL.len() as u32)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            })
            .collect();
        material_entries.push(wgpu::BindGroupLayoutEntry {
            binding: TextureSlot::ALL.len() as u32,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Layout"),
            entries: &material_entries,
        });

        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Depth,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Bind Group"),
            layout: &shadow_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
                },
            ],
        });

        let fallback_texture =
            TextureResource::from_rgba(&device, &queue, "Fallback Texture", 1, 1, &[255; 4]);

        let mut pipeline_manager = PipelineManager::new(device.clone());
        pipeline_manager.load_shader("shadow", include_str!("shaders/shadow.wgsl"));
        pipeline_manager.load_shader("pick", include_str!("shaders/pick.wgsl"));
        pipeline_manager.load_shader("pbr", include_str!("shaders/pbr.wgsl"));

        // Both faces cast shadows; the slope bias keeps lit faces from self-shadowing.
        pipeline_manager.register_pipeline(
            SHADOW_PIPELINE,
            PipelineConfig::default()
                .with_label("SHADOW")
                .with_shader("shadow")
                .with_bind_group_layouts(vec![global_layout.clone(), draw_layout.clone()])
                .with_cull_mode(None)
                .with_depth(TextureResource::DEPTH_FORMAT)
                .with_depth_bias(wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                })
                .with_vertex_only(),
        );

        pipeline_manager.register_pipeline(
            PICK_PIPELINE,
            PipelineConfig::default()
                .with_label("PICK")
                .with_shader("pick")
                .with_bind_group_layouts(vec![global_layout.clone(), draw_layout.clone()])
                .with_depth(TextureResource::DEPTH_FORMAT)
                .with_color_target(TextureResource::PICK_FORMAT, None),
        );

        let shaded = PipelineConfig::default()
            .with_label("PBR")
            .with_shader("pbr")
            .with_bind_group_layouts(vec![
                global_layout,
                draw_layout.clone(),
                material_layout.clone(),
                shadow_layout,
            ])
            .with_depth(TextureResource::DEPTH_FORMAT)
            .with_color_target(format, Some(wgpu::BlendState::ALPHA_BLENDING));
        if wireframe_supported {
            pipeline_manager.register_pipeline(
                WIREFRAME_PIPELINE,
                shaded
                    .clone()
                    .with_label("PBR WIREFRAME")
                    .with_cull_mode(None)
                    .with_polygon_mode(wgpu::PolygonMode::Line),
            );
        }
        pipeline_manager.register_pipeline(PBR_PIPELINE, shaded);

        pipeline_manager.create_all_pipelines()?;

        Ok(Self {
            surface,
            device,
            queue,
            config,
            format,
            present_modes,
            adapter_name: info.name,
            pipeline_manager,
            depth_texture,
            pick_target,
            pick_depth,
            shadow_map,
            readback_buffer,
            global_buffer,
            global_bind_group,
            draw_layout,
            draw_buffer,
            draw_bind_group,
            draw_capacity: INITIAL_DRAW_CAPACITY,
            material_layout,
            material_bind_groups: HashMap::new(),
            shadow_bind_group,
            fallback_texture,
            meshes: HashMap::new(),
            next_mesh_id: 1,
            textures: Vec::new(),
            globals: GlobalUniform::default(),
            current: DrawUniform::default(),
            bound_textures: [None; 6],
            pass: None,
            frame: None,
            wireframe: false,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn vsync(&self) -> bool {
        self.config.present_mode == wgpu::PresentMode::Fifo
    }

    /// Switches between `Fifo` and `Immediate` presentation.
    ///
    /// Falls back to `Fifo` when the surface cannot present immediately.
    pub fn set_vsync(&mut self, enabled: bool) {
        let mode = present_mode(enabled, &self.present_modes);
        if mode == self.config.present_mode {
            return;
        }
        self.frame = None;
        self.config.present_mode = mode;
        self.surface.configure(&self.device, &self.config);
        log::info!("Present mode {:?}", mode);
    }

    pub fn wireframe_supported(&self) -> bool {
        self.pipeline_manager.has_pipeline(WIREFRAME_PIPELINE)
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    /// Draws the main pass as lines. Returns the state actually in effect.
    pub fn set_wireframe(&mut self, enabled: bool) -> bool {
        if enabled && !self.wireframe_supported() {
            log::warn!("Wireframe requested but not supported by this adapter");
            self.wireframe = false;
        } else {
            self.wireframe = enabled;
        }
        self.wireframe
    }

    /// Records `draw` on top of the current frame, after every pending pass.
    ///
    /// Used for the GUI. Does nothing when no surface texture could be acquired.
    pub fn render_overlay<F>(&mut self, draw: F)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        self.flush();
        if !self.acquire_frame() {
            return;
        }
        let Some((_, view)) = self.frame.as_ref() else {
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Overlay Encoder"),
            });
        draw(self.device.as_ref(), self.queue.as_ref(), &mut encoder, view);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Flushes pending work and shows the frame.
    pub fn present(&mut self) {
        self.flush();
        if let Some((texture, _)) = self.frame.take() {
            texture.present();
        }
    }

    fn acquire_frame(&mut self) -> bool {
        if self.frame.is_some() {
            return true;
        }
        match self.surface.get_current_texture() {
            Ok(texture) => {
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.frame = Some((texture, view));
                true
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                false
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::debug!("Timed out acquiring the surface texture");
                false
            }
            Err(e) => {
                log::warn!("Failed to acquire the surface texture: {}", e);
                false
            }
        }
    }

    fn pass_mut(&mut self) -> &mut PendingPass {
        self.pass.get_or_insert_with(|| PendingPass::new(TargetId::Main))
    }

    /// Encodes the pending pass and reopens the same target with its contents loaded.
    fn split_pass(&mut self) {
        if let Some(target) = self.pass.as_ref().map(|p| p.target) {
            self.flush();
            self.pass = Some(PendingPass::new(target));
        }
    }

    fn set_global(&mut self, update: impl FnOnce(&mut GlobalUniform)) {
        if self.pass.as_ref().is_some_and(|p| !p.draws.is_empty()) {
            self.split_pass();
        }
        update(&mut self.globals);
    }

    fn flush(&mut self) {
        let Some(pass) = self.pass.take() else {
            return;
        };
        if pass.is_empty() {
            return;
        }
        if pass.target == TargetId::Main {
            if !self.acquire_frame() {
                return;
            }
            for draw in &pass.draws {
                self.ensure_material_bind_group(draw.textures);
            }
        }
        self.ensure_draw_capacity(pass.uniforms.len());

        self.queue
            .write_buffer(&self.global_buffer, 0, bytemuck::bytes_of(&self.globals));
        if !pass.uniforms.is_empty() {
            self.queue
                .write_buffer(&self.draw_buffer, 0, bytemuck::cast_slice(&pass.uniforms));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(pass_label(pass.target)),
            });
        self.encode_pass(&mut encoder, &pass);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, pass: &PendingPass) {
        let (color_clear, depth_clear) = split_clear(pass.clear);

        let (color_view, depth_view, pipeline_name) = match pass.target {
            TargetId::Shadow => (None, &self.shadow_map.view, SHADOW_PIPELINE),
            TargetId::Picking => (Some(&self.pick_target.view), &self.pick_depth.view, PICK_PIPELINE),
            TargetId::Main => {
                let Some((_, view)) = self.frame.as_ref() else {
                    return;
                };
                let pipeline = if self.wireframe && self.wireframe_supported() {
                    WIREFRAME_PIPELINE
                } else {
                    PBR_PIPELINE
                };
                (Some(view), &self.depth_texture.view, pipeline)
            }
        };
        let Some(pipeline) = self.pipeline_manager.get_pipeline(pipeline_name) else {
            log::warn!("Pipeline '{}' missing, skipping pass", pipeline_name);
            return;
        };

        let color_attachment = color_view.map(|view| wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: color_clear.map_or(wgpu::LoadOp::Load, |c| {
                    wgpu::LoadOp::Clear(wgpu::Color {
                        r: c[0],
                        g: c[1],
                        b: c[2],
                        a: c[3],
                    })
                }),
                store: wgpu::StoreOp::Store,
            },
        });
        let color_attachments: &[Option<wgpu::RenderPassColorAttachment>] = match color_attachment {
            Some(_) => std::slice::from_ref(&color_attachment),
            None => &[],
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass_label(pass.target)),
            color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.global_bind_group, &[]);
        if pass.target == TargetId::Main {
            render_pass.set_bind_group(3, &self.shadow_bind_group, &[]);
        }

        for (slot, draw) in pass.draws.iter().enumerate() {
            let Some(mesh) = self.meshes.get(&draw.mesh) else {
                log::debug!("Skipping draw of released mesh {}", draw.mesh);
                continue;
            };
            if pass.target == TargetId::Main {
                let Some(material) = self.material_bind_groups.get(&draw.textures) else {
                    continue;
                };
                render_pass.set_bind_group(2, material, &[]);
            }
            let offset = (slot as u64 * DRAW_STRIDE) as u32;
            render_pass.set_bind_group(1, &self.draw_bind_group, &[offset]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..draw.index_count.min(mesh.index_count), 0, 0..1);
        }
    }

    fn ensure_draw_capacity(&mut self, draws: usize) {
        if draws <= self.draw_capacity {
            return;
        }
        let capacity = draws.next_power_of_two();
        let (buffer, bind_group) = create_draw_buffer(&self.device, &self.draw_layout, capacity);
        self.draw_buffer = buffer;
        self.draw_bind_group = bind_group;
        self.draw_capacity = capacity;
        log::debug!("Draw uniform buffer grown to {} slots", capacity);
    }

    fn ensure_material_bind_group(&mut self, key: MaterialKey) {
        if self.material_bind_groups.contains_key(&key) {
            return;
        }

        let bind_group = {
            let resources: Vec<&TextureResource> = key
                .iter()
                .map(|id| {
                    id.and_then(|id| self.textures.get(id.0 as usize))
                        .unwrap_or(&self.fallback_texture)
                })
                .collect();

            let mut entries: Vec<wgpu::BindGroupEntry> = resources
                .iter()
                .enumerate()
                .map(|(binding, texture)| wgpu::BindGroupEntry {
                    binding: binding as u32,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                })
                .collect();
            entries.push(wgpu::BindGroupEntry {
                binding: resources.len() as u32,
                resource: wgpu::BindingResource::Sampler(&resources[TextureSlot::Albedo.index()].sampler),
            });

            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material Bind Group"),
                layout: &self.material_layout,
                entries: &entries,
            })
        };
        self.material_bind_groups.insert(key, bind_group);
    }
}

impl RenderBackend for RenderEngine {
    fn viewport_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == self.viewport_size() {
            return;
        }

        self.pass = None;
        self.frame = None;
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture = TextureResource::create_depth_texture(&self.device, width, height, "Depth Texture");
        self.pick_target = TextureResource::create_pick_target(&self.device, width, height);
        self.pick_depth = TextureResource::create_depth_texture(&self.device, width, height, "Picking Depth");
        log::info!("Resized to {}x{}", width, height);
    }

    fn row_order(&self) -> RowOrder {
        RowOrder::TopDown
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let id = self.next_mesh_id;
        self.next_mesh_id += 1;
        self.meshes.insert(
            id,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: mesh.index_count(),
            },
        );
        MeshHandle::new(id, mesh.index_count())
    }

    fn release_mesh(&mut self, mesh: MeshHandle) {
        if self.meshes.remove(&mesh.id()).is_none() {
            log::warn!("Released unknown mesh {}", mesh.id());
        }
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> Result<TextureId> {
        validate_rgba(label, width, height, rgba)?;
        let texture = TextureResource::from_rgba(&self.device, &self.queue, label, width, height, rgba);
        self.textures.push(texture);
        log::debug!("Uploaded texture '{}' ({}x{})", label, width, height);
        Ok(TextureId(self.textures.len() as u32 - 1))
    }

    fn bind_target(&mut self, target: TargetId) {
        if self.pass.as_ref().is_some_and(|p| p.target == target) {
            return;
        }
        self.flush();
        self.pass = Some(PendingPass::new(target));
    }

    fn clear(&mut self, value: ClearValue) {
        if self.pass.as_ref().is_some_and(|p| !p.draws.is_empty()) {
            self.split_pass();
        }
        let pass = self.pass_mut();
        pass.clear = Some(merge_clear(pass.clear, value));
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        match (name, value) {
            (uniforms::VIEW_PROJ, UniformValue::Mat4(m)) => self.set_global(|g| g.view_proj = m.into()),
            (uniforms::LIGHT_SPACE, UniformValue::Mat4(m)) => self.set_global(|g| g.light_space = m.into()),
            (uniforms::VIEW_POS, UniformValue::Vec3(v)) => {
                self.set_global(|g| g.view_pos = [v.x, v.y, v.z, 1.0])
            }
            (uniforms::LIGHT_POS, UniformValue::Vec3(v)) => {
                self.set_global(|g| g.light_pos = [v.x, v.y, v.z, 1.0])
            }
            (uniforms::MODEL, UniformValue::Mat4(m)) => self.current.model = m.into(),
            (uniforms::NORMAL_MATRIX, UniformValue::Mat4(m)) => self.current.normal_matrix = m.into(),
            (uniforms::PICK_COLOR, UniformValue::Vec4(c)) => self.current.pick_color = c,
            (uniforms::BASE_COLOR, UniformValue::Vec3(c)) => self.current.base_color = [c.x, c.y, c.z, 1.0],
            (uniforms::EMISSIVE, UniformValue::Vec3(c)) => self.current.emissive = [c.x, c.y, c.z, 1.0],
            (uniforms::REFLECTANCE, UniformValue::Vec3(c)) => {
                self.current.reflectance = [c.x, c.y, c.z, 1.0]
            }
            (uniforms::ROUGHNESS, UniformValue::Float(v)) => self.current.params[0] = v,
            (uniforms::METALNESS, UniformValue::Float(v)) => self.current.params[1] = v,
            (uniforms::OPACITY, UniformValue::Float(v)) => self.current.params[2] = v,
            (uniforms::IS_PICKED, UniformValue::Int(v)) => {
                self.current.params[3] = if v != 0 { 1.0 } else { 0.0 }
            }
            (uniforms::TEX_SCALE, UniformValue::Vec4(s)) => self.current.tex_scale = s,
            _ => log::warn!("Ignoring uniform '{}' = {:?}", name, value),
        }
    }

    fn bind_texture(&mut self, slot: TextureSlot, texture: Option<TextureId>) {
        self.bound_textures[slot.index()] = texture;
    }

    fn submit_draw(&mut self, mesh: &MeshHandle, index_count: u32) {
        let draw = RecordedDraw {
            mesh: mesh.id(),
            index_count,
            textures: self.bound_textures,
        };
        let uniform = self.current;
        let pass = self.pass_mut();
        pass.draws.push(draw);
        pass.uniforms.push(uniform);
    }

    fn read_pixel(&mut self, target: TargetId, x: u32, y: u32) -> Option<[u8; 4]> {
        if target != TargetId::Picking {
            log::debug!("Readback from {:?} is not supported", target);
            return None;
        }
        let (width, height) = self.viewport_size();
        if x >= width || y >= height {
            return None;
        }
        if self.pass.as_ref().is_some_and(|p| p.target == TargetId::Picking) {
            self.split_pass();
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pick Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.pick_target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = self.readback_buffer.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        if let Err(e) = self.device.poll(wgpu::PollType::Wait) {
            log::debug!("Device poll failed during pick readback: {}", e);
        }

        match futures::executor::block_on(rx) {
            Ok(Ok(())) => {
                let pixel = {
                    let data = slice.get_mapped_range();
                    [data[0], data[1], data[2], data[3]]
                };
                self.readback_buffer.unmap();
                Some(pixel)
            }
            Ok(Err(e)) => {
                log::debug!("Pick readback could not map: {}", e);
                None
            }
            Err(_) => {
                log::debug!("Pick readback was cancelled");
                None
            }
        }
    }
}

fn uniform_entry(binding: u32, dynamic: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_draw_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw Uniform Buffer"),
        size: capacity as u64 * DRAW_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Draw Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(DRAW_STRIDE),
            }),
        }],
    });
    (buffer, bind_group)
}

fn present_mode(vsync: bool, supported: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    let wanted = if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::Immediate
    };
    if supported.contains(&wanted) {
        wanted
    } else {
        wgpu::PresentMode::Fifo
    }
}

/// Combines two clears recorded against the same pass.
fn merge_clear(previous: Option<ClearValue>, next: ClearValue) -> ClearValue {
    let (old_color, old_depth) = split_clear(previous);
    let (new_color, new_depth) = split_clear(Some(next));
    match (new_color.or(old_color), new_depth.or(old_depth)) {
        (Some(color), Some(depth)) => ClearValue::ColorAndDepth(color, depth),
        (Some(color), None) => ClearValue::Color(color),
        (None, Some(depth)) => ClearValue::Depth(depth),
        (None, None) => next,
    }
}

fn split_clear(clear: Option<ClearValue>) -> (Option<[f64; 4]>, Option<f32>) {
    match clear {
        Some(ClearValue::Color(c)) => (Some(c), None),
        Some(ClearValue::Depth(d)) => (None, Some(d)),
        Some(ClearValue::ColorAndDepth(c, d)) => (Some(c), Some(d)),
        None => (None, None),
    }
}

fn pass_label(target: TargetId) -> &'static str {
    match target {
        TargetId::Shadow => "Shadow Pass",
        TargetId::Picking => "Picking Pass",
        TargetId::Main => "Main Pass",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_uniform_fills_one_slot() {
        assert_eq!(std::mem::size_of::<DrawUniform>() as u64, DRAW_STRIDE);
        assert_eq!(std::mem::size_of::<GlobalUniform>(), 160);
    }

    #[test]
    fn test_merge_clear_combines_color_and_depth() {
        let white = [1.0; 4];
        assert_eq!(
            merge_clear(Some(ClearValue::Color(white)), ClearValue::Depth(1.0)),
            ClearValue::ColorAndDepth(white, 1.0)
        );
        assert_eq!(
            merge_clear(Some(ClearValue::ColorAndDepth(white, 0.5)), ClearValue::Depth(1.0)),
            ClearValue::ColorAndDepth(white, 1.0)
        );
        assert_eq!(merge_clear(None, ClearValue::Depth(1.0)), ClearValue::Depth(1.0));
    }

    #[test]
    fn test_immediate_falls_back_to_fifo() {
        let fifo_only = [wgpu::PresentMode::Fifo];
        assert_eq!(present_mode(false, &fifo_only), wgpu::PresentMode::Fifo);

        let both = [wgpu::PresentMode::Fifo, wgpu::PresentMode::Immediate];
        assert_eq!(present_mode(false, &both), wgpu::PresentMode::Immediate);
        assert_eq!(present_mode(true, &both), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn test_default_draw_state_is_opaque_identity() {
        let draw = DrawUniform::default();
        assert_eq!(draw.params[2], 1.0);
        assert_eq!(draw.model, Into::<[[f32; 4]; 4]>::into(Matrix4::<f32>::identity()));
    }
}
