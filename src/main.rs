use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3};
use thiserror::Error;
use wgpu::util::DeviceExt;
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use periodic3d::atom_model::{
    ELECTRON_COLOR, ELECTRON_EMISSIVE, ELECTRON_RADIUS, NUCLEUS_COLOR, NUCLEUS_EMISSIVE,
    RING_COLOR, RING_TUBE_RADIUS,
};
use periodic3d::element::hex_to_rgb;
use periodic3d::layout::{TILE_DEPTH, TILE_SIZE};
use periodic3d::scene::Lighting;
use periodic3d::search::{self, SearchResults};
use periodic3d::{
    AtomicModel, Camera, Category, CategoryKind, CategorySelection, Config, DatasetError,
    ElementDataset, Interaction, SceneContext, SceneEvent, SceneManager, Tooltip, View,
    ViewController,
};

const SPHERE_SEGMENTS: u32 = 32;
const SPHERE_RINGS: u32 = 16;
const TORUS_SEGMENTS: u32 = 96;
const TORUS_TUBE_SEGMENTS: u32 = 12;
const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0x11 as f64 / 255.0,
    g: 0x18 as f64 / 255.0,
    b: 0x27 as f64 / 255.0,
    a: 1.0,
};
const SHINY: u32 = 1;
const MIN_LABEL_POINTS: f32 = 2.0;

#[derive(Debug, Error)]
enum RenderError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter")]
    NoAdapter,
    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct InstanceData {
    model: [[f32; 4]; 4],
    color: [f32; 3],
    flags: u32,
    emissive: [f32; 3],
    _padding: f32,
}

impl InstanceData {
    fn new(model: Mat4, color: [f32; 3], emissive: [f32; 3], flags: u32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color,
            flags,
            emissive,
            _padding: 0.0,
        }
    }

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: 16,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: 32,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: 48,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: 64,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 76,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Uint32,
                },
                wgpu::VertexAttribute {
                    offset: 80,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    light_dir: [f32; 4],
    light: [f32; 4],
}

impl CameraUniform {
    fn new(camera: &Camera, lighting: &Lighting) -> Self {
        let position = camera.position();
        let direction = lighting.direction;
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            camera_pos: [position.x, position.y, position.z, 1.0],
            light_dir: [direction.x, direction.y, direction.z, lighting.ambient],
            light: [lighting.directional, 0.0, 0.0, 0.0],
        }
    }
}

struct Mesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl Mesh {
    fn new(device: &wgpu::Device, label: &str, (vertices, indices): (Vec<Vertex>, Vec<u32>)) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_vertices")),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_indices")),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

struct InstanceBatch {
    label: &'static str,
    buffer: Option<wgpu::Buffer>,
    capacity: usize,
    len: u32,
}

impl InstanceBatch {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            buffer: None,
            capacity: 0,
            len: 0,
        }
    }

    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[InstanceData]) {
        self.len = 0;
        if data.is_empty() {
            return;
        }
        if data.len() > self.capacity {
            self.destroy();
            let capacity = data.len().next_power_of_two();
            self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: (capacity * std::mem::size_of::<InstanceData>()) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.capacity = capacity;
        }
        if let Some(buffer) = &self.buffer {
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(data));
            self.len = data.len() as u32;
        }
    }

    fn destroy(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
        self.capacity = 0;
        self.len = 0;
    }
}

struct AtomResources {
    generation: u64,
    rings: Vec<Mesh>,
    ring_instances: InstanceBatch,
    sphere_instances: InstanceBatch,
}

impl AtomResources {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue, model: &AtomicModel, generation: u64, orbit: Mat4) -> Self {
        let rings = model
            .rings
            .iter()
            .map(|ring| {
                Mesh::new(
                    device,
                    &format!("ring_{}", ring.shell),
                    create_torus_mesh(ring.radius, RING_TUBE_RADIUS, TORUS_SEGMENTS, TORUS_TUBE_SEGMENTS),
                )
            })
            .collect();
        let color = hex_to_rgb(RING_COLOR);
        let emissive = color.map(|channel| channel * 0.5);
        let ring_data = vec![InstanceData::new(orbit, color, emissive, 0); model.rings.len()];
        let mut ring_instances = InstanceBatch::new("ring_instances");
        ring_instances.upload(device, queue, &ring_data);
        Self {
            generation,
            rings,
            ring_instances,
            sphere_instances: InstanceBatch::new("atom_sphere_instances"),
        }
    }

    fn destroy(&mut self) {
        for ring in &self.rings {
            ring.destroy();
        }
        self.rings.clear();
        self.ring_instances.destroy();
        self.sphere_instances.destroy();
    }
}

struct Texture {
    view: wgpu::TextureView,
}

impl Texture {
    fn new_depth(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        let size = wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth24Plus,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { view }
    }
}

struct RenderState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    pipeline: wgpu::RenderPipeline,
    sphere: Mesh,
    cube: Mesh,
    tile_instances: InstanceBatch,
    atom: Option<AtomResources>,
    orbit_plane: Mat4,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    depth_texture: Texture,
}

impl RenderState {
    async fn new(window: Arc<Window>, orbit_tilt_degrees: f32) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .first()
            .copied()
            .ok_or(RenderError::NoSurfaceFormat)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            desired_maximum_frame_latency: 2,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let sphere = Mesh::new(&device, "sphere", create_sphere_mesh(SPHERE_SEGMENTS, SPHERE_RINGS));
        let cube = Mesh::new(&device, "cube", create_cube_mesh());

        let camera_uniform = CameraUniform::new(&Camera::new(75.0, 20.0), &Lighting::default());
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_buffer"),
            contents: bytemuck::bytes_of(&camera_uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("camera_bind_group_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::desc(), InstanceData::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth24Plus,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let depth_texture = Texture::new_depth(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            pipeline,
            sphere,
            cube,
            tile_instances: InstanceBatch::new("tile_instances"),
            atom: None,
            orbit_plane: Mat4::from_rotation_x(-orbit_tilt_degrees.to_radians()),
            camera_buffer,
            camera_bind_group,
            depth_texture,
        })
    }

    fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.size = size;
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = Texture::new_depth(&self.device, &self.config);
    }

    fn sync(&mut self, context: &SceneContext) {
        let uniform = CameraUniform::new(&context.camera, &context.lighting);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));

        if context.table_visible() {
            let tiles: Vec<InstanceData> = context
                .table()
                .tiles()
                .iter()
                .map(|tile| {
                    let scale = Vec3::new(TILE_SIZE, TILE_SIZE, TILE_DEPTH) * tile.scale;
                    let model =
                        Mat4::from_scale_rotation_translation(scale, Quat::IDENTITY, tile.position);
                    InstanceData::new(model, tile.color, tile.emissive, 0)
                })
                .collect();
            self.tile_instances.upload(&self.device, &self.queue, &tiles);
        }

        let stale = self
            .atom
            .as_ref()
            .is_some_and(|atom| atom.generation != context.model_generation());
        if stale {
            if let Some(mut previous) = self.atom.take() {
                previous.destroy();
            }
        }
        let Some(model) = context.atom() else {
            return;
        };
        let orbit = self.orbit_plane;
        let atom = self.atom.get_or_insert_with(|| {
            AtomResources::new(&self.device, &self.queue, model, context.model_generation(), orbit)
        });
        if context.atom_visible() {
            let mut spheres = Vec::with_capacity(model.electrons.len() + 1);
            spheres.push(InstanceData::new(
                Mat4::from_scale(Vec3::splat(model.nucleus.radius)),
                hex_to_rgb(NUCLEUS_COLOR),
                hex_to_rgb(NUCLEUS_EMISSIVE),
                SHINY,
            ));
            let electron_color = hex_to_rgb(ELECTRON_COLOR);
            let electron_emissive = hex_to_rgb(ELECTRON_EMISSIVE);
            for electron in &model.electrons {
                let position = orbit.transform_point3(electron.position.extend(0.0));
                let transform = Mat4::from_scale_rotation_translation(
                    Vec3::splat(ELECTRON_RADIUS),
                    Quat::IDENTITY,
                    position,
                );
                spheres.push(InstanceData::new(transform, electron_color, electron_emissive, SHINY));
            }
            atom.sphere_instances.upload(&self.device, &self.queue, &spheres);
        }
    }

    fn render(
        &mut self,
        context: &SceneContext,
        egui_renderer: &mut egui_wgpu::Renderer,
        paint_jobs: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            if context.table_visible() {
                if let Some(buffer) = &self.tile_instances.buffer {
                    draw_mesh(&mut render_pass, &self.cube, buffer, 0..self.tile_instances.len);
                }
            } else if let Some(atom) = &self.atom {
                if let Some(buffer) = &atom.sphere_instances.buffer {
                    draw_mesh(&mut render_pass, &self.sphere, buffer, 0..atom.sphere_instances.len);
                }
                if let Some(buffer) = &atom.ring_instances.buffer {
                    for (index, ring) in atom.rings.iter().enumerate() {
                        let index = index as u32;
                        draw_mesh(&mut render_pass, ring, buffer, index..index + 1);
                    }
                }
            }
        }

        egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            paint_jobs,
            screen_descriptor,
        );
        {
            let mut egui_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            egui_renderer.render(&mut egui_pass, paint_jobs, screen_descriptor);
        }

        self.queue.submit(Some(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn draw_mesh<'a>(
    render_pass: &mut wgpu::RenderPass<'a>,
    mesh: &'a Mesh,
    instances: &'a wgpu::Buffer,
    range: std::ops::Range<u32>,
) {
    if range.is_empty() {
        return;
    }
    render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
    render_pass.set_vertex_buffer(1, instances.slice(..));
    render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    render_pass.draw_indexed(0..mesh.index_count, 0, range);
}

fn create_sphere_mesh(segments: u32, rings: u32) -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let theta = v * std::f32::consts::PI;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for segment in 0..=segments {
            let u = segment as f32 / segments as f32;
            let phi = u * std::f32::consts::TAU;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let position = Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi);
            vertices.push(Vertex {
                position: position.to_array(),
                normal: position.normalize_or_zero().to_array(),
            });
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let i0 = ring * stride + segment;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i1, i2, i1, i3, i2]);
        }
    }

    (vertices, indices)
}

fn create_torus_mesh(radius: f32, tube: f32, segments: u32, tube_segments: u32) -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for segment in 0..=segments {
        let u = segment as f32 / segments as f32 * std::f32::consts::TAU;
        let (sin_u, cos_u) = u.sin_cos();
        let center = Vec3::new(radius * cos_u, radius * sin_u, 0.0);
        for side in 0..=tube_segments {
            let v = side as f32 / tube_segments as f32 * std::f32::consts::TAU;
            let (sin_v, cos_v) = v.sin_cos();
            let normal = Vec3::new(cos_v * cos_u, cos_v * sin_u, sin_v);
            vertices.push(Vertex {
                position: (center + normal * tube).to_array(),
                normal: normal.to_array(),
            });
        }
    }

    let stride = tube_segments + 1;
    for segment in 0..segments {
        for side in 0..tube_segments {
            let i0 = segment * stride + side;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }

    (vertices, indices)
}

fn create_cube_mesh() -> (Vec<Vertex>, Vec<u32>) {
    let faces = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            vertices.push(Vertex {
                position: ((normal + u * su + v * sv) * 0.5).to_array(),
                normal: normal.to_array(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

struct ScreenLabel {
    text: String,
    position: egui::Pos2,
    size: f32,
}

fn project_labels(context: &SceneContext, pixels_per_point: f32) -> Vec<ScreenLabel> {
    let camera = &context.camera;
    let viewport = context.viewport;
    let eye = camera.position();
    let pixels_per_unit_at_one = viewport.height as f32 / (2.0 * (camera.fov_y * 0.5).tan());
    let mut world_labels: Vec<(Vec3, &str, f32)> = Vec::new();
    if context.table_visible() {
        for tile in context.table().tiles() {
            for label in &tile.labels {
                world_labels.push((
                    tile.label_position(label),
                    label.text.as_str(),
                    label.size * tile.scale,
                ));
            }
        }
    } else if let Some(model) = context.atom() {
        let nucleus = &model.nucleus.label;
        world_labels.push((nucleus.offset, nucleus.text.as_str(), nucleus.size));
        for label in &model.labels {
            world_labels.push((label.offset, label.text.as_str(), label.size));
        }
    }

    world_labels
        .into_iter()
        .filter_map(|(world, text, size)| {
            let screen = camera.project(world, viewport)?;
            let distance = (world - eye).length().max(f32::EPSILON);
            let points = size * pixels_per_unit_at_one / distance / pixels_per_point;
            (points >= MIN_LABEL_POINTS).then(|| ScreenLabel {
                text: text.to_string(),
                position: egui::pos2(screen.x / pixels_per_point, screen.y / pixels_per_point),
                size: points,
            })
        })
        .collect()
}

enum UiAction {
    SelectElement(Arc<periodic3d::Element>),
    OpenCategory(CategorySelection),
    BackToTable,
}

struct UiState {
    dragging: bool,
    last_cursor: Option<Vec2>,
    drag_distance: f32,
    last_touch: Option<Vec2>,
    search_query: String,
    search_results: SearchResults,
    frame_timer: Instant,
    fps: f32,
}

impl UiState {
    fn new() -> Self {
        Self {
            dragging: false,
            last_cursor: None,
            drag_distance: 0.0,
            last_touch: None,
            search_query: String::new(),
            search_results: SearchResults::default(),
            frame_timer: Instant::now(),
            fps: 0.0,
        }
    }

    fn update_cursor(&mut self, position: Vec2) -> Option<Vec2> {
        let delta = match (self.dragging, self.last_cursor) {
            (true, Some(last)) => {
                let delta = position - last;
                self.drag_distance += delta.length();
                Some(delta)
            }
            _ => None,
        };
        self.last_cursor = Some(position);
        delta
    }

    fn begin_drag(&mut self) {
        self.dragging = true;
        self.drag_distance = 0.0;
    }

    fn end_drag(&mut self) {
        self.dragging = false;
        self.drag_distance = 0.0;
    }

    fn update_fps(&mut self) {
        let now = Instant::now();
        let dt = now - self.frame_timer;
        self.frame_timer = now;
        let frame_seconds = dt.as_secs_f32();
        if frame_seconds > 0.0 {
            let fps = 1.0 / frame_seconds;
            self.fps = if self.fps == 0.0 {
                fps
            } else {
                self.fps * 0.9 + fps * 0.1
            };
        }
    }
}

struct UiFrame<'a> {
    views: &'a ViewController,
    dataset: Option<&'a ElementDataset>,
    load_error: Option<&'a str>,
    labels: &'a [ScreenLabel],
    tooltip: Option<&'a Tooltip>,
    model: Option<&'a AtomicModel>,
    pixels_per_point: f32,
}

fn category_color(category: Category) -> egui::Color32 {
    let [r, g, b] = category.color().map(|channel| (channel * 255.0).round() as u8);
    egui::Color32::from_rgb(r, g, b)
}

fn draw_ui(ctx: &egui::Context, frame: &UiFrame, ui_state: &mut UiState) -> Vec<UiAction> {
    let mut actions = Vec::new();

    let painter = ctx.layer_painter(egui::LayerId::background());
    for label in frame.labels {
        painter.text(
            label.position,
            egui::Align2::CENTER_CENTER,
            &label.text,
            egui::FontId::proportional(label.size),
            egui::Color32::WHITE,
        );
    }

    egui::TopBottomPanel::top("header").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui.button("3D Periodic Table").clicked() {
                actions.push(UiAction::BackToTable);
            }
            ui.separator();
            ui.label("Search");
            let response = ui.text_edit_singleline(&mut ui_state.search_query);
            if response.changed() {
                ui_state.search_results = frame
                    .dataset
                    .map(|dataset| search::search(dataset, &ui_state.search_query))
                    .unwrap_or_default();
            }
            ui.label(format!("{:.0} fps", ui_state.fps));
        });
        if ui_state.search_results.is_empty() {
            return;
        }
        let mut picked = false;
        ui.horizontal_wrapped(|ui| {
            for category in &ui_state.search_results.categories {
                if ui.selectable_label(false, format!("Category: {}", category.name())).clicked() {
                    actions.push(UiAction::OpenCategory(CategorySelection::category(category.name())));
                    picked = true;
                }
            }
            for hazard in &ui_state.search_results.properties {
                if ui.selectable_label(false, format!("Property: {}", hazard.label())).clicked() {
                    actions.push(UiAction::OpenCategory(CategorySelection::property(hazard.name())));
                    picked = true;
                }
            }
        });
        ui.horizontal_wrapped(|ui| {
            for element in &ui_state.search_results.elements {
                let text = format!("{} {} ({})", element.symbol, element.name, element.number);
                if ui.button(text).clicked() {
                    actions.push(UiAction::SelectElement(Arc::clone(element)));
                    picked = true;
                }
            }
        });
        if picked {
            ui_state.search_query.clear();
            ui_state.search_results = SearchResults::default();
        }
    });

    if frame.dataset.is_none() {
        egui::Window::new("Loading")
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| match frame.load_error {
                Some(error) => {
                    ui.colored_label(egui::Color32::LIGHT_RED, "Failed to load element data.");
                    ui.label(error);
                }
                None => {
                    ui.label("Loading element data...");
                }
            });
        return actions;
    }

    match frame.views.view() {
        View::Table => {
            egui::Window::new("Categories")
                .anchor(egui::Align2::LEFT_BOTTOM, [10.0, -10.0])
                .resizable(false)
                .show(ctx, |ui| {
                    for category in Category::ALL {
                        ui.horizontal(|ui| {
                            let (rect, _) =
                                ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                            ui.painter().rect_filled(rect, 2.0, category_color(category));
                            if ui.selectable_label(false, category.name()).clicked() {
                                actions.push(UiAction::OpenCategory(CategorySelection::category(
                                    category.name(),
                                )));
                            }
                        });
                    }
                });
            if let Some(tooltip) = frame.tooltip {
                let position = egui::pos2(
                    tooltip.position.x / frame.pixels_per_point,
                    tooltip.position.y / frame.pixels_per_point,
                );
                egui::Area::new(egui::Id::new("element_tooltip"))
                    .fixed_pos(position)
                    .order(egui::Order::Tooltip)
                    .interactable(false)
                    .show(ctx, |ui| {
                        egui::Frame::popup(ui.style()).show(ui, |ui| {
                            for (index, line) in tooltip.lines.iter().enumerate() {
                                if index == 0 {
                                    ui.strong(line);
                                } else {
                                    ui.label(line);
                                }
                            }
                        });
                    });
            }
        }
        View::Atom => {
            if let Some(element) = frame.views.selected_element() {
                egui::SidePanel::right("element_info")
                    .default_width(320.0)
                    .show(ctx, |ui| {
                        if ui.button("Back to periodic table").clicked() {
                            actions.push(UiAction::BackToTable);
                        }
                        ui.separator();
                        egui::ScrollArea::vertical().show(ui, |ui| {
                            element_info(ui, element, frame.model, &mut actions);
                        });
                    });
            }
        }
        View::Category => {
            if let (Some(selection), Some(dataset)) = (frame.views.selected_category(), frame.dataset) {
                let title = match selection.kind {
                    CategoryKind::Category => format!("Category: {}", selection.name),
                    CategoryKind::Property => format!("Property: {}", selection.name),
                };
                egui::Window::new(title)
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .collapsible(false)
                    .show(ctx, |ui| {
                        if ui.button("Back to periodic table").clicked() {
                            actions.push(UiAction::BackToTable);
                        }
                        ui.separator();
                        let members = search::elements_for(dataset, selection);
                        if members.is_empty() {
                            ui.label("No elements found.");
                        }
                        egui::ScrollArea::vertical().max_height(400.0).show(ui, |ui| {
                            for element in members {
                                let text = format!("{} {} ({})", element.symbol, element.name, element.number);
                                if ui.button(text).clicked() {
                                    actions.push(UiAction::SelectElement(element));
                                }
                            }
                        });
                    });
            }
        }
    }

    actions
}

fn element_info(
    ui: &mut egui::Ui,
    element: &periodic3d::Element,
    model: Option<&AtomicModel>,
    actions: &mut Vec<UiAction>,
) {
    let category = element.display_category();
    ui.heading(format!("{} ({})", element.name, element.symbol));
    ui.label(format!("Atomic number: {}", element.number));
    ui.label(format!("Atomic mass: {}", element.mass_label()));
    ui.horizontal(|ui| {
        ui.label("Category:");
        let text = egui::RichText::new(&element.category).color(category_color(category));
        if ui
            .add(egui::Label::new(text).sense(egui::Sense::click()))
            .clicked()
            && category != Category::Unknown
        {
            actions.push(UiAction::OpenCategory(CategorySelection::category(category.name())));
        }
    });
    ui.label(format!("Phase: {}", element.phase));
    if let Some(notation) = element.configuration_notation() {
        ui.label(format!("Electron configuration: {notation}"));
    }
    if let Some(model) = model {
        ui.label(model.composition.summary());
        for line in periodic3d::atom_model::shell_lines(&model.shells) {
            ui.small(line);
        }
    }
    if let Some(discovered_by) = &element.discovered_by {
        ui.label(format!("Discovered by: {discovered_by}"));
    }
    if let Some(summary) = &element.summary {
        ui.separator();
        ui.label(summary);
    }
    if !element.applications.is_empty() {
        ui.separator();
        ui.strong("Applications");
        for application in &element.applications {
            ui.label(format!("- {application}"));
        }
    }
    let hazards = search::hazards_of(element);
    let note = search::special_note(element);
    if !hazards.is_empty() || note.is_some() {
        ui.separator();
        ui.strong("Hazards");
        ui.horizontal_wrapped(|ui| {
            for hazard in hazards {
                if ui.selectable_label(false, hazard.label()).clicked() {
                    actions.push(UiAction::OpenCategory(CategorySelection::property(hazard.name())));
                }
            }
        });
        if let Some(note) = note {
            ui.small(note);
        }
    }
    if let Some(image) = &element.image {
        ui.separator();
        ui.hyperlink_to("Image", &image.url);
        if let Some(attribution) = &image.attribution {
            ui.small(attribution);
        }
    }
}

fn spawn_dataset_loader(path: std::path::PathBuf) -> mpsc::Receiver<Result<ElementDataset, DatasetError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        log::info!("loading element data from {}", path.display());
        let _ = tx.send(ElementDataset::load(&path));
    });
    rx
}

fn create_render_state(window: &Arc<Window>, config: &Config) -> Option<RenderState> {
    let attempts = config.scene.gpu_init_attempts.max(1);
    for attempt in 1..=attempts {
        match pollster::block_on(RenderState::new(window.clone(), config.scene.orbit_tilt_degrees)) {
            Ok(state) => return Some(state),
            Err(err) => {
                log::warn!("GPU init attempt {attempt}/{attempts} failed: {err}");
                if attempt < attempts {
                    thread::sleep(Duration::from_millis(config.scene.gpu_retry_delay_ms));
                }
            }
        }
    }
    None
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::from_args(&args);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();

    let event_loop = EventLoop::new().expect("event loop");
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(&config.window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.window.width,
                config.window.height,
            ))
            .build(&event_loop)
            .expect("window"),
    );

    let Some(mut render_state) = create_render_state(&window, &config) else {
        log::error!("giving up: no usable GPU");
        return;
    };
    let egui_ctx = egui::Context::default();
    let viewport_id = egui_ctx.viewport_id();
    let mut egui_state = egui_winit::State::new(
        egui_ctx.clone(),
        viewport_id,
        window.as_ref(),
        Some(window.scale_factor() as f32),
        None,
    );
    let mut egui_renderer =
        egui_wgpu::Renderer::new(&render_state.device, render_state.config.format, None, 1);

    let dataset_rx = spawn_dataset_loader(config.dataset_path.clone());
    let mut dataset: Option<ElementDataset> = None;
    let mut load_error: Option<String> = None;

    let (event_tx, event_rx) = mpsc::channel::<SceneEvent>();
    let mut scene = SceneManager::new(config.scene.clone());
    scene.init();
    let size = window.inner_size();
    scene.on_resize(size.width, size.height);
    let mut interaction = Interaction::new(event_tx, config.scene.tap_threshold_px);
    let mut views = ViewController::default();
    let mut ui_state = UiState::new();
    let click_threshold = config.scene.click_drag_threshold_px;
    let start = Instant::now();

    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop
        .run(move |event, target| match event {
            Event::WindowEvent { event, window_id } if window_id == window.id() => {
                if let WindowEvent::RedrawRequested = event {
                    if let Ok(result) = dataset_rx.try_recv() {
                        match result {
                            Ok(loaded) => {
                                scene.populate_table(&loaded);
                                scene.show_table(Instant::now());
                                dataset = Some(loaded);
                            }
                            Err(err) => {
                                log::error!("{err}");
                                load_error = Some(err.to_string());
                            }
                        }
                    }
                    while let Ok(scene_event) = event_rx.try_recv() {
                        views.handle(scene_event, &mut scene, Instant::now());
                    }
                    if !views.accepts_pointer() {
                        interaction.clear(&mut scene);
                    }

                    scene.animate(start.elapsed().as_secs_f32());
                    ui_state.update_fps();
                    let Some(context) = scene.context() else {
                        return;
                    };
                    render_state.sync(context);

                    let pixels_per_point = egui_ctx.pixels_per_point();
                    let labels = project_labels(context, pixels_per_point);
                    let frame = UiFrame {
                        views: &views,
                        dataset: dataset.as_ref(),
                        load_error: load_error.as_deref(),
                        labels: &labels,
                        tooltip: interaction.tooltip(),
                        model: context.atom(),
                        pixels_per_point,
                    };
                    let raw_input = egui_state.take_egui_input(&window);
                    let mut actions = Vec::new();
                    let output = egui_ctx.run(raw_input, |ctx| {
                        actions = draw_ui(ctx, &frame, &mut ui_state);
                    });
                    egui_state.handle_platform_output(&window, output.platform_output);
                    let paint_jobs = egui_ctx.tessellate(output.shapes, output.pixels_per_point);
                    let screen_descriptor = egui_wgpu::ScreenDescriptor {
                        size_in_pixels: [render_state.config.width, render_state.config.height],
                        pixels_per_point: output.pixels_per_point,
                    };

                    for (id, image_delta) in &output.textures_delta.set {
                        egui_renderer.update_texture(
                            &render_state.device,
                            &render_state.queue,
                            *id,
                            image_delta,
                        );
                    }

                    let render_result =
                        render_state.render(context, &mut egui_renderer, &paint_jobs, &screen_descriptor);
                    match render_result {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost) => render_state.resize(render_state.size),
                        Err(wgpu::SurfaceError::OutOfMemory) => target.exit(),
                        Err(wgpu::SurfaceError::Timeout) => {
                            std::thread::sleep(Duration::from_millis(16));
                        }
                        Err(wgpu::SurfaceError::Outdated) => {}
                    }

                    for id in &output.textures_delta.free {
                        egui_renderer.free_texture(id);
                    }

                    let now = Instant::now();
                    for action in actions {
                        match action {
                            UiAction::SelectElement(element) => {
                                views.select_element(element, &mut scene, now)
                            }
                            UiAction::OpenCategory(selection) => {
                                views.open_category(selection, &mut scene, now)
                            }
                            UiAction::BackToTable => views.back_to_table(&mut scene, now),
                        }
                    }
                    if !views.accepts_pointer() {
                        interaction.clear(&mut scene);
                    }
                    return;
                }

                if egui_state.on_window_event(&window, &event).consumed {
                    return;
                }
                match event {
                    WindowEvent::CloseRequested => target.exit(),
                    WindowEvent::Resized(size) => {
                        render_state.resize(size);
                        scene.on_resize(size.width, size.height);
                    }
                    WindowEvent::ScaleFactorChanged {
                        mut inner_size_writer,
                        ..
                    } => {
                        let new_size = window.inner_size();
                        let _ = inner_size_writer.request_inner_size(new_size);
                        render_state.resize(new_size);
                        scene.on_resize(new_size.width, new_size.height);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let cursor = Vec2::new(position.x as f32, position.y as f32);
                        if let Some(delta) = ui_state.update_cursor(cursor) {
                            if let Some(context) = scene.context_mut() {
                                context.camera.orbit(delta);
                            }
                        }
                        if views.accepts_pointer() {
                            interaction.pointer_moved(&mut scene, cursor);
                        }
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left {
                            match state {
                                ElementState::Pressed => ui_state.begin_drag(),
                                ElementState::Released => {
                                    if ui_state.drag_distance < click_threshold
                                        && views.accepts_pointer()
                                    {
                                        interaction.click(&scene);
                                    }
                                    ui_state.end_drag();
                                }
                            }
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                        };
                        if scroll.abs() > f32::EPSILON {
                            if let Some(context) = scene.context_mut() {
                                context.camera.zoom(scroll * 0.1);
                            }
                        }
                    }
                    WindowEvent::Touch(touch) => {
                        let location = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                        match touch.phase {
                            TouchPhase::Started => {
                                ui_state.last_touch = Some(location);
                                if views.accepts_pointer() {
                                    interaction.touch_start(&mut scene, location);
                                }
                            }
                            TouchPhase::Moved => {
                                if let (Some(last), Some(context)) =
                                    (ui_state.last_touch, scene.context_mut())
                                {
                                    context.camera.orbit(location - last);
                                }
                                ui_state.last_touch = Some(location);
                            }
                            TouchPhase::Ended => {
                                ui_state.last_touch = None;
                                if views.accepts_pointer() {
                                    interaction.touch_end(&mut scene, location);
                                }
                            }
                            TouchPhase::Cancelled => ui_state.last_touch = None,
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                if scene.take_redraw(Instant::now()) {
                    let size = window.inner_size();
                    if size != render_state.size {
                        render_state.resize(size);
                        scene.on_resize(size.width, size.height);
                    }
                }
                window.request_redraw();
            }
            _ => {}
        })
        .expect("event loop run");
}
