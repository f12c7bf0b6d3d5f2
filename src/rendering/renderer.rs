use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use wgpu::{
    CommandEncoderDescriptor, DepthBiasState, MultisampleState, PipelineCompilationOptions,
    ShaderSource, StencilState,
};
use winit::window::Window;

use crate::camera::{Camera, CameraUniform};
use crate::color::Rgba;
use crate::rendering::environment::{Environment, ENV_VBL};
use crate::rendering::imgui_renderer::ImguiRendererState;
use crate::rendering::instance::{gather_instances, Instance};
use crate::rendering::render_model::{render_model_instances, RenderModel, RENDER_MODEL_VBL};
use crate::scene_graph::scene::Scene;
use crate::scene_graph::scene_model::SceneModelId;
use crate::shader_loader::{PipelineBuilder, ShaderDefinition, ShaderId, ShaderLoader};
use crate::texture::DepthTexture;

const BACKGROUND_COLOR: u32 = 0xe0e0e0;

const MESH_SHADER: ShaderDefinition = ShaderDefinition {
    id: ShaderId::Mesh,
    name: "Mesh Shader",
    path: "mesh.wgsl",
};

const GROUND_SHADER: ShaderDefinition = ShaderDefinition {
    id: ShaderId::Ground,
    name: "Ground Shader",
    path: "ground.wgsl",
};

const GRID_SHADER: ShaderDefinition = ShaderDefinition {
    id: ShaderId::Grid,
    name: "Grid Shader",
    path: "grid.wgsl",
};

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: winit::dpi::PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,

    depth_texture: DepthTexture,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    render_models: HashMap<SceneModelId, RenderModel>,
    environment: Environment,

    shader_loader: ShaderLoader,
    imgui: ImguiRendererState,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        camera: &Camera,
        imgui_context: &mut imgui::Context,
    ) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to acquire GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        let depth_texture = DepthTexture::new(&device, &surface_config, "Depth Texture");

        let mut camera_uniform = CameraUniform::default();
        camera_uniform.update(size, camera);
        let camera_buffer = camera_uniform.create_buffer(&device);

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

        let shader_loader = ShaderLoader::new(
            device.clone(),
            vec![
                (
                    MESH_SHADER,
                    mesh_pipeline_builder(surface_format, camera_bind_group_layout.clone()),
                ),
                (
                    GROUND_SHADER,
                    environment_pipeline_builder(
                        surface_format,
                        camera_bind_group_layout.clone(),
                        EnvironmentPipelineKind::Ground,
                    ),
                ),
                (
                    GRID_SHADER,
                    environment_pipeline_builder(
                        surface_format,
                        camera_bind_group_layout.clone(),
                        EnvironmentPipelineKind::Grid,
                    ),
                ),
            ],
        )?;

        let environment = Environment::new(&device);
        let imgui = ImguiRendererState::new(&device, &queue, surface_format, imgui_context);

        Ok(Self {
            window,
            size,
            surface,
            surface_config,
            device,
            queue,
            depth_texture,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            render_models: HashMap::new(),
            environment,
            shader_loader,
            imgui,
        })
    }

    /// Uploads GPU buffers for any scene model that doesn't have them
    /// yet and drops buffers whose scene model is gone. Called every
    /// frame; loads complete asynchronously.
    pub fn sync_models(&mut self, scene: &Scene) {
        self.render_models
            .retain(|model_id, _| scene.models.contains_key(model_id));

        for (model_id, scene_model) in scene.models.iter() {
            if self.render_models.contains_key(model_id) {
                continue;
            }

            let render_model = RenderModel::from_model(&self.device, &scene_model.model);
            self.render_models.insert(*model_id, render_model);
            log::info!(
                "Uploaded model {} with {} primitives",
                scene_model.model.name,
                scene_model.model.primitives.len()
            );
        }
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.surface_config.width = new_size.width;
            self.surface_config.height = new_size.height;
            self.surface.configure(&self.device, &self.surface_config);
            self.depth_texture.resize(&self.device, &self.surface_config);
        }
    }

    pub fn render(
        &mut self,
        camera: &Camera,
        scene: &Scene,
        imgui_context: &mut imgui::Context,
    ) -> Result<(), wgpu::SurfaceError> {
        self.shader_loader.load_pending_shaders();

        self.camera_uniform.update(self.size, camera);
        self.camera_uniform
            .update_buffer(&self.queue, &self.camera_buffer);

        gather_instances(scene, &mut self.render_models);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let [r, g, b, a] = Rgba::from_hex(BACKGROUND_COLOR).to_linear();

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Environment Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.depth_texture.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

            render_pass.set_pipeline(self.shader_loader.get(ShaderId::Ground));
            render_pass.set_vertex_buffer(0, self.environment.ground_vertex_buffer.slice(..));
            render_pass.draw(0..self.environment.ground_vertex_count, 0..1);

            render_pass.set_pipeline(self.shader_loader.get(ShaderId::Grid));
            render_pass.set_vertex_buffer(0, self.environment.grid_vertex_buffer.slice(..));
            render_pass.draw(0..self.environment.grid_vertex_count, 0..1);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Model Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.depth_texture.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(self.shader_loader.get(ShaderId::Mesh));
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

            for render_model in self.render_models.values() {
                render_model_instances(&mut render_pass, &self.queue, render_model);
            }
        }

        self.imgui
            .render(&view, imgui_context, &self.device, &self.queue, &mut encoder);

        self.queue.submit([encoder.finish()]);
        output.present();

        Ok(())
    }
}

fn mesh_pipeline_builder(
    surface_format: wgpu::TextureFormat,
    camera_layout: wgpu::BindGroupLayout,
) -> PipelineBuilder {
    Box::new(move |device, source| {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: ShaderSource::Wgsl(source.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&camera_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[RENDER_MODEL_VBL, Instance::descriptor()],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthTexture::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(pipeline)
    })
}

#[derive(Clone, Copy)]
enum EnvironmentPipelineKind {
    Ground,
    Grid,
}

fn environment_pipeline_builder(
    surface_format: wgpu::TextureFormat,
    camera_layout: wgpu::BindGroupLayout,
    kind: EnvironmentPipelineKind,
) -> PipelineBuilder {
    Box::new(move |device, source| {
        let (label, topology, blend) = match kind {
            EnvironmentPipelineKind::Ground => (
                "Ground Pipeline",
                wgpu::PrimitiveTopology::TriangleList,
                wgpu::BlendState::REPLACE,
            ),
            EnvironmentPipelineKind::Grid => (
                "Grid Pipeline",
                wgpu::PrimitiveTopology::LineList,
                wgpu::BlendState::ALPHA_BLENDING,
            ),
        };

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: ShaderSource::Wgsl(source.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&camera_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[ENV_VBL],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // The ground and grid test against depth but never write it,
            // so the model always overdraws them.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthTexture::DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(pipeline)
    })
}
