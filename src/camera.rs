use glam::{Mat4, Vec2, Vec3, Vec4};
use wgpu::util::DeviceExt;

const FOV_Y_DEGREES: f32 = 45.0;
const NEAR: f32 = 0.25;
const FAR: f32 = 500.0;

pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl Camera {
    /// Initial pose of the viewer: off to the side, looking at a point
    /// slightly above the ground so the model sits centered.
    pub fn initial() -> Self {
        Self {
            eye: Vec3::new(-5.0, 3.0, 15.0),
            target: Vec3::new(0.0, 2.0, 0.0),
            up: Vec3::Y,
        }
    }

    pub fn get_vp_matrix(&self, resolution: Vec2) -> Mat4 {
        let view = Mat4::look_at_lh(self.eye, self.target, self.up);
        let projection = Mat4::perspective_lh(
            FOV_Y_DEGREES.to_radians(),
            resolution.x / resolution.y,
            NEAR,
            FAR,
        );
        projection * view
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Default)]
pub struct CameraUniform {
    view_proj: Mat4,
    // Eye position, w unused. Shaders need it for fog distance.
    eye: Vec4,
}

impl CameraUniform {
    pub fn update(&mut self, resolution: winit::dpi::PhysicalSize<u32>, camera: &Camera) {
        self.view_proj =
            camera.get_vp_matrix(Vec2::new(resolution.width as f32, resolution.height as f32));
        self.eye = camera.eye.extend(0.0);
    }

    pub fn create_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::cast_slice(&[*self]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn update_buffer(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[*self]));
    }
}
