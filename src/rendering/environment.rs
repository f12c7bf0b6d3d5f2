use std::mem::offset_of;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::color::Rgba;

const GROUND_HALF_EXTENT: f32 = 1000.0;
const GRID_HALF_EXTENT: f32 = 100.0;
const GRID_DIVISIONS: u32 = 40;
const GROUND_COLOR: u32 = 0xcbcbcb;
const GRID_OPACITY: f32 = 0.2;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct EnvVertex {
    position: Vec3,
    normal: Vec3,
    // Plain array, not Vec4: its 16-byte alignment would introduce
    // padding after the two Vec3s and break the Pod derive.
    color: [f32; 4],
}

pub const ENV_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<EnvVertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            offset: offset_of!(EnvVertex, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(EnvVertex, normal) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(EnvVertex, color) as wgpu::BufferAddress,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x4,
        },
    ],
};

/// Static scene dressing: the big ground plane and the reference grid.
/// Built once; neither buffer changes after creation.
pub struct Environment {
    pub ground_vertex_buffer: wgpu::Buffer,
    pub ground_vertex_count: u32,
    pub grid_vertex_buffer: wgpu::Buffer,
    pub grid_vertex_count: u32,
}

impl Environment {
    pub fn new(device: &wgpu::Device) -> Self {
        let ground = ground_vertices();
        let grid = grid_vertices();

        let ground_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Ground vertex buffer"),
            contents: bytemuck::cast_slice(&ground),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let grid_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Grid vertex buffer"),
            contents: bytemuck::cast_slice(&grid),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            ground_vertex_buffer,
            ground_vertex_count: ground.len() as u32,
            grid_vertex_buffer,
            grid_vertex_count: grid.len() as u32,
        }
    }
}

fn ground_vertices() -> Vec<EnvVertex> {
    let color = Rgba::from_hex(GROUND_COLOR).to_array();
    let h = GROUND_HALF_EXTENT;
    let corner = |x: f32, z: f32| EnvVertex {
        position: Vec3::new(x, 0.0, z),
        normal: Vec3::Y,
        color,
    };

    vec![
        corner(-h, -h),
        corner(h, -h),
        corner(h, h),
        corner(-h, -h),
        corner(h, h),
        corner(-h, h),
    ]
}

fn grid_vertices() -> Vec<EnvVertex> {
    let color = [0.0, 0.0, 0.0, GRID_OPACITY];
    let h = GRID_HALF_EXTENT;
    let step = (h * 2.0) / GRID_DIVISIONS as f32;

    let line_vertex = |x: f32, z: f32| EnvVertex {
        position: Vec3::new(x, 0.0, z),
        normal: Vec3::Y,
        color,
    };

    let mut vertices = Vec::with_capacity(((GRID_DIVISIONS + 1) * 4) as usize);
    for i in 0..=GRID_DIVISIONS {
        let offset = -h + i as f32 * step;
        vertices.push(line_vertex(offset, -h));
        vertices.push(line_vertex(offset, h));
        vertices.push(line_vertex(-h, offset));
        vertices.push(line_vertex(h, offset));
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_a_line_pair_per_division_boundary() {
        let vertices = grid_vertices();
        // 41 boundaries, two lines each, two vertices per line.
        assert_eq!(vertices.len(), ((GRID_DIVISIONS + 1) * 4) as usize);
    }

    #[test]
    fn ground_is_two_triangles() {
        assert_eq!(ground_vertices().len(), 6);
    }

    #[test]
    fn env_vertex_is_tightly_packed() {
        // The vertex layout offsets assume no padding between fields.
        assert_eq!(
            std::mem::size_of::<EnvVertex>(),
            std::mem::size_of::<Vec3>() * 2 + std::mem::size_of::<[f32; 4]>()
        );
        assert_eq!(
            std::mem::offset_of!(EnvVertex, color),
            std::mem::size_of::<Vec3>() * 2
        );
    }
}
