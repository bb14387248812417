use crate::device::{AttributeFormat, VertexLayoutDesc};

use super::texture::DEPTH_FORMAT;

fn to_wgpu_format(format: AttributeFormat) -> wgpu::VertexFormat {
    match format {
        AttributeFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        AttributeFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        AttributeFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

pub(crate) fn vertex_attributes(layout: &VertexLayoutDesc) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes
        .iter()
        .map(|attribute| wgpu::VertexAttribute {
            offset: attribute.offset,
            shader_location: attribute.location,
            format: to_wgpu_format(attribute.format),
        })
        .collect()
}

/// Builds the pipeline of one (program, vertex layout) pair.
///
/// The pipeline layout is derived from the shaders, so any bind groups the
/// program declares are accepted as long as the draw provides them.
pub(crate) fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    vertex: (&wgpu::ShaderModule, &str),
    fragment: (&wgpu::ShaderModule, &str),
    color_format: wgpu::TextureFormat,
    layout: &VertexLayoutDesc,
) -> wgpu::RenderPipeline {
    let attributes = vertex_attributes(layout);
    let vertex_layouts = [wgpu::VertexBufferLayout {
        array_stride: layout.stride as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &attributes,
    }];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: None,
        vertex: wgpu::VertexState {
            module: vertex.0,
            entry_point: Some(vertex.1),
            buffers: &vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment.0,
            entry_point: Some(fragment.1),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Imported meshes come with either winding.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: Some(true),
            depth_compare: Some(wgpu::CompareFunction::Less),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
