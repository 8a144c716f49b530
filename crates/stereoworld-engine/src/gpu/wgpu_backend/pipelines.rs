use std::collections::HashMap;
use std::num::NonZeroU64;

use stereoworld_scene::RawVertex;

use super::uniforms::UniformBlock;
use crate::gpu::ProgramKind;

pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Pipelines are specialised per program, colour target and sample count.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub kind: ProgramKind,
    /// `None` for depth-only targets.
    pub color: Option<wgpu::TextureFormat>,
    pub samples: u32,
}

const VERTEX_ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x4, // position
    1 => Float32x3, // normal
    2 => Float32x2, // uv
    3 => Float32x3, // tangent
    4 => Float32x3  // bitangent
];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<RawVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRS,
    }
}

/// Shader modules, bind group layouts and the lazily built pipeline cache.
pub(super) struct Pipelines {
    modules: HashMap<ProgramKind, wgpu::ShaderModule>,
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    shaded_layout: wgpu::PipelineLayout,
    depth_layout: wgpu::PipelineLayout,
    cache: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stereoworld uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<UniformBlock>() as u64),
                },
                count: None,
            }],
        });

        let color_texture = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("stereoworld textures bgl"),
            entries: &[
                color_texture(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                color_texture(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let shaded_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("stereoworld shaded pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });
        let depth_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("stereoworld depth pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            immediate_size: 0,
        });

        Self {
            modules: HashMap::new(),
            uniform_layout,
            texture_layout,
            shaded_layout,
            depth_layout,
            cache: HashMap::new(),
        }
    }

    /// Compiles the shader module for `kind` once.
    pub fn ensure_module(&mut self, device: &wgpu::Device, kind: ProgramKind) {
        if self.modules.contains_key(&kind) {
            return;
        }
        let (label, source) = match kind {
            ProgramKind::Lit => ("stereoworld lit shader", include_str!("shaders/lit.wgsl")),
            ProgramKind::ShadowDepth => ("stereoworld shadow shader", include_str!("shaders/shadow.wgsl")),
            ProgramKind::Mirror => ("stereoworld mirror shader", include_str!("shaders/mirror.wgsl")),
        };
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        self.modules.insert(kind, module);
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.cache.get(key)
    }

    pub fn ensure_pipeline(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.cache.contains_key(&key) {
            return;
        }
        self.ensure_module(device, key.kind);
        let Some(module) = self.modules.get(&key.kind) else { return };

        let (label, layout) = match key.kind {
            ProgramKind::Lit => ("stereoworld lit pipeline", &self.shaded_layout),
            ProgramKind::Mirror => ("stereoworld mirror pipeline", &self.shaded_layout),
            ProgramKind::ShadowDepth => ("stereoworld shadow pipeline", &self.depth_layout),
        };

        let targets = key.color.map(|format| {
            [Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })]
        });
        let fragment = targets.as_ref().map(|targets| wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets,
        });

        // The mirror quad overwrites whatever the window holds.
        let (depth_write_enabled, depth_compare) = match key.kind {
            ProgramKind::Mirror => (false, wgpu::CompareFunction::Always),
            _ => (true, wgpu::CompareFunction::Less),
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout()],
            },
            fragment,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled,
                depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: key.samples,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
            cache: None,
        });

        log::debug!("built {label} ({:?}, {}x)", key.color, key.samples);
        self.cache.insert(key, pipeline);
    }
}
