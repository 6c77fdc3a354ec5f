use std::collections::HashMap;
use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use crate::device::{Gpu, GpuFrame};
use crate::pipeline::{QuadGeometry, RenderTarget};

use super::{
    check_interface, BackendError, DepthId, Destination, DrawCall, FramebufferId, GeometryHandle,
    GraphicsBackend, PassOutput, ProgramHandle, ProgramSource, ShaderStage, TextureId,
};

/// Color format of every offscreen target.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

const VERTEX_ENTRY: &str = "vs_main";
const FRAGMENT_ENTRY: &str = "fs_main";

/// Bytes of one uniform slot (`vec4<f32>`).
const SLOT_SIZE: u64 = 16;

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const TEXCOORD_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

/// Parses and validates both stages of `source` with naga.
///
/// Parse and validation failures become [`BackendError::Compile`] with the
/// rendered diagnostic. A missing entry point (`vs_main` / `fs_main`) or a
/// resource binding outside the program's interface becomes
/// [`BackendError::Link`].
pub fn validate_program_source(source: &ProgramSource<'_>) -> Result<(), BackendError> {
    let vertex = validate_stage(source.label, ShaderStage::Vertex, source.vertex)?;
    let fragment = validate_stage(source.label, ShaderStage::Fragment, source.fragment)?;

    require_entry(source.label, &vertex, naga::ShaderStage::Vertex, VERTEX_ENTRY)?;
    require_entry(source.label, &fragment, naga::ShaderStage::Fragment, FRAGMENT_ENTRY)?;

    for module in [&vertex, &fragment] {
        for (_, global) in module.global_variables.iter() {
            let Some(binding) = &global.binding else { continue };
            let inside = match binding.group {
                0 => binding.binding == 0,
                1 => binding.binding <= source.texture_units,
                _ => false,
            };
            if !inside {
                return Err(BackendError::Link {
                    label: source.label.to_owned(),
                    log: format!(
                        "@group({}) @binding({}) is outside the program interface \
                         (uniforms at 0/0, sampler at 1/0, {} textures from 1/1)",
                        binding.group, binding.binding, source.texture_units
                    ),
                });
            }
        }
    }
    Ok(())
}

fn validate_stage(
    label: &str,
    stage: ShaderStage,
    text: &str,
) -> Result<naga::Module, BackendError> {
    let compile_error = |log: String| BackendError::Compile {
        label: label.to_owned(),
        stage,
        log,
    };

    let module = naga::front::wgsl::parse_str(text)
        .map_err(|e| compile_error(e.emit_to_string(text)))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| compile_error(e.emit_to_string(text)))?;
    Ok(module)
}

fn require_entry(
    label: &str,
    module: &naga::Module,
    stage: naga::ShaderStage,
    name: &str,
) -> Result<(), BackendError> {
    if module
        .entry_points
        .iter()
        .any(|ep| ep.name == name && ep.stage == stage)
    {
        return Ok(());
    }
    Err(BackendError::Link {
        label: label.to_owned(),
        log: format!("missing {stage:?} entry point `{name}`"),
    })
}

struct GpuTarget {
    target: RenderTarget,
    view: wgpu::TextureView,
    _color: wgpu::Texture,
    _depth: wgpu::Texture,
}

struct GpuProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    uniform_slots: usize,
    texture_units: u32,
    output: PassOutput,
}

impl GpuProgram {
    fn block_size(&self) -> u64 {
        block_size(self.uniform_slots)
    }
}

fn block_size(uniform_slots: usize) -> u64 {
    uniform_slots.max(1) as u64 * SLOT_SIZE
}

struct GpuGeometry {
    positions: wgpu::Buffer,
    texcoords: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

/// Growable uniform buffer holding one block per draw of a frame.
#[derive(Default)]
struct UniformArena {
    buffer: Option<wgpu::Buffer>,
    capacity: u64,
    /// Per-program bind groups over `buffer`, rebuilt when it grows.
    groups: HashMap<ProgramHandle, wgpu::BindGroup>,
}

/// wgpu implementation of [`GraphicsBackend`].
///
/// Draws are validated when recorded and encoded at [`flush`](GraphicsBackend::flush):
/// uniforms of the whole frame are uploaded into one buffer addressed with
/// dynamic offsets, then each draw becomes its own render pass. Surface
/// draws need a frame handed in through [`begin_frame`](Self::begin_frame).
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    surface_size: (u32, u32),
    sampler: wgpu::Sampler,
    next_id: u32,

    targets: HashMap<FramebufferId, GpuTarget>,
    programs: HashMap<ProgramHandle, GpuProgram>,
    geometries: HashMap<GeometryHandle, GpuGeometry>,
    texture_groups: HashMap<(ProgramHandle, Vec<TextureId>), wgpu::BindGroup>,
    uniforms: UniformArena,

    frame: Option<GpuFrame>,
    pending: Vec<DrawCall>,
}

impl WgpuBackend {
    pub fn new(gpu: &Gpu<'_>) -> Self {
        let size = gpu.size();
        Self::from_parts(
            gpu.device().clone(),
            gpu.queue().clone(),
            gpu.surface_format(),
            (size.width, size.height),
        )
    }

    pub fn from_parts(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        surface_size: (u32, u32),
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("afterglow linear clamp sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            device,
            queue,
            surface_format,
            surface_size,
            sampler,
            next_id: 1,
            targets: HashMap::new(),
            programs: HashMap::new(),
            geometries: HashMap::new(),
            texture_groups: HashMap::new(),
            uniforms: UniformArena::default(),
            frame: None,
            pending: Vec::new(),
        }
    }

    /// Records the surface size after the window was resized.
    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        self.surface_size = (width, height);
    }

    /// Hands over the acquired surface frame for the next flush.
    pub fn begin_frame(&mut self, frame: GpuFrame) {
        if self.frame.replace(frame).is_some() {
            log::warn!("previous surface frame dropped without being flushed");
        }
    }

    fn issue(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn view_of(&self, texture: TextureId) -> Option<&wgpu::TextureView> {
        self.targets
            .values()
            .find(|t| t.target.color == texture)
            .map(|t| &t.view)
    }

    fn check(&self, call: &DrawCall) -> Result<(), String> {
        let program = self
            .programs
            .get(&call.program)
            .ok_or_else(|| format!("program {:?} was never compiled", call.program))?;
        if !self.geometries.contains_key(&call.geometry) {
            return Err(format!("geometry {:?} was never uploaded", call.geometry));
        }
        for binding in &call.textures {
            if self.view_of(binding.texture).is_none() {
                return Err(format!("texture {:?} is not live", binding.texture));
            }
        }
        if let Destination::Offscreen { framebuffer, color } = call.destination {
            match self.targets.get(&framebuffer) {
                Some(t) if t.target.color == color => {}
                Some(_) => return Err(format!("{framebuffer:?} does not own {color:?}")),
                None => return Err(format!("{framebuffer:?} is not live")),
            }
        }
        check_interface(
            call,
            &program.label,
            program.uniform_slots,
            program.texture_units,
            program.output,
        )
    }

    /// Writes the uniform blocks of `draws` and returns each draw's offset.
    fn upload_uniforms(&mut self, draws: &[DrawCall]) -> Result<Vec<u32>, BackendError> {
        let align = u64::from(self.device.limits().min_uniform_buffer_offset_alignment).max(1);

        let mut offsets = Vec::with_capacity(draws.len());
        let mut total = 0u64;
        for call in draws {
            let offset = u32::try_from(total)
                .map_err(|_| BackendError::Surface("uniform arena exceeds 4 GiB".to_owned()))?;
            offsets.push(offset);
            total += block_size(call.uniforms.len()).div_ceil(align) * align;
        }

        if total > self.uniforms.capacity || self.uniforms.buffer.is_none() {
            let capacity = total.max(align).next_power_of_two();
            self.uniforms.buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("afterglow uniform arena"),
                size: capacity,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.uniforms.capacity = capacity;
            self.uniforms.groups.clear();
            log::debug!("uniform arena grown to {capacity} bytes");
        }
        let Some(buffer) = self.uniforms.buffer.as_ref() else {
            return Ok(offsets);
        };

        let mut staging = vec![0u8; total as usize];
        for (call, offset) in draws.iter().zip(&offsets) {
            let bytes: &[u8] = bytemuck::cast_slice(&call.uniforms);
            let start = *offset as usize;
            staging[start..start + bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            self.queue.write_buffer(buffer, 0, &staging);
        }

        for call in draws {
            if self.uniforms.groups.contains_key(&call.program) {
                continue;
            }
            let Some(program) = self.programs.get(&call.program) else { continue };
            let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("afterglow uniform bind group"),
                layout: &program.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer,
                        offset: 0,
                        size: NonZeroU64::new(program.block_size()),
                    }),
                }],
            });
            self.uniforms.groups.insert(call.program, group);
        }

        Ok(offsets)
    }

    fn ensure_texture_groups(&mut self, draws: &[DrawCall]) -> Result<(), BackendError> {
        for call in draws {
            let key = (call.program, textures_by_unit(call));
            if self.texture_groups.contains_key(&key) {
                continue;
            }
            let program = self
                .programs
                .get(&call.program)
                .ok_or_else(|| BackendError::InvalidHandle(format!("{:?}", call.program)))?;

            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            }];
            for (unit, texture) in key.1.iter().enumerate() {
                let view = self
                    .targets
                    .values()
                    .find(|t| t.target.color == *texture)
                    .map(|t| &t.view)
                    .ok_or_else(|| BackendError::InvalidHandle(format!("{texture:?}")))?;
                entries.push(wgpu::BindGroupEntry {
                    binding: unit as u32 + 1,
                    resource: wgpu::BindingResource::TextureView(view),
                });
            }

            let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("afterglow texture bind group"),
                layout: &program.texture_layout,
                entries: &entries,
            });
            self.texture_groups.insert(key, group);
        }
        Ok(())
    }

    fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: Option<&wgpu::TextureView>,
        surface_extent: (u32, u32),
        draws: &[DrawCall],
        offsets: &[u32],
    ) -> Result<(), BackendError> {
        for (call, offset) in draws.iter().zip(offsets) {
            let invalid =
                |what: String| BackendError::InvalidHandle(format!("'{}': {what}", call.label));

            let program = self
                .programs
                .get(&call.program)
                .ok_or_else(|| invalid(format!("{:?}", call.program)))?;
            let geometry = self
                .geometries
                .get(&call.geometry)
                .ok_or_else(|| invalid(format!("{:?}", call.geometry)))?;
            let uniform_group = self
                .uniforms
                .groups
                .get(&call.program)
                .ok_or_else(|| invalid("uniform bind group missing".to_owned()))?;
            let texture_group = self
                .texture_groups
                .get(&(call.program, textures_by_unit(call)))
                .ok_or_else(|| invalid("texture bind group missing".to_owned()))?;

            let (view, extent) = match call.destination {
                Destination::Offscreen { framebuffer, .. } => {
                    let t = self
                        .targets
                        .get(&framebuffer)
                        .ok_or_else(|| invalid(format!("{framebuffer:?}")))?;
                    (&t.view, (t.target.width, t.target.height))
                }
                Destination::Surface => {
                    let view = surface_view.ok_or_else(|| {
                        BackendError::Surface("no frame acquired for surface draw".to_owned())
                    })?;
                    (view, surface_extent)
                }
            };

            let width = call.viewport.0.min(extent.0).max(1);
            let height = call.viewport.1.min(extent.1).max(1);

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(call.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
            rpass.set_pipeline(&program.pipeline);
            rpass.set_bind_group(0, uniform_group, &[*offset]);
            rpass.set_bind_group(1, texture_group, &[]);
            rpass.set_vertex_buffer(0, geometry.positions.slice(..));
            rpass.set_vertex_buffer(1, geometry.texcoords.slice(..));
            rpass.set_index_buffer(geometry.indices.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..geometry.index_count, 0, 0..1);
        }
        Ok(())
    }
}

/// Texture ids ordered by unit. `check_interface` guarantees the units are dense.
fn textures_by_unit(call: &DrawCall) -> Vec<TextureId> {
    let mut bindings = call.textures.clone();
    bindings.sort_by_key(|b| b.unit);
    bindings.into_iter().map(|b| b.texture).collect()
}

impl GraphicsBackend for WgpuBackend {
    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<RenderTarget, BackendError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(BackendError::Allocation {
                width,
                height,
                reason: format!("device supports edges of 1..={max}"),
            });
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("afterglow target color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("afterglow target depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let target = RenderTarget {
            width,
            height,
            color: TextureId(self.issue()),
            depth: DepthId(self.issue()),
            framebuffer: FramebufferId(self.issue()),
        };
        self.targets.insert(
            target.framebuffer,
            GpuTarget {
                target,
                view,
                _color: color,
                _depth: depth,
            },
        );
        Ok(target)
    }

    fn destroy_render_target(&mut self, target: &RenderTarget) {
        if self.targets.remove(&target.framebuffer).is_none() {
            log::warn!("destroying unknown target {:?}", target.framebuffer);
            return;
        }
        self.texture_groups
            .retain(|(_, textures), _| !textures.contains(&target.color));
    }

    fn compile_program(
        &mut self,
        source: &ProgramSource<'_>,
    ) -> Result<ProgramHandle, BackendError> {
        validate_program_source(source)?;

        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(source.label),
            source: wgpu::ShaderSource::Wgsl(source.vertex.into()),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(source.label),
            source: wgpu::ShaderSource::Wgsl(source.fragment.into()),
        });

        let uniform_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("afterglow uniform bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(block_size(source.uniform_slots)),
                    },
                    count: None,
                }],
            });

        let mut texture_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        }];
        texture_entries.extend((0..source.texture_units).map(|unit| wgpu::BindGroupLayoutEntry {
            binding: unit + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));
        let texture_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("afterglow texture bgl"),
                entries: &texture_entries,
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(source.label),
                bind_group_layouts: &[&uniform_layout, &texture_layout],
                immediate_size: 0,
            });

        let format = match source.output {
            PassOutput::Offscreen => OFFSCREEN_FORMAT,
            PassOutput::Surface => self.surface_format,
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(source.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some(VERTEX_ENTRY),
                    compilation_options: Default::default(),
                    buffers: &[
                        wgpu::VertexBufferLayout {
                            array_stride: 3 * 4,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes: &POSITION_ATTRS,
                        },
                        wgpu::VertexBufferLayout {
                            array_stride: 2 * 4,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes: &TEXCOORD_ATTRS,
                        },
                    ],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some(FRAGMENT_ENTRY),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        let handle = ProgramHandle(self.issue());
        self.programs.insert(
            handle,
            GpuProgram {
                label: source.label.to_owned(),
                pipeline,
                uniform_layout,
                texture_layout,
                uniform_slots: source.uniform_slots,
                texture_units: source.texture_units,
                output: source.output,
            },
        );
        Ok(handle)
    }

    fn create_geometry(&mut self, quad: &QuadGeometry) -> Result<GeometryHandle, BackendError> {
        let vertices = quad.positions.len() / 3;
        if vertices * 2 != quad.texcoords.len()
            || quad.indices.iter().any(|&i| i as usize >= vertices)
        {
            return Err(BackendError::InvalidHandle(
                "quad attributes do not match its vertex count".to_owned(),
            ));
        }

        // Index buffers must be a multiple of 4 bytes.
        let mut indices = quad.indices.to_vec();
        if indices.len() % 2 == 1 {
            indices.push(0);
        }

        let geometry = GpuGeometry {
            positions: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("afterglow quad positions"),
                contents: bytemuck::cast_slice(quad.positions),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            texcoords: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("afterglow quad texcoords"),
                contents: bytemuck::cast_slice(quad.texcoords),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            indices: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("afterglow quad indices"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: quad.indices.len() as u32,
        };

        let handle = GeometryHandle(self.issue());
        self.geometries.insert(handle, geometry);
        Ok(handle)
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), BackendError> {
        self.check(call).map_err(|reason| BackendError::InvalidDraw {
            label: call.label.to_owned(),
            reason,
        })?;
        self.pending.push(call.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        let draws = std::mem::take(&mut self.pending);
        let frame = self.frame.take();

        if frame.is_none() && draws.iter().any(|d| d.destination == Destination::Surface) {
            return Err(BackendError::Surface(
                "no frame acquired for surface draw".to_owned(),
            ));
        }

        let offsets = self.upload_uniforms(&draws)?;
        self.ensure_texture_groups(&draws)?;

        match frame {
            Some(GpuFrame {
                surface_texture,
                view,
                mut encoder,
            }) => {
                let extent = (
                    surface_texture.texture.width(),
                    surface_texture.texture.height(),
                );
                self.encode(&mut encoder, Some(&view), extent, &draws, &offsets)?;
                self.queue.submit(std::iter::once(encoder.finish()));
                drop(view);
                surface_texture.present();
            }
            None => {
                let mut encoder = self
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("afterglow offscreen encoder"),
                    });
                self.encode(&mut encoder, None, (0, 0), &draws, &offsets)?;
                self.queue.submit(std::iter::once(encoder.finish()));
            }
        }

        log::trace!("flushed {} draws", draws.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) tc: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.position = vec4<f32>(position, 1.0);
    out.uv = vec2<f32>(tc.x, 1.0 - tc.y);
    return out;
}
"#;

    const FRAGMENT: &str = r#"
struct Params {
    resolution: vec4<f32>,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(1) @binding(0) var linear_sampler: sampler;
@group(1) @binding(1) var scene_texture: texture_2d<f32>;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(scene_texture, linear_sampler, uv) * params.resolution.x;
}
"#;

    fn source<'a>(vertex: &'a str, fragment: &'a str, texture_units: u32) -> ProgramSource<'a> {
        ProgramSource {
            label: "test",
            vertex,
            fragment,
            uniform_slots: 1,
            texture_units,
            output: PassOutput::Offscreen,
        }
    }

    #[test]
    fn accepts_matching_program() {
        validate_program_source(&source(VERTEX, FRAGMENT, 1)).unwrap();
    }

    #[test]
    fn syntax_errors_are_compile_errors() {
        let broken = FRAGMENT.replace("return textureSample", "return textureSample(");
        let err = validate_program_source(&source(VERTEX, &broken, 1)).unwrap_err();
        match err {
            BackendError::Compile { stage, log, .. } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn type_errors_are_compile_errors() {
        let broken = VERTEX.replace("out.uv = vec2<f32>(tc.x, 1.0 - tc.y);", "out.uv = 1u;");
        let err = validate_program_source(&source(&broken, FRAGMENT, 1)).unwrap_err();
        assert!(matches!(err, BackendError::Compile { stage: ShaderStage::Vertex, .. }));
    }

    #[test]
    fn missing_entry_point_is_a_link_error() {
        let renamed = FRAGMENT.replace("fn fs_main", "fn main");
        let err = validate_program_source(&source(VERTEX, &renamed, 1)).unwrap_err();
        match err {
            BackendError::Link { log, .. } => assert!(log.contains("fs_main")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bindings_outside_interface_are_link_errors() {
        let err = validate_program_source(&source(VERTEX, FRAGMENT, 0)).unwrap_err();
        match err {
            BackendError::Link { log, .. } => assert!(log.contains("@group(1) @binding(1)")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn block_size_has_one_slot_minimum() {
        assert_eq!(block_size(0), 16);
        assert_eq!(block_size(35), 560);
    }
}
