use crate::batch::{
    DrawBatch, DrawKind, DrawUniform, GpuVertex, MAX_SHADOW_MAPS, ShadowUniform, build_batches,
    frame_setup,
};
use crate::platform::{Gpu, WgpuPlatform};
use crate::shaders;
use crate::target::{COLOR_FORMAT, DEPTH_FORMAT, RenderTarget};
use glam::Mat4;
use offrender_render::{
    ColorImage, DepthImage, Platform, RenderError, RenderFlags, RenderOutput, SceneRenderer,
};
use offrender_scene::{IntrinsicsCamera, Scene};
use wgpu::util::DeviceExt;

const SHADOW_MAP_SIZE: u32 = 2048;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4];
const POSITION_ATTRIBUTE: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

fn vertex_layout(
    step_mode: wgpu::VertexStepMode,
    attributes: &[wgpu::VertexAttribute],
) -> wgpu::VertexBufferLayout<'_> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuVertex>() as u64,
        step_mode,
        attributes,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

struct Pipelines {
    fill_cull: wgpu::RenderPipeline,
    fill_nocull: wgpu::RenderPipeline,
    lines: wgpu::RenderPipeline,
    points: wgpu::RenderPipeline,
    shadow: wgpu::RenderPipeline,
}

impl Pipelines {
    fn new(
        device: &wgpu::Device,
        globals_layout: &wgpu::BindGroupLayout,
        draw_layout: &wgpu::BindGroupLayout,
        shadow_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });
        let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SHADOW_SHADER.into()),
        });

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[globals_layout, draw_layout],
            push_constant_ranges: &[],
        });
        let shadow_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow_pipeline_layout"),
            bind_group_layouts: &[shadow_layout, draw_layout],
            push_constant_ranges: &[],
        });

        let scene_pipeline = |label: &str,
                              entry_point: &str,
                              step_mode: wgpu::VertexStepMode,
                              topology: wgpu::PrimitiveTopology,
                              cull_mode: Option<wgpu::Face>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&scene_layout),
                vertex: wgpu::VertexState {
                    module: &scene_shader,
                    entry_point: Some(entry_point),
                    compilation_options: Default::default(),
                    buffers: &[vertex_layout(step_mode, &VERTEX_ATTRIBUTES)],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &scene_shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: COLOR_FORMAT,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    cull_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        };

        let vertex = wgpu::VertexStepMode::Vertex;
        let triangles = wgpu::PrimitiveTopology::TriangleList;
        let fill_cull = scene_pipeline(
            "fill_pipeline",
            "vs_main",
            vertex,
            triangles,
            Some(wgpu::Face::Back),
        );
        let fill_nocull =
            scene_pipeline("fill_nocull_pipeline", "vs_main", vertex, triangles, None);
        let lines = scene_pipeline(
            "line_pipeline",
            "vs_main",
            vertex,
            wgpu::PrimitiveTopology::LineList,
            None,
        );
        // One instance per point, six generated corners each.
        let points = scene_pipeline(
            "point_pipeline",
            "vs_point",
            wgpu::VertexStepMode::Instance,
            triangles,
            None,
        );

        let shadow = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow_pipeline"),
            layout: Some(&shadow_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shadow_shader,
                entry_point: Some("vs_shadow"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout(wgpu::VertexStepMode::Vertex, &POSITION_ATTRIBUTE)],
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: triangles,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        Self {
            fill_cull,
            fill_nocull,
            lines,
            points,
            shadow,
        }
    }
}

/// Device objects owned by a live renderer.
struct Resources {
    pipelines: Pipelines,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    draw_layout: wgpu::BindGroupLayout,
    shadow_buffers: Vec<wgpu::Buffer>,
    shadow_bind_groups: Vec<wgpu::BindGroup>,
    shadow_layer_views: Vec<wgpu::TextureView>,
    /// Offscreen target, created on first use and replaced on resize.
    target: Option<RenderTarget>,
}

impl Resources {
    fn new(device: &wgpu::Device) -> Self {
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_bind_group_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_bind_group_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow_bind_group_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let shadow_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_maps"),
            size: wgpu::Extent3d {
                width: SHADOW_MAP_SIZE,
                height: SHADOW_MAP_SIZE,
                depth_or_array_layers: MAX_SHADOW_MAPS as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let shadow_array_view = shadow_texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadow_maps_array"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let shadow_layer_views = (0..MAX_SHADOW_MAPS as u32)
            .map(|layer| {
                shadow_texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("shadow_map_layer"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals_buffer"),
            size: std::mem::size_of::<crate::batch::GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout: &globals_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_array_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });

        let shadow_buffers: Vec<wgpu::Buffer> = (0..MAX_SHADOW_MAPS)
            .map(|_| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("shadow_pass_buffer"),
                    contents: bytemuck::bytes_of(&ShadowUniform {
                        view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                    }),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                })
            })
            .collect();
        let shadow_bind_groups = shadow_buffers
            .iter()
            .map(|buffer| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("shadow_pass_bind_group"),
                    layout: &shadow_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                })
            })
            .collect();

        let pipelines = Pipelines::new(device, &globals_layout, &draw_layout, &shadow_layout);

        Self {
            pipelines,
            globals_buffer,
            globals_bind_group,
            draw_layout,
            shadow_buffers,
            shadow_bind_groups,
            shadow_layer_views,
            target: None,
        }
    }

    fn ensure_target(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.target.as_ref().map(RenderTarget::size) != Some((width, height)) {
            tracing::debug!(width, height, "allocating offscreen target");
            self.target = Some(RenderTarget::new(device, width, height));
        }
    }
}

/// A batch uploaded to the device.
struct GpuBatch {
    kind: DrawKind,
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
    count: u32,
    bind_group: wgpu::BindGroup,
    casts_shadow: bool,
}

fn upload(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, batch: &DrawBatch) -> GpuBatch {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("batch_vertex_buffer"),
        contents: bytemuck::cast_slice(&batch.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let (index_buffer, count) = match batch.kind {
        DrawKind::Points => (None, batch.vertices.len() as u32),
        DrawKind::Triangles | DrawKind::Lines => {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("batch_index_buffer"),
                contents: bytemuck::cast_slice(&batch.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (Some(buffer), batch.indices.len() as u32)
        }
    };
    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("batch_uniform_buffer"),
        contents: bytemuck::bytes_of::<DrawUniform>(&batch.uniform),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("batch_bind_group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });
    GpuBatch {
        kind: batch.kind,
        vertex_buffer,
        index_buffer,
        count,
        bind_group,
        casts_shadow: batch.casts_shadow,
    }
}

fn is_drawable(batch: &DrawBatch) -> bool {
    match batch.kind {
        DrawKind::Points => !batch.vertices.is_empty(),
        DrawKind::Triangles | DrawKind::Lines => {
            !batch.vertices.is_empty() && !batch.indices.is_empty()
        }
    }
}

/// Scene renderer drawing with wgpu into either its own offscreen target or
/// the platform's default target.
pub struct WgpuSceneRenderer {
    width: u32,
    height: u32,
    point_size: f32,
    resources: Option<Resources>,
    /// Camera and alpha mode of the last default-target render, needed to
    /// interpret a later readback.
    last_camera: Option<IntrinsicsCamera>,
    keep_alpha: bool,
}

impl WgpuSceneRenderer {
    pub fn new(gpu: &Gpu, width: u32, height: u32) -> Result<Self, RenderError> {
        let resources = gpu.validated(|| Ok(Resources::new(&gpu.device)))?;
        tracing::debug!(width, height, "scene renderer created");
        Ok(Self {
            width,
            height,
            point_size: 1.0,
            resources: Some(resources),
            last_camera: None,
            keep_alpha: false,
        })
    }

    fn render_validated(
        &mut self,
        gpu: &Gpu,
        scene: &Scene,
        flags: RenderFlags,
    ) -> Result<Option<RenderOutput>, RenderError> {
        let resources = self.resources.as_mut().ok_or(RenderError::NoContext)?;

        if !flags.contains(RenderFlags::OFFSCREEN) {
            let camera = Self::draw_frame(
                resources,
                gpu,
                &gpu.default_target,
                scene,
                self.point_size,
                flags,
            )?;
            self.last_camera = Some(camera);
            self.keep_alpha = flags.contains(RenderFlags::RGBA);
            return Ok(None);
        }

        resources.ensure_target(&gpu.device, self.width, self.height);
        let Some(target) = resources.target.as_ref() else {
            return Err(RenderError::NoContext);
        };
        let camera = Self::draw_frame(resources, gpu, target, scene, self.point_size, flags)?;

        let (width, height) = target.size();
        let raw_depth = target.read_depth(&gpu.device, &gpu.queue, gpu.depth_resolve.as_ref())?;
        let depth = linear_depth_image(&camera, width, height, raw_depth);
        if flags.contains(RenderFlags::DEPTH_ONLY) {
            return Ok(Some(RenderOutput::DepthOnly(depth)));
        }
        let rgba = target.read_color(&gpu.device, &gpu.queue)?;
        let color = ColorImage::from_rgba8(width, height, &rgba, flags.contains(RenderFlags::RGBA));
        Ok(Some(RenderOutput::ColorDepth { color, depth }))
    }

    fn draw_frame(
        resources: &Resources,
        gpu: &Gpu,
        target: &RenderTarget,
        scene: &Scene,
        point_size: f32,
        flags: RenderFlags,
    ) -> Result<IntrinsicsCamera, RenderError> {
        let (width, height) = target.size();
        let setup = frame_setup(scene, width, height, point_size, flags)?;
        let batches: Vec<GpuBatch> = build_batches(scene, flags)
            .iter()
            .filter(|b| is_drawable(b))
            .map(|b| upload(&gpu.device, &resources.draw_layout, b))
            .collect();
        tracing::trace!(
            batches = batches.len(),
            shadow_passes = setup.shadow_passes.len(),
            width,
            height,
            "drawing frame"
        );

        gpu.queue
            .write_buffer(&resources.globals_buffer, 0, bytemuck::bytes_of(&setup.globals));
        for (layer, view_proj) in &setup.shadow_passes {
            gpu.queue.write_buffer(
                &resources.shadow_buffers[*layer as usize],
                0,
                bytemuck::bytes_of(&ShadowUniform {
                    view_proj: view_proj.to_cols_array_2d(),
                }),
            );
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        for (layer, _) in &setup.shadow_passes {
            let layer = *layer as usize;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &resources.shadow_layer_views[layer],
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_pipeline(&resources.pipelines.shadow);
            pass.set_bind_group(0, &resources.shadow_bind_groups[layer], &[]);
            for batch in batches.iter().filter(|b| b.casts_shadow) {
                let Some(index_buffer) = &batch.index_buffer else {
                    continue;
                };
                pass.set_bind_group(1, &batch.bind_group, &[]);
                pass.set_vertex_buffer(0, batch.vertex_buffer.slice(..));
                pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..batch.count, 0, 0..1);
            }
        }

        {
            let bg = scene.bg_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: bg.x as f64,
                            g: bg.y as f64,
                            b: bg.z as f64,
                            a: bg.w as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: target.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_bind_group(0, &resources.globals_bind_group, &[]);

            let fill = if flags.contains(RenderFlags::SKIP_CULL_FACES) {
                &resources.pipelines.fill_nocull
            } else {
                &resources.pipelines.fill_cull
            };
            for batch in &batches {
                pass.set_bind_group(1, &batch.bind_group, &[]);
                pass.set_vertex_buffer(0, batch.vertex_buffer.slice(..));
                match (&batch.kind, &batch.index_buffer) {
                    (DrawKind::Points, _) => {
                        pass.set_pipeline(&resources.pipelines.points);
                        pass.draw(0..6, 0..batch.count);
                    }
                    (kind, Some(index_buffer)) => {
                        pass.set_pipeline(if *kind == DrawKind::Lines {
                            &resources.pipelines.lines
                        } else {
                            fill
                        });
                        pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..batch.count, 0, 0..1);
                    }
                    (_, None) => {}
                }
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(setup.camera)
    }
}

fn linear_depth_image(
    camera: &IntrinsicsCamera,
    width: u32,
    height: u32,
    raw: Vec<f32>,
) -> DepthImage {
    DepthImage {
        width,
        height,
        data: raw.into_iter().map(|d| camera.linear_depth(d)).collect(),
    }
}

impl SceneRenderer for WgpuSceneRenderer {
    type Platform = WgpuPlatform;

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn set_point_size(&mut self, size: f32) {
        self.point_size = size;
    }

    fn render(
        &mut self,
        platform: &mut WgpuPlatform,
        scene: &Scene,
        flags: RenderFlags,
    ) -> Result<Option<RenderOutput>, RenderError> {
        platform.make_current()?;
        let gpu = platform.gpu()?;
        gpu.validated(|| self.render_validated(gpu, scene, flags))
    }

    fn read_color_buf(&mut self, platform: &mut WgpuPlatform) -> Result<ColorImage, RenderError> {
        let gpu = platform.gpu()?;
        let target = &gpu.default_target;
        let (width, height) = target.size();
        let rgba = gpu.validated(|| target.read_color(&gpu.device, &gpu.queue))?;
        Ok(ColorImage::from_rgba8(width, height, &rgba, self.keep_alpha))
    }

    fn read_depth_buf(&mut self, platform: &mut WgpuPlatform) -> Result<DepthImage, RenderError> {
        let camera = self
            .last_camera
            .ok_or_else(|| RenderError::Readback("nothing rendered yet".into()))?;
        let gpu = platform.gpu()?;
        let target = &gpu.default_target;
        let (width, height) = target.size();
        let raw = gpu.validated(|| {
            target.read_depth(&gpu.device, &gpu.queue, gpu.depth_resolve.as_ref())
        })?;
        Ok(linear_depth_image(&camera, width, height, raw))
    }

    fn delete(&mut self, platform: &mut WgpuPlatform) {
        if self.resources.take().is_some() {
            if let Ok(gpu) = platform.gpu() {
                let _ = gpu.device.poll(wgpu::Maintain::Wait);
            }
            self.last_camera = None;
            tracing::debug!("scene renderer released");
        }
    }
}
