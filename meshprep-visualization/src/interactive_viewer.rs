//! Interactive mesh viewer
//!
//! Frames are rasterized on the CPU and shown through a wgpu surface. The
//! winit event loop is created on first use and kept for every later window,
//! since a process may only ever create one.

use std::sync::Arc;
use winit::{
    dpi::{LogicalSize, PhysicalPosition, PhysicalSize},
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    platform::run_on_demand::EventLoopExtRunOnDemand,
    window::{Window, WindowBuilder},
};

use image::RgbaImage;
use meshprep_core::{Error, Result, TriangleMesh};
use tracing::{debug, info, warn};

use crate::camera::Camera;
use crate::raster::rasterize;
use crate::renderer::RenderOptions;
use crate::shaders::BLIT_SHADER;

/// Radians of orbit per pixel of mouse drag
const ORBIT_SPEED: f64 = 0.01;
/// Zoom factor per wheel line
const ZOOM_STEP: f64 = 0.9;

/// Window that shows one mesh at a time and blocks until closed
#[derive(Default)]
pub struct InteractiveViewer {
    event_loop: Option<EventLoop<()>>,
}

/// Mouse and camera state of one open window
struct ViewState {
    camera: Camera,
    home: Camera,
    dragging: bool,
    last_cursor: Option<PhysicalPosition<f64>>,
}

impl ViewState {
    fn new(camera: Camera) -> Self {
        Self {
            home: camera.clone(),
            camera,
            dragging: false,
            last_cursor: None,
        }
    }

    fn cursor_moved(&mut self, position: PhysicalPosition<f64>) -> bool {
        let moved = match (self.dragging, self.last_cursor) {
            (true, Some(last)) => {
                let dx = position.x - last.x;
                let dy = position.y - last.y;
                self.camera.orbit(dx * ORBIT_SPEED, dy * ORBIT_SPEED);
                true
            }
            _ => false,
        };
        self.last_cursor = Some(position);
        moved
    }

    fn scrolled(&mut self, delta: MouseScrollDelta) {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, y) => y as f64,
            MouseScrollDelta::PixelDelta(pos) => pos.y / 100.0,
        };
        self.camera.zoom(ZOOM_STEP.powf(lines));
    }

    fn reset(&mut self) {
        let aspect_ratio = self.camera.aspect_ratio;
        self.camera = self.home.clone();
        self.camera.set_aspect_ratio(aspect_ratio);
    }

    fn resized(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            let aspect_ratio = size.width as f64 / size.height as f64;
            self.camera.set_aspect_ratio(aspect_ratio);
            self.home.set_aspect_ratio(aspect_ratio);
        }
    }
}

impl InteractiveViewer {
    pub fn new() -> Self {
        Self::default()
    }

    fn event_loop(&mut self) -> Result<&mut EventLoop<()>> {
        if self.event_loop.is_none() {
            let event_loop = EventLoop::new()
                .map_err(|e| Error::Visualization(format!("Failed to create event loop: {}", e)))?;
            self.event_loop = Some(event_loop);
        }
        self.event_loop
            .as_mut()
            .ok_or_else(|| Error::Visualization("event loop unavailable".to_string()))
    }

    /// Show `mesh` in a new window and return once the user closes it.
    ///
    /// Left drag orbits, the wheel zooms, `R` resets the view and `Esc`
    /// closes the window.
    pub fn show(&mut self, mesh: &TriangleMesh, title: &str, options: &RenderOptions) -> Result<()> {
        let event_loop = self.event_loop()?;

        let window = Arc::new(
            WindowBuilder::new()
                .with_title(title)
                .with_inner_size(LogicalSize::new(
                    options.width.min(1280) as f64,
                    options.height.min(720) as f64,
                ))
                .build(event_loop)
                .map_err(|e| Error::Visualization(format!("Failed to create window: {}", e)))?,
        );

        let mut presenter = pollster::block_on(FramePresenter::new(window.clone()))?;

        let size = window.inner_size();
        let aspect_ratio = size.width.max(1) as f64 / size.height.max(1) as f64;
        let mut state = ViewState::new(Camera::framing(mesh, aspect_ratio, options.zoom));
        let mut failure: Option<Error> = None;

        info!(title, "opened viewer window; close it to continue");

        event_loop
            .run_on_demand(|event, target| {
                target.set_control_flow(ControlFlow::Wait);

                let Event::WindowEvent { event, window_id } = event else {
                    return;
                };
                if window_id != window.id() {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => target.exit(),
                    WindowEvent::Resized(new_size) => {
                        presenter.resize(new_size);
                        state.resized(new_size);
                        window.request_redraw();
                    }
                    WindowEvent::MouseInput {
                        state: button_state,
                        button: MouseButton::Left,
                        ..
                    } => {
                        state.dragging = button_state == ElementState::Pressed;
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        if state.cursor_moved(position) {
                            window.request_redraw();
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        state.scrolled(delta);
                        window.request_redraw();
                    }
                    WindowEvent::KeyboardInput { event, .. }
                        if event.state == ElementState::Pressed =>
                    {
                        match &event.logical_key {
                            Key::Character(c) if c.as_str().eq_ignore_ascii_case("r") => {
                                state.reset();
                                window.request_redraw();
                            }
                            Key::Named(NamedKey::Escape) => target.exit(),
                            _ => {}
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let size = window.inner_size();
                        if size.width == 0 || size.height == 0 {
                            return;
                        }
                        let frame_options = options.clone().with_size(size.width, size.height);
                        let image = rasterize(mesh, &state.camera, &frame_options);
                        if let Err(e) = presenter.present(&image) {
                            failure = Some(e);
                            target.exit();
                        }
                    }
                    _ => {}
                }
            })
            .map_err(|e| Error::Visualization(format!("Event loop error: {}", e)))?;

        debug!(title, "viewer window closed");
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Texture holding the current frame, sized to the window
struct FrameTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

/// Copies CPU frames to the window surface
struct FramePresenter {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    frame: Option<FrameTexture>,
}

impl FramePresenter {
    async fn new(window: Arc<Window>) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            ..Default::default()
        });

        let size = window.inner_size();
        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::Visualization(format!("Failed to create surface: {:?}", e)))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| Error::Visualization("Failed to find suitable adapter".to_string()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("meshprep viewer device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| Error::Visualization(format!("Failed to create device: {}", e)))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| Error::Visualization("Surface reports no formats".to_string()))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("frame_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            pipeline,
            bind_group_layout,
            sampler,
            frame: None,
        })
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.surface_config.width = new_size.width;
            self.surface_config.height = new_size.height;
            self.surface.configure(&self.device, &self.surface_config);
        }
    }

    fn create_frame_texture(&self, width: u32, height: u32) -> FrameTexture {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Frame Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        FrameTexture {
            texture,
            bind_group,
            width,
            height,
        }
    }

    fn present(&mut self, image: &RgbaImage) -> Result<()> {
        let (width, height) = image.dimensions();

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timed out; dropping frame");
                return Ok(());
            }
            Err(e) => {
                return Err(Error::Visualization(format!(
                    "Failed to get surface texture: {:?}",
                    e
                )))
            }
        };

        let frame = match self.frame.take() {
            Some(frame) if frame.width == width && frame.height == height => frame,
            _ => self.create_frame_texture(width, height),
        };
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &frame.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Blit Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &frame.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        self.frame = Some(frame);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshprep_core::Point3d;

    fn state() -> ViewState {
        let points = vec![Point3d::new(-1.0, -1.0, -1.0), Point3d::new(1.0, 1.0, 1.0)];
        ViewState::new(Camera::framing(points.as_slice(), 1.0, 1.0))
    }

    #[test]
    fn test_drag_orbits_only_while_pressed() {
        let mut state = state();
        let start = state.camera.position;

        assert!(!state.cursor_moved(PhysicalPosition::new(10.0, 10.0)));
        assert!(!state.cursor_moved(PhysicalPosition::new(50.0, 10.0)));
        assert_eq!(state.camera.position, start);

        state.dragging = true;
        assert!(state.cursor_moved(PhysicalPosition::new(90.0, 10.0)));
        assert_ne!(state.camera.position, start);
    }

    #[test]
    fn test_scroll_and_reset() {
        let mut state = state();
        let home_distance = state.camera.distance();

        state.scrolled(MouseScrollDelta::LineDelta(0.0, 2.0));
        assert!(state.camera.distance() < home_distance);

        state.resized(PhysicalSize::new(200, 100));
        state.reset();
        assert_eq!(state.camera.position, state.home.position);
        assert_eq!(state.camera.aspect_ratio, 2.0);
    }
}
