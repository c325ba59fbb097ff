// app.rs
//! Window, message loop and frame timing shared by every sample.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::error::{RenderError, Result};
use crate::input::InputState;
use crate::renderer::gpu::GpuContext;
use crate::settings::RenderSettings;
use crate::time::{FrameStats, GameTimer};

/// Per-frame state handed to `Sample::update_scene`.
pub struct FrameContext<'a> {
    pub gpu: &'a GpuContext,
    pub input: &'a InputState,
    pub timer: &'a GameTimer,
    /// Seconds since the previous frame.
    pub dt: f32,
}

impl FrameContext<'_> {
    pub fn total_time(&self) -> f32 {
        self.timer.total_time() as f32
    }
}

/// One tutorial sample driven by `App`.
pub trait Sample {
    fn title(&self) -> &str;

    /// Creates buffers, effects and textures once the device exists.
    fn init(&mut self, gpu: &mut GpuContext) -> Result<()>;

    /// Called after the swap chain was resized.
    fn on_resize(&mut self, gpu: &mut GpuContext) -> Result<()> {
        let _ = gpu;
        Ok(())
    }

    fn update_scene(&mut self, ctx: &mut FrameContext<'_>) -> Result<()>;

    /// Records the frame into `encoder`; `frame_view` is the back buffer.
    fn draw_scene(
        &mut self,
        gpu: &mut GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        frame_view: &wgpu::TextureView,
    ) -> Result<()>;

    /// Extra text appended to the window title.
    fn status(&self) -> Option<String> {
        None
    }
}

pub struct App {
    sample: Box<dyn Sample>,
    settings: RenderSettings,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    timer: GameTimer,
    stats: FrameStats,
    input: InputState,
    paused: bool,
    minimized: bool,
    error: Option<RenderError>,
}

impl App {
    pub fn new(sample: Box<dyn Sample>, settings: RenderSettings) -> Self {
        Self {
            sample,
            settings,
            window: None,
            gpu: None,
            timer: GameTimer::new(),
            stats: FrameStats::new(),
            input: InputState::new(),
            paused: false,
            minimized: false,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let resolution = &self.settings.resolution;
        let attributes = Window::default_attributes()
            .with_title(self.sample.title())
            .with_inner_size(PhysicalSize::new(resolution.width, resolution.height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let mut gpu = pollster::block_on(GpuContext::new(window.clone(), &self.settings))?;
        self.sample.init(&mut gpu)?;
        log::info!("Initialized sample {}", self.sample.title());

        self.timer.reset();
        self.gpu = Some(gpu);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: RenderError) {
        log::error!("{}", err);
        self.error.get_or_insert(err);
        event_loop.exit();
    }

    fn set_paused(&mut self, paused: bool) {
        if paused == self.paused {
            return;
        }
        self.paused = paused;
        if paused {
            self.timer.stop();
        } else {
            self.timer.start();
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        self.minimized = size.width == 0 || size.height == 0;
        self.set_paused(self.minimized);
        if self.minimized {
            return Ok(());
        }
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(size);
            self.sample.on_resize(gpu)?;
        }
        Ok(())
    }

    fn update_title(&mut self) {
        let Some(report) = self.stats.frame(self.timer.total_time()) else {
            return;
        };
        let Some(window) = &self.window else {
            return;
        };
        let mut title = format!(
            "{}    FPS: {:.0}    Frame Time: {:.3} (ms)",
            self.sample.title(),
            report.fps,
            report.ms_per_frame
        );
        if let Some(status) = self.sample.status() {
            title.push_str("    ");
            title.push_str(&status);
        }
        window.set_title(&title);
    }

    fn frame(&mut self) -> Result<()> {
        self.timer.tick();
        if self.paused || self.minimized {
            return Ok(());
        }
        self.update_title();

        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };

        let mut ctx = FrameContext {
            gpu: &*gpu,
            input: &self.input,
            timer: &self.timer,
            dt: self.timer.delta_time() as f32,
        };
        let updated = self.sample.update_scene(&mut ctx);
        // key edges are consumed even when the update fails
        self.input.end_frame();
        updated?;

        let frame = match gpu.acquire_frame() {
            Ok(frame) => frame,
            Err(RenderError::Surface(wgpu::SurfaceError::Timeout)) => {
                log::warn!("Surface timeout, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("FrameEncoder"),
            });

        self.sample.draw_scene(gpu, &mut encoder, &view)?;

        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(|w| w.id()) != Some(id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Err(err) = self.resize(size) {
                    self.fail(event_loop, err);
                }
            }
            WindowEvent::Focused(focused) => {
                if !focused {
                    self.input.clear();
                }
                self.set_paused(!focused || self.minimized);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape && state == ElementState::Pressed {
                    event_loop.exit();
                    return;
                }
                self.input.on_key(code, state);
            }
            WindowEvent::MouseInput { button, state, .. } => {
                self.input.on_mouse_button(button, state);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.input.on_scroll(delta);
            }
            WindowEvent::RedrawRequested => match self.frame() {
                Ok(()) => {}
                Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                    self.fail(event_loop, RenderError::Surface(wgpu::SurfaceError::OutOfMemory));
                }
                Err(err) => {
                    log::error!("Frame failed: {}", err);
                }
            },
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.on_mouse_motion(dx, dy);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // idle until a window event arrives while paused
        if self.paused || self.minimized {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        }
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Opens a window and runs `sample` until it is closed.
pub fn run(sample: Box<dyn Sample>, settings: RenderSettings) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(sample, settings);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => {
            log::info!("Application shutdown complete");
            Ok(())
        }
    }
}
