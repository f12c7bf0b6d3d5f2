use std::{sync::Arc, time::Instant};

use anyhow::Context;
use glam::Vec2;
use imgui::{FontConfig, FontSource};
use imgui_winit_support::WinitPlatform;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::EventLoop,
    window::Window,
};

use crate::{config::ViewerConfig, rendering::renderer::Renderer, viewer::Viewer};

struct ImguiState {
    context: imgui::Context,
    platform: WinitPlatform,
}

struct App {
    renderer: Option<Renderer>,
    viewer: Viewer,
    mouse_pos: Vec2,
    imgui: Option<ImguiState>,
    last_frame: Instant,
}

impl App {
    fn from_viewer(viewer: Viewer) -> Self {
        Self {
            renderer: None,
            viewer,
            mouse_pos: Vec2::ZERO,
            imgui: None,
            last_frame: Instant::now(),
        }
    }

    fn setup_imgui(&mut self, window: &Window) {
        let mut context = imgui::Context::create();
        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(
            context.io_mut(),
            &window,
            imgui_winit_support::HiDpiMode::Default,
        );

        let font_size = 14.0;
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);

        // Disable INI support because it's broken in the published version of imgui
        context.set_ini_filename(None);

        self.imgui = Some(ImguiState { context, platform });
    }

    /// Routing for a left press: panel chrome first, then orbit. The
    /// panel consumes anything inside its rectangle.
    fn handle_mouse_press(&mut self) {
        let on_panel = self
            .viewer
            .panel
            .as_mut()
            .map(|panel| panel.pointer_pressed(self.mouse_pos))
            .unwrap_or(false);

        let imgui_wants_mouse = self
            .imgui
            .as_ref()
            .map(|imgui| imgui.context.io().want_capture_mouse)
            .unwrap_or(false);

        if !on_panel && !imgui_wants_mouse {
            self.viewer.controls.set_rotating(true);
        }
    }

    fn handle_mouse_release(&mut self) {
        if let Some(panel) = self.viewer.panel.as_mut() {
            panel.pointer_released();
        }
        self.viewer.controls.set_rotating(false);
    }

    fn handle_cursor_moved(&mut self, position: Vec2) {
        self.mouse_pos = position;

        let panel_dragging = self
            .viewer
            .panel
            .as_mut()
            .map(|panel| {
                panel.pointer_moved(position);
                panel.is_dragging()
            })
            .unwrap_or(false);

        if !panel_dragging {
            self.viewer.controls.cursor_moved(position);
        }
    }

    fn redraw(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        let imgui = self.imgui.as_mut().unwrap();

        let delta_time = self.last_frame.elapsed();
        let dt = delta_time.as_secs_f32();
        imgui.context.io_mut().update_delta_time(delta_time);
        self.last_frame = Instant::now();

        let renderer = self.renderer.as_mut().unwrap();
        renderer.window.request_redraw();

        if let Err(error) = imgui
            .platform
            .prepare_frame(imgui.context.io_mut(), &renderer.window)
        {
            log::error!("Failed to prepare imgui frame: {}", error);
            return;
        }

        self.viewer.pump_loader();
        renderer.sync_models(&self.viewer.scene);
        self.viewer.advance(dt);

        let ui = imgui.context.new_frame();
        let selection = self.viewer.panel.as_mut().and_then(|panel| panel.draw(ui));
        if let Some(name) = selection {
            self.viewer.request_model(&name);
        }
        self.viewer.stats.draw_ui(ui);

        match renderer.render(&self.viewer.camera, &self.viewer.scene, &mut imgui.context) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.resize(renderer.size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                event_loop.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
            }
            Err(other) => {
                log::error!("Unexpected error: {:?}", other);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        let window_attributes = Window::default_attributes()
            .with_title("Model Viewer")
            .with_inner_size(LogicalSize::new(960.0, 540.0));
        let window = event_loop
            .create_window(window_attributes)
            .expect("Failed to create window");
        self.setup_imgui(&window);

        let renderer = pollster::block_on(Renderer::new(
            Arc::new(window),
            &self.viewer.camera,
            &mut self.imgui.as_mut().unwrap().context,
        ))
        .expect("Failed to create renderer");
        self.renderer = Some(renderer);
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(new_size);
                }
            }
            WindowEvent::RedrawRequested => {
                if self.renderer.is_some() {
                    self.redraw(event_loop);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.handle_mouse_press(),
                ElementState::Released => self.handle_mouse_release(),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let imgui_wants_mouse = self
                    .imgui
                    .as_ref()
                    .map(|imgui| imgui.context.io().want_capture_mouse)
                    .unwrap_or(false);
                if !imgui_wants_mouse {
                    let lines = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(position) => position.y as f32 / 50.0,
                    };
                    self.viewer.controls.scroll(lines);
                }
            }
            _ => (),
        }

        if let (Some(renderer), Some(imgui)) = (self.renderer.as_mut(), self.imgui.as_mut()) {
            let window = renderer.window.as_ref();
            imgui.platform.handle_event::<()>(
                imgui.context.io_mut(),
                &window,
                &Event::WindowEvent { window_id, event },
            );
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let viewer = Viewer::new(ViewerConfig::default()).context("Failed to create viewer")?;
    let mut app = App::from_viewer(viewer);
    event_loop.run_app(&mut app)?;

    Ok(())
}
