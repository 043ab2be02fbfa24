//! Windowed viewer: winit event handling and the frame loop

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use cdvis_math::Vec2;
use cdvis_render::builtin_library;
use cdvis_xr::{SimulatedXrBackend, XrSystem};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::gpu::{DesktopPresenter, WgpuBackend};
use crate::input::InputState;
use crate::loader::{BackgroundLoader, LoadEvent};
use crate::scene::ViewerScene;

/// Frames between status lines
const STATUS_INTERVAL: u64 = 300;

/// Everything that exists once the window does
struct Viewer {
    window: Arc<Window>,
    presenter: DesktopPresenter,
    backend: WgpuBackend,
    scene: ViewerScene,
}

pub struct ViewerApp {
    config: AppConfig,
    startup_folder: Option<PathBuf>,
    viewer: Option<Viewer>,
    loader: BackgroundLoader,
    input: InputState,
    frame: u64,
    last_time: Instant,
    error: Option<AppError>,
}

impl ViewerApp {
    pub fn new(config: AppConfig, startup_folder: Option<PathBuf>) -> Self {
        let loader = BackgroundLoader::new(config.loader.workers);
        Self {
            startup_folder: startup_folder.or_else(|| config.volume.folder.clone()),
            config,
            viewer: None,
            loader,
            input: InputState::new(),
            frame: 0,
            last_time: Instant::now(),
            error: None,
        }
    }

    /// Run until the window closes. Startup failures are returned.
    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_viewer(&mut self, event_loop: &ActiveEventLoop) -> Result<Viewer> {
        let display = &self.config.display;
        let attributes = WindowAttributes::default()
            .with_title(display.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(display.width, display.height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let presenter = pollster::block_on(DesktopPresenter::new(window.clone(), display))?;

        let library = match builtin_library() {
            Ok(library) => Arc::new(library),
            Err(e) => {
                log::error!("Shader compilation failed:\n{}", e);
                return Err(e.into());
            }
        };
        let mut backend = WgpuBackend::new(
            presenter.device().clone(),
            presenter.queue().clone(),
            library.clone(),
            presenter.format(),
            presenter.size(),
        );

        let mut scene = ViewerScene::new(&mut backend, &library, &self.config, presenter.size())?;
        if self.config.xr.enabled {
            let mut xr = XrSystem::new(Box::new(SimulatedXrBackend::new()));
            match xr.initialize() {
                Ok(()) => scene.set_xr(xr),
                Err(e) => log::warn!("XR unavailable: {}", e),
            }
        }

        Ok(Viewer {
            window,
            presenter,
            backend,
            scene,
        })
    }

    fn request_volume(&mut self, folder: PathBuf) {
        if let Err(e) = self.loader.load_volume(folder) {
            log::error!("Could not start volume load: {}", e);
        }
    }

    fn pick_volume_folder(&mut self) {
        if let Some(folder) = rfd::FileDialog::new()
            .set_title("Open DICOM folder")
            .pick_folder()
        {
            self.request_volume(folder);
        }
    }

    fn pick_mask_folder(&mut self) {
        let Some(data) = self
            .viewer
            .as_ref()
            .and_then(|v| v.scene.volume_data())
            .cloned()
        else {
            log::warn!("Load a volume before loading a mask");
            return;
        };
        if let Some(folder) = rfd::FileDialog::new()
            .set_title("Open mask folder")
            .pick_folder()
        {
            if let Err(e) = self.loader.load_mask(folder, data) {
                log::error!("Could not start mask load: {}", e);
            }
        }
    }

    /// Hand finished loads to the scene
    fn apply_loads(&mut self) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        for event in self.loader.poll() {
            let applied = match event {
                LoadEvent::Volume { folder, result } => match result {
                    Ok(data) => viewer.scene.apply_volume(&mut viewer.backend, data),
                    Err(e) => {
                        log::error!("Failed to load {}: {}", folder.display(), e);
                        Ok(())
                    }
                },
                LoadEvent::Mask { folder, result } => match result {
                    Ok(data) => viewer.scene.apply_mask(&mut viewer.backend, data),
                    Err(e) => {
                        log::error!("Failed to load mask {}: {}", folder.display(), e);
                        Ok(())
                    }
                },
            };
            if let Err(e) = applied {
                log::error!("Failed to upload volume: {}", e);
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.frame += 1;
        let now = Instant::now();
        let delta = (now - self.last_time).as_secs_f32();
        self.last_time = now;

        self.apply_loads();

        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        let scene = &mut viewer.scene;

        scene.handle_toggles(&self.input);
        let (width, height) = viewer.presenter.size();
        let center = Vec2::new(width as f32 * 0.5, height as f32 * 0.5);
        if let Err(e) = scene.update_desktop(&self.input, delta, center) {
            log::error!("Desktop controls failed: {}", e);
        }
        if let Err(e) = scene.update_xr() {
            log::warn!("XR frame failed: {}", e);
        }
        scene.sync_dials();
        self.input.end_frame();

        let output = match viewer.presenter.acquire_frame() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost) => {
                let size = viewer.presenter.size();
                viewer.presenter.resize(size);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory!");
                event_loop.exit();
                return;
            }
            Err(e) => {
                log::warn!("Surface error: {:?}", e);
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        viewer.backend.begin_frame(view);
        if let Err(e) = viewer.scene.render(&mut viewer.backend) {
            log::warn!("Frame incomplete: {}", e);
        }
        viewer.backend.end_frame();
        output.present();

        if self.frame % STATUS_INTERVAL == 1 {
            log::info!(
                "Frame {}: {:.1} FPS, {} pipelines{}",
                self.frame,
                1.0 / delta.max(f32::EPSILON),
                viewer.backend.pipeline_count(),
                if self.loader.is_busy() { ", loading" } else { "" }
            );
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        match self.create_viewer(event_loop) {
            Ok(viewer) => {
                self.viewer = Some(viewer);
                log::info!("Viewer initialized. O: open folder, P: open mask, ESC: exit");
                log::info!("Left mouse: rotate volume (Shift: roll), Right mouse: look + WASDQE fly, Scroll: dolly");
                log::info!("Z/X threshold, N/M density, K/L exposure, H/J step size, G sample count, F outline, V XR");
                if let Some(folder) = self.startup_folder.take() {
                    self.request_volume(folder);
                }
            }
            Err(e) => {
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Shutdown requested...");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.presenter.resize((size.width, size.height));
                    viewer.backend.resize((size.width, size.height));
                    viewer.scene.resize(size.width, size.height);
                }
            }

            WindowEvent::Focused(false) => self.input.release_all(),

            WindowEvent::ModifiersChanged(modifiers) => {
                self.input.set_modifiers(modifiers.state());
            }

            WindowEvent::KeyboardInput { event, .. } => {
                self.input.handle_key(&event);
                if event.state == ElementState::Pressed && !event.repeat {
                    match event.physical_key {
                        winit::keyboard::PhysicalKey::Code(KeyCode::Escape) => {
                            log::info!("Escape pressed, shutting down...");
                            event_loop.exit();
                        }
                        winit::keyboard::PhysicalKey::Code(KeyCode::KeyO) => self.pick_volume_folder(),
                        winit::keyboard::PhysicalKey::Code(KeyCode::KeyP) => self.pick_mask_folder(),
                        _ => {}
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .set_mouse_position(position.x as f32, position.y as f32);
            }

            WindowEvent::MouseInput { state, button, .. } => {
                self.input.handle_mouse_button(button, state);
            }

            WindowEvent::MouseWheel { delta, .. } => {
                self.input.handle_scroll(delta);
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = &self.viewer {
            viewer.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.scene.release(&mut viewer.backend);
        }
    }
}
