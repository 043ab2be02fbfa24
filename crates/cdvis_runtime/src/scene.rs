//! The viewer's scene: camera, volume, outline and the controller widgets
//!
//! ```text
//! root ─┬─ camera
//!       ├─ volume            (outline drawn on the same node)
//!       ├─ dial x3 ── dial mesh
//!       ├─ pie menu ── menu mesh
//!       ├─ clip marker
//!       └─ rig ── tracked devices
//! ```
//!
//! One frame runs desktop controls, XR interaction, dial sync and then
//! draws everything in queue order.

use cdvis_core::HandleError;
use cdvis_dicom::VolumeData;
use cdvis_math::{radians, Aabb, Obb, Transform, Vec2, Vec3, Vec4};
use cdvis_render::{
    draw_sorted, queue, Extent3d, Frame, GpuBackend, MeshRenderer, RenderContext, Renderer, Volume,
    VolumeParameters,
};
use cdvis_scene::{Camera, NodeId, SceneGraph};
use cdvis_shader::ShaderLibrary;
use cdvis_xr::{
    clip_plane, Buttons, DeviceRole, Dial, Interactable, InteractionEngine, PieMenu, Tool, TrackedDevice, XrSystem,
};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::config::AppConfig;
use crate::controls::{dolly_offset, drag_rotation, fly_axes, fly_offset, FlyCamera, ParameterNudge};
use crate::error::Result;
use crate::input::InputState;

/// Scale of the volume node before a scan is loaded
pub const INITIAL_VOLUME_SCALE: f32 = 0.5;

const OUTLINE_COLOR: Vec4 = Vec4::new(1.0, 1.0, 1.0, 1.0);
const MENU_COLOR: Vec4 = Vec4::new(0.2, 0.6, 1.0, 1.0);
const CLIP_MARKER_COLOR: Vec4 = Vec4::new(1.0, 0.3, 0.3, 1.0);

/// Touchpad positions closer to the center than this count as untouched
const TOUCHPAD_DEADZONE: f32 = 0.05;

/// Which volume parameter a dial drives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialBinding {
    Threshold,
    Density,
    Exposure,
}

impl DialBinding {
    fn get(&self, params: &VolumeParameters) -> f32 {
        match self {
            DialBinding::Threshold => params.threshold,
            DialBinding::Density => params.density,
            DialBinding::Exposure => params.exposure,
        }
    }

    fn set(&self, volume: &mut Volume, value: f32) {
        match self {
            DialBinding::Threshold => volume.set_threshold(value),
            DialBinding::Density => volume.set_density(value),
            DialBinding::Exposure => volume.set_exposure(value),
        }
    }
}

struct DialWidget {
    dial: Dial,
    binding: DialBinding,
    renderer: MeshRenderer,
    /// Dial value after the last sync
    synced: f32,
}

/// Lets a controller grab and move the volume node
struct VolumeGrab {
    node: NodeId,
    bounds: Aabb,
}

impl Interactable for VolumeGrab {
    fn node(&self) -> NodeId {
        self.node
    }

    fn bounds(&self, graph: &mut SceneGraph) -> std::result::Result<Obb, HandleError> {
        let world = graph.world(self.node)?;
        Ok(self
            .bounds
            .to_world(&world.object_to_world, world.scale, world.rotation))
    }

    fn draggable(&self) -> bool {
        true
    }
}

pub struct ViewerScene {
    graph: SceneGraph,
    context: RenderContext,
    camera: Camera,
    fly: FlyCamera,
    volume: Volume,
    outline: MeshRenderer,
    draw_outline: bool,
    grab: VolumeGrab,
    dials: Vec<DialWidget>,
    menu: PieMenu,
    menu_renderer: MeshRenderer,
    clip_marker: MeshRenderer,
    tool: Tool,
    engine: InteractionEngine,
    rig: NodeId,
    xr: Option<XrSystem>,
    xr_active: bool,
    data: Option<VolumeData>,
}

impl ViewerScene {
    pub fn new(
        backend: &mut dyn GpuBackend,
        library: &ShaderLibrary,
        config: &AppConfig,
        size: (u32, u32),
    ) -> Result<Self> {
        let context = RenderContext::new(backend, library)?;
        let mut graph = SceneGraph::new();

        let camera_node = graph.create_with(
            "camera",
            Transform::from_position(Vec3::from_array(config.camera.position)),
        );
        let mut camera = Camera::new(camera_node, size.0, size.1);
        camera.set_field_of_view(radians(config.camera.fov_degrees));
        camera.set_clip_planes(config.camera.near, config.camera.far);
        camera.look_at(&mut graph, Vec3::ZERO)?;
        let fly = FlyCamera::from_rotation(graph.world_rotation(camera_node)?);

        let volume_node = graph.create_with(
            "volume",
            Transform::IDENTITY.with_scale(Vec3::splat(INITIAL_VOLUME_SCALE)),
        );
        let volume = Volume::with_parameters(volume_node, &context, config.volume.parameters());

        let mut outline = MeshRenderer::new(
            volume_node,
            context.wire_cube,
            context.cube_bounds,
            context.unlit_program.clone(),
        );
        outline.set_color(OUTLINE_COLOR);

        let dial_specs = [
            ("Threshold", DialBinding::Threshold, (0.0, 1.0, 20), Vec4::new(0.9, 0.9, 0.9, 1.0)),
            ("Density", DialBinding::Density, (0.0, 2.0, 40), Vec4::new(1.0, 0.6, 0.2, 1.0)),
            ("Exposure", DialBinding::Exposure, (0.0, 5.0, 50), Vec4::new(1.0, 0.9, 0.3, 1.0)),
        ];
        let mut dials = Vec::with_capacity(dial_specs.len());
        for (i, (label, binding, (min, max, steps), color)) in dial_specs.into_iter().enumerate() {
            let position = Vec3::new(-0.15 + 0.15 * i as f32, -0.35, -0.3);
            let node = graph.create_with(label, Transform::from_position(position));
            let mesh_node = graph.create_child(node, "dial mesh")?;
            let diameter = Dial::DEFAULT_RADIUS * 2.0;
            graph.set_local_scale(mesh_node, Vec3::new(diameter, 0.02, diameter))?;

            let mut dial = Dial::new(node, label).with_range(min, max, steps);
            dial.set_value(binding.get(volume.parameters()));
            let mut renderer =
                MeshRenderer::new(mesh_node, context.cube, context.cube_bounds, context.unlit_program.clone());
            renderer.set_color(color);
            renderer.set_visible(false);
            dials.push(DialWidget {
                synced: dial.value(),
                dial,
                binding,
                renderer,
            });
        }

        let menu_node = graph.create("pie menu");
        let menu_mesh = graph.create_child(menu_node, "pie menu mesh")?;
        let diameter = PieMenu::DEFAULT_RADIUS * 2.0;
        graph.set_local_scale(menu_mesh, Vec3::new(diameter, diameter, 0.02))?;
        let menu = PieMenu::new(menu_node, Tool::ALL.iter().map(Tool::label));
        let mut menu_renderer =
            MeshRenderer::new(menu_mesh, context.cube, context.cube_bounds, context.unlit_program.clone());
        menu_renderer.set_color(MENU_COLOR);
        menu_renderer.set_render_queue(queue::OVERLAY);
        menu_renderer.set_visible(false);

        let marker_node = graph.create("clip marker");
        let mut clip_marker =
            MeshRenderer::new(marker_node, context.cube, context.cube_bounds, context.unlit_program.clone());
        clip_marker.set_color(CLIP_MARKER_COLOR);
        clip_marker.set_visible(false);

        let rig = graph.create("rig");

        log::info!("Viewer scene ready: camera at {:?}", config.camera.position);
        Ok(Self {
            grab: VolumeGrab {
                node: volume_node,
                bounds: context.cube_bounds,
            },
            engine: InteractionEngine::new(config.xr.interaction()),
            graph,
            context,
            camera,
            fly,
            volume,
            outline,
            draw_outline: true,
            dials,
            menu,
            menu_renderer,
            clip_marker,
            tool: Tool::default(),
            rig,
            xr: None,
            xr_active: false,
            data: None,
        })
    }

    /// Attach an initialized XR session. Device processing starts enabled.
    pub fn set_xr(&mut self, xr: XrSystem) {
        self.xr = Some(xr);
        self.xr_active = true;
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn volume_data(&self) -> Option<&VolumeData> {
        self.data.as_ref()
    }

    pub fn camera_node(&self) -> NodeId {
        self.camera.node()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn is_xr_active(&self) -> bool {
        self.xr.is_some() && self.xr_active
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.resize(width, height);
    }

    // Loading

    /// Upload a freshly loaded scan and size the volume node to it
    pub fn apply_volume(&mut self, backend: &mut dyn GpuBackend, data: VolumeData) -> Result<()> {
        let extent = Extent3d::new(data.width, data.height, data.depth);
        self.volume.set_source(backend, extent, &data.voxels)?;
        self.volume.set_mask_enabled(data.mask);
        self.graph.set_local_scale(self.volume.node(), data.size)?;
        log::info!(
            "Volume is {}x{}x{}, {:.3}m x {:.3}m x {:.3}m",
            data.width,
            data.height,
            data.depth,
            data.size.x,
            data.size.y,
            data.size.z
        );
        self.data = Some(data);
        Ok(())
    }

    /// Replace the source with a copy that carries a mask. Ignored if the
    /// scan it was made from has since been replaced.
    pub fn apply_mask(&mut self, backend: &mut dyn GpuBackend, data: VolumeData) -> Result<()> {
        let matches = self.data.as_ref().is_some_and(|current| {
            (current.width, current.height, current.depth) == (data.width, data.height, data.depth)
        });
        if !matches {
            log::warn!("Mask no longer matches the loaded volume, ignoring");
            return Ok(());
        }
        self.volume.write_source(backend, &data.voxels)?;
        self.volume.set_mask_enabled(true);
        self.data = Some(data);
        log::info!("Mask applied");
        Ok(())
    }

    // Desktop

    /// G, F and V toggles
    pub fn handle_toggles(&mut self, input: &InputState) {
        if input.was_key_pressed(KeyCode::KeyG) {
            let enabled = !self.volume.parameters().display_sample_count;
            self.volume.set_display_sample_count(enabled);
            log::info!("Display sample count: {}", if enabled { "ON" } else { "OFF" });
        }
        if input.was_key_pressed(KeyCode::KeyF) {
            self.draw_outline = !self.draw_outline;
            log::info!("Volume outline: {}", if self.draw_outline { "ON" } else { "OFF" });
        }
        if input.was_key_pressed(KeyCode::KeyV) {
            if self.xr.is_some() {
                self.xr_active = !self.xr_active;
                log::info!("XR device processing: {}", if self.xr_active { "ON" } else { "OFF" });
            } else {
                log::info!("XR is not enabled");
            }
        }
    }

    /// Mouse and held-key controls. `window_center` is in the same pixel
    /// space as the cursor.
    pub fn update_desktop(&mut self, input: &InputState, dt: f32, window_center: Vec2) -> Result<()> {
        let camera_node = self.camera.node();
        let camera_rotation = self.graph.world_rotation(camera_node)?;
        let mouse_delta = input.mouse_delta();

        if input.is_mouse_held(MouseButton::Left) {
            let roll = input.shift().then(|| input.mouse_position() - window_center);
            if let Some(delta) = drag_rotation(camera_rotation, mouse_delta, roll) {
                let node = self.volume.node();
                let local = self.graph.local(node)?.rotation;
                self.graph.set_local_rotation(node, (delta * local).normalize())?;
            }
        }

        if input.is_mouse_held(MouseButton::Right) {
            self.fly.look(mouse_delta);
            self.graph.set_local_rotation(camera_node, self.fly.rotation())?;
            let offset = fly_offset(self.fly.rotation(), fly_axes(input), input.shift(), dt);
            if offset != Vec3::ZERO {
                let position = self.graph.local(camera_node)?.position;
                self.graph.set_local_position(camera_node, position + offset)?;
            }
        }

        let lines = input.scroll_lines();
        if lines != 0.0 {
            let rotation = self.graph.world_rotation(camera_node)?;
            let position = self.graph.local(camera_node)?.position;
            self.graph
                .set_local_position(camera_node, position + dolly_offset(rotation, lines))?;
        }

        let nudge = ParameterNudge::from_input(input, dt);
        if !nudge.is_empty() {
            nudge.apply(&mut self.volume);
        }
        Ok(())
    }

    // XR

    /// Poll devices, run interaction, the pie menu and the clip plane tool
    pub fn update_xr(&mut self) -> Result<()> {
        let Some(xr) = self.xr.as_mut() else {
            return Ok(());
        };
        if !self.xr_active {
            return Ok(());
        }

        xr.begin_frame(&mut self.graph, self.rig)?;

        let mut targets: Vec<&mut dyn Interactable> = Vec::with_capacity(1 + self.dials.len());
        targets.push(&mut self.grab);
        for widget in self.dials.iter_mut() {
            targets.push(&mut widget.dial);
        }
        self.engine.update(&mut self.graph, xr.devices_mut(), &mut targets)?;
        drop(targets);
        for event in self.engine.drain_events() {
            log::trace!("{:?} on {:?} by device {}", event.kind, event.node, event.device);
        }

        let dragging = self.engine.is_dragging();
        let tool_device = tool_controller(xr.devices());
        match tool_device {
            Some(device) if device.is_tracked() => {
                let world = self.graph.world(device.node())?;

                // pie menu follows the tool controller while the pad is touched
                let touched = device.touchpad().length() > TOUCHPAD_DEADZONE;
                self.menu.set_visible(touched);
                if touched {
                    self.graph.set_local_position(self.menu.node(), world.position)?;
                    self.graph.set_local_rotation(self.menu.node(), world.rotation)?;
                    self.menu.update_touchpad(device.touchpad());
                    if device.pressed_edge(Buttons::TOUCHPAD) {
                        if let Some(tool) = self.menu.select_hovered().and_then(Tool::from_slice) {
                            self.tool = tool;
                            log::info!("Tool: {}", tool.label());
                        }
                    }
                }

                let marker = self.clip_marker.node();
                self.graph.set_local_position(marker, world.position)?;
                self.graph.set_local_rotation(marker, world.rotation)?;
                self.graph.set_local_scale(marker, Vec3::new(0.2, 0.2, 0.002))?;
                self.clip_marker.set_visible(self.tool == Tool::ClipPlane);

                if let Some((point, normal)) =
                    clip_plane(self.tool, device, dragging, &mut self.graph, self.volume.node())?
                {
                    self.volume.set_plane(point, normal);
                }
            }
            _ => {
                self.menu.set_visible(false);
                self.clip_marker.set_visible(false);
            }
        }

        xr.end_frame()?;
        Ok(())
    }

    /// Push dial changes into the volume, then pull the volume's values
    /// back so the dials follow keyboard edits
    pub fn sync_dials(&mut self) {
        for widget in &mut self.dials {
            if widget.dial.value() != widget.synced {
                widget.binding.set(&mut self.volume, widget.dial.value());
            } else {
                widget
                    .dial
                    .set_value(widget.binding.get(self.volume.parameters()));
            }
            widget.synced = widget.dial.value();
        }
    }

    pub fn dial_value(&self, binding: DialBinding) -> Option<f32> {
        self.dials
            .iter()
            .find(|w| w.binding == binding)
            .map(|w| w.dial.value())
    }

    // Drawing

    pub fn render(&mut self, backend: &mut dyn GpuBackend) -> Result<()> {
        let xr_visible = self.is_xr_active();
        for widget in &mut self.dials {
            widget.renderer.set_visible(xr_visible);
        }
        self.menu_renderer
            .set_visible(xr_visible && self.menu.is_visible());
        if !xr_visible {
            self.clip_marker.set_visible(false);
        }
        self.outline.set_visible(self.draw_outline);

        let camera = self.camera.matrices(&mut self.graph)?;
        let mut frame = Frame {
            context: &self.context,
            graph: &mut self.graph,
            camera,
            backend,
        };

        let mut renderers: Vec<&mut dyn Renderer> = vec![
            &mut self.outline,
            &mut self.volume,
            &mut self.menu_renderer,
            &mut self.clip_marker,
        ];
        for widget in &mut self.dials {
            renderers.push(&mut widget.renderer);
        }
        draw_sorted(&mut renderers, &mut frame)?;
        Ok(())
    }

    /// Free GPU resources owned by the scene
    pub fn release(&mut self, backend: &mut dyn GpuBackend) {
        self.volume.release(backend);
    }
}

/// The controller that carries the pie menu and tools: the right hand,
/// else the first controller
fn tool_controller(devices: &[TrackedDevice]) -> Option<&TrackedDevice> {
    devices
        .iter()
        .find(|d| d.role() == DeviceRole::RightController)
        .or_else(|| devices.iter().find(|d| d.role().is_controller()))
}
