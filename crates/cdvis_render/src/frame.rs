//! Per-frame draw state and the renderer seam

use cdvis_scene::{CameraMatrices, SceneGraph};

use crate::backend::GpuBackend;
use crate::context::RenderContext;
use crate::Result;

/// What every renderer receives for one camera view
pub struct Frame<'a> {
    pub context: &'a RenderContext,
    pub graph: &'a mut SceneGraph,
    pub camera: CameraMatrices,
    pub backend: &'a mut dyn GpuBackend,
}

/// Something that issues draws for one scene node
pub trait Renderer {
    /// Lower queues draw first
    fn render_queue(&self) -> u32;

    fn visible(&self) -> bool {
        true
    }

    fn draw(&mut self, frame: &mut Frame<'_>) -> Result<()>;
}

/// Draw every visible renderer in ascending queue order. Equal queues keep
/// their input order.
pub fn draw_sorted(renderers: &mut [&mut dyn Renderer], frame: &mut Frame<'_>) -> Result<()> {
    renderers.sort_by_key(|r| r.render_queue());
    for renderer in renderers.iter_mut() {
        if renderer.visible() {
            renderer.draw(frame)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::queue;
    use crate::testing::test_context;
    use crate::recording::RecordingBackend;
    use cdvis_math::{Mat4, Vec3};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Probe {
        queue: u32,
        visible: bool,
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Renderer for Probe {
        fn render_queue(&self) -> u32 {
            self.queue
        }

        fn visible(&self) -> bool {
            self.visible
        }

        fn draw(&mut self, _frame: &mut Frame<'_>) -> Result<()> {
            self.log.borrow_mut().push(self.name);
            Ok(())
        }
    }

    #[test]
    fn test_draw_sorted_by_queue() {
        let mut backend = RecordingBackend::new();
        let context = test_context(&mut backend);
        let mut graph = SceneGraph::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let probe = |name, queue, visible| Probe {
            queue,
            visible,
            name,
            log: log.clone(),
        };
        let mut volume = probe("volume", queue::VOLUME, true);
        let mut overlay = probe("overlay", queue::OVERLAY, true);
        let mut opaque = probe("opaque", queue::OPAQUE, true);
        let mut hidden = probe("hidden", queue::OPAQUE, false);

        let mut frame = Frame {
            context: &context,
            graph: &mut graph,
            camera: CameraMatrices {
                view: Mat4::IDENTITY,
                projection: Mat4::IDENTITY,
                view_projection: Mat4::IDENTITY,
                inverse_projection: Mat4::IDENTITY,
                world_position: Vec3::ZERO,
            },
            backend: &mut backend,
        };
        let mut renderers: Vec<&mut dyn Renderer> = vec![&mut volume, &mut overlay, &mut hidden, &mut opaque];
        draw_sorted(&mut renderers, &mut frame).unwrap();

        assert_eq!(*log.borrow(), vec!["opaque", "volume", "overlay"]);
    }
}
