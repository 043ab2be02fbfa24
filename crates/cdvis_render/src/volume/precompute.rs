//! GPU bake of density and received light

use cdvis_math::Vec3;
use cdvis_scene::SceneGraph;

use crate::backend::{ComputeDispatch, GpuBackend, ImageBinding};
use crate::context::keywords;
use crate::resource::{Extent3d, ImageAccess, TextureDesc, TextureHandle, TextureInit};
use crate::Result;

use super::{BakeState, Volume, VolumeTexture};

/// Edge length of the cubic compute workgroup
pub const WORKGROUP_SIZE: u32 = 8;

impl Volume {
    /// Bake the source into the baked texture if anything it depends on
    /// changed. Returns whether a dispatch was issued.
    ///
    /// Without a source texture the volume stays dirty and nothing is
    /// dispatched.
    pub fn precompute(&mut self, graph: &mut SceneGraph, backend: &mut dyn GpuBackend) -> Result<bool> {
        if self.state == BakeState::Clean {
            return Ok(false);
        }
        let Some(source) = self.source else {
            log::trace!("Volume has no source, skipping bake");
            return Ok(false);
        };

        let baked = self.ensure_baked(backend, source.extent)?;

        self.precompute_program.set_keyword(keywords::MASK, self.params.mask);
        self.precompute_program.enable_keyword(keywords::LIGHT_POINT);

        let world = graph.world(self.node)?;
        let inverse_rotation = world.rotation.inverse();
        let p = &self.params;
        let u = &mut self.bake_uniforms;
        u.set("Exposure", p.exposure);
        u.set("Density", p.density);
        u.set("Threshold", p.threshold);
        // world scale, not local: a parented volume bakes at the size it is drawn
        u.set("WorldScale", world.scale);
        u.set("TexelSize", Vec3::from_array(source.extent.texel_size()));
        u.set("LightDensity", p.light_density);
        u.set("LightPosition", inverse_rotation * (p.light_position - world.position));
        u.set("LightDirection", inverse_rotation * p.light_direction);
        u.set("LightAngle", p.light_angle);
        u.set("LightAmbient", p.light_ambient);
        u.set("LightIntensity", p.light_intensity);

        let images = [
            ImageBinding {
                unit: 0,
                texture: source.handle,
                access: ImageAccess::ReadOnly,
            },
            ImageBinding {
                unit: 1,
                texture: baked,
                access: ImageAccess::WriteOnly,
            },
        ];
        let key = self.precompute_program.active_key();
        backend.dispatch_compute(&ComputeDispatch {
            program: &key,
            uniforms: &self.bake_uniforms,
            images: &images,
            workgroups: source.extent.workgroups(WORKGROUP_SIZE),
        })?;
        backend.memory_barrier();

        self.state = BakeState::Clean;
        self.bake_count += 1;
        log::debug!("Baked volume with {}", key);
        Ok(true)
    }

    /// The baked texture, reallocated only when its extent differs from
    /// the source
    fn ensure_baked(&mut self, backend: &mut dyn GpuBackend, extent: Extent3d) -> Result<TextureHandle> {
        if let Some(baked) = self.baked {
            if baked.extent == extent {
                return Ok(baked.handle);
            }
            backend.destroy_texture(baked.handle);
        }
        let handle = backend.create_texture(&TextureDesc::volume_baked(extent), TextureInit::Fill(u16::MAX))?;
        log::debug!(
            "Allocated baked volume texture {}x{}x{}",
            extent.width,
            extent.height,
            extent.depth
        );
        self.baked = Some(VolumeTexture { handle, extent });
        Ok(handle)
    }
}
