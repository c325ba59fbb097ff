use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Capacity of each light array in the forward lighting block.
pub const MAX_LIGHTS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub direction: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vec4::new(0.5, 0.5, 0.5, 1.0),
            direction: Vec3::new(0.0, -1.0, 0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub position: Vec3,
    pub range: f32,
    /// Constant, linear and quadratic attenuation factors.
    pub att: Vec3,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.0, 0.0, 0.0, 1.0),
            diffuse: Vec4::new(0.7, 0.7, 0.7, 1.0),
            specular: Vec4::new(0.7, 0.7, 0.7, 1.0),
            position: Vec3::ZERO,
            range: 25.0,
            att: Vec3::new(0.0, 0.1, 0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotLight {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub position: Vec3,
    pub range: f32,
    pub direction: Vec3,
    /// Exponent applied to the cone falloff.
    pub spot: f32,
    pub att: Vec3,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.0, 0.0, 0.0, 1.0),
            diffuse: Vec4::new(1.0, 1.0, 1.0, 1.0),
            specular: Vec4::new(1.0, 1.0, 1.0, 1.0),
            position: Vec3::ZERO,
            range: 10000.0,
            direction: Vec3::NEG_Z,
            spot: 12.0,
            att: Vec3::new(1.0, 0.0, 0.0),
        }
    }
}

/// Surface reflectance. `specular.w` is the specular power.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub reflect: Vec4,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec4::new(0.5, 0.5, 0.5, 1.0),
            diffuse: Vec4::new(1.0, 1.0, 1.0, 1.0),
            specular: Vec4::new(0.1, 0.1, 0.1, 5.0),
            reflect: Vec4::ZERO,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct DirectionalLightRaw {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub direction: [f32; 3],
    pub _pad: f32,
}

impl From<&DirectionalLight> for DirectionalLightRaw {
    fn from(light: &DirectionalLight) -> Self {
        Self {
            ambient: light.ambient.to_array(),
            diffuse: light.diffuse.to_array(),
            specular: light.specular.to_array(),
            direction: light.direction.normalize_or_zero().to_array(),
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct PointLightRaw {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub position: [f32; 3],
    pub range: f32,
    pub att: [f32; 3],
    pub _pad: f32,
}

impl From<&PointLight> for PointLightRaw {
    fn from(light: &PointLight) -> Self {
        Self {
            ambient: light.ambient.to_array(),
            diffuse: light.diffuse.to_array(),
            specular: light.specular.to_array(),
            position: light.position.to_array(),
            range: light.range,
            att: light.att.to_array(),
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct SpotLightRaw {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub position: [f32; 3],
    pub range: f32,
    pub direction: [f32; 3],
    pub spot: f32,
    pub att: [f32; 3],
    pub _pad: f32,
}

impl From<&SpotLight> for SpotLightRaw {
    fn from(light: &SpotLight) -> Self {
        Self {
            ambient: light.ambient.to_array(),
            diffuse: light.diffuse.to_array(),
            specular: light.specular.to_array(),
            position: light.position.to_array(),
            range: light.range,
            direction: light.direction.normalize_or_zero().to_array(),
            spot: light.spot,
            att: light.att.to_array(),
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug)]
pub struct MaterialRaw {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub reflect: [f32; 4],
}

impl From<&Material> for MaterialRaw {
    fn from(material: &Material) -> Self {
        Self {
            ambient: material.ambient.to_array(),
            diffuse: material.diffuse.to_array(),
            specular: material.specular.to_array(),
            reflect: material.reflect.to_array(),
        }
    }
}

/// Every light of the forward effects, packed for one constant buffer range.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightBlock {
    pub directionals: [DirectionalLightRaw; MAX_LIGHTS],
    pub points: [PointLightRaw; MAX_LIGHTS],
    pub spots: [SpotLightRaw; MAX_LIGHTS],
    /// Directional, point and spot counts; the last lane is unused.
    pub counts: [u32; 4],
}

impl Default for LightBlock {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl LightBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the light at `index`, growing the active count to cover it.
    /// Indices past the array capacity are ignored.
    pub fn set_directional(&mut self, index: usize, light: &DirectionalLight) {
        if let Some(slot) = self.directionals.get_mut(index) {
            *slot = light.into();
            self.counts[0] = self.counts[0].max(index as u32 + 1);
        }
    }

    pub fn set_point(&mut self, index: usize, light: &PointLight) {
        if let Some(slot) = self.points.get_mut(index) {
            *slot = light.into();
            self.counts[1] = self.counts[1].max(index as u32 + 1);
        }
    }

    pub fn set_spot(&mut self, index: usize, light: &SpotLight) {
        if let Some(slot) = self.spots.get_mut(index) {
            *slot = light.into();
            self.counts[2] = self.counts[2].max(index as u32 + 1);
        }
    }

    /// Caps the active light counts; lights past them are not evaluated.
    pub fn set_counts(&mut self, directional: usize, point: usize, spot: usize) {
        self.counts[0] = directional.min(MAX_LIGHTS) as u32;
        self.counts[1] = point.min(MAX_LIGHTS) as u32;
        self.counts[2] = spot.min(MAX_LIGHTS) as u32;
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.counts[0] as usize,
            self.counts[1] as usize,
            self.counts[2] as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn raw_layouts_match_shader_structs() {
        assert_eq!(size_of::<DirectionalLightRaw>(), 64);
        assert_eq!(size_of::<PointLightRaw>(), 80);
        assert_eq!(size_of::<SpotLightRaw>(), 96);
        assert_eq!(size_of::<MaterialRaw>(), 64);
        assert_eq!(size_of::<LightBlock>(), 5 * (64 + 80 + 96) + 16);
    }

    #[test]
    fn setting_lights_tracks_counts() {
        let mut block = LightBlock::new();
        block.set_point(2, &PointLight::default());
        block.set_directional(0, &DirectionalLight::default());
        assert_eq!(block.counts(), (1, 3, 0));

        block.set_spot(MAX_LIGHTS, &SpotLight::default());
        assert_eq!(block.counts().2, 0);

        block.set_counts(0, 9, 1);
        assert_eq!(block.counts(), (0, MAX_LIGHTS, 1));
    }

    #[test]
    fn directions_are_normalized() {
        let light = DirectionalLight {
            direction: Vec3::new(0.0, -4.0, 3.0),
            ..Default::default()
        };
        let raw = DirectionalLightRaw::from(&light);
        assert!((Vec3::from_array(raw.direction).length() - 1.0).abs() < 1e-6);
    }
}
