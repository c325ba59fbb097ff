// renderer/render_states.rs
//! Immutable pipeline state presets and the per-device sampler cache.

use std::collections::HashMap;

/// Primitive state plus the depth bias that D3D-style APIs keep on the rasterizer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterizerState {
    pub primitive: wgpu::PrimitiveState,
    pub depth_bias: wgpu::DepthBiasState,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_bias: wgpu::DepthBiasState::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendPreset {
    pub blend: Option<wgpu::BlendState>,
    pub write_mask: wgpu::ColorWrites,
    pub alpha_to_coverage: bool,
}

impl Default for BlendPreset {
    fn default() -> Self {
        Self {
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
            alpha_to_coverage: false,
        }
    }
}

pub fn rs_wireframe() -> RasterizerState {
    let mut state = RasterizerState::default();
    state.primitive.polygon_mode = wgpu::PolygonMode::Line;
    state.primitive.cull_mode = None;
    state
}

pub fn rs_no_cull() -> RasterizerState {
    let mut state = RasterizerState::default();
    state.primitive.cull_mode = None;
    state
}

/// Back-face culling with clockwise front faces, for mirrored geometry.
pub fn rs_cull_clockwise() -> RasterizerState {
    let mut state = RasterizerState::default();
    state.primitive.front_face = wgpu::FrontFace::Cw;
    state
}

/// Depth pass rasterizer with constant and slope-scaled bias.
pub fn rs_shadow(constant: i32, slope_scale: f32) -> RasterizerState {
    let mut state = RasterizerState::default();
    state.depth_bias = wgpu::DepthBiasState {
        constant,
        slope_scale,
        clamp: 0.0,
    };
    state
}

pub fn bs_no_color_write() -> BlendPreset {
    BlendPreset {
        blend: None,
        write_mask: wgpu::ColorWrites::empty(),
        alpha_to_coverage: false,
    }
}

pub fn bs_transparent() -> BlendPreset {
    BlendPreset {
        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
        ..Default::default()
    }
}

pub fn bs_alpha_to_coverage() -> BlendPreset {
    BlendPreset {
        alpha_to_coverage: true,
        ..Default::default()
    }
}

pub fn bs_additive() -> BlendPreset {
    let add = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };
    BlendPreset {
        blend: Some(wgpu::BlendState {
            color: add,
            alpha: add,
        }),
        ..Default::default()
    }
}

pub fn dss_default(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Depth test passes on equal depth; used by skyboxes drawn at the far plane.
pub fn dss_less_equal(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        depth_compare: wgpu::CompareFunction::LessEqual,
        ..dss_default(format)
    }
}

/// Writes the stencil reference wherever the depth test passes, without touching depth.
pub fn dss_write_stencil(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Always,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Replace,
    };
    wgpu::DepthStencilState {
        depth_write_enabled: false,
        stencil: wgpu::StencilState {
            front: face,
            back: face,
            read_mask: 0xff,
            write_mask: 0xff,
        },
        ..dss_default(format)
    }
}

/// Draws only where the stencil buffer equals the reference.
pub fn dss_draw_with_stencil(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Equal,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Keep,
    };
    wgpu::DepthStencilState {
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState {
            front: face,
            back: face,
            read_mask: 0xff,
            write_mask: 0,
        },
        ..dss_default(format)
    }
}

pub fn dss_no_depth_write(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        depth_write_enabled: false,
        ..dss_default(format)
    }
}

pub fn dss_no_depth_test(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Always,
        ..dss_default(format)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    LinearWrap,
    PointClamp,
    LinearClamp,
    AnisotropicWrap,
    /// Comparison sampler for percentage-closer filtering of shadow maps.
    ShadowPcf,
}

impl SamplerKind {
    pub const ALL: [SamplerKind; 5] = [
        SamplerKind::LinearWrap,
        SamplerKind::PointClamp,
        SamplerKind::LinearClamp,
        SamplerKind::AnisotropicWrap,
        SamplerKind::ShadowPcf,
    ];

    pub fn descriptor(self) -> wgpu::SamplerDescriptor<'static> {
        let wrap = wgpu::AddressMode::Repeat;
        let clamp = wgpu::AddressMode::ClampToEdge;
        match self {
            SamplerKind::LinearWrap => wgpu::SamplerDescriptor {
                label: Some("LinearWrap"),
                address_mode_u: wrap,
                address_mode_v: wrap,
                address_mode_w: wrap,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            },
            SamplerKind::PointClamp => wgpu::SamplerDescriptor {
                label: Some("PointClamp"),
                address_mode_u: clamp,
                address_mode_v: clamp,
                address_mode_w: clamp,
                mag_filter: wgpu::FilterMode::Nearest,
                min_filter: wgpu::FilterMode::Nearest,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            },
            SamplerKind::LinearClamp => wgpu::SamplerDescriptor {
                label: Some("LinearClamp"),
                address_mode_u: clamp,
                address_mode_v: clamp,
                address_mode_w: clamp,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            },
            SamplerKind::AnisotropicWrap => wgpu::SamplerDescriptor {
                label: Some("AnisotropicWrap"),
                address_mode_u: wrap,
                address_mode_v: wrap,
                address_mode_w: wrap,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Linear,
                anisotropy_clamp: 4,
                ..Default::default()
            },
            SamplerKind::ShadowPcf => wgpu::SamplerDescriptor {
                label: Some("ShadowPcf"),
                address_mode_u: clamp,
                address_mode_v: clamp,
                address_mode_w: clamp,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Nearest,
                compare: Some(wgpu::CompareFunction::LessEqual),
                ..Default::default()
            },
        }
    }

    pub fn is_comparison(self) -> bool {
        self == SamplerKind::ShadowPcf
    }
}

/// Samplers created once per device and shared by every effect.
pub struct RenderStates {
    samplers: HashMap<SamplerKind, wgpu::Sampler>,
}

impl RenderStates {
    pub fn new(device: &wgpu::Device) -> Self {
        let samplers = SamplerKind::ALL
            .iter()
            .map(|&kind| (kind, device.create_sampler(&kind.descriptor())))
            .collect();
        Self { samplers }
    }

    pub fn sampler(&self, kind: SamplerKind) -> &wgpu::Sampler {
        // every kind is inserted in new()
        &self.samplers[&kind]
    }

    pub fn linear_wrap(&self) -> &wgpu::Sampler {
        self.sampler(SamplerKind::LinearWrap)
    }

    pub fn linear_clamp(&self) -> &wgpu::Sampler {
        self.sampler(SamplerKind::LinearClamp)
    }

    pub fn anisotropic_wrap(&self) -> &wgpu::Sampler {
        self.sampler(SamplerKind::AnisotropicWrap)
    }

    pub fn shadow_pcf(&self) -> &wgpu::Sampler {
        self.sampler(SamplerKind::ShadowPcf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

    #[test]
    fn default_rasterizer_culls_back_faces() {
        let state = RasterizerState::default();
        assert_eq!(state.primitive.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(state.primitive.front_face, wgpu::FrontFace::Ccw);
        assert_eq!(state.depth_bias, wgpu::DepthBiasState::default());
    }

    #[test]
    fn shadow_rasterizer_carries_bias() {
        let state = rs_shadow(100, 1.5);
        assert_eq!(state.depth_bias.constant, 100);
        assert_eq!(state.depth_bias.slope_scale, 1.5);
    }

    #[test]
    fn no_color_write_masks_everything() {
        let preset = bs_no_color_write();
        assert!(preset.write_mask.is_empty());
        assert!(preset.blend.is_none());
    }

    #[test]
    fn blend_presets() {
        let additive = bs_additive().blend.unwrap();
        assert_eq!(additive.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(additive.color.dst_factor, wgpu::BlendFactor::One);

        let coverage = bs_alpha_to_coverage();
        assert!(coverage.alpha_to_coverage);
        assert!(coverage.blend.is_none());
        assert_eq!(bs_transparent().blend, Some(wgpu::BlendState::ALPHA_BLENDING));
    }

    #[test]
    fn rasterizer_variants() {
        assert_eq!(rs_cull_clockwise().primitive.front_face, wgpu::FrontFace::Cw);
        assert_eq!(rs_cull_clockwise().primitive.cull_mode, Some(wgpu::Face::Back));
        let wire = rs_wireframe();
        assert_eq!(wire.primitive.polygon_mode, wgpu::PolygonMode::Line);
        assert_eq!(wire.primitive.cull_mode, None);
    }

    #[test]
    fn stencil_presets_pair_up() {
        let write = dss_write_stencil(FORMAT);
        let draw = dss_draw_with_stencil(FORMAT);
        assert!(!write.depth_write_enabled);
        assert_eq!(write.stencil.front.pass_op, wgpu::StencilOperation::Replace);
        assert_eq!(draw.stencil.front.compare, wgpu::CompareFunction::Equal);
        assert_eq!(draw.stencil.write_mask, 0);
    }

    #[test]
    fn no_depth_test_always_passes() {
        let state = dss_no_depth_test(FORMAT);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::Always);
        assert!(!state.depth_write_enabled);
    }

    #[test]
    fn only_shadow_sampler_compares() {
        for kind in SamplerKind::ALL {
            assert_eq!(kind.descriptor().compare.is_some(), kind.is_comparison());
        }
    }
}
