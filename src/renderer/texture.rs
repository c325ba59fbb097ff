// renderer/texture.rs

use std::path::Path;

use glam::{Vec3, Vec4};
use image::{imageops, RgbaImage};

use crate::error::{RenderError, Result};

#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Number of mip levels down to 1x1 for the larger dimension
    pub fn calculate_mip_levels(width: u32, height: u32) -> u32 {
        let max_dimension = width.max(height).max(1);
        u32::BITS - max_dimension.leading_zeros()
    }

    /// Decodes an image file and uploads it with a full CPU-built mip chain.
    pub fn from_path(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: impl AsRef<Path>,
        is_srgb: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading texture {}", path.display());

        let img = image::open(path).map_err(|e| RenderError::Texture {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self::from_image(
            device,
            queue,
            &img.to_rgba8(),
            path.to_str(),
            is_srgb,
        ))
    }

    /// Uploads an image and a CPU-filtered mip chain
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        label: Option<&str>,
        is_srgb: bool,
    ) -> Self {
        let (width, height) = image.dimensions();
        let format = color_format(is_srgb);
        let mips = mip_chain(image);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mips.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, mip) in mips.iter().enumerate() {
            write_rgba(queue, &texture, level as u32, 0, mip);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Solid-color 1x1 texture
    pub fn solid(device: &wgpu::Device, queue: &wgpu::Queue, color: [u8; 4], label: Option<&str>) -> Self {
        let image = RgbaImage::from_pixel(1, 1, image::Rgba(color));
        Self::from_image(device, queue, &image, label, true)
    }

    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::solid(device, queue, [255, 255, 255, 255], Some("White"))
    }

    /// Two-color checkerboard with `checker_size` texel squares.
    pub fn checkerboard(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: u32,
        checker_size: u32,
        color1: [u8; 4],
        color2: [u8; 4],
        label: Option<&str>,
    ) -> Self {
        let image = checker_image(size, checker_size, color1, color2);
        Self::from_image(device, queue, &image, label, true)
    }

    /// Cube map with a vertical gradient from `horizon` to `zenith`, darkening below the horizon
    pub fn sky_gradient(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: u32,
        horizon: Vec4,
        zenith: Vec4,
    ) -> Self {
        let faces = std::array::from_fn(|face| {
            RgbaImage::from_fn(size, size, |x, y| {
                let u = (x as f32 + 0.5) / size as f32;
                let v = (y as f32 + 0.5) / size as f32;
                let dir = cube_face_direction(face, u, v);
                image::Rgba(to_rgba8(sky_color(dir, horizon, zenith)))
            })
        });
        Self::cube_from_faces(device, queue, &faces, Some("SkyGradient"))
    }

    /// Cube map from six square faces in +X, -X, +Y, -Y, +Z, -Z order
    pub fn cube_from_faces(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[RgbaImage; 6],
        label: Option<&str>,
    ) -> Self {
        let size = faces[0].width();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_format(true),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().enumerate() {
            write_rgba(queue, &texture, 0, layer as u32, face);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label,
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Self { texture, view }
    }

    /// Rgba8 texture a compute shader can write and later passes can sample
    pub fn storage_rgba8(device: &wgpu::Device, width: u32, height: u32, label: Option<&str>) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn size(&self) -> (u32, u32) {
        let size = self.texture.size();
        (size.width, size.height)
    }
}

fn color_format(is_srgb: bool) -> wgpu::TextureFormat {
    if is_srgb {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    }
}

fn write_rgba(queue: &wgpu::Queue, texture: &wgpu::Texture, mip_level: u32, layer: u32, image: &RgbaImage) {
    let (width, height) = image.dimensions();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
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
}

/// Base image followed by successively halved copies down to 1x1
pub fn mip_chain(image: &RgbaImage) -> Vec<RgbaImage> {
    let (mut width, mut height) = image.dimensions();
    let levels = Texture::calculate_mip_levels(width, height);
    let mut chain = Vec::with_capacity(levels as usize);
    chain.push(image.clone());
    for _ in 1..levels {
        width = (width / 2).max(1);
        height = (height / 2).max(1);
        chain.push(imageops::resize(image, width, height, imageops::FilterType::Triangle));
    }
    chain
}

pub fn checker_image(size: u32, checker_size: u32, color1: [u8; 4], color2: [u8; 4]) -> RgbaImage {
    let checker_size = checker_size.max(1);
    RgbaImage::from_fn(size.max(1), size.max(1), |x, y| {
        let is_color1 = ((x / checker_size) + (y / checker_size)) % 2 == 0;
        image::Rgba(if is_color1 { color1 } else { color2 })
    })
}

/// Direction through texel (u, v) of a cube face, faces ordered +X, -X, +Y, -Y, +Z, -Z.
pub fn cube_face_direction(face: usize, u: f32, v: f32) -> Vec3 {
    let s = 2.0 * u - 1.0;
    let t = 2.0 * v - 1.0;
    let dir = match face {
        0 => Vec3::new(1.0, -t, -s),
        1 => Vec3::new(-1.0, -t, s),
        2 => Vec3::new(s, 1.0, t),
        3 => Vec3::new(s, -1.0, -t),
        4 => Vec3::new(s, -t, 1.0),
        _ => Vec3::new(-s, -t, -1.0),
    };
    dir.normalize()
}

fn sky_color(dir: Vec3, horizon: Vec4, zenith: Vec4) -> Vec4 {
    if dir.y >= 0.0 {
        horizon.lerp(zenith, dir.y.sqrt())
    } else {
        horizon * (1.0 + dir.y * 0.6)
    }
}

fn to_rgba8(color: Vec4) -> [u8; 4] {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_count_follows_the_longest_side() {
        for (w, h, levels) in [(1, 1, 1), (4, 4, 3), (2048, 2048, 12), (512, 64, 10), (64, 512, 10), (1920, 1080, 11)] {
            assert_eq!(Texture::calculate_mip_levels(w, h), levels, "{w}x{h}");
        }
    }

    #[test]
    fn mip_chain_halves_to_one_texel() {
        let image = RgbaImage::from_pixel(8, 4, image::Rgba([10, 20, 30, 255]));
        let chain = mip_chain(&image);
        let dims: Vec<_> = chain.iter().map(|m| m.dimensions()).collect();
        assert_eq!(dims, vec![(8, 4), (4, 2), (2, 1), (1, 1)]);
        // constant images stay constant when filtered
        assert_eq!(chain[3].get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn checkerboard_alternates() {
        let image = checker_image(4, 2, [255; 4], [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [255; 4]);
        assert_eq!(image.get_pixel(2, 0).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(2, 2).0, [255; 4]);
    }

    #[test]
    fn cube_face_centers_point_along_axes() {
        let expected = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (face, axis) in expected.iter().enumerate() {
            let dir = cube_face_direction(face, 0.5, 0.5);
            assert!(dir.abs_diff_eq(*axis, 1e-6), "face {face}: {dir}");
        }
        // top row of a side face looks upward
        assert!(cube_face_direction(4, 0.5, 0.0).y > 0.0);
    }

    #[test]
    fn sky_is_zenith_colored_straight_up() {
        let horizon = Vec4::new(0.8, 0.9, 1.0, 1.0);
        let zenith = Vec4::new(0.1, 0.3, 0.8, 1.0);
        assert!(sky_color(Vec3::Y, horizon, zenith).abs_diff_eq(zenith, 1e-6));
        assert!(sky_color(Vec3::X, horizon, zenith).abs_diff_eq(horizon, 1e-6));
        assert_eq!(to_rgba8(Vec4::new(2.0, -1.0, 0.5, 1.0)), [255, 0, 128, 255]);
    }
}
