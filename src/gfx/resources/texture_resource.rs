//! Texture resource management for wgpu
//!
//! [`TextureResource`] bundles a GPU texture with its view and sampler.
//! [`TextureImage`] is the CPU-side RGBA8 image a material refers to; its GPU
//! copy is created lazily the first time it is drawn and then shared by every
//! material and model holding the same `Arc<TextureImage>`.

use std::{path::Path, sync::OnceLock};

use crate::gfx::scene::loader::LoadError;

/// GPU texture resource containing texture, view, and sampler
///
/// Bundles the three main components needed for texture operations:
/// - Texture: The actual GPU memory allocation
/// - View: Interface for shader access
/// - Sampler: Filtering and addressing configuration
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureResource {
    /// Standard depth buffer format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Color textures are sampled without sRGB decoding so a texel and an
    /// equal vertex color feed the same value into lighting.
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Creates a depth texture matching the surface configuration
    pub fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };

        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Creates a 2D texture from raw RGBA8 data with configurable filtering
    pub fn create_from_rgba_data_with_filter(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
        label: &str,
        filter_mode: wgpu::FilterMode,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: filter_mode,
            min_filter: filter_mode,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Creates a 2D texture from raw RGBA8 data with linear filtering
    pub fn create_from_rgba_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        Self::create_from_rgba_data_with_filter(
            device,
            queue,
            data,
            width,
            height,
            label,
            wgpu::FilterMode::Linear,
        )
    }
}

/// GPU side of a [`TextureImage`]: the texture plus its group-2 bind group
pub struct TextureBinding {
    pub resource: TextureResource,
    pub bind_group: wgpu::BindGroup,
}

/// CPU-side RGBA8 image used as a diffuse texture
pub struct TextureImage {
    label: String,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    gpu: OnceLock<TextureBinding>,
}

impl std::fmt::Debug for TextureImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureImage")
            .field("label", &self.label)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("uploaded", &self.gpu.get().is_some())
            .finish()
    }
}

impl TextureImage {
    /// Wraps raw RGBA8 pixels; `rgba` must hold exactly `width * height * 4` bytes.
    pub fn from_rgba(label: &str, width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, LoadError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(LoadError::InvalidTexture {
                label: label.to_string(),
                reason: format!(
                    "{}x{} image needs {} bytes, got {}",
                    width,
                    height,
                    expected,
                    rgba.len()
                ),
            });
        }

        Ok(Self {
            label: label.to_string(),
            width,
            height,
            rgba,
            gpu: OnceLock::new(),
        })
    }

    /// A 1x1 texture of a single color (components in [0, 1]).
    pub fn solid_color(label: &str, color: [f32; 3]) -> Self {
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            label: label.to_string(),
            width: 1,
            height: 1,
            rgba: vec![to_byte(color[0]), to_byte(color[1]), to_byte(color[2]), 255],
            gpu: OnceLock::new(),
        }
    }

    /// Decodes an image file into RGBA8.
    ///
    /// Images are flipped vertically so texture coordinate v=0 addresses
    /// the bottom row, matching OBJ conventions.
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        if !path.is_file() {
            return Err(LoadError::MissingTexture {
                path: path.to_path_buf(),
            });
        }

        let image = image::open(path)
            .map_err(|source| LoadError::Texture {
                path: path.to_path_buf(),
                source,
            })?
            .flipv()
            .into_rgba8();
        let (width, height) = image.dimensions();

        Self::from_rgba(&path.display().to_string(), width, height, image.into_raw())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.get().is_some()
    }

    /// Nearest-neighbour sample with repeat addressing, as normalized RGB.
    ///
    /// Row 0 of the pixel data is v=0.
    pub fn sample(&self, uv: [f32; 2]) -> [f32; 3] {
        let wrap = |t: f32, size: u32| -> usize {
            let t = t.rem_euclid(1.0);
            ((t * size as f32) as usize).min(size as usize - 1)
        };
        let x = wrap(uv[0], self.width);
        let y = wrap(uv[1], self.height);
        let i = (y * self.width as usize + x) * 4;
        [
            self.rgba[i] as f32 / 255.0,
            self.rgba[i + 1] as f32 / 255.0,
            self.rgba[i + 2] as f32 / 255.0,
        ]
    }

    /// Returns the GPU binding, uploading the image on first use.
    pub fn gpu_binding<F>(&self, device: &wgpu::Device, queue: &wgpu::Queue, bind: F) -> &TextureBinding
    where
        F: FnOnce(&TextureResource) -> wgpu::BindGroup,
    {
        self.gpu.get_or_init(|| {
            log::debug!(
                "uploading texture '{}' ({}x{})",
                self.label,
                self.width,
                self.height
            );
            let resource = TextureResource::create_from_rgba_data(
                device,
                queue,
                &self.rgba,
                self.width,
                self.height,
                &self.label,
            );
            let bind_group = bind(&resource);
            TextureBinding {
                resource,
                bind_group,
            }
        })
    }
}
