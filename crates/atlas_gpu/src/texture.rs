use crate::config::TextureConfig;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};

const BYTES_PER_PIXEL: usize = 4;

/// A sprite sheet uploaded to the device, ready to sample.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Upload a tightly packed RGBA8 image.
    ///
    /// `label` names the wgpu objects in debugging tools.
    pub fn from_rgba8(
        ctx: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        config: &TextureConfig,
        label: &str,
    ) -> Result<Self> {
        check_rgba8_upload(data.len(), width, height, ctx.max_texture_dimension())?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        ctx.queue.write_texture(
            texture.as_image_copy(),
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(BYTES_PER_PIXEL as u32 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: config.address_mode_u,
            address_mode_v: config.address_mode_v,
            mag_filter: config.mag_filter,
            min_filter: config.min_filter,
            mipmap_filter: config.mipmap_filter,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            width,
            height,
        })
    }
}

/// Reject uploads the device would refuse or that don't match their size.
fn check_rgba8_upload(len: usize, width: u32, height: u32, max_dimension: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(GpuError::Texture(format!(
            "Invalid dimensions {}x{}",
            width, height
        )));
    }

    if width > max_dimension || height > max_dimension {
        return Err(GpuError::Texture(format!(
            "{}x{} exceeds the device limit of {}",
            width, height, max_dimension
        )));
    }

    let expected = (width as usize) * (height as usize) * BYTES_PER_PIXEL;
    if len != expected {
        return Err(GpuError::Texture(format!(
            "Invalid data size: expected {} bytes for {}x{} RGBA8, got {}",
            expected, width, height, len
        )));
    }

    Ok(())
}
