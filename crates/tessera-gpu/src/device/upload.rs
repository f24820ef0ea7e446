use crate::error::{ensure_precondition, GpuError, Result};
use crate::format::translate::translate_texture_format;
use crate::gl::consts as gl;
use crate::resource::buffer::BufferPage;
use crate::resource::texture::mip_size;
use crate::resource::{Buffer, Texture, TextureDimension};

use super::Device;

impl Device {
    /// Writes `data` at `dst_offset`, splitting the write at page
    /// boundaries.
    pub fn upload_buffer_data(&mut self, buffer: &Buffer, dst_offset: u32, data: &[u8]) -> Result<()> {
        buffer.0.base.ensure_alive()?;
        let len = u32::try_from(data.len())
            .map_err(|_| GpuError::Precondition(format!("upload of {} bytes is too large", data.len())))?;
        ensure_precondition!(
            dst_offset as u64 + len as u64 <= buffer.byte_size() as u64,
            "upload of {len} bytes at {dst_offset} exceeds buffer {} of {} bytes",
            buffer.0.base.label(),
            buffer.byte_size()
        );
        if data.is_empty() {
            return Ok(());
        }

        let target = buffer.target();
        let mut guard = self.ctx.borrow_mut();
        let ctx = &mut *guard;
        if target == gl::ELEMENT_ARRAY_BUFFER {
            self.state.bind_vertex_array(ctx, None);
        }
        let mut bound = None;
        for (page, in_page, start, chunk) in buffer.page_chunks(dst_offset, len) {
            let bytes = &data[start..start + chunk as usize];
            match buffer.page(page) {
                Some(BufferPage::Native(native)) => {
                    if bound != Some(*native) {
                        ctx.bind_buffer(target, Some(*native));
                        bound = Some(*native);
                    }
                    ctx.buffer_sub_data(target, in_page as i32, bytes);
                }
                Some(BufferPage::Shadow(shadow)) => {
                    let mut shadow = shadow.borrow_mut();
                    let at = in_page as usize;
                    shadow[at..at + bytes.len()].copy_from_slice(bytes);
                }
                None => return Err(GpuError::Native(format!("buffer page {page} is missing"))),
            }
        }
        if bound.is_some() {
            ctx.bind_buffer(target, None);
        }
        Ok(())
    }

    /// Typed variant of [`Device::upload_buffer_data`]; `dst_offset` is in
    /// bytes.
    pub fn upload_buffer_pod<T: bytemuck::Pod>(&mut self, buffer: &Buffer, dst_offset: u32, data: &[T]) -> Result<()> {
        self.upload_buffer_data(buffer, dst_offset, bytemuck::cast_slice(data))
    }

    /// Uploads `levels[i]` to mip level `first_mip_level + i`.
    ///
    /// Levels past the texture's mip count are ignored. Each level holds
    /// every face (cube) or slice (3D, array) back to back. A single level-0
    /// upload to a texture with more levels generates the rest, except for
    /// NPOT textures on WebGL1 where mipmapping is not available.
    pub fn upload_texture_data(&mut self, texture: &Texture, first_mip_level: u32, levels: &[&[u8]]) -> Result<()> {
        texture.0.base.ensure_alive()?;
        let Some(native_texture) = texture.gl_texture() else {
            return Err(GpuError::Precondition("the onscreen texture cannot be uploaded to".into()));
        };
        let d = *texture.descriptor();
        let native = translate_texture_format(d.pixel_format, &self.caps)?;
        let compressed = d.pixel_format.is_compressed();
        let end = (first_mip_level as usize + levels.len()).min(d.mip_level_count as usize) as u32;
        let target = texture.gl_target();

        let mut guard = self.ctx.borrow_mut();
        let ctx = &mut *guard;
        self.state.bind_texture(ctx, 0, target, Some(native_texture));

        for level in first_mip_level..end {
            let data = levels[(level - first_mip_level) as usize];
            let width = mip_size(d.width, level);
            let height = mip_size(d.height, level);
            let image_size = d.pixel_format.image_byte_size(width, height) as usize;
            let layers = match d.dimension {
                TextureDimension::D2 => 1,
                TextureDimension::Cube => 6,
                TextureDimension::D2Array => d.depth_or_array_layers,
                TextureDimension::D3 => mip_size(d.depth_or_array_layers, level),
            };
            ensure_precondition!(
                data.len() == image_size * layers as usize,
                "level {level} of texture {} needs {} bytes, got {}",
                texture.0.base.label(),
                image_size * layers as usize,
                data.len()
            );
            let (w, h, level_i) = (width as i32, height as i32, level as i32);

            match d.dimension {
                TextureDimension::D2 | TextureDimension::Cube => {
                    for layer in 0..layers {
                        let face = if d.dimension == TextureDimension::Cube {
                            gl::TEXTURE_CUBE_MAP_POSITIVE_X + layer
                        } else {
                            target
                        };
                        let image = &data[layer as usize * image_size..(layer as usize + 1) * image_size];
                        match (compressed, texture.is_immutable()) {
                            (true, true) => ctx.compressed_tex_sub_image_2d(
                                face,
                                level_i,
                                0,
                                0,
                                w,
                                h,
                                native.internal_format,
                                image,
                            ),
                            (true, false) => {
                                ctx.compressed_tex_image_2d(face, level_i, native.internal_format, w, h, image)
                            }
                            (false, true) => {
                                ctx.tex_sub_image_2d(face, level_i, 0, 0, w, h, native.format, native.ty, image)
                            }
                            (false, false) => ctx.tex_image_2d(
                                face,
                                level_i,
                                native.internal_format as i32,
                                w,
                                h,
                                native.format,
                                native.ty,
                                Some(image),
                            ),
                        }
                    }
                }
                TextureDimension::D2Array | TextureDimension::D3 => {
                    let depth = layers as i32;
                    if compressed {
                        ctx.compressed_tex_sub_image_3d(
                            target,
                            level_i,
                            0,
                            0,
                            0,
                            w,
                            h,
                            depth,
                            native.internal_format,
                            data,
                        );
                    } else {
                        ctx.tex_sub_image_3d(target, level_i, 0, 0, 0, w, h, depth, native.format, native.ty, data);
                    }
                }
            }
        }

        let single_base_level = first_mip_level == 0 && levels.len() == 1;
        if single_base_level && d.mip_level_count > 1 && !compressed {
            if !self.caps.webgl2 && texture.is_npot() {
                log::debug!(
                    "texture {}: skipping mipmap generation for NPOT size {}x{} on WebGL1",
                    texture.0.base.label(),
                    d.width,
                    d.height
                );
            } else {
                ctx.generate_mipmap(target);
                texture.0.mipmaps_generated.set(true);
            }
        }
        Ok(())
    }
}
