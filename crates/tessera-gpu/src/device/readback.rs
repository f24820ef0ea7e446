use crate::error::{ensure_precondition, ensure_supported, GpuError, Result};
use crate::format::Format;
use crate::gl::consts as gl;
use crate::resource::buffer::BufferPage;
use crate::resource::{Buffer, Readback, ReadbackFuture, Texture};

use super::Device;

/// `readPixels` format, type and bytes per pixel for a readable format.
fn read_format(format: Format) -> Option<(u32, u32, u32)> {
    match format {
        Format::U8Rgba | Format::U8RgbaSrgb | Format::U8RgbaRt | Format::U8RgbaRtSrgb => {
            Some((gl::RGBA, gl::UNSIGNED_BYTE, 4))
        }
        Format::F32Rgba => Some((gl::RGBA, gl::FLOAT, 16)),
        _ => None,
    }
}

impl Device {
    /// Reads a rectangle of mip level 0 of `texture` into `readback`.
    ///
    /// On WebGL2 the pixels are packed into the readback's buffer behind a
    /// fence and the future resolves once the fence signals. On WebGL1 the
    /// read is synchronous.
    pub fn read_texture(
        &mut self,
        readback: &Readback,
        texture: &Texture,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<ReadbackFuture> {
        texture.0.base.ensure_alive()?;
        let Some((format, ty, pixel_size)) = read_format(texture.format()) else {
            return Err(GpuError::Unsupported(format!("{:?} textures cannot be read back", texture.format())));
        };
        ensure_precondition!(
            x as u64 + width as u64 <= texture.width() as u64 && y as u64 + height as u64 <= texture.height() as u64,
            "read of {width}x{height} at ({x}, {y}) exceeds texture {} of {}x{}",
            texture.0.base.label(),
            texture.width(),
            texture.height()
        );
        let Some(len) = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(pixel_size as usize))
        else {
            return Err(GpuError::Precondition(format!("read of {width}x{height} does not fit in memory")));
        };
        readback.begin_read(len)?;

        let read_target = if self.caps.webgl2 { gl::READ_FRAMEBUFFER } else { gl::FRAMEBUFFER };
        let mut guard = self.ctx.borrow_mut();
        let ctx = &mut *guard;
        match texture.gl_texture() {
            None => self.state.bind_read_framebuffer(ctx, None),
            Some(native) => {
                self.state.bind_read_framebuffer(ctx, Some(self.read_framebuffer));
                if self.read_attachment != Some(native) {
                    ctx.framebuffer_texture_2d(read_target, gl::COLOR_ATTACHMENT0, gl::TEXTURE_2D, Some(native), 0);
                    self.read_attachment = Some(native);
                }
            }
        }
        let (x, y, w, h) = (x as i32, y as i32, width as i32, height as i32);

        match readback.pack_buffer() {
            Some(pack) => {
                ctx.bind_buffer(gl::PIXEL_PACK_BUFFER, Some(pack));
                ctx.read_pixels_to_pack_buffer(x, y, w, h, format, ty, 0);
                ctx.bind_buffer(gl::PIXEL_PACK_BUFFER, None);
                let Some(sync) = ctx.fence_sync() else {
                    readback.0.pending.set(false);
                    return Err(GpuError::Native("fenceSync returned null".into()));
                };
                drop(guard);
                Ok(ReadbackFuture::fenced(self.context(), readback.clone(), sync, len))
            }
            None => {
                let mut data = vec![0; len];
                ctx.read_pixels(x, y, w, h, format, ty, &mut data);
                drop(guard);
                Ok(ReadbackFuture::ready(self.context(), readback.clone(), data))
            }
        }
    }

    /// Reads `len` bytes of `buffer` starting at `src_offset`.
    ///
    /// Emulated uniform buffers are read from their CPU pages. Native
    /// buffers need WebGL2 (`getBufferSubData`).
    pub fn read_buffer(&mut self, readback: &Readback, buffer: &Buffer, src_offset: u32, len: u32) -> Result<ReadbackFuture> {
        buffer.0.base.ensure_alive()?;
        ensure_precondition!(
            src_offset as u64 + len as u64 <= buffer.byte_size() as u64,
            "read of {len} bytes at {src_offset} exceeds buffer {} of {} bytes",
            buffer.0.base.label(),
            buffer.byte_size()
        );
        ensure_supported!(
            buffer.is_emulated() || self.caps.webgl2,
            "reading native buffers needs WebGL2"
        );
        readback.begin_read(len as usize)?;

        let mut data = vec![0; len as usize];
        {
            let mut ctx = self.ctx.borrow_mut();
            for (page, in_page, start, chunk) in buffer.page_chunks(src_offset, len) {
                let dst = &mut data[start..start + chunk as usize];
                match buffer.page(page) {
                    Some(BufferPage::Shadow(shadow)) => {
                        let shadow = shadow.borrow();
                        let at = in_page as usize;
                        dst.copy_from_slice(&shadow[at..at + dst.len()]);
                    }
                    Some(BufferPage::Native(native)) => {
                        ctx.bind_buffer(gl::COPY_READ_BUFFER, Some(*native));
                        ctx.get_buffer_sub_data(gl::COPY_READ_BUFFER, in_page as i32, dst);
                        ctx.bind_buffer(gl::COPY_READ_BUFFER, None);
                    }
                    None => {
                        readback.0.pending.set(false);
                        return Err(GpuError::Native(format!("buffer page {page} is missing")));
                    }
                }
            }
        }
        Ok(ReadbackFuture::ready(self.context(), readback.clone(), data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_formats() {
        assert_eq!(read_format(Format::U8RgbaRt), Some((gl::RGBA, gl::UNSIGNED_BYTE, 4)));
        assert_eq!(read_format(Format::F32Rgba), Some((gl::RGBA, gl::FLOAT, 16)));
        assert_eq!(read_format(Format::D24S8), None);
        assert_eq!(read_format(Format::Bc1), None);
    }
}
