use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ensure_precondition, Result};
use crate::gl::{consts as gl, GlBuffer};

use super::ResourceBase;

bitflags::bitflags! {
    /// How a buffer is going to be bound.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const INDEX = 1 << 0;
        const VERTEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const COPY_SRC = 1 << 3;
        const COPY_DST = 1 << 4;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BufferFrequencyHint {
    #[default]
    Static,
    Dynamic,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub byte_size: u32,
    pub usage: BufferUsage,
    pub hint: BufferFrequencyHint,
}

impl BufferDescriptor {
    pub fn new(byte_size: u32, usage: BufferUsage) -> Self {
        Self {
            byte_size,
            usage,
            hint: BufferFrequencyHint::Static,
        }
    }
}

/// Storage of one page.
#[derive(Debug)]
pub(crate) enum BufferPage {
    Native(GlBuffer),
    /// CPU copy of an emulated uniform buffer page.
    Shadow(RefCell<Vec<u8>>),
}

#[derive(Debug)]
pub(crate) struct BufferInner {
    pub(crate) base: ResourceBase,
    pub(crate) byte_size: u32,
    pub(crate) usage: BufferUsage,
    pub(crate) hint: BufferFrequencyHint,
    pub(crate) page_byte_size: u32,
    pub(crate) pages: Vec<BufferPage>,
    /// Native bind target matching the usage.
    pub(crate) target: u32,
}

/// GPU buffer, split into fixed-size pages.
///
/// Uniform buffers are paged at the uniform block size limit so every
/// bindable range lives in a single native buffer. Other buffers have one
/// page spanning the whole buffer.
#[derive(Debug, Clone)]
pub struct Buffer(pub(crate) Rc<BufferInner>);

resource_handle!(Buffer, destroy_buffer);

impl Buffer {
    pub fn byte_size(&self) -> u32 {
        self.0.byte_size
    }

    pub fn usage(&self) -> BufferUsage {
        self.0.usage
    }

    pub fn hint(&self) -> BufferFrequencyHint {
        self.0.hint
    }

    pub fn page_byte_size(&self) -> u32 {
        self.0.page_byte_size
    }

    pub fn page_count(&self) -> usize {
        self.0.pages.len()
    }

    /// `true` for WebGL1 uniform buffers, which never touch the GPU.
    pub fn is_emulated(&self) -> bool {
        matches!(self.0.pages.first(), Some(BufferPage::Shadow(_)))
    }

    /// Native buffer holding byte `offset`.
    pub fn platform_buffer(&self, offset: u32) -> Option<GlBuffer> {
        let page = (offset / self.0.page_byte_size) as usize;
        match self.0.pages.get(page)? {
            BufferPage::Native(b) => Some(*b),
            BufferPage::Shadow(_) => None,
        }
    }

    /// Page index and in-page offset of `[offset, offset + size)`.
    ///
    /// The range must not straddle a page boundary.
    pub fn page_range(&self, offset: u32, size: u32) -> Result<(usize, u32)> {
        let page_size = self.0.page_byte_size;
        let in_page = offset % page_size;
        ensure_precondition!(
            in_page as u64 + size as u64 <= page_size as u64,
            "range {offset}+{size} of buffer {} crosses its {page_size}-byte page",
            self.0.base.label()
        );
        ensure_precondition!(
            offset as u64 + size as u64 <= self.0.byte_size as u64,
            "range {offset}+{size} exceeds buffer {} of {} bytes",
            self.0.base.label(),
            self.0.byte_size
        );
        Ok(((offset / page_size) as usize, in_page))
    }

    /// Splits `[offset, offset + len)` into per-page chunks
    /// `(page, in_page_offset, chunk_start, chunk_len)`.
    pub(crate) fn page_chunks(&self, offset: u32, len: u32) -> Vec<(usize, u32, usize, u32)> {
        let page_size = self.0.page_byte_size;
        let mut chunks = Vec::new();
        let mut cursor = offset;
        let end = offset + len;
        while cursor < end {
            let in_page = cursor % page_size;
            let chunk = (page_size - in_page).min(end - cursor);
            chunks.push(((cursor / page_size) as usize, in_page, (cursor - offset) as usize, chunk));
            cursor += chunk;
        }
        chunks
    }

    pub(crate) fn page(&self, index: usize) -> Option<&BufferPage> {
        self.0.pages.get(index)
    }

    pub(crate) fn target(&self) -> u32 {
        self.0.target
    }

    pub(crate) fn native_pages(&self) -> impl Iterator<Item = GlBuffer> + '_ {
        self.0.pages.iter().filter_map(|p| match p {
            BufferPage::Native(b) => Some(*b),
            BufferPage::Shadow(_) => None,
        })
    }
}

pub(crate) fn buffer_target(usage: BufferUsage) -> u32 {
    if usage.contains(BufferUsage::INDEX) {
        gl::ELEMENT_ARRAY_BUFFER
    } else if usage.contains(BufferUsage::UNIFORM) {
        gl::UNIFORM_BUFFER
    } else {
        gl::ARRAY_BUFFER
    }
}

pub(crate) fn buffer_gl_usage(hint: BufferFrequencyHint) -> u32 {
    match hint {
        BufferFrequencyHint::Static => gl::STATIC_DRAW,
        BufferFrequencyHint::Dynamic => gl::DYNAMIC_DRAW,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;
    use std::num::NonZeroU32;

    fn paged(byte_size: u32, page_byte_size: u32) -> Buffer {
        let pages = (0..byte_size.div_ceil(page_byte_size))
            .map(|i| BufferPage::Native(GlBuffer(NonZeroU32::new(i + 1).unwrap())))
            .collect();
        Buffer(Rc::new(BufferInner {
            base: ResourceBase::new(ResourceType::Buffer),
            byte_size,
            usage: BufferUsage::UNIFORM,
            hint: BufferFrequencyHint::Dynamic,
            page_byte_size,
            pages,
            target: gl::UNIFORM_BUFFER,
        }))
    }

    #[test]
    fn platform_buffer_selects_page() {
        let b = paged(200_000, 65_536);
        assert_eq!(b.page_count(), 4);
        assert_eq!(b.platform_buffer(0).unwrap().0.get(), 1);
        assert_eq!(b.platform_buffer(65_536).unwrap().0.get(), 2);
        assert_eq!(b.platform_buffer(199_999).unwrap().0.get(), 4);
        assert!(b.platform_buffer(300_000).is_none());
    }

    #[test]
    fn range_inside_page() {
        let b = paged(200_000, 65_536);
        assert_eq!(b.page_range(65_536 + 256, 1024).unwrap(), (1, 256));
        assert_eq!(b.page_range(65_536 - 16, 16).unwrap(), (0, 65_520));
    }

    #[test]
    fn range_crossing_page_is_precondition() {
        let b = paged(200_000, 65_536);
        let err = b.page_range(65_536 - 16, 32).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Precondition);
    }

    #[test]
    fn chunks_split_at_page_boundaries() {
        let b = paged(300, 100);
        assert_eq!(b.page_chunks(50, 200), vec![(0, 50, 0, 50), (1, 0, 50, 100), (2, 0, 150, 50)]);
        assert!(b.page_chunks(10, 0).is_empty());
    }

    #[test]
    fn target_follows_usage() {
        assert_eq!(buffer_target(BufferUsage::INDEX), gl::ELEMENT_ARRAY_BUFFER);
        assert_eq!(buffer_target(BufferUsage::UNIFORM | BufferUsage::COPY_DST), gl::UNIFORM_BUFFER);
        assert_eq!(buffer_target(BufferUsage::VERTEX), gl::ARRAY_BUFFER);
    }
}
