//! Asynchronous reads of GPU data.
//!
//! On WebGL2 a texture read goes into a pixel-pack buffer owned by the
//! [`Readback`], followed by a fence. The returned [`ReadbackFuture`] polls
//! the fence without blocking and copies the bytes out once it signals.
//! WebGL1 has neither, so reads complete synchronously and the future is
//! ready on first poll.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::error::{ensure_precondition, GpuError, Result};
use crate::gl::{consts as gl, GlBuffer, GlContext, GlSync};

use super::ResourceBase;

#[derive(Debug)]
pub(crate) struct ReadbackInner {
    pub(crate) base: ResourceBase,
    pub(crate) byte_size: u32,
    /// Pixel-pack buffer (WebGL2).
    pub(crate) pack_buffer: Option<GlBuffer>,
    pub(crate) pending: Cell<bool>,
}

/// Staging area for one outstanding read.
#[derive(Debug, Clone)]
pub struct Readback(pub(crate) Rc<ReadbackInner>);

resource_handle!(Readback, destroy_readback);

impl Readback {
    pub fn byte_size(&self) -> u32 {
        self.0.byte_size
    }

    /// A read was issued and its future has not completed yet.
    pub fn is_pending(&self) -> bool {
        self.0.pending.get()
    }

    pub(crate) fn pack_buffer(&self) -> Option<GlBuffer> {
        self.0.pack_buffer
    }

    /// Marks a new read in flight. Reads on one readback do not overlap.
    pub(crate) fn begin_read(&self, len: usize) -> Result<()> {
        self.0.base.ensure_alive()?;
        ensure_precondition!(
            !self.0.pending.get(),
            "readback {} already has a read in flight",
            self.0.base.label()
        );
        ensure_precondition!(
            len <= self.0.byte_size as usize,
            "read of {len} bytes exceeds readback {} of {} bytes",
            self.0.base.label(),
            self.0.byte_size
        );
        self.0.pending.set(true);
        Ok(())
    }
}

#[derive(Debug)]
enum ReadState {
    Ready(Vec<u8>),
    Fenced { sync: GlSync, len: usize },
    Done,
}

/// Result of a read. Resolves to the bytes read.
pub struct ReadbackFuture {
    ctx: Rc<RefCell<dyn GlContext>>,
    readback: Readback,
    state: ReadState,
}

impl std::fmt::Debug for ReadbackFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadbackFuture")
            .field("readback", &self.readback.0.base.id())
            .field("state", &self.state)
            .finish()
    }
}

impl ReadbackFuture {
    pub(crate) fn ready(ctx: Rc<RefCell<dyn GlContext>>, readback: Readback, data: Vec<u8>) -> Self {
        Self {
            ctx,
            readback,
            state: ReadState::Ready(data),
        }
    }

    pub(crate) fn fenced(ctx: Rc<RefCell<dyn GlContext>>, readback: Readback, sync: GlSync, len: usize) -> Self {
        Self {
            ctx,
            readback,
            state: ReadState::Fenced { sync, len },
        }
    }

    fn finish(&mut self, result: Result<Vec<u8>>) -> Poll<Result<Vec<u8>>> {
        self.readback.0.pending.set(false);
        Poll::Ready(result)
    }

    fn poll_fence(&mut self, sync: GlSync, len: usize, cx: &mut Context<'_>) -> Poll<Result<Vec<u8>>> {
        let mut ctx = self.ctx.borrow_mut();
        if ctx.is_context_lost() {
            drop(ctx);
            return self.finish(Err(GpuError::Native("context lost during readback".into())));
        }
        if self.readback.0.base.is_destroyed() {
            ctx.delete_sync(sync);
            drop(ctx);
            return self.finish(Err(GpuError::Precondition(format!(
                "readback {} destroyed while a read was in flight",
                self.readback.0.base.label()
            ))));
        }

        match ctx.client_wait_sync(sync, 0, 0) {
            gl::ALREADY_SIGNALED | gl::CONDITION_SATISFIED => {
                ctx.delete_sync(sync);
                let mut data = vec![0; len];
                ctx.bind_buffer(gl::COPY_READ_BUFFER, self.readback.pack_buffer());
                ctx.get_buffer_sub_data(gl::COPY_READ_BUFFER, 0, &mut data);
                ctx.bind_buffer(gl::COPY_READ_BUFFER, None);
                drop(ctx);
                self.finish(Ok(data))
            }
            gl::TIMEOUT_EXPIRED => {
                drop(ctx);
                self.state = ReadState::Fenced { sync, len };
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            status => {
                ctx.delete_sync(sync);
                drop(ctx);
                self.finish(Err(GpuError::Native(format!("clientWaitSync returned {status:#x}"))))
            }
        }
    }
}

impl Future for ReadbackFuture {
    type Output = Result<Vec<u8>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match std::mem::replace(&mut this.state, ReadState::Done) {
            ReadState::Ready(data) => this.finish(Ok(data)),
            ReadState::Fenced { sync, len } => this.poll_fence(sync, len, cx),
            ReadState::Done => Poll::Ready(Err(GpuError::Precondition("readback future polled after completion".into()))),
        }
    }
}

impl Drop for ReadbackFuture {
    fn drop(&mut self) {
        match std::mem::replace(&mut self.state, ReadState::Done) {
            ReadState::Done => {}
            ReadState::Fenced { sync, .. } => {
                if let Ok(mut ctx) = self.ctx.try_borrow_mut() {
                    ctx.delete_sync(sync);
                }
                self.readback.0.pending.set(false);
            }
            ReadState::Ready(_) => self.readback.0.pending.set(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::RecordingContext;
    use crate::resource::ResourceType;

    fn readback(ctx: &Rc<RefCell<RecordingContext>>, byte_size: u32) -> Readback {
        let mut c = ctx.borrow_mut();
        let buffer = c.create_buffer().unwrap();
        c.bind_buffer(gl::PIXEL_PACK_BUFFER, Some(buffer));
        c.buffer_data_size(gl::PIXEL_PACK_BUFFER, byte_size as i32, gl::STREAM_READ);
        Readback(Rc::new(ReadbackInner {
            base: ResourceBase::new(ResourceType::Readback),
            byte_size,
            pack_buffer: Some(buffer),
            pending: Cell::new(false),
        }))
    }

    #[test]
    fn fenced_read_resolves_after_polls() {
        let ctx = Rc::new(RefCell::new(RecordingContext::webgl2().with_sync_polls(3).with_pixel_fill(7)));
        let rb = readback(&ctx, 16);
        rb.begin_read(16).unwrap();
        let sync = {
            let mut c = ctx.borrow_mut();
            c.read_pixels_to_pack_buffer(0, 0, 2, 2, gl::RGBA, gl::UNSIGNED_BYTE, 0);
            c.fence_sync().unwrap()
        };
        let dyn_ctx: Rc<RefCell<dyn GlContext>> = ctx.clone();
        let future = ReadbackFuture::fenced(dyn_ctx, rb.clone(), sync, 16);
        let data = pollster::block_on(future).unwrap();
        assert_eq!(data, vec![7; 16]);
        assert!(!rb.is_pending());
    }

    #[test]
    fn overlapping_reads_are_rejected() {
        let ctx = Rc::new(RefCell::new(RecordingContext::webgl2()));
        let rb = readback(&ctx, 16);
        rb.begin_read(4).unwrap();
        assert!(rb.begin_read(4).is_err());
    }

    #[test]
    fn oversized_read_is_rejected() {
        let ctx = Rc::new(RefCell::new(RecordingContext::webgl2()));
        let rb = readback(&ctx, 16);
        assert!(rb.begin_read(17).is_err());
        assert!(!rb.is_pending());
    }

    #[test]
    fn dropping_future_releases_readback() {
        let ctx = Rc::new(RefCell::new(RecordingContext::webgl2()));
        let rb = readback(&ctx, 4);
        rb.begin_read(4).unwrap();
        let dyn_ctx: Rc<RefCell<dyn GlContext>> = ctx.clone();
        drop(ReadbackFuture::ready(dyn_ctx, rb.clone(), vec![1, 2, 3, 4]));
        assert!(!rb.is_pending());
        assert!(rb.begin_read(4).is_ok());
    }
}
