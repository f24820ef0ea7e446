//! The device: resource factory, command replay and native state owner.
//!
//! Responsibilities:
//! - resolve capabilities, limits and vendor strings once per context
//! - create and destroy resources, owning every native handle
//! - replay recorded render passes through the state cache
//! - upload and read back buffer and texture data
//! - keep the debug side channel (names, leak tracking, debug groups)

mod cache;
mod create;
mod destroy;
mod query;
mod readback;
mod submit;
mod upload;

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::caps::{Capabilities, DeviceLimits, VendorInfo};
use crate::config::DeviceConfig;
use crate::error::{GpuError, Result};
use crate::format::Format;
use crate::gl::{consts as gl, GlContext, GlFramebuffer, GlTexture};
use crate::leak::ResourceTracker;
use crate::pass::{DebugPointer, RenderPassPool};
use crate::resource::texture::{texture_target, TextureInner};
use crate::resource::{ResourceBase, ResourceType, Texture, TextureDescriptor, TextureDimension, TextureUsage};

pub(crate) use cache::CachedDeviceState;

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// Pixel format of the onscreen texture.
const ONSCREEN_FORMAT: Format = Format::U8RgbaRt;

/// GPU device bound to one native context.
///
/// Single-threaded. Resources created by a device must be destroyed on the
/// same device; passes created by a device can only be submitted to it.
pub struct Device {
    id: u64,
    ctx: Rc<RefCell<dyn GlContext>>,
    config: DeviceConfig,
    caps: Capabilities,
    limits: DeviceLimits,
    vendor: VendorInfo,

    state: CachedDeviceState,
    pass_pool: RenderPassPool,
    tracker: ResourceTracker,

    /// Offscreen framebuffer all render passes draw into.
    render_framebuffer: GlFramebuffer,
    /// Read side of resolves and texture readbacks.
    read_framebuffer: GlFramebuffer,
    /// Draw side of resolves (WebGL2).
    resolve_framebuffer: Option<GlFramebuffer>,
    /// Texture attached to `read_framebuffer`.
    read_attachment: Option<GlTexture>,
    /// Attribute locations enabled outside of any VAO.
    enabled_attributes: u32,

    onscreen: Texture,
    debug_group_depth: u32,
    debug_pointer: Option<DebugPointer>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("renderer", &self.vendor.renderer)
            .field("webgl2", &self.caps.webgl2)
            .field("live_resources", &self.tracker.live_count())
            .finish()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if self.tracker.is_enabled() {
            self.tracker.check_for_leaks();
        }
        let Ok(mut ctx) = self.ctx.try_borrow_mut() else {
            log::warn!("device {}: context borrowed during drop, framebuffers leaked", self.id);
            return;
        };
        if ctx.is_context_lost() {
            return;
        }
        let framebuffers = [Some(self.render_framebuffer), Some(self.read_framebuffer), self.resolve_framebuffer];
        for framebuffer in framebuffers.into_iter().flatten() {
            ctx.delete_framebuffer(framebuffer);
        }
    }
}

impl Device {
    /// Creates a device on `ctx`.
    ///
    /// The caller keeps its own handle to the context; the device assumes
    /// it is the only user of the context's bound state from here on.
    pub fn new<C: GlContext + 'static>(ctx: Rc<RefCell<C>>, config: DeviceConfig) -> Result<Self> {
        let ctx: Rc<RefCell<dyn GlContext>> = ctx;
        Self::with_shared_context(ctx, config)
    }

    pub fn with_shared_context(ctx: Rc<RefCell<dyn GlContext>>, config: DeviceConfig) -> Result<Self> {
        let id = NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed);

        let (caps, limits, vendor, state, render_framebuffer, read_framebuffer, resolve_framebuffer) = {
            let mut guard = ctx.borrow_mut();
            let c = &mut *guard;
            if c.is_context_lost() {
                return Err(GpuError::Native("context is lost".into()));
            }

            let caps = Capabilities::resolve(c);
            let limits = DeviceLimits::resolve(c, &caps);
            let vendor = VendorInfo::resolve(c);

            let state = CachedDeviceState::new(
                &caps,
                limits.max_texture_units,
                limits.max_uniform_buffers,
                limits.max_color_attachments,
            );
            state.force_apply(c);
            c.pixel_store_i32(gl::UNPACK_ALIGNMENT, 1);
            c.pixel_store_i32(gl::PACK_ALIGNMENT, 1);

            let render = create_framebuffer(c)?;
            let read = create_framebuffer(c)?;
            let resolve = if caps.blit_framebuffer { Some(create_framebuffer(c)?) } else { None };

            (caps, limits, vendor, state, render, read, resolve)
        };

        log::debug!(
            "device {id}: {} / {} ({}), webgl2={}",
            vendor.vendor,
            vendor.renderer,
            vendor.version,
            caps.webgl2
        );

        Ok(Self {
            id,
            ctx,
            config,
            caps,
            limits,
            vendor,
            state,
            pass_pool: RenderPassPool::default(),
            tracker: ResourceTracker::new(config.track_resources),
            render_framebuffer,
            read_framebuffer,
            resolve_framebuffer,
            read_attachment: None,
            enabled_attributes: 0,
            onscreen: onscreen_texture(1, 1),
            debug_group_depth: 0,
            debug_pointer: None,
        })
    }

    pub fn config(&self) -> DeviceConfig {
        self.config
    }

    /// Shared handle to the native context.
    pub fn context(&self) -> Rc<RefCell<dyn GlContext>> {
        Rc::clone(&self.ctx)
    }

    // ── swap chain ───────────────────────────────────────────────────────

    /// Resizes the onscreen texture. Render targets made from the previous
    /// onscreen texture keep their old size and fail attachment checks
    /// against new ones.
    pub fn configure_swap_chain(&mut self, width: u32, height: u32) {
        if self.onscreen.width() == width && self.onscreen.height() == height {
            return;
        }
        log::debug!("device {}: swap chain {width}x{height}", self.id);
        self.onscreen = onscreen_texture(width.max(1), height.max(1));
    }

    /// The texture backed by the default framebuffer.
    pub fn onscreen_texture(&self) -> Texture {
        self.onscreen.clone()
    }

    // ── debug side channel ───────────────────────────────────────────────

    pub fn set_resource_name(&mut self, resource: &dyn crate::resource::Resource, name: &str) {
        resource.base().set_name(name);
        self.tracker.set_name(resource.id(), name);
    }

    /// Excludes (or re-includes) a resource from leak reports.
    pub fn set_resource_leak_check(&mut self, resource: &dyn crate::resource::Resource, enabled: bool) {
        self.tracker.set_leak_check(resource.id(), enabled);
    }

    /// Logs and returns every live resource with leak checking enabled.
    /// Empty unless [`DeviceConfig::track_resources`] is set.
    pub fn check_for_leaks(&self) -> Vec<crate::leak::LeakReport> {
        self.tracker.check_for_leaks()
    }

    pub fn push_debug_group(&mut self, label: &str) {
        log::debug!("debug group {}: {label}", self.debug_group_depth);
        self.debug_group_depth += 1;
        self.ctx.borrow_mut().push_debug_group(label);
    }

    pub fn pop_debug_group(&mut self) {
        if self.debug_group_depth == 0 {
            log::warn!("pop_debug_group without a matching push");
            return;
        }
        self.debug_group_depth -= 1;
        self.ctx.borrow_mut().pop_debug_group();
    }

    // ── internals ────────────────────────────────────────────────────────

    fn register(&mut self, base: &ResourceBase) {
        self.tracker.track(base.id(), base.resource_type());
    }
}

fn create_framebuffer(ctx: &mut dyn GlContext) -> Result<GlFramebuffer> {
    ctx.create_framebuffer()
        .ok_or_else(|| GpuError::Native("createFramebuffer returned null".into()))
}

fn onscreen_texture(width: u32, height: u32) -> Texture {
    let descriptor = TextureDescriptor {
        usage: TextureUsage::RENDER_TARGET,
        ..TextureDescriptor::new_2d(ONSCREEN_FORMAT, width, height, 1)
    };
    Texture(Rc::new(TextureInner {
        base: ResourceBase::new(ResourceType::Texture),
        descriptor,
        gl_texture: None,
        gl_target: texture_target(TextureDimension::D2),
        immutable: true,
        npot: false,
        mipmaps_generated: std::cell::Cell::new(false),
        last_sampler: std::cell::Cell::new(None),
    }))
}
