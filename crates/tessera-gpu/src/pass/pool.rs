use super::render_pass::RenderPass;

/// Recycled render passes.
///
/// Released passes keep their stream allocations, so steady-state frames
/// record without allocating.
#[derive(Debug, Default)]
pub(crate) struct RenderPassPool {
    free: Vec<RenderPass>,
    allocated: usize,
}

impl RenderPassPool {
    pub(crate) fn acquire(&mut self) -> RenderPass {
        self.free.pop().unwrap_or_else(|| {
            self.allocated += 1;
            log::debug!("render pass pool: {} pass(es) allocated", self.allocated);
            RenderPass::empty()
        })
    }

    pub(crate) fn release(&mut self, mut pass: RenderPass) {
        pass.reset();
        self.free.push(pass);
    }

    /// Passes created over the pool's lifetime.
    #[cfg(test)]
    pub(crate) fn allocated(&self) -> usize {
        self.allocated
    }

    #[cfg(test)]
    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::RenderPassDescriptor;

    #[test]
    fn released_passes_are_reused() {
        let mut pool = RenderPassPool::default();
        let mut pass = pool.acquire();
        pass.begin(1, RenderPassDescriptor::default(), None);
        for _ in 0..32 {
            pass.draw(3, 0);
        }
        let capacity = pass.stream.capacity();
        pool.release(pass);
        assert_eq!(pool.free_count(), 1);

        let pass = pool.acquire();
        assert_eq!(pool.allocated(), 1);
        assert!(pass.stream.is_empty());
        assert_eq!(pass.stream.capacity(), capacity);
    }
}
