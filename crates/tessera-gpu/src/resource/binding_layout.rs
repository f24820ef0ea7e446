use crate::caps::DeviceLimits;
use crate::error::{ensure_precondition, Result};

/// Resource counts of one bind group.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingLayoutDescriptor {
    pub num_uniform_buffers: u32,
    pub num_samplers: u32,
}

/// Flattened slot range of one bind group.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingLayoutTableEntry {
    pub first_uniform_buffer: u32,
    pub num_uniform_buffers: u32,
    pub first_sampler: u32,
    pub num_samplers: u32,
}

/// Bind groups laid out back to back over the native slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingLayoutTable {
    entries: Vec<BindingLayoutTableEntry>,
    total_uniform_buffers: u32,
    total_samplers: u32,
}

impl BindingLayoutTable {
    /// Totals saturate at `u32::MAX`, which no device limit admits.
    pub fn new(layouts: &[BindingLayoutDescriptor]) -> Self {
        let mut first_uniform_buffer: u32 = 0;
        let mut first_sampler: u32 = 0;
        let entries = layouts
            .iter()
            .map(|l| {
                let entry = BindingLayoutTableEntry {
                    first_uniform_buffer,
                    num_uniform_buffers: l.num_uniform_buffers,
                    first_sampler,
                    num_samplers: l.num_samplers,
                };
                first_uniform_buffer = first_uniform_buffer.saturating_add(l.num_uniform_buffers);
                first_sampler = first_sampler.saturating_add(l.num_samplers);
                entry
            })
            .collect();

        Self {
            entries,
            total_uniform_buffers: first_uniform_buffer,
            total_samplers: first_sampler,
        }
    }

    pub fn entries(&self) -> &[BindingLayoutTableEntry] {
        &self.entries
    }

    pub fn entry(&self, group: u32) -> Option<&BindingLayoutTableEntry> {
        self.entries.get(group as usize)
    }

    pub fn total_uniform_buffers(&self) -> u32 {
        self.total_uniform_buffers
    }

    pub fn total_samplers(&self) -> u32 {
        self.total_samplers
    }

    pub(crate) fn check_limits(&self, limits: &DeviceLimits) -> Result<()> {
        ensure_precondition!(
            self.total_uniform_buffers <= limits.max_uniform_buffers,
            "binding layouts use {} uniform buffers, limit is {}",
            self.total_uniform_buffers,
            limits.max_uniform_buffers
        );
        ensure_precondition!(
            self.total_samplers <= limits.max_texture_units,
            "binding layouts use {} samplers, limit is {}",
            self.total_samplers,
            limits.max_texture_units
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(u: u32, s: u32) -> BindingLayoutDescriptor {
        BindingLayoutDescriptor {
            num_uniform_buffers: u,
            num_samplers: s,
        }
    }

    fn entry(fu: u32, nu: u32, fs: u32, ns: u32) -> BindingLayoutTableEntry {
        BindingLayoutTableEntry {
            first_uniform_buffer: fu,
            num_uniform_buffers: nu,
            first_sampler: fs,
            num_samplers: ns,
        }
    }

    #[test]
    fn prefix_sums_in_declaration_order() {
        let table = BindingLayoutTable::new(&[layout(2, 1), layout(0, 3)]);
        assert_eq!(table.entries(), &[entry(0, 2, 0, 1), entry(2, 0, 1, 3)]);
        assert_eq!(table.total_uniform_buffers(), 2);
        assert_eq!(table.total_samplers(), 4);
    }

    #[test]
    fn empty_layout() {
        let table = BindingLayoutTable::new(&[]);
        assert!(table.entries().is_empty());
        assert!(table.entry(0).is_none());
    }

    #[test]
    fn limits_are_enforced() {
        let limits = DeviceLimits {
            max_texture_size: 4096,
            max_texture_units: 4,
            max_vertex_attributes: 16,
            max_uniform_buffers: 2,
            uniform_buffer_page_size: 65536,
            uniform_buffer_offset_alignment: 256,
            max_color_attachments: 1,
            max_samples: 1,
        };
        assert!(BindingLayoutTable::new(&[layout(2, 4)]).check_limits(&limits).is_ok());
        assert!(BindingLayoutTable::new(&[layout(2, 0), layout(1, 0)]).check_limits(&limits).is_err());
        assert!(BindingLayoutTable::new(&[layout(0, 5)]).check_limits(&limits).is_err());
    }

    #[test]
    fn huge_counts_saturate_and_fail_the_limit_check() {
        let limits = DeviceLimits {
            max_texture_size: 4096,
            max_texture_units: 16,
            max_vertex_attributes: 16,
            max_uniform_buffers: 24,
            uniform_buffer_page_size: 65536,
            uniform_buffer_offset_alignment: 256,
            max_color_attachments: 8,
            max_samples: 4,
        };
        let table = BindingLayoutTable::new(&[layout(u32::MAX, 1), layout(1, u32::MAX), layout(1, 1)]);
        assert_eq!(table.total_uniform_buffers(), u32::MAX);
        assert_eq!(table.total_samplers(), u32::MAX);
        assert_eq!(table.entry(2).map(|e| e.first_sampler), Some(u32::MAX));
        assert!(table.check_limits(&limits).is_err());
    }
}
