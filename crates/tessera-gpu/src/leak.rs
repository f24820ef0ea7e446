//! Live-resource tracking.
//!
//! With tracking enabled every created resource is registered together with
//! the backtrace of its creation. Destroying a resource unregisters it;
//! whatever is left when [`ResourceTracker::check_for_leaks`] runs is
//! reported through `log::warn!`.

use std::backtrace::Backtrace;
use std::collections::HashMap;

use crate::resource::{ResourceId, ResourceType};

#[derive(Debug)]
struct Tracked {
    ty: ResourceType,
    name: Option<String>,
    leak_check: bool,
    backtrace: Backtrace,
}

/// One leaked resource.
#[derive(Debug)]
pub struct LeakReport {
    pub id: ResourceId,
    pub resource_type: ResourceType,
    pub name: Option<String>,
    pub backtrace: String,
}

#[derive(Debug, Default)]
pub struct ResourceTracker {
    enabled: bool,
    live: HashMap<ResourceId, Tracked>,
}

impl ResourceTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            live: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn track(&mut self, id: ResourceId, ty: ResourceType) {
        if !self.enabled {
            return;
        }
        self.live.insert(
            id,
            Tracked {
                ty,
                name: None,
                leak_check: true,
                backtrace: Backtrace::force_capture(),
            },
        );
    }

    pub fn untrack(&mut self, id: ResourceId) {
        self.live.remove(&id);
    }

    pub fn set_name(&mut self, id: ResourceId, name: &str) {
        if let Some(t) = self.live.get_mut(&id) {
            t.name = Some(name.to_string());
        }
    }

    /// Excludes (or re-includes) a resource from leak reports.
    pub fn set_leak_check(&mut self, id: ResourceId, enabled: bool) {
        if let Some(t) = self.live.get_mut(&id) {
            t.leak_check = enabled;
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Live resources subject to leak checks, ordered by id.
    pub fn leaks(&self) -> Vec<LeakReport> {
        let mut leaks: Vec<LeakReport> = self
            .live
            .iter()
            .filter(|(_, t)| t.leak_check)
            .map(|(id, t)| LeakReport {
                id: *id,
                resource_type: t.ty,
                name: t.name.clone(),
                backtrace: t.backtrace.to_string(),
            })
            .collect();
        leaks.sort_by_key(|l| l.id);
        leaks
    }

    /// Logs every leak and returns them.
    pub fn check_for_leaks(&self) -> Vec<LeakReport> {
        let leaks = self.leaks();
        for leak in &leaks {
            match &leak.name {
                Some(name) => log::warn!("leaked {:?} {} ({name}) created at:\n{}", leak.resource_type, leak.id, leak.backtrace),
                None => log::warn!("leaked {:?} {} created at:\n{}", leak.resource_type, leak.id, leak.backtrace),
            }
        }
        if !leaks.is_empty() {
            log::warn!("{} resource(s) leaked", leaks.len());
        }
        leaks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_tracker_records_nothing() {
        let mut t = ResourceTracker::new(false);
        t.track(ResourceId(1), ResourceType::Buffer);
        assert_eq!(t.live_count(), 0);
        assert!(t.check_for_leaks().is_empty());
    }

    #[test]
    fn reports_only_remaining() {
        let mut t = ResourceTracker::new(true);
        for i in 1..=4 {
            t.track(ResourceId(i), ResourceType::Texture);
        }
        t.untrack(ResourceId(1));
        t.untrack(ResourceId(2));
        t.untrack(ResourceId(4));
        let leaks = t.check_for_leaks();
        assert_eq!(leaks.len(), 1);
        assert_eq!(leaks[0].id, ResourceId(3));
        assert!(!leaks[0].backtrace.is_empty());
    }

    #[test]
    fn leak_check_opt_out() {
        let mut t = ResourceTracker::new(true);
        t.track(ResourceId(7), ResourceType::Sampler);
        t.set_leak_check(ResourceId(7), false);
        assert!(t.leaks().is_empty());
        assert_eq!(t.live_count(), 1);
    }

    #[test]
    fn leaks_sorted_and_named() {
        let mut t = ResourceTracker::new(true);
        t.track(ResourceId(9), ResourceType::Buffer);
        t.track(ResourceId(2), ResourceType::Buffer);
        t.set_name(ResourceId(9), "vertices");
        let leaks = t.leaks();
        assert_eq!(leaks[0].id, ResourceId(2));
        assert_eq!(leaks[1].name.as_deref(), Some("vertices"));
    }
}
