/// Construction parameters for a [`Device`](crate::Device).
///
/// Both flags cost time or memory and are off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Record a creation backtrace for every resource so
    /// [`Device::check_for_leaks`](crate::Device::check_for_leaks) can report
    /// where leaked resources came from.
    pub track_resources: bool,

    /// Check compile and link status of every program and log driver output.
    ///
    /// A program that fails the check never becomes ready.
    pub shader_debug: bool,
}

impl DeviceConfig {
    /// Leak tracking and shader diagnostics enabled.
    pub fn debug() -> Self {
        Self {
            track_resources: true,
            shader_debug: true,
        }
    }
}
