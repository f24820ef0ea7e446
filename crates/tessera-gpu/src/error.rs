use thiserror::Error;

/// Errors raised by the device layer.
///
/// The variants separate wrong API usage from driver-side failures so callers
/// (and tests) can tell them apart. Soft failures such as shader compile
/// errors or leaked resources are never returned; they go to the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    /// The caller violated a documented precondition of the API.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The current context lacks a capability or extension the request needs.
    #[error("unsupported on this context: {0}")]
    Unsupported(String),

    /// The native context failed in a way the device cannot recover from.
    ///
    /// After this error the cached device state may no longer match the
    /// context; the device should be torn down.
    #[error("native context failure: {0}")]
    Native(String),
}

/// Coarse classification of a [`GpuError`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    Precondition,
    Unsupported,
    Native,
}

impl GpuError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GpuError::Precondition(_) => ErrorKind::Precondition,
            GpuError::Unsupported(_) => ErrorKind::Unsupported,
            GpuError::Native(_) => ErrorKind::Native,
        }
    }

    /// Returns `true` for errors after which the device must not be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GpuError::Native(_))
    }
}

pub type Result<T, E = GpuError> = std::result::Result<T, E>;

/// Returns early with [`GpuError::Precondition`] when `cond` does not hold.
macro_rules! ensure_precondition {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::GpuError::Precondition(format!($($arg)+)));
        }
    };
}

/// Returns early with [`GpuError::Unsupported`] when `cond` does not hold.
macro_rules! ensure_supported {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::GpuError::Unsupported(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_precondition;
pub(crate) use ensure_supported;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        assert_eq!(GpuError::Precondition("x".into()).kind(), ErrorKind::Precondition);
        assert_eq!(GpuError::Unsupported("x".into()).kind(), ErrorKind::Unsupported);
        assert_eq!(GpuError::Native("x".into()).kind(), ErrorKind::Native);
    }

    #[test]
    fn only_native_is_fatal() {
        assert!(GpuError::Native("lost".into()).is_fatal());
        assert!(!GpuError::Precondition("bad".into()).is_fatal());
        assert!(!GpuError::Unsupported("ext".into()).is_fatal());
    }

    #[test]
    fn display_includes_message() {
        let e = GpuError::Precondition("binding count".into());
        assert_eq!(e.to_string(), "precondition violated: binding count");
    }
}
