use thiserror::Error;

/// Configuration-time layout failures. These are reportable to the
/// caller; nothing here aborts the VM.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("unsupported layout kind: {0}")]
    UnsupportedKind(String),

    #[error("malformed field input: {0}")]
    MalformedFieldInput(String),
}

/// Memory-subsystem failures.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("out of memory in region {region}: requested {requested} bytes, {available} available")]
    OutOfMemory {
        region: String,
        requested: usize,
        available: usize,
    },

    #[error("{op} failed: {source}")]
    Os {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl MemoryError {
    pub(crate) fn os(op: &'static str) -> Self {
        MemoryError::Os {
            op,
            source: std::io::Error::last_os_error(),
        }
    }
}

/// Aborts on an unrecoverable condition: a corrupted header, an
/// exhausted immortal space, or an overlapping region set. The
/// diagnostic goes to the log stream before the panic.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {{
        tracing::error!($($arg)*);
        panic!($($arg)*);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_memory_message() {
        let err = MemoryError::OutOfMemory {
            region: "immortal".into(),
            requested: 64,
            available: 24,
        };
        let msg = err.to_string();
        assert!(msg.contains("immortal"));
        assert!(msg.contains("64"));
        assert!(msg.contains("24"));
    }

    #[test]
    fn layout_error_message() {
        let err = LayoutError::MalformedFieldInput("superclass size not word aligned".into());
        assert!(err.to_string().contains("superclass size"));
    }
}
