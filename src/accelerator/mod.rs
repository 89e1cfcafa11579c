use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use thiserror::Error;

use crate::ir::CompositeFunction;

pub mod buffer;
pub mod sampler;

pub use buffer::{AcceleratorBit, AcceleratorBuffer, BitState, BufferError, MetadataValue};
pub use sampler::Sampler;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("backend {backend:?}: buffer of size {requested} exceeds capacity {capacity}")]
    Resource {
        backend: String,
        requested: usize,
        capacity: usize,
    },
    /// Retryable backend failure; the framework never retries on its own.
    #[error("backend {backend:?}: executing kernel {kernel:?} failed: {message}")]
    Execution {
        backend: String,
        kernel: String,
        message: String,
    },
    /// Not retryable (malformed credentials, incompatible backend, ...).
    #[error("backend {backend:?}: fatal: {message}")]
    FatalBackend { backend: String, message: String },
    #[error("backend {backend:?}: kernel {kernel:?} timed out after {elapsed:?}")]
    Timeout {
        backend: String,
        kernel: String,
        elapsed: Duration,
    },
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

impl ExecutionError {
    /// Whether the caller may reasonably retry the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecutionError::Execution { .. } | ExecutionError::Timeout { .. }
        )
    }
}

/// Backend constraints an accelerator advertises so compilers and
/// transformation passes can adapt without knowing the backend's identity.
/// `None` fields mean "unconstrained".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Largest buffer this backend can allocate.
    pub max_bits: Option<usize>,
    /// Instruction names the backend can execute natively.
    pub supported_instructions: Option<BTreeSet<String>>,
    /// Physical two-bit connectivity, as index pairs.
    pub connectivity: Option<Vec<(usize, usize)>>,
}

impl Capabilities {
    pub fn supports(&self, instruction: &str) -> bool {
        match &self.supported_instructions {
            Some(set) => set.contains(instruction),
            None => true,
        }
    }
}

/// Per-execution knobs supplied by the caller.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Number of repeated samples one `execute` call records.
    pub shots: u64,
    /// Upper bound on one execution; on expiry the backend reports
    /// [`ExecutionError::Timeout`] and leaves the buffer well defined.
    pub timeout: Option<Duration>,
    /// Values for the kernel's free symbolic variables.
    pub bindings: BTreeMap<String, f64>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            shots: 1024,
            timeout: None,
            bindings: BTreeMap::new(),
        }
    }
}

impl ExecutionOptions {
    pub fn with_shots(shots: u64) -> Self {
        Self {
            shots,
            ..Self::default()
        }
    }
}

/// An execution backend. One `execute` call takes a buffer through the
/// allocated -> executing -> completed cycle; implementations that are
/// reentrant may run independent (buffer, kernel) pairs concurrently, so
/// `execute` takes `&self` and the exclusive borrow is on the buffer
/// alone.
pub trait Accelerator: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Allocate a result buffer of `size` addressable bits.
    fn create_buffer(&self, size: usize) -> Result<AcceleratorBuffer, ExecutionError> {
        if let Some(capacity) = self.capabilities().max_bits {
            if size > capacity {
                return Err(ExecutionError::Resource {
                    backend: self.name().to_string(),
                    requested: size,
                    capacity,
                });
            }
        }
        Ok(AcceleratorBuffer::new(size))
    }

    /// Run `kernel` against `buffer`, recording results before returning.
    /// The buffer's measurement multiset is updated all-or-nothing: a
    /// failed call leaves it exactly as it was.
    fn execute(
        &self,
        buffer: &mut AcceleratorBuffer,
        kernel: &CompositeFunction,
        options: &ExecutionOptions,
    ) -> Result<(), ExecutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_capabilities_support_everything() {
        let caps = Capabilities::default();
        assert!(caps.supports("ANYTHING"));
    }

    #[test]
    fn constrained_capabilities_filter_by_name() {
        let caps = Capabilities {
            supported_instructions: Some(["H".to_string(), "CNOT".to_string()].into()),
            ..Capabilities::default()
        };
        assert!(caps.supports("H"));
        assert!(!caps.supports("TOFFOLI"));
    }

    #[test]
    fn retryability_follows_the_taxonomy() {
        let retry = ExecutionError::Execution {
            backend: "b".into(),
            kernel: "k".into(),
            message: "queue hiccup".into(),
        };
        let fatal = ExecutionError::FatalBackend {
            backend: "b".into(),
            message: "bad credentials".into(),
        };
        assert!(retry.is_retryable());
        assert!(!fatal.is_retryable());
    }
}
