use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod asm;
pub mod composite;
pub mod instruction;
pub mod serialize;
pub mod visitor;

pub use asm::{AsmRenderer, DefaultRenderer};
pub use composite::{CompositeFunction, InstructionNode};
pub use instruction::{Instruction, Parameter};
pub use visitor::InstructionVisitor;

#[derive(Debug, Error)]
pub enum IrError {
    #[error("kernel {name:?} already exists in this IR")]
    DuplicateKernel { name: String },
    #[error("kernel {name:?} not found")]
    KernelNotFound { name: String },
    #[error("child index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("bit index {bit} out of range for bit map of length {len}")]
    BitOutOfRange { bit: usize, len: usize },
    #[error("unsupported IR format version {found}, this build reads version {supported}")]
    UnsupportedFormatVersion { found: u64, supported: u64 },
    #[error("malformed IR payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The intermediate representation: a set of named kernels, produced by a
/// compiler, rewritten by transformation passes and finally consumed by an
/// accelerator. Kernel names are unique; iteration order is the name order,
/// so rendering and persistence are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ir {
    pub(crate) kernels: BTreeMap<String, CompositeFunction>,
}

impl Ir {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a kernel under its own name. Duplicate names are rejected, the
    /// existing kernel is kept.
    pub fn add_kernel(&mut self, kernel: CompositeFunction) -> Result<(), IrError> {
        if self.kernels.contains_key(&kernel.name) {
            return Err(IrError::DuplicateKernel {
                name: kernel.name.clone(),
            });
        }
        self.kernels.insert(kernel.name.clone(), kernel);
        Ok(())
    }

    pub fn kernel(&self, name: &str) -> Result<&CompositeFunction, IrError> {
        self.kernels.get(name).ok_or_else(|| IrError::KernelNotFound {
            name: name.to_string(),
        })
    }

    pub fn kernel_mut(&mut self, name: &str) -> Result<&mut CompositeFunction, IrError> {
        self.kernels
            .get_mut(name)
            .ok_or_else(|| IrError::KernelNotFound {
                name: name.to_string(),
            })
    }

    pub fn remove_kernel(&mut self, name: &str) -> Result<CompositeFunction, IrError> {
        self.kernels.remove(name).ok_or_else(|| IrError::KernelNotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kernels.contains_key(name)
    }

    pub fn kernels(&self) -> impl Iterator<Item = &CompositeFunction> {
        self.kernels.values()
    }

    pub fn kernels_mut(&mut self) -> impl Iterator<Item = &mut CompositeFunction> {
        self.kernels.values_mut()
    }

    pub fn kernel_names(&self) -> impl Iterator<Item = &str> {
        self.kernels.keys().map(String::as_str)
    }

    /// Number of kernels.
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Total leaf instruction count across all kernels.
    pub fn total_instructions(&self) -> usize {
        self.kernels
            .values()
            .map(CompositeFunction::total_instructions)
            .sum()
    }
}
