use thiserror::Error;

use crate::accelerator::Accelerator;
use crate::ir::{Ir, IrError};

pub mod textual;
pub mod tokens;

pub use textual::TextualCompiler;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{compiler}: syntax error at offset {offset}: {message}")]
    Syntax {
        compiler: String,
        offset: usize,
        message: String,
    },
    /// The source needs an operation the target backend cannot express and
    /// no registered transformation lowers. Never silently approximated.
    #[error(
        "{compiler}: instruction {instruction:?} in kernel {kernel:?} is not supported by target {target:?}"
    )]
    UnsupportedOperation {
        compiler: String,
        instruction: String,
        kernel: String,
        target: String,
    },
    #[error("{compiler}: {source}")]
    Ir {
        compiler: String,
        #[source]
        source: IrError,
    },
}

/// A front end: turns source text into IR, optionally informed by the
/// target accelerator's capabilities. Stateless per call: identical
/// source against an identical target yields structurally identical IR.
pub trait Compiler: Send + Sync {
    fn name(&self) -> &str;

    fn compile(
        &self,
        source: &str,
        target: Option<&dyn Accelerator>,
    ) -> Result<Ir, CompileError>;
}
