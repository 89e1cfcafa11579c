use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use crate::accelerator::Capabilities;
use crate::ir::{Ir, IrError};

pub mod flatten;
pub mod remap_bits;
pub mod strip_disabled;

pub use flatten::Flatten;
pub use remap_bits::RemapBits;
pub use strip_disabled::StripDisabled;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("pass {pass:?} failed on kernel {kernel:?}: {message}")]
    Failed {
        pass: String,
        kernel: String,
        message: String,
    },
    #[error("pass {pass:?} cannot express instruction {instruction:?} in kernel {kernel:?}")]
    UnsupportedOperation {
        pass: String,
        instruction: String,
        kernel: String,
    },
    #[error("pass {pass:?}: {source}")]
    Ir {
        pass: String,
        #[source]
        source: IrError,
    },
}

impl TransformError {
    /// The identifier of the pass that failed.
    pub fn pass(&self) -> &str {
        match self {
            TransformError::Failed { pass, .. }
            | TransformError::UnsupportedOperation { pass, .. }
            | TransformError::Ir { pass, .. } => pass,
        }
    }
}

/// Everything a pass may consult besides the IR itself. Backend-specific
/// passes read the target's capabilities from here; the pass never learns
/// the backend's identity.
#[derive(Debug, Clone, Default)]
pub struct TransformContext {
    pub capabilities: Option<Capabilities>,
}

impl TransformContext {
    pub fn for_target(capabilities: Capabilities) -> Self {
        Self {
            capabilities: Some(capabilities),
        }
    }
}

/// One optimization/lowering/embedding pass over the IR. Passes take the
/// IR by value and return a new one, so a caller-retained IR is never
/// observed mid-rewrite; deterministic for a given (IR, context) pair.
pub trait Transformation: Send + Sync {
    /// Stable identifier, also used in error reporting.
    fn name(&self) -> &str;

    /// Whether applying this pass twice yields the same IR as applying it
    /// once. Declared per pass, never assumed.
    fn is_idempotent(&self) -> bool;

    fn transform(&self, ir: Ir, ctx: &TransformContext) -> Result<Ir, TransformError>;
}

impl std::fmt::Debug for dyn Transformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformation")
            .field("name", &self.name())
            .finish()
    }
}

/// An ordered sequence of passes. `run` stops at the first failure and the
/// error names the originating pass; the input IR is cloned up front, so
/// the caller's instance is untouched no matter where the pipeline stops.
#[derive(Default)]
pub struct Pipeline {
    passes: Vec<Arc<dyn Transformation>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pass: Arc<dyn Transformation>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    pub fn passes(&self) -> impl Iterator<Item = &str> {
        self.passes.iter().map(|pass| pass.name())
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    #[instrument(skip_all, fields(passes = self.passes.len()))]
    pub fn run(&self, ir: &Ir, ctx: &TransformContext) -> Result<Ir, TransformError> {
        let mut current = ir.clone();
        for pass in &self.passes {
            tracing::debug!(pass = pass.name(), "applying transformation");
            current = pass.transform(current, ctx)?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CompositeFunction, Instruction};

    struct Renamer;

    impl Transformation for Renamer {
        fn name(&self) -> &str {
            "renamer"
        }

        fn is_idempotent(&self) -> bool {
            true
        }

        fn transform(&self, mut ir: Ir, _ctx: &TransformContext) -> Result<Ir, TransformError> {
            for kernel in ir.kernels_mut() {
                for child in &mut kernel.children {
                    if let crate::ir::InstructionNode::Leaf(inst) = child {
                        inst.name = inst.name.to_lowercase();
                    }
                }
            }
            Ok(ir)
        }
    }

    struct AlwaysFails;

    impl Transformation for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        fn is_idempotent(&self) -> bool {
            true
        }

        fn transform(&self, ir: Ir, _ctx: &TransformContext) -> Result<Ir, TransformError> {
            let kernel = ir.kernel_names().next().unwrap_or("").to_string();
            Err(TransformError::Failed {
                pass: self.name().to_string(),
                kernel,
                message: "intentional".to_string(),
            })
        }
    }

    fn sample_ir() -> Ir {
        let mut kernel = CompositeFunction::new("main");
        kernel.add_instruction(Instruction::new("H", vec![0]));
        let mut ir = Ir::new();
        ir.add_kernel(kernel).unwrap();
        ir
    }

    #[test]
    fn passes_apply_in_order() {
        let ir = sample_ir();
        let mut pipeline = Pipeline::new();
        pipeline.push(Arc::new(Renamer));
        let out = pipeline.run(&ir, &TransformContext::default()).unwrap();
        assert_eq!(
            out.kernel("main").unwrap().leaves().next().unwrap().name,
            "h"
        );
        // input untouched
        assert_eq!(ir.kernel("main").unwrap().leaves().next().unwrap().name, "H");
    }

    #[test]
    fn failure_halts_and_names_the_pass() {
        let ir = sample_ir();
        let mut pipeline = Pipeline::new();
        pipeline.push(Arc::new(Renamer));
        pipeline.push(Arc::new(AlwaysFails));
        let err = pipeline.run(&ir, &TransformContext::default()).unwrap_err();
        assert_eq!(err.pass(), "always-fails");
        // the caller-visible IR is unaffected by the failed pipeline
        assert_eq!(ir.kernel("main").unwrap().leaves().next().unwrap().name, "H");
    }
}
