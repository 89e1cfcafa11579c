use crate::ir::{CompositeFunction, Ir};

use super::{TransformContext, TransformError, Transformation};

/// Inlines nested composites: every kernel becomes a flat sequence of its
/// leaf instructions in program order. Disabled leaves are kept (stripping
/// them is `strip-disabled`'s job), kernel variables are kept as declared.
pub struct Flatten;

impl Transformation for Flatten {
    fn name(&self) -> &str {
        "flatten"
    }

    fn is_idempotent(&self) -> bool {
        true
    }

    fn transform(&self, ir: Ir, _ctx: &TransformContext) -> Result<Ir, TransformError> {
        let mut out = Ir::new();
        for kernel in ir.kernels() {
            let mut flat = CompositeFunction::new(&kernel.name);
            flat.variables = kernel.variables.clone();
            for inst in kernel.leaves() {
                flat.add_instruction(inst.clone());
            }
            out.add_kernel(flat).map_err(|source| TransformError::Ir {
                pass: self.name().to_string(),
                source,
            })?;
        }
        Ok(out)
    }
}
