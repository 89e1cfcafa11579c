use crate::ir::{CompositeFunction, InstructionNode, Ir};

use super::{TransformContext, TransformError, Transformation};

/// Drops soft-deleted (disabled) instructions from every kernel,
/// recursively. Run this after passes that disable instructions instead of
/// removing them to keep sibling indices stable.
pub struct StripDisabled;

fn strip(kernel: &CompositeFunction) -> CompositeFunction {
    let mut out = CompositeFunction::new(&kernel.name);
    out.variables = kernel.variables.clone();
    for child in &kernel.children {
        match child {
            InstructionNode::Leaf(inst) if inst.enabled => {
                out.add_instruction(inst.clone());
            }
            InstructionNode::Leaf(_) => {}
            InstructionNode::Composite(comp) => {
                out.add_composite(strip(comp));
            }
        }
    }
    out
}

impl Transformation for StripDisabled {
    fn name(&self) -> &str {
        "strip-disabled"
    }

    fn is_idempotent(&self) -> bool {
        true
    }

    fn transform(&self, ir: Ir, _ctx: &TransformContext) -> Result<Ir, TransformError> {
        let mut out = Ir::new();
        for kernel in ir.kernels() {
            out.add_kernel(strip(kernel)).map_err(|source| TransformError::Ir {
                pass: self.name().to_string(),
                source,
            })?;
        }
        Ok(out)
    }
}
