use crate::ir::Ir;

use super::{TransformContext, TransformError, Transformation};

/// Re-addresses every instruction's bits through a logical-to-physical
/// map: logical bit `i` becomes physical bit `map[i]`. This is the generic
/// placement piece; computing a good map for a given hardware graph is a
/// separate, pluggable concern.
pub struct RemapBits {
    map: Vec<usize>,
}

impl RemapBits {
    pub fn new(map: Vec<usize>) -> Self {
        Self { map }
    }
}

impl Transformation for RemapBits {
    fn name(&self) -> &str {
        "remap-bits"
    }

    // remapping twice remaps twice
    fn is_idempotent(&self) -> bool {
        false
    }

    fn transform(&self, mut ir: Ir, ctx: &TransformContext) -> Result<Ir, TransformError> {
        if let Some(capabilities) = &ctx.capabilities {
            if let Some(max_bits) = capabilities.max_bits {
                if let Some(bad) = self.map.iter().find(|target| **target >= max_bits) {
                    return Err(TransformError::Failed {
                        pass: self.name().to_string(),
                        kernel: String::new(),
                        message: format!(
                            "map targets physical bit {bad}, backend has {max_bits} bits"
                        ),
                    });
                }
            }
        }
        let names: Vec<String> = ir.kernel_names().map(str::to_string).collect();
        for name in names {
            let kernel = ir.kernel_mut(&name).map_err(|source| TransformError::Ir {
                pass: self.name().to_string(),
                source,
            })?;
            kernel.map_bits(&self.map).map_err(|source| TransformError::Ir {
                pass: self.name().to_string(),
                source,
            })?;
        }
        Ok(ir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accelerator::Capabilities;
    use crate::ir::{CompositeFunction, Instruction};

    fn two_bit_ir() -> Ir {
        let mut kernel = CompositeFunction::new("main");
        kernel.add_instruction(Instruction::new("CNOT", vec![0, 1]));
        let mut ir = Ir::new();
        ir.add_kernel(kernel).unwrap();
        ir
    }

    #[test]
    fn remaps_logical_to_physical() {
        let out = RemapBits::new(vec![3, 1])
            .transform(two_bit_ir(), &TransformContext::default())
            .unwrap();
        let bits: Vec<_> = out
            .kernel("main")
            .unwrap()
            .leaves()
            .flat_map(|i| i.bits.clone())
            .collect();
        assert_eq!(bits, vec![3, 1]);
    }

    #[test]
    fn short_map_fails_with_pass_id() {
        let err = RemapBits::new(vec![0])
            .transform(two_bit_ir(), &TransformContext::default())
            .unwrap_err();
        assert_eq!(err.pass(), "remap-bits");
    }

    #[test]
    fn map_must_fit_target_capabilities() {
        let ctx = TransformContext::for_target(Capabilities {
            max_bits: Some(2),
            ..Capabilities::default()
        });
        let err = RemapBits::new(vec![0, 5]).transform(two_bit_ir(), &ctx).unwrap_err();
        assert!(matches!(err, TransformError::Failed { .. }));
    }
}
