use std::collections::BTreeSet;
use std::time::Duration;

use tracing::instrument;

use super::buffer::{AcceleratorBuffer, BitState, MetadataValue};
use super::{Accelerator, Capabilities, ExecutionError, ExecutionOptions};
use crate::ir::CompositeFunction;

/// The in-process reference backend: a deterministic sampler that walks a
/// kernel's enabled instructions, tracks classical bit states, and records
/// the resulting bit-string once per shot. It exercises the whole
/// accelerator contract (capacity, capability reporting, timeout,
/// all-or-nothing measurement updates) without simulating any instruction
/// semantics: `H` and rotations are deliberate no-ops on the tracked state.
pub struct Sampler {
    capacity: usize,
}

impl Sampler {
    pub const DEFAULT_CAPACITY: usize = 32;

    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    fn supported() -> BTreeSet<String> {
        ["I", "X", "Z", "H", "CNOT", "RX", "RZ", "MEASURE"]
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl Accelerator for Sampler {
    fn name(&self) -> &str {
        "sampler"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            max_bits: Some(self.capacity),
            supported_instructions: Some(Self::supported()),
            connectivity: None,
        }
    }

    #[instrument(skip_all, fields(kernel = %kernel.name, shots = options.shots))]
    fn execute(
        &self,
        buffer: &mut AcceleratorBuffer,
        kernel: &CompositeFunction,
        options: &ExecutionOptions,
    ) -> Result<(), ExecutionError> {
        if buffer.size() > self.capacity {
            return Err(ExecutionError::Resource {
                backend: self.name().to_string(),
                requested: buffer.size(),
                capacity: self.capacity,
            });
        }
        // A zero timeout can never be met; report it before any work, with
        // the buffer untouched.
        if options.timeout == Some(Duration::ZERO) {
            return Err(ExecutionError::Timeout {
                backend: self.name().to_string(),
                kernel: kernel.name.clone(),
                elapsed: Duration::ZERO,
            });
        }

        let fail = |message: String| ExecutionError::Execution {
            backend: "sampler".to_string(),
            kernel: kernel.name.clone(),
            message,
        };

        // Work on scratch state so a failing instruction leaves the buffer
        // untouched.
        let mut states = vec![BitState::Zero; buffer.size()];
        for inst in kernel.enabled_leaves() {
            for bit in &inst.bits {
                if *bit >= states.len() {
                    return Err(fail(format!(
                        "instruction {:?} addresses bit {bit}, buffer has {} bits",
                        inst.name,
                        states.len()
                    )));
                }
            }
            for variable in inst.variables() {
                if !options.bindings.contains_key(variable) {
                    return Err(fail(format!(
                        "unbound variable %{variable} in instruction {:?}",
                        inst.name
                    )));
                }
            }
            match inst.name.as_str() {
                "X" => {
                    if inst.bits.len() != 1 {
                        return Err(fail(format!(
                            "X takes 1 operand, got {}",
                            inst.bits.len()
                        )));
                    }
                    let bit = inst.bits[0];
                    states[bit] = match states[bit] {
                        BitState::One => BitState::Zero,
                        _ => BitState::One,
                    };
                }
                "CNOT" => {
                    if inst.bits.len() != 2 {
                        return Err(fail(format!(
                            "CNOT takes 2 operands, got {}",
                            inst.bits.len()
                        )));
                    }
                    if states[inst.bits[0]] == BitState::One {
                        let target = inst.bits[1];
                        states[target] = match states[target] {
                            BitState::One => BitState::Zero,
                            _ => BitState::One,
                        };
                    }
                }
                // state-preserving stubs, no numerical simulation here
                "I" | "Z" | "H" | "RX" | "RZ" | "MEASURE" => {}
                other => {
                    return Err(fail(format!("unsupported instruction {other:?}")));
                }
            }
        }

        let bitstring: String = states
            .iter()
            .map(|state| match state {
                BitState::One => '1',
                _ => '0',
            })
            .collect();

        for (index, state) in states.iter().enumerate() {
            buffer.set_bit_state(index, *state)?;
        }
        if options.shots > 0 {
            buffer.record_measurements(&[(bitstring, options.shots)])?;
        }
        buffer.add_metadata(
            "sampler.shots",
            MetadataValue::Int(i64::try_from(options.shots).unwrap_or(i64::MAX)),
        );
        tracing::debug!(size = buffer.size(), "sampler execution complete");
        Ok(())
    }
}
