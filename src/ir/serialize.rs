use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use super::composite::CompositeFunction;
use super::{Ir, IrError};

/// Version tag written into every persisted IR. Bumped whenever the schema
/// changes shape; `load` rejects anything else instead of misparsing.
pub const FORMAT_VERSION: u64 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u64,
    kernels: &'a BTreeMap<String, CompositeFunction>,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u64,
    #[serde(default)]
    kernels: BTreeMap<String, CompositeFunction>,
}

#[derive(Deserialize)]
struct VersionProbe {
    format_version: u64,
}

impl Ir {
    /// Serialize the full kernel set to `sink` as a versioned JSON
    /// envelope. Round-trips losslessly through [`Ir::load`].
    pub fn persist<W: Write>(&self, sink: &mut W) -> Result<(), IrError> {
        let envelope = EnvelopeRef {
            format_version: FORMAT_VERSION,
            kernels: &self.kernels,
        };
        serde_json::to_writer_pretty(&mut *sink, &envelope)?;
        sink.write_all(b"\n")?;
        Ok(())
    }

    /// Read an IR previously written by [`Ir::persist`]. The version tag is
    /// checked before the kernel payload is decoded.
    pub fn load<R: Read>(source: &mut R) -> Result<Ir, IrError> {
        let mut raw = String::new();
        source.read_to_string(&mut raw)?;

        let probe: VersionProbe = serde_json::from_str(&raw)?;
        if probe.format_version != FORMAT_VERSION {
            return Err(IrError::UnsupportedFormatVersion {
                found: probe.format_version,
                supported: FORMAT_VERSION,
            });
        }

        let envelope: Envelope = serde_json::from_str(&raw)?;
        tracing::debug!(kernels = envelope.kernels.len(), "loaded IR");
        Ok(Ir {
            kernels: envelope.kernels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, Parameter};

    fn sample_ir() -> Ir {
        let mut kernel = CompositeFunction::new("bell");
        kernel.add_instruction(Instruction::new("H", vec![0]));
        kernel.add_instruction(Instruction::with_parameters(
            "RX",
            vec![Parameter::Real(1.5708), Parameter::Variable("theta".into())],
            vec![1],
        ));
        kernel.add_variable("theta");

        let mut nested = CompositeFunction::new("tail");
        nested.add_instruction(Instruction::new("MEASURE", vec![0, 1]));
        kernel.add_composite(nested);

        let mut ir = Ir::new();
        ir.add_kernel(kernel).unwrap();
        ir
    }

    #[test]
    fn round_trip_preserves_structure() {
        let ir = sample_ir();
        let mut buf = Vec::new();
        ir.persist(&mut buf).unwrap();
        let loaded = Ir::load(&mut buf.as_slice()).unwrap();
        assert_eq!(ir, loaded);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let payload = r#"{"format_version": 99, "kernels": {}}"#;
        let err = Ir::load(&mut payload.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            IrError::UnsupportedFormatVersion {
                found: 99,
                supported: FORMAT_VERSION
            }
        ));
    }

    #[test]
    fn garbage_payload_is_malformed() {
        let err = Ir::load(&mut "not json".as_bytes()).unwrap_err();
        assert!(matches!(err, IrError::Malformed(_)));
    }

    #[test]
    fn disabled_flag_round_trips() {
        let mut ir = sample_ir();
        if let crate::ir::InstructionNode::Leaf(inst) =
            &mut ir.kernel_mut("bell").unwrap().children[0]
        {
            inst.disable();
        }
        let mut buf = Vec::new();
        ir.persist(&mut buf).unwrap();
        let loaded = Ir::load(&mut buf.as_slice()).unwrap();
        assert_eq!(loaded.kernel("bell").unwrap().enabled_leaves().count(), 2);
        assert_eq!(ir, loaded);
    }
}
