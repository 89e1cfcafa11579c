use std::fmt;

use serde::{Deserialize, Serialize};

use super::IrError;

/// A single typed instruction parameter.
///
/// `Variable` is a free symbolic parameter, declared on the enclosing
/// kernel and bound to a concrete value at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Parameter {
    Int(i64),
    Real(f64),
    Str(String),
    Variable(String),
}

impl Parameter {
    pub fn is_variable(&self) -> bool {
        matches!(self, Parameter::Variable(_))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Int(v) => write!(f, "{v}"),
            Parameter::Real(v) => write!(f, "{v}"),
            Parameter::Str(v) => write!(f, "{v:?}"),
            Parameter::Variable(v) => write!(f, "%{v}"),
        }
    }
}

/// The smallest visitable program element: an operation name, its
/// parameters and the addresses of the bits it acts on.
///
/// Instruction is a dumb data holder. Whether `bits` matches the arity the
/// name implies is the producing compiler's problem, not ours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub bits: Vec<usize>,
    /// Soft delete: a disabled instruction stays in the tree so sibling
    /// indices held elsewhere remain valid.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Instruction {
    pub fn new(name: impl Into<String>, bits: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            bits,
            enabled: true,
        }
    }

    pub fn with_parameters(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        bits: Vec<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            bits,
            enabled: true,
        }
    }

    pub fn is_parameterized(&self) -> bool {
        !self.parameters.is_empty()
    }

    /// Names of the symbolic variables this instruction references.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().filter_map(|p| match p {
            Parameter::Variable(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn parameter(&self, idx: usize) -> Option<&Parameter> {
        self.parameters.get(idx)
    }

    pub fn set_parameter(&mut self, idx: usize, parameter: Parameter) -> Result<(), IrError> {
        let len = self.parameters.len();
        match self.parameters.get_mut(idx) {
            Some(slot) => {
                *slot = parameter;
                Ok(())
            }
            None => Err(IrError::IndexOutOfBounds { index: idx, len }),
        }
    }

    /// Re-address `bits` through `map`: bit `b` becomes `map[b]`.
    pub fn map_bits(&mut self, map: &[usize]) -> Result<(), IrError> {
        for bit in &self.bits {
            if *bit >= map.len() {
                return Err(IrError::BitOutOfRange {
                    bit: *bit,
                    len: map.len(),
                });
            }
        }
        for bit in &mut self.bits {
            *bit = map[*bit];
        }
        Ok(())
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_bits_reindexes() {
        let mut inst = Instruction::new("CNOT", vec![0, 1]);
        inst.map_bits(&[2, 0]).unwrap();
        assert_eq!(inst.bits, vec![2, 0]);
    }

    #[test]
    fn map_bits_rejects_short_map() {
        let mut inst = Instruction::new("CNOT", vec![0, 3]);
        let err = inst.map_bits(&[1, 0]).unwrap_err();
        assert!(matches!(err, IrError::BitOutOfRange { bit: 3, len: 2 }));
        // failed remap leaves the bits untouched
        assert_eq!(inst.bits, vec![0, 3]);
    }

    #[test]
    fn variables_filters_symbolic_parameters() {
        let inst = Instruction::with_parameters(
            "RX",
            vec![Parameter::Variable("theta".into()), Parameter::Real(0.5)],
            vec![0],
        );
        assert!(inst.is_parameterized());
        assert_eq!(inst.variables().collect::<Vec<_>>(), vec!["theta"]);
    }

    #[test]
    fn set_parameter_bounds_checked() {
        let mut inst = Instruction::with_parameters("RX", vec![Parameter::Real(0.1)], vec![0]);
        inst.set_parameter(0, Parameter::Real(0.2)).unwrap();
        assert_eq!(inst.parameter(0), Some(&Parameter::Real(0.2)));
        assert!(inst.set_parameter(1, Parameter::Int(1)).is_err());
    }
}
