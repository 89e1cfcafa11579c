use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("measurement {measured:?} has length {len}, buffer size is {size}")]
    LengthMismatch {
        measured: String,
        len: usize,
        size: usize,
    },
    #[error("measurement {measured:?} is not a bit-string")]
    NotABitString { measured: String },
    #[error("bit index {index} out of range for buffer of size {size}")]
    OutOfRange { index: usize, size: usize },
}

/// Tri-state of one addressable bit: unmeasured, or measured 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitState {
    #[default]
    Unknown,
    Zero,
    One,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceleratorBit {
    pub index: usize,
    pub state: BitState,
}

/// Free-form extra information an accelerator attaches to a buffer
/// (timing, calibration, backend identity, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Int(i64),
    Real(f64),
    Str(String),
}

/// The measurable state container for execution: `size` addressable bits
/// and a multiset of measured bit-strings, accumulated across repeated
/// executions of the same buffer.
///
/// Mutated only by the owning accelerator during `execute`; read by the
/// caller afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceleratorBuffer {
    size: usize,
    bits: Vec<AcceleratorBit>,
    measurements: BTreeMap<String, u64>,
    metadata: BTreeMap<String, MetadataValue>,
}

impl AcceleratorBuffer {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            bits: (0..size)
                .map(|index| AcceleratorBit {
                    index,
                    state: BitState::Unknown,
                })
                .collect(),
            measurements: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn bits(&self) -> &[AcceleratorBit] {
        &self.bits
    }

    pub fn bit(&self, index: usize) -> Result<&AcceleratorBit, BufferError> {
        self.bits.get(index).ok_or(BufferError::OutOfRange {
            index,
            size: self.size,
        })
    }

    pub fn set_bit_state(&mut self, index: usize, state: BitState) -> Result<(), BufferError> {
        let size = self.size;
        match self.bits.get_mut(index) {
            Some(bit) => {
                bit.state = state;
                Ok(())
            }
            None => Err(BufferError::OutOfRange { index, size }),
        }
    }

    fn validate(&self, bitstring: &str) -> Result<(), BufferError> {
        if bitstring.len() != self.size {
            return Err(BufferError::LengthMismatch {
                measured: bitstring.to_string(),
                len: bitstring.len(),
                size: self.size,
            });
        }
        if !bitstring.chars().all(|c| c == '0' || c == '1') {
            return Err(BufferError::NotABitString {
                measured: bitstring.to_string(),
            });
        }
        Ok(())
    }

    /// Record `count` observations of `bitstring`.
    pub fn record_measurement(&mut self, bitstring: &str, count: u64) -> Result<(), BufferError> {
        self.record_measurements(&[(bitstring.to_string(), count)])
    }

    /// Record a whole batch, all-or-nothing: every string is validated
    /// against the buffer size before any count is merged, so a failed
    /// call leaves `measurements` exactly as it was.
    pub fn record_measurements(&mut self, batch: &[(String, u64)]) -> Result<(), BufferError> {
        for (bitstring, _) in batch {
            self.validate(bitstring)?;
        }
        for (bitstring, count) in batch {
            *self.measurements.entry(bitstring.clone()).or_insert(0) += count;
        }
        Ok(())
    }

    /// Measured bit-strings with their accumulated counts.
    pub fn measurements(&self) -> &BTreeMap<String, u64> {
        &self.measurements
    }

    /// Total number of recorded shots.
    pub fn total_shots(&self) -> u64 {
        self.measurements.values().sum()
    }

    /// Empirical probability of `bitstring` over all recorded shots.
    pub fn probability(&self, bitstring: &str) -> f64 {
        let total = self.total_shots();
        if total == 0 {
            return 0.0;
        }
        *self.measurements.get(bitstring).unwrap_or(&0) as f64 / total as f64
    }

    pub fn metadata(&self) -> &BTreeMap<String, MetadataValue> {
        &self.metadata
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: MetadataValue) {
        self.metadata.insert(key.into(), value);
    }

    /// Clear measurements, metadata and bit states, keeping the size.
    pub fn reset(&mut self) {
        self.measurements.clear();
        self.metadata.clear();
        for bit in &mut self.bits {
            bit.state = BitState::Unknown;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurements_accumulate_across_calls() {
        let mut buffer = AcceleratorBuffer::new(2);
        buffer.record_measurement("00", 3).unwrap();
        buffer.record_measurement("11", 1).unwrap();
        buffer.record_measurement("00", 2).unwrap();
        assert_eq!(buffer.measurements().get("00"), Some(&5));
        assert_eq!(buffer.total_shots(), 6);
        assert!((buffer.probability("11") - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_length_batch_changes_nothing() {
        let mut buffer = AcceleratorBuffer::new(2);
        buffer.record_measurement("01", 1).unwrap();
        let err = buffer
            .record_measurements(&[("11".to_string(), 1), ("101".to_string(), 1)])
            .unwrap_err();
        assert!(matches!(err, BufferError::LengthMismatch { len: 3, size: 2, .. }));
        assert_eq!(buffer.measurements().len(), 1);
        assert_eq!(buffer.total_shots(), 1);
    }

    #[test]
    fn non_bitstring_is_rejected() {
        let mut buffer = AcceleratorBuffer::new(2);
        let err = buffer.record_measurement("0x", 1).unwrap_err();
        assert!(matches!(err, BufferError::NotABitString { .. }));
    }

    #[test]
    fn bits_start_unknown_and_reset_clears() {
        let mut buffer = AcceleratorBuffer::new(3);
        assert!(buffer.bits().iter().all(|b| b.state == BitState::Unknown));
        buffer.set_bit_state(1, BitState::One).unwrap();
        buffer.record_measurement("010", 1).unwrap();
        buffer.add_metadata("backend", MetadataValue::Str("test".into()));

        buffer.reset();
        assert_eq!(buffer.size(), 3);
        assert!(buffer.measurements().is_empty());
        assert!(buffer.metadata().is_empty());
        assert_eq!(buffer.bit(1).unwrap().state, BitState::Unknown);
    }

    #[test]
    fn out_of_range_bit_access_fails() {
        let mut buffer = AcceleratorBuffer::new(1);
        let err = buffer.set_bit_state(5, BitState::Zero).unwrap_err();
        assert_eq!(err, BufferError::OutOfRange { index: 5, size: 1 });
    }
}
