use std::sync::Arc;

use thiserror::Error;

use crate::accelerator::{Accelerator, ExecutionError, Sampler};
use crate::compiler::{CompileError, Compiler, TextualCompiler};
use crate::ir::{Ir, IrError};
use crate::registry::{Registry, RegistryError};
use crate::transform::{
    Flatten, Pipeline, RemapBits, StripDisabled, TransformError, Transformation,
};

/// Configuration handed to accelerator factories.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Overrides the backend's default capacity when set.
    pub capacity: Option<usize>,
}

/// Configuration handed to transformation factories.
#[derive(Debug, Clone, Default)]
pub struct PassConfig {
    /// Logical-to-physical bit map, for placement-style passes.
    pub bit_map: Option<Vec<usize>>,
}

pub type CompilerRegistry = Registry<dyn Compiler>;
pub type AcceleratorRegistry = Registry<dyn Accelerator, BackendConfig>;
pub type TransformationRegistry = Registry<dyn Transformation, PassConfig>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Ir(#[from] IrError),
}

/// An explicitly constructed bundle of the three plugin registries. There
/// is no process-wide instance: whoever needs plugin discovery is handed a
/// `Runtime` (or a registry borrowed from one), and tests build isolated
/// runtimes freely.
#[derive(Default)]
pub struct Runtime {
    pub compilers: CompilerRegistry,
    pub accelerators: AcceleratorRegistry,
    pub transformations: TransformationRegistry,
}

impl Runtime {
    /// An empty runtime with no plugins registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A runtime with the stock plugins registered: the `textual` compiler,
    /// the `sampler` accelerator and the `flatten`, `strip-disabled` and
    /// `remap-bits` passes.
    pub fn with_defaults() -> Result<Self, RegistryError> {
        let runtime = Self::new();
        runtime
            .compilers
            .add(TextualCompiler::ID, |_: &()| Ok(Arc::new(TextualCompiler) as _))?;
        runtime.accelerators.add("sampler", |config: &BackendConfig| {
            let capacity = config.capacity.unwrap_or(Sampler::DEFAULT_CAPACITY);
            Ok(Arc::new(Sampler::new(capacity)) as _)
        })?;
        runtime
            .transformations
            .add("flatten", |_: &PassConfig| Ok(Arc::new(Flatten) as _))?;
        runtime
            .transformations
            .add("strip-disabled", |_: &PassConfig| Ok(Arc::new(StripDisabled) as _))?;
        runtime
            .transformations
            .add("remap-bits", |config: &PassConfig| {
                let map = config.bit_map.clone().ok_or_else(|| {
                    RegistryError::Construction {
                        id: "remap-bits".to_string(),
                        message: "remap-bits needs a bit_map".to_string(),
                    }
                })?;
                Ok(Arc::new(RemapBits::new(map)) as _)
            })?;
        Ok(runtime)
    }

    /// Compile `source` with the compiler registered under `compiler_id`.
    pub fn compile(
        &self,
        compiler_id: &str,
        source: &str,
        target: Option<&dyn Accelerator>,
    ) -> Result<Ir, RuntimeError> {
        let compiler = self.compilers.create(compiler_id, &())?;
        Ok(compiler.compile(source, target)?)
    }

    /// Build a pipeline from registered pass ids, in the given order.
    pub fn pipeline(
        &self,
        passes: &[(&str, PassConfig)],
    ) -> Result<Pipeline, RegistryError> {
        let mut pipeline = Pipeline::new();
        for (id, config) in passes {
            pipeline.push(self.transformations.create(id, config)?);
        }
        Ok(pipeline)
    }
}
