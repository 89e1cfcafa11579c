pub mod accelerator;
pub mod compiler;
pub mod ir;
pub mod registry;
pub mod runtime;
pub mod transform;
