use quartz::accelerator::{AcceleratorBuffer, ExecutionOptions};
use quartz::ir::Ir;
use quartz::runtime::{BackendConfig, PassConfig, Runtime, RuntimeError};
use tracing_subscriber::EnvFilter;

/// Honors RUST_LOG when a test wants pass/execution traces.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Compile `source` with the stock textual compiler, run the named passes
/// and execute every kernel on the stock sampler, returning the populated
/// buffer.
pub fn compile_and_run(
    source: &str,
    size: usize,
    passes: &[(&str, PassConfig)],
    shots: u64,
) -> Result<(Ir, AcceleratorBuffer), RuntimeError> {
    init_tracing();
    let runtime = Runtime::with_defaults()?;
    let accelerator = runtime
        .accelerators
        .create("sampler", &BackendConfig::default())?;

    let ir = runtime.compile("textual", source, Some(accelerator.as_ref()))?;
    let pipeline = runtime.pipeline(passes)?;
    let ir = pipeline.run(&ir, &Default::default())?;

    let mut buffer = accelerator.create_buffer(size)?;
    for kernel in ir.kernels() {
        accelerator.execute(&mut buffer, kernel, &ExecutionOptions::with_shots(shots))?;
    }
    Ok((ir, buffer))
}
