use ort::execution_providers::ExecutionProviderDispatch;

/// Accelerators to register on an inference session, in preference order.
///
/// ONNX Runtime silently falls back to its CPU provider when none of these
/// can be initialized, so an empty list means "CPU only".
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    let providers = platform_providers();
    log::debug!(
        "Requesting {} accelerated execution provider(s), CPU fallback",
        providers.len()
    );
    providers
}

#[cfg(target_os = "macos")]
fn platform_providers() -> Vec<ExecutionProviderDispatch> {
    vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
}

#[cfg(target_os = "windows")]
fn platform_providers() -> Vec<ExecutionProviderDispatch> {
    vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_providers() -> Vec<ExecutionProviderDispatch> {
    Vec::new()
}
