//! The main entry point for the Nova Wayland Compositor.

use std::process::ExitCode;

use nova_compositor::logging::{init_logging, init_minimal_logging};
use nova_compositor::{Bootstrap, CompositorError, Config, ProcessEnvironment};
use tracing::{error, info, warn};

fn exit_with(e: CompositorError) -> ExitCode {
    error!(error = %e, "fatal error");
    ExitCode::from(e.exit_code() as u8)
}

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            init_minimal_logging();
            return exit_with(e.into());
        }
    };

    // Keeps the file writer alive until the process exits.
    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            init_minimal_logging();
            warn!(error = %e, "falling back to minimal logging");
            None
        }
    };

    info!(version = env!("CARGO_PKG_VERSION"), "Nova Compositor starting");
    let result = Bootstrap::new(&config)
        .start(&mut ProcessEnvironment)
        .and_then(|compositor| compositor.run());
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => exit_with(e),
    }
}
