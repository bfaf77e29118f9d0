pub mod config;
pub mod pipeline;

pub use config::{AppConfig, Mode};
pub use pipeline::Pipeline;

/// Initialize tracing once for the whole process
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rps_booth=debug,rps_capture=debug,rps_game=debug,rps_link=debug".into()
            }),
        )
        .init();
}
