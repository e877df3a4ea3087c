pub use crate::gemini::generate::{Content, ContentRole, TextStream};
pub use crate::gemini::{Client as GeminiClient, Config, UpstreamError};
pub use crate::personas::Persona;
pub use crate::relay::{RelayError, Upstream};

pub mod client;
pub mod gemini;
pub mod personas;
pub mod relay;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Installs the fmt subscriber shared by the binaries. `RUST_LOG` wins over
/// `default_filter`.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
