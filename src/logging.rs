use anyhow::Result;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber on stderr. An explicit filter wins;
/// otherwise `RUST_LOG` refines an `info` default. Repeated calls are ignored.
pub fn init(filter: Option<String>) -> Result<()> {
    let env_filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
    Ok(())
}
