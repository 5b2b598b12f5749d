//! # Report Composer
//!
//! Command-line front end for composing prostate MRI report images.

use clap::Parser;
use composer_cli::CliArgs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with optional JSON formatting.
///
/// Set `RUST_LOG` to control log levels (default: info,composer_core=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,composer_core=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    tracing::debug!("Arguments: {args:?}");

    match composer_cli::run(args).await? {
        composer_renderer::Delivery::Primary(target) => println!("{target}"),
        composer_renderer::Delivery::Fallback(target) => {
            println!("{target}");
            tracing::warn!("Clipboard unavailable, saved to {target} instead");
        }
    }
    Ok(())
}
