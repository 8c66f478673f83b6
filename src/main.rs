use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use dev_mirror::config::validation::validate_config;
use dev_mirror::config::{load_config, MirrorConfig};
use dev_mirror::lifecycle;
use dev_mirror::observability::logging;

#[derive(Parser)]
#[command(name = "dev-mirror")]
#[command(about = "Mirror HTTP and WebSocket traffic to a local frontend dev server", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults apply without one.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration.
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Upstream dev server as host:port, overriding the configuration.
    #[arg(short, long, value_parser = parse_upstream)]
    upstream: Option<(String, u16)>,
}

/// Split `host:port` on the last colon. The port must be 1-65535.
fn parse_upstream(value: &str) -> Result<(String, u16), String> {
    let (host, port) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected host:port, got '{value}'"))?;
    if host.is_empty() {
        return Err(format!("missing host in '{value}'"));
    }
    let port = port
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| format!("invalid port '{port}'"))?;
    Ok((host.to_string(), port))
}

impl Cli {
    fn apply(&self, config: &mut MirrorConfig) {
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind.to_string();
        }
        if let Some((host, port)) = &self.upstream {
            config.upstream.host = host.clone();
            config.upstream.port = *port;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("dev-mirror: {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => MirrorConfig::default(),
    };
    cli.apply(&mut config);
    if let Err(errors) = validate_config(&config) {
        for e in errors {
            eprintln!("dev-mirror: {e}");
        }
        return ExitCode::FAILURE;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("dev-mirror v{} starting", env!("CARGO_PKG_VERSION"));

    match lifecycle::run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "dev-mirror failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_flag_overrides_config() {
        let args = ["dev-mirror", "--upstream", "devbox:5173", "-b", "0.0.0.0:9000"];
        let cli = Cli::try_parse_from(args).unwrap();
        let mut config = MirrorConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.upstream.host, "devbox");
        assert_eq!(config.upstream.port, 5173);
        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
    }

    #[test]
    fn malformed_upstream_is_a_usage_error() {
        for bad in ["localhost", "localhost:http", ":3000", "localhost:0", "localhost:70000"] {
            let err = Cli::try_parse_from(["dev-mirror", "--upstream", bad]).err();
            assert!(
                matches!(&err, Some(e) if e.kind() == clap::error::ErrorKind::ValueValidation),
                "{bad} was accepted"
            );
        }
    }

    #[test]
    fn bind_must_be_a_socket_address() {
        assert!(Cli::try_parse_from(["dev-mirror", "--bind", "not-an-address"]).is_err());
    }
}
