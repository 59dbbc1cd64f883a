//! CLI module for PMP Gateway Control
//!
//! - `serve`: run the admin API and the notification listener
//! - `check-config`: validate the layered configuration and print it

pub mod check_config;
pub mod serve;

use clap::{Parser, Subcommand};

/// PMP Gateway Control - keys, policies and OAuth clients for a gateway fleet
#[derive(Parser)]
#[command(name = "pmp-gateway-control")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the admin API server
    Serve,

    /// Validate configuration and print it with secrets redacted
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["pmp-gateway-control", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve));

        let cli = Cli::try_parse_from(["pmp-gateway-control", "check-config"]).unwrap();
        assert!(matches!(cli.command, Command::CheckConfig));

        assert!(Cli::try_parse_from(["pmp-gateway-control", "api"]).is_err());
    }
}
