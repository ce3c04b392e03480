use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "awo",
    about = "Work order proxy: submit work orders to a ledger and wait for their results",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Proxy configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run submit/complete/get-result round trips against an in-memory ledger
    Simulate(SimulateArgs),
    /// Print the effective proxy configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of concurrent work orders
    #[arg(short = 'n', long, default_value = "3")]
    pub orders: usize,
    /// Time the simulated worker spends on each work order
    #[arg(long, default_value = "250")]
    pub worker_delay_ms: u64,
    /// Delay between a ledger invocation and its event
    #[arg(long, default_value = "100")]
    pub commit_delay_ms: u64,
}

#[derive(Args)]
pub struct ConfigArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simulate_defaults() {
        let cli = Cli::try_parse_from(["awo", "simulate"]).unwrap();
        if let Command::Simulate(args) = cli.command {
            assert_eq!(args.orders, 3);
            assert_eq!(args.worker_delay_ms, 250);
            assert_eq!(args.commit_delay_ms, 100);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_simulate_options() {
        let cli = Cli::try_parse_from(["awo", "simulate", "-n", "8", "--worker-delay-ms", "5"]).unwrap();
        if let Command::Simulate(args) = cli.command {
            assert_eq!(args.orders, 8);
            assert_eq!(args.worker_delay_ms, 5);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["awo", "config", "--config", "proxy.toml", "-v"]).unwrap();
        assert!(matches!(cli.command, Command::Config(_)));
        assert!(cli.verbose);
        assert_eq!(cli.config, Some("proxy.toml".into()));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["awo", "serve"]).is_err());
    }
}
