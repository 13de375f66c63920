// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nsendpoint")]
#[command(about = "Network service endpoint: negotiates mechanisms, programs the dataplane, tracks connections")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only the final result
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new nsendpoint.yml configuration file
    Init {
        /// Network service to advertise
        #[arg(short, long)]
        service: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration and show the resolved settings
    Check,

    /// List known mechanisms and their parameters
    Mechanisms,

    /// Request a connection from the configured dataplane agent
    Request {
        /// Network service to connect to (default: the advertised one)
        #[arg(short, long)]
        service: Option<String>,

        /// Mechanism preference, most preferred first
        #[arg(short, long = "mechanism", required = true)]
        mechanisms: Vec<String>,

        /// Mechanism parameter hint (key=value), applied to every preference
        #[arg(short, long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Request context entry (key=value)
        #[arg(short, long = "context", value_parser = parse_key_value)]
        context: Vec<(String, String)>,

        /// Close the connection again once it is established
        #[arg(long)]
        close: bool,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_splits_on_first_equals() {
        assert_eq!(
            parse_key_value("socketfile=/a=b").unwrap(),
            ("socketfile".to_string(), "/a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
