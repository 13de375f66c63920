// ABOUTME: Entry point for the nsendpoint CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use nsendpoint::config::{self, Config};
use nsendpoint::connection::{MechanismPreference, NetworkServiceRequest};
use nsendpoint::dataplane::{AgentDataplane, HttpAgent};
use nsendpoint::endpoint::Endpoint;
use nsendpoint::error::Result;
use nsendpoint::mechanism::MechanismType;
use nsendpoint::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut output = Output::new(OutputMode::from_flags(cli.quiet, cli.json));
    output.start_timer();

    if let Err(e) = run(cli, &output).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    match cli.command {
        Commands::Init { service, force } => init(output, service.as_deref(), force),
        Commands::Check => check(output),
        Commands::Mechanisms => {
            mechanisms();
            Ok(())
        }
        Commands::Request {
            service,
            mechanisms,
            params,
            context,
            close,
        } => request(output, service, mechanisms, params, context, close).await,
    }
}

fn init(output: &Output, service: Option<&str>, force: bool) -> Result<()> {
    let cwd = env::current_dir()?;
    config::init_config(&cwd, service, force)?;
    output.success(&format!("Created {}", config::CONFIG_FILENAME));
    Ok(())
}

fn load_config() -> Result<Config> {
    let cwd = env::current_dir()?;
    Ok(Config::discover(&cwd)?.apply_env_overrides())
}

fn check(output: &Output) -> Result<()> {
    let config = load_config()?;
    let settings = config.endpoint_settings();
    let allocator = config.allocator()?;

    output.progress(&format!("Service:       {}", settings.network_service));
    output.progress(&format!("Endpoint:      {}", settings.endpoint_name));
    output.progress(&format!(
        "Bridge domain: {}",
        settings.bridge_domain_for(&settings.network_service)
    ));
    output.progress(&format!("Agent:         {}", config.agent.endpoint));
    output.progress(&format!(
        "Mechanisms:    {}",
        settings
            .supported
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    output.progress(&format!(
        "Address pool:  {}/{} ({} free)",
        allocator.base(),
        allocator.prefix_len(),
        allocator.remaining()
    ));
    match settings.netns_inode {
        Some(inode) => output.progress(&format!("Netns inode:   {inode}")),
        None => output.progress("Netns inode:   unknown"),
    }
    output.success("Configuration is valid");
    Ok(())
}

fn mechanisms() {
    for mechanism in MechanismType::ALL {
        let schema = mechanism.schema();
        let mut required: Vec<&str> = schema.required.to_vec();
        if schema.role_required {
            required.push("master|slave");
        }
        let optional = if schema.optional.is_empty() {
            "-".to_string()
        } else {
            schema.optional.join(", ")
        };
        println!(
            "{:<6} required: {}  optional: {}",
            mechanism.as_str(),
            required.join(", "),
            optional
        );
    }
}

async fn request(
    output: &Output,
    service: Option<String>,
    mechanisms: Vec<String>,
    params: Vec<(String, String)>,
    context: Vec<(String, String)>,
    close: bool,
) -> Result<()> {
    let config = load_config()?;
    let service = service.unwrap_or_else(|| config.network_service.to_string());

    let mut request = NetworkServiceRequest::new(service);
    for mechanism in mechanisms {
        let preference = params
            .iter()
            .fold(MechanismPreference::new(mechanism), |p, (k, v)| {
                p.with_parameter(k.as_str(), v.as_str())
            });
        request = request.prefer(preference);
    }
    for (key, value) in context {
        request = request.with_context(key, value);
    }

    let agent = HttpAgent::new(config.agent.endpoint.clone());
    let dataplane = AgentDataplane::new(agent, config.dataplane_settings());
    let endpoint = Endpoint::new(
        config.endpoint_settings(),
        dataplane,
        config.allocator()?,
        config.connection_monitor(),
    );

    output.progress(&format!("Requesting connection via {}...", config.agent.endpoint));
    let connection = endpoint.request(request).await?;
    output.connection("Connection established", &connection);

    if close {
        output.progress("Closing connection...");
        endpoint.close(&connection).await;
        output.success(&format!("Connection {} closed", connection.id));
    }
    Ok(())
}
