//! Skeet provisions synthetic HTTP load targets onto Kubernetes clusters.
#![deny(warnings)]
#![deny(missing_docs)]

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use skeet_common::telemetry;
use tracing::info;

use skeet_operator::target::{
    self,
    nginx::{render, TargetConfig},
    validate::validate,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Available Subcommands
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the controller daemon for the HttpTarget CRD
    Daemon,
    /// Render the manifest for a target configuration and print it as YAML
    Render(RenderOpts),
}

/// Options of the render command
#[derive(Args, Debug)]
struct RenderOpts {
    /// Name of the target workload
    #[arg(long, default_value = "http-target")]
    name: String,
    /// Number of nginx replicas
    #[arg(long, default_value_t = 1)]
    replicas: i32,
    /// Image for the nginx container
    #[arg(long, default_value = "nginx:1.25")]
    image: String,
    /// Pull policy for the nginx image
    #[arg(long, default_value = "Always")]
    image_pull_policy: String,
    /// Number of bytes of pseudo-random content generated at container startup
    #[arg(long, default_value_t = 1_048_576)]
    content_size_bytes: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    match args.command {
        Command::Daemon => {
            telemetry::init()?;
            info!("starting operator daemon");
            target::run().await;
        }
        Command::Render(opts) => {
            let config = TargetConfig {
                name: opts.name,
                replicas: opts.replicas,
                image: opts.image,
                image_pull_policy: opts.image_pull_policy,
                content_size_bytes: opts.content_size_bytes,
            };
            let rendered = render(&config)?;
            validate(&rendered)?;
            print!("{}", serde_yaml::to_string(&rendered.deployment)?);
            println!("---");
            print!("{}", serde_yaml::to_string(&rendered.service)?);
        }
    }
    Ok(())
}
