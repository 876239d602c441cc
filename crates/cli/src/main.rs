use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod output;

use config::{CliConfig, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(about = "Compile workflow definitions into execution graphs", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "weft.toml", env = "WEFT_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a workflow definition and print the execution graph
    Compose {
        /// Workflow definition file
        file: PathBuf,

        /// Composer to use (defaults to the configured one)
        #[arg(long)]
        composer: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Print the intermediate workflow graph instead
        #[arg(long)]
        workflow_graph: bool,
    },

    /// List available composers
    Composers,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries the rendered graph
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weft=info,weft_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = CliConfig::load(&args.config)?;

    match args.command {
        Command::Compose {
            file,
            composer,
            format,
            workflow_graph,
        } => {
            let composer_name = composer.unwrap_or_else(|| config.composer.clone());
            let composer = weft_core::get_composer(&composer_name)?;

            let definition = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read workflow definition {}", file.display()))?;

            tracing::info!("Composing {} with {} composer", file.display(), composer.name());

            let format = format.unwrap_or(config.output.format);
            let rendered = if workflow_graph {
                let graph = composer
                    .compose_workflow_graph(&definition)
                    .with_context(|| format!("Failed to compose {}", file.display()))?;
                output::render(&graph, format, config.output.pretty)?
            } else {
                let graph = composer
                    .compose(&definition)
                    .with_context(|| format!("Failed to compose {}", file.display()))?;
                output::render(&graph, format, config.output.pretty)?
            };

            println!("{}", rendered);
        }
        Command::Composers => {
            for name in weft_core::composer::available_composers() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
