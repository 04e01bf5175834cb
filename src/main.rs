use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prop_symbol_map::{config, data, render, server};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one PNG frame per period
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the interactive map viewer
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the attribute series and minimum value of the dataset
    Inspect {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config } => {
            info!("Rendering frames with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let dataset = data::load_dataset(&app_config)?;
            let frames = render::render_frames(&app_config, dataset)?;

            info!("Wrote {} frames to {:?}", frames.len(), app_config.output.frame_dir);
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            server::start_server(app_config).await?;
        }
        Commands::Inspect { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_dataset(&app_config)?;

            let palette = app_config.legend.palette();
            for (i, attribute) in dataset.attributes.iter().enumerate() {
                let present = dataset
                    .features
                    .iter()
                    .filter(|f| f.value(attribute).is_some())
                    .count();
                println!(
                    "{:>3}  {:<16} period={:<8} color={}  values={}/{}",
                    i,
                    attribute.key,
                    attribute.period.as_str(),
                    palette.color(attribute.period.as_str()),
                    present,
                    dataset.features.len()
                );
            }
            println!("min value: {}", dataset.min_value.get());
        }
    }

    Ok(())
}
