mod commands;
mod utils;

use clap::Parser;
use clap::Subcommand;
use smarthome_client_rs::ClientError;
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug, Clone)]
enum PlugCommands {
    List,
    Switch {
        #[arg(long)]
        id: String,
        #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
        on: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
enum LampCommands {
    List,
    Power {
        #[arg(long)]
        id: String,
        #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
        on: bool,
    },
    Brightness {
        #[arg(long)]
        id: String,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=254))]
        bri: u8,
    },
    Color {
        #[arg(long)]
        id: String,
        #[arg(long)]
        hue: u16,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=254))]
        sat: u8,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=254))]
        bri: u8,
    },
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    Plugs {
        #[command(subcommand)]
        command: PlugCommands,
    },
    Lamps {
        #[command(subcommand)]
        command: LampCommands,
    },
}

#[derive(Parser, Debug)]
struct Params {
    /// Shelly Cloud server URL
    #[clap(long, env = "SHELLY_HOST")]
    shelly_host: Option<String>,
    /// Shelly Cloud auth key
    #[clap(long, env = "SHELLY_AUTH_KEY")]
    shelly_key: Option<String>,
    /// Hue bridge host or URL
    #[clap(long, env = "HUE_BRIDGE")]
    hue_bridge: Option<String>,
    /// Hue bridge API user
    #[clap(long, env = "HUE_USERNAME")]
    hue_user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let params = Params::parse();

    match &params.command.clone() {
        Commands::Plugs { command } => match command {
            PlugCommands::List => commands::list_plugs(params).await?,
            PlugCommands::Switch { id, on } => commands::switch_plug(params, id, *on).await?,
        },
        Commands::Lamps { command } => match command {
            LampCommands::List => commands::list_lamps(params).await?,
            LampCommands::Power { id, on } => commands::lamp_power(params, id, *on).await?,
            LampCommands::Brightness { id, bri } => {
                commands::lamp_brightness(params, id, *bri).await?
            }
            LampCommands::Color { id, hue, sat, bri } => {
                commands::lamp_color(params, id, *hue, *sat, *bri).await?
            }
        },
    }

    Ok(())
}
