use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotbridge::{cli, config, warning};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Make sure a valid token exists, authorizing in the browser if needed
    Auth,

    /// Authorize again in the browser, replacing the stored token
    Refresh,

    /// Show when the stored token expires
    Status,

    /// List available devices
    Devices(DevicesOptions),

    /// Play a track on the selected device until it finishes
    Play(PlayOptions),

    /// Show or set the device volume
    Volume(VolumeOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct DevicesOptions {
    /// Remember this device id for play and volume
    #[clap(long)]
    pub select: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct PlayOptions {
    /// Spotify track id
    pub track_id: String,

    /// Device id (defaults to the selected device)
    #[clap(long)]
    pub device: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct VolumeOptions {
    /// New volume in percent
    #[clap(value_parser = clap::value_parser!(u8).range(0..=100))]
    pub percent: Option<u8>,

    /// Device id (defaults to the selected device)
    #[clap(long)]
    pub device: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotbridge=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = config::load_env().await {
        warning!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth => cli::auth().await,
        Command::Refresh => cli::refresh().await,
        Command::Status => cli::status().await,
        Command::Devices(opt) => cli::devices(opt.select).await,
        Command::Play(opt) => cli::play(opt.track_id, opt.device).await,
        Command::Volume(opt) => cli::volume(opt.percent, opt.device).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
