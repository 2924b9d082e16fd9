use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotlink::{cli, config, error, types::PlaybackCommand};

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
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify and store the refresh token
    Auth,

    /// Follow playback until interrupted
    Watch(WatchOptions),

    /// Show the current playback state once
    Status,

    /// Pause playback
    Pause,

    /// Resume playback
    Resume,

    /// Skip to the next track
    Next,

    /// Go back to the previous track
    Previous,

    /// Seek to a position given in percent of the current track
    Seek(PercentOption),

    /// Set the device volume in percent
    Volume(PercentOption),

    /// Start playing a track, album or playlist URI
    Play(PlayOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct WatchOptions {
    /// Print a full table on every poll instead of one line per change
    #[clap(long)]
    pub table: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PercentOption {
    /// Value between 0 and 100
    #[clap(value_parser = clap::value_parser!(f32))]
    pub percent: f32,
}

#[derive(Parser, Debug, Clone)]
pub struct PlayOptions {
    /// Spotify URI, e.g. spotify:track:4uLU6hMCjMI75M1A2tKUQC
    pub uri: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command_for_update();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let settings = match config::Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("Invalid configuration: {}", e),
    };

    match cli.command {
        Command::Auth => cli::auth(settings).await,
        Command::Watch(opt) => cli::watch(settings, opt.table).await,
        Command::Status => cli::status(settings).await,
        Command::Pause => cli::control(settings, PlaybackCommand::Pause).await,
        Command::Resume => cli::control(settings, PlaybackCommand::Resume).await,
        Command::Next => cli::control(settings, PlaybackCommand::Next).await,
        Command::Previous => cli::control(settings, PlaybackCommand::Previous).await,
        Command::Seek(opt) => {
            cli::control(settings, PlaybackCommand::SeekToPercent(opt.percent)).await
        }
        Command::Volume(opt) => {
            cli::control(settings, PlaybackCommand::SetVolumePercent(opt.percent)).await
        }
        Command::Play(opt) => cli::control(settings, PlaybackCommand::PlayTrack(opt.uri)).await,
        Command::Completions(_) => {}
    }
}
