//! StoryKit command-line entry point.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use storykit_core::{MediaType, StoryKitConfig};

#[derive(Parser)]
#[command(name = "storykit", version, about = "Inspect story overlays, media and links")]
struct Cli {
    /// JSON config file with upload limits.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse an overlay array or a story row and report problems.
    Validate { file: PathBuf },
    /// Project a story's overlays onto a viewer of the given size.
    Project {
        file: PathBuf,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
        #[arg(long, default_value_t = 0.0)]
        left: f64,
        #[arg(long, default_value_t = 0.0)]
        top: f64,
    },
    /// Check a media file against the upload ceiling.
    CheckMedia {
        file: PathBuf,
        #[arg(long, value_enum)]
        kind: MediaKind,
    },
    /// Resolve a YouTube link or id.
    Youtube { input: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum MediaKind {
    Image,
    Video,
}

impl From<MediaKind> for MediaType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => MediaType::Image,
            MediaKind::Video => MediaType::Video,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StoryKitConfig::load(path)?,
        None => StoryKitConfig::default(),
    };

    let output = match cli.command {
        Command::Validate { file } => commands::validate(&file)?,
        Command::Project {
            file,
            width,
            height,
            left,
            top,
        } => commands::project(&file, kurbo::Rect::new(left, top, left + width, top + height))?,
        Command::CheckMedia { file, kind } => commands::check_media(&file, kind.into(), &config)?,
        Command::Youtube { input } => commands::youtube(&input)?,
    };
    println!("{}", output);
    Ok(())
}
