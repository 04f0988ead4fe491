use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::providers::azure::types::ImageSize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable debug output
    #[arg(short, long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a prompt to the chat deployment
    Chat {
        /// Your prompt
        prompt: String,

        /// Optional system message
        #[arg(short, long)]
        system: Option<String>,

        /// Wait for the full reply instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },
    /// Embed one or more texts
    Embed {
        #[arg(required = true)]
        texts: Vec<String>,

        /// Ask for base64-encoded vectors
        #[arg(long)]
        base64: bool,
    },
    /// Transcribe an audio file
    Transcribe {
        file: PathBuf,

        /// Spoken language as an ISO-639-1 code
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Translate an audio file into English
    Translate { file: PathBuf },
    /// Generate or modify images
    #[command(subcommand)]
    Image(ImageCommand),
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::Embed { .. } => "embed",
            Self::Transcribe { .. } => "transcribe",
            Self::Translate { .. } => "translate",
            Self::Image(ImageCommand::Generate { .. }) => "image generate",
            Self::Image(ImageCommand::Edit { .. }) => "image edit",
            Self::Image(ImageCommand::Variation { .. }) => "image variation",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ImageCommand {
    /// Generate images from a prompt
    Generate {
        prompt: String,

        #[arg(short, long)]
        n: Option<u32>,

        /// One of 256x256, 512x512, 1024x1024, 1792x1024, 1024x1792
        #[arg(short, long)]
        size: Option<ImageSize>,
    },
    /// Edit an image according to a prompt
    Edit {
        image: PathBuf,
        prompt: String,

        /// PNG whose transparent areas mark where to edit
        #[arg(short, long)]
        mask: Option<PathBuf>,
    },
    /// Create variations of an image
    Variation { image: PathBuf },
}
