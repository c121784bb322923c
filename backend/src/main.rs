//! Local media command line.

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info};

use local_media::{
    commands::{embed_code_block, embed_inline},
    config::{Overrides, Settings},
    expander::expand,
    logging,
    notice::LogNotifier,
    render::render_block,
    resolver::resolve,
    MediaServer,
};
use local_media_types::{MediaKind, MediaReference};

/// Local Media - embed local video, audio and images in notes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to merge on top of the user and local config files
    #[arg(long, global = true, env = "LOCAL_MEDIA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the loopback media server until Ctrl+C
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Disable cache headers on served files
        #[arg(long)]
        no_cache: bool,
    },
    /// Print inline embed markup for a path or link
    Embed {
        selection: String,

        /// video, audio, image, iframe or auto
        #[arg(short, long, default_value = "auto")]
        kind: MediaKind,
    },
    /// Print a fenced media block for a path or link
    CodeBlock { selection: String },
    /// Print the resolved URL, kind and media id of a path or link as JSON
    Resolve { selection: String },
    /// Render a media block body read from a file or stdin
    Render { file: Option<PathBuf> },
    /// List the files a directory or wildcard reference expands to
    Expand {
        path: String,

        /// Case-insensitive regex the file names must match
        #[arg(short, long)]
        filter: Option<String>,

        /// Maximum number of files
        #[arg(long)]
        max: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut overrides = Overrides {
        config_file: args.config.clone(),
        log_level: args.log_level.clone(),
        ..Default::default()
    };
    match &args.command {
        Command::Serve { port, no_cache } => {
            overrides.port = *port;
            overrides.enable_caching = no_cache.then_some(false);
        }
        Command::Expand { max, .. } => overrides.max_embeds = *max,
        _ => {}
    }

    let settings = Settings::load(overrides)?;
    let _log_guard = logging::init(&settings)?;

    let notifier = LogNotifier;
    match args.command {
        Command::Serve { .. } => serve(&settings)?,
        Command::Embed { selection, kind } => {
            if let Some(html) = embed_inline(&selection, kind, &settings, &notifier) {
                println!("{}", html);
            }
        }
        Command::CodeBlock { selection } => {
            if let Some(block) = embed_code_block(&selection, &settings, &notifier) {
                println!("{}", block);
            }
        }
        Command::Resolve { selection } => match resolve(&selection, &settings.resolve_options()) {
            Ok(target) => println!("{}", serde_json::to_string_pretty(&target)?),
            Err(e) => anyhow::bail!(e),
        },
        Command::Render { file } => {
            let source = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut source = String::new();
                    std::io::stdin().read_to_string(&mut source)?;
                    source
                }
            };
            println!("{}", render_block(&source, &settings, &notifier));
        }
        Command::Expand { path, filter, .. } => {
            let reference = MediaReference {
                filter,
                ..MediaReference::new(path)
            };
            for file in expand(&reference, settings.max_embeds, &notifier) {
                println!("{}", file);
            }
        }
    }

    Ok(())
}

fn serve(settings: &Settings) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_server(settings))
}

async fn run_server(settings: &Settings) -> anyhow::Result<()> {
    let mut server = MediaServer::new(settings.server_config());

    if let Err(e) = server.start().await {
        error!("{}", e);
        return Err(e.into());
    }

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down gracefully...");

    server.stop().await;
    Ok(())
}
