//! x3fview - browse X3F raw files through their embedded JPEG previews.

mod browse;
mod library;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use x3fview_core::container::{self, SectionHeader};
use x3fview_core::decode::{self, DecoderChoice};
use x3fview_core::services::ExportKind;
use x3fview_core::{parse_viewport, viewport, ViewerConfig};

use crate::browse::Browser;
use crate::library::{ExportOutcome, FsLibrary};

#[derive(Parser)]
#[command(name = "x3fview", version, about = "Browse and export X3F embedded previews")]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Preview decoder: auto, fast (turbo) or generic
    #[arg(short, long, global = true)]
    decoder: Option<DecoderChoice>,
    /// Viewport size, e.g. 1280x720
    #[arg(long, global = true, value_parser = parse_viewport_arg)]
    viewport: Option<(i32, i32)>,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the X3F files of a directory
    List {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Show the container directory of a file
    Inspect {
        file: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Write embedded JPEGs to the export directory, skipping existing ones
    Extract {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },
    /// Append a converter job to the export list
    Queue {
        /// dng or tiff
        #[arg(short, long, default_value = "dng")]
        kind: ExportKind,
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },
    /// Compute the fit of an image into the viewport
    Fit { width: u32, height: u32 },
    /// Browse a directory interactively, one command per line on stdin
    Browse {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn parse_viewport_arg(value: &str) -> Result<(i32, i32), String> {
    parse_viewport(value).map_err(|e| e.to_string())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(cli: &Cli) -> Result<ViewerConfig> {
    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(choice) = cli.decoder {
        config.decoder = choice;
    }
    if let Some(viewport) = cli.viewport {
        config.initial_viewport = viewport;
    }
    Ok(config)
}

/// Directory holding `file`, so `export/` and `delete/` land beside it.
fn parent_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::List { dir } => {
            let library = FsLibrary::new(dir, config.clone());
            for path in library.scan().with_context(|| format!("listing {}", dir.display()))? {
                println!("{}", path.display());
            }
        }

        Commands::Inspect { file, json } => {
            let parsed = container::open_file(file)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
                return Ok(());
            }
            println!("File           {}", file.display());
            println!("Size           {} B", parsed.file_len);
            println!("Directory      {} (version {:#x})", parsed.directory_offset, parsed.version);
            println!("{:<6} {:>10} {:>10}  Section", "Tag", "Offset", "Size");
            for entry in &parsed.entries {
                let section = match &entry.section {
                    SectionHeader::Image(h) => format!(
                        "image type {} format {} {}x{}{}",
                        h.data_type,
                        h.data_format,
                        h.columns,
                        h.rows,
                        if h.is_jpeg_preview() { " (JPEG preview)" } else { "" }
                    ),
                    SectionHeader::Other(tag) => container::tag_to_string(tag),
                    SectionHeader::Unreadable(e) => format!("unreadable: {}", e),
                };
                println!(
                    "{:<6} {:>10} {:>10}  {}",
                    entry.record.tag_str(),
                    entry.record.offset,
                    entry.record.size,
                    section
                );
            }
            match parsed.locate_embedded_jpeg() {
                Ok(jpeg) => println!("Preview        {} B at {}", jpeg.size, jpeg.offset),
                Err(e) => println!("Preview        {}", e),
            }
        }

        Commands::Extract { files } => {
            let mut failed = 0;
            for file in files {
                let library = FsLibrary::new(parent_dir(file), config.clone());
                match library.export_preview(file) {
                    Ok(ExportOutcome::Written(target)) => println!("  wrote    {}", target.display()),
                    Ok(ExportOutcome::Skipped(target)) => println!("  skipped  {}", target.display()),
                    Err(e) => {
                        failed += 1;
                        log::error!("{:#}", e);
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} files failed", failed, files.len());
            }
        }

        Commands::Queue { kind, files } => {
            for file in files {
                let mut library = FsLibrary::new(parent_dir(file), config.clone());
                let job = library.queue_export(file, *kind)?;
                print!("{}", job.to_line());
            }
        }

        Commands::Fit { width, height } => {
            let (vw, vh) = config.initial_viewport;
            let fit = viewport::compute_fit(*width, *height, vw, vh)?;
            println!("{}", serde_json::to_string(&fit)?);
        }

        Commands::Browse { dir } => {
            let decoder = decode::select_decoder(config.decoder)?;
            let library = FsLibrary::new(dir, config.clone());
            let mut browser = Browser::new(library, &config, config.initial_viewport, decoder)?;
            let stdin = io::stdin();
            browser.run(stdin.lock(), &mut io::stdout())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "x3fview", "browse", "/photos", "--viewport", "1280x720", "-d", "generic", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.viewport, Some((1280, 720)));
        assert_eq!(cli.decoder, Some(DecoderChoice::Generic));
        assert_eq!(cli.verbose, 2);

        let config = load_config(&cli).unwrap();
        assert_eq!(config.initial_viewport, (1280, 720));
        assert_eq!(config.decoder, DecoderChoice::Generic);
    }

    #[test]
    fn test_cli_rejects_bad_viewport() {
        assert!(Cli::try_parse_from(["x3fview", "fit", "10", "10", "--viewport", "big"]).is_err());
    }

    #[test]
    fn test_queue_kind_parses() {
        let cli = Cli::try_parse_from(["x3fview", "queue", "-k", "tiff", "a.X3F"]).unwrap();
        assert!(matches!(cli.command, Commands::Queue { kind: ExportKind::Tiff, .. }));
    }

    #[test]
    fn test_parent_dir_of_bare_name() {
        assert_eq!(parent_dir(Path::new("a.X3F")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("/p/a.X3F")), PathBuf::from("/p"));
    }
}
