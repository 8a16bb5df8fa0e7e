use clap::{Parser, Subcommand};
use env_logger::Env;
use hugoswipe::album::{Album, UpdateOutcome};
use hugoswipe::config::{load_settings, stock_config_toml, Settings};
use hugoswipe::descriptor;
use hugoswipe::prompt::TerminalPrompt;
use log::warn;
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "hugoswipe",
    version,
    about = "Incremental photo gallery updater for Hugo + PhotoSwipe sites"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "hugoswipe.toml")]
    config: PathBuf,

    /// Log each rebuilt photo instead of showing a progress bar
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Update one album, or every album in the current directory
    Update {
        /// Album directory to update (default: all subdirectories)
        album: Option<String>,
    },
    /// Remove the generated files of one album, or of every album
    Clean {
        /// Album directory to clean (default: all subdirectories)
        album: Option<String>,
    },
    /// Create a new album directory with a skeleton descriptor
    New {
        /// Name of the album directory to create
        name: String,
    },
    /// Write a stock configuration file with every option documented
    GenConfig,
}

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut settings = load_settings(&cli.config)?;
    if cli.verbose {
        settings.verbose = true;
    }

    match cli.command {
        Command::Update { album } => update(album.as_deref(), &settings),
        Command::Clean { album } => clean(album.as_deref(), &settings),
        Command::New { name } => new_album(&name, &settings),
        Command::GenConfig => gen_config(&cli.config),
    }
}

/// Album directories to operate on: the named one, or every
/// subdirectory of the current directory.
fn album_dirs(album: Option<&str>) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    match album {
        Some(name) => Ok(vec![PathBuf::from(name)]),
        None => {
            let mut dirs: Vec<PathBuf> = std::fs::read_dir(".")?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect();
            dirs.sort();
            Ok(dirs)
        }
    }
}

/// Load the album at `dir`. Skipping non-album directories is only
/// acceptable when walking; an explicitly named album must exist.
fn load_album(
    dir: &Path,
    settings: &Settings,
    named: bool,
) -> Result<Option<Album>, Box<dyn Error>> {
    match descriptor::load(dir, settings)? {
        Some(album) => Ok(Some(album)),
        None if named => {
            Err(format!("no album descriptor found in {}", dir.display()).into())
        }
        None => Ok(None),
    }
}

fn update(album: Option<&str>, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let named = album.is_some();
    let mut updated = 0;
    for dir in album_dirs(album)? {
        let Some(mut album) = load_album(&dir, settings, named)? else {
            continue;
        };
        match album.update(settings)? {
            UpdateOutcome::Updated(report) => {
                updated += 1;
                println!(
                    "{}: {} added, {} removed, {} rebuilt",
                    album.name(),
                    report.added,
                    report.removed,
                    report.rebuilt
                );
            }
            UpdateOutcome::SkippedDuplicateNames => {}
        }
    }
    if updated == 0 && !named {
        warn!("no albums found in the current directory");
    }
    Ok(())
}

fn clean(album: Option<&str>, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let named = album.is_some();
    let prompt = TerminalPrompt;
    for dir in album_dirs(album)? {
        let Some(album) = load_album(&dir, settings, named)? else {
            continue;
        };
        album.clean(settings, &prompt)?;
    }
    Ok(())
}

fn new_album(name: &str, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let dir = PathBuf::from(name);
    if descriptor::descriptor_path(&dir, settings).exists() {
        return Err(format!("album {} already exists", name).into());
    }
    std::fs::create_dir_all(dir.join(&settings.photo_dir))?;

    let mut album = Album::new(dir);
    album.title = Some(name.to_string());
    album.creation_time = Some(descriptor::timestamp_now());
    descriptor::save(&mut album, settings)?;

    println!(
        "Created new album {}: drop photos into {}/{} and run `hugoswipe update {}`",
        name, name, settings.photo_dir, name
    );
    Ok(())
}

fn gen_config(path: &Path) -> Result<(), Box<dyn Error>> {
    if path.exists() {
        return Err(format!("refusing to overwrite existing {}", path.display()).into());
    }
    std::fs::write(path, stock_config_toml())?;
    println!("Written stock configuration to {}", path.display());
    Ok(())
}
