mod config;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use miette::{IntoDiagnostic, Result};
use srfile::{AssetKind, SrFile};
use srmodel::{GeometrySource, Platform};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "Soul Reaver extractor")]
#[command(about, author, version, long_about = None)]
struct Cli {
    /// Print decoder debug output
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    /// TOML file with [parse] and [textures] sections
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Override the platform detected from the file
    #[arg(long, global = true, value_enum)]
    platform: Option<PlatformArg>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PlatformArg {
    Psx,
    Pc,
    Dreamcast,
}

impl From<PlatformArg> for Platform {
    fn from(value: PlatformArg) -> Self {
        match value {
            PlatformArg::Psx => Platform::Psx,
            PlatformArg::Pc => Platform::Pc,
            PlatformArg::Dreamcast => Platform::Dreamcast,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse every unit and object file below a directory
    #[command(arg_required_else_help = true)]
    Check {
        /// Directory with ".pcm" or ".drm" files
        dir: PathBuf,
    },
    /// Print what a unit or object file contains
    #[command(arg_required_else_help = true)]
    Info {
        /// Unit or object file
        file: PathBuf,
        /// List every model with its octree statistics
        #[arg(long, default_value_t = false)]
        models: bool,
    },
    /// Rebuild the textures of a PlayStation ".crm" file as PNG images
    #[command(arg_required_else_help = true)]
    Textures {
        /// Unit or object file whose polygons sample the textures
        file: PathBuf,
        /// Matching ".crm" texture file
        crm: PathBuf,
        /// Outbound directory
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,
        /// Overwrite files
        #[arg(short, long, default_value_t = false)]
        force: bool,
        /// Skip the polygon pass and draw every page in greyscale
        #[arg(long, default_value_t = false)]
        greyscale: bool,
    },
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let stdout = console::Term::stdout();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(platform) = cli.platform {
        config.parse.forced_platform = Some(platform.into());
    }

    match cli.command {
        Commands::Check { dir } => command_check(stdout, &config, &dir)?,
        Commands::Info { file, models } => command_info(stdout, &config, &file, models)?,
        Commands::Textures {
            file,
            crm,
            out,
            force,
            greyscale,
        } => command_textures(stdout, &config, &file, &crm, &out, force, greyscale)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn command_check(stdout: console::Term, config: &Config, dir: &Path) -> Result<()> {
    let mut files = Vec::new();
    common::collect_files_recursive(dir, &mut files);
    files.retain(|path| is_asset_file(path));
    files.sort();

    let bar = indicatif::ProgressBar::new(files.len() as u64);
    bar.set_style(get_bar_style()?);

    let mut failed = Vec::new();
    for path in &files {
        bar.set_message(path.display().to_string());
        if let Err(err) = srfile::parse_path(path, &config.parse) {
            failed.push(format!("{}: {err}", path.display()));
        }
        bar.inc(1);
    }
    bar.finish();

    for line in &failed {
        stdout.write_line(line).into_diagnostic()?;
    }
    let text = format!(
        "Checked files: {};\nFailed: {};",
        files.len(),
        failed.len()
    );
    stdout.write_line(&text).into_diagnostic()?;

    Ok(())
}

fn command_info(stdout: console::Term, config: &Config, file: &Path, models: bool) -> Result<()> {
    let parsed = srfile::parse_path(file, &config.parse)?;

    let text = format!(
        "Name: {};\nKind: {};\nVersion: {};\nPlatform: {};\nData start: {:#x};\nModels: {};\nPolygons: {};",
        parsed.name,
        parsed.kind.label(),
        parsed.version.label(),
        parsed.platform.label(),
        parsed.data_start,
        parsed.models.len(),
        parsed.polygon_count()
    );
    stdout.write_line(&text).into_diagnostic()?;

    if parsed.kind == AssetKind::Unit {
        print_unit_tables(&stdout, &parsed)?;
    }

    if models {
        for model in &parsed.models {
            let mut text = format!(
                "Model {} \"{}\": {} vertices, {} polygons, {} materials",
                model.index,
                model.name,
                model.vertex_count(),
                model.polygon_count(),
                model.materials.len()
            );
            if let GeometrySource::Octree(tree) = &model.source {
                text.push_str(&format!(
                    ", {} groups, {} nodes, {} leaves, {} meshes",
                    tree.groups.len(),
                    tree.nodes.len(),
                    tree.leaf_count(),
                    tree.meshes.len()
                ));
            }
            stdout.write_line(&text).into_diagnostic()?;
        }
    }

    Ok(())
}

fn print_unit_tables(stdout: &console::Term, parsed: &SrFile) -> Result<()> {
    for portal in &parsed.portals {
        stdout
            .write_line(&format!("Portal: {}", portal.name))
            .into_diagnostic()?;
    }
    for intro in &parsed.intros {
        let [x, y, z] = intro.position;
        stdout
            .write_line(&format!(
                "Intro {}: {} at ({x}, {y}, {z})",
                intro.id, intro.name
            ))
            .into_diagnostic()?;
    }
    if !parsed.object_names.is_empty() {
        stdout
            .write_line(&format!("Objects: {}", parsed.object_names.join(", ")))
            .into_diagnostic()?;
    }
    Ok(())
}

fn command_textures(
    stdout: console::Term,
    config: &Config,
    file: &Path,
    crm_path: &Path,
    out: &Path,
    force: bool,
    greyscale: bool,
) -> Result<()> {
    let crm_file = crm::CrmFile::open_path(crm_path)?;
    let set = if greyscale {
        crm::build_greyscale_textures(&crm_file)
    } else {
        let parsed = srfile::parse_path(file, &config.parse)?;
        if parsed.platform != Platform::Psx {
            log::warn!(
                "{} is a {} file, CRM textures belong to PlayStation data",
                file.display(),
                parsed.platform.label()
            );
        }
        let uses: Vec<_> = parsed
            .models
            .iter()
            .flat_map(crm::texture_uses)
            .collect();
        crm::build_textures(&crm_file, &uses, &config.textures)
    };

    std::fs::create_dir_all(out).into_diagnostic()?;

    let mut outputs: Vec<(PathBuf, &image::RgbaImage)> = set
        .textures()
        .iter()
        .enumerate()
        .map(|(index, image)| (out.join(format!("texture-{index:03}.png")), image))
        .collect();
    for (texture_id, clut) in set.variant_keys() {
        if let Some(image) = set.texture_with_clut(texture_id, clut) {
            let name = format!("texture-{texture_id:03}-clut-{clut:04x}.png");
            outputs.push((out.join(name), image));
        }
    }

    let bar = indicatif::ProgressBar::new(outputs.len() as u64);
    bar.set_style(get_bar_style()?);

    let mut skipped = 0usize;
    for (path, image) in &outputs {
        bar.set_message(path.display().to_string());
        if !force && path.exists() {
            skipped += 1;
        } else {
            image.save(path).into_diagnostic()?;
        }
        bar.inc(1);
    }
    bar.finish();

    let text = format!(
        "Textures: {};\nVariations: {};\nSkipped existing: {};",
        set.len(),
        set.variant_count(),
        skipped
    );
    stdout.write_line(&text).into_diagnostic()?;

    Ok(())
}

fn is_asset_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pcm") || ext.eq_ignore_ascii_case("drm"))
}

fn get_bar_style() -> Result<indicatif::ProgressStyle> {
    Ok(
        indicatif::ProgressStyle::with_template("[{bar:32}] {pos:>7}/{len:7} {msg}")
            .into_diagnostic()?
            .progress_chars("=>-"),
    )
}
