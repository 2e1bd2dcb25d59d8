use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::{info, warn};

use blender_core::config::{self, BlenderConfig, CONFIG_FILE_NAME};
use blender_core::discovery::find_product_specifications;
use blender_core::loader::FsLoader;
use blender_core::location::{FragmentLocation, PathResolver};
use blender_core::parse::{self, document::OpenApiDocument};
use blender_core::{BlendOptions, Blender, MergeMode};

#[derive(Parser)]
#[command(
    name = "blender",
    about = "Blends product schemas into an OpenAPI document",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Blend product schemas into an OpenAPI spec and normalize the result
    Blend {
        /// Path to the OpenAPI spec file (YAML or JSON)
        #[arg(short, long = "input-spec")]
        input: Option<PathBuf>,

        #[command(flatten)]
        schemas: SchemaArgs,

        /// Target handling when the augmented model is not polymorphic
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Shorthand for `--mode strict`
        #[arg(long, conflicts_with = "mode")]
        strict_mode: bool,

        /// Honour `x-mef-target` on product schemas
        #[arg(long)]
        autodiscover: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Merge product schemas into a document holding only schemas
    Merge {
        #[command(flatten)]
        schemas: SchemaArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Initialize a new blender configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Args)]
struct SchemaArgs {
    /// Product specification to blend in, optionally with a `#/json/pointer`
    #[arg(short = 'b', long = "blending-schema")]
    blending_schemas: Vec<String>,

    /// Take every product specification under the root directory whose URN
    /// ends with this function name or `all`
    #[arg(long = "all-schemas", conflicts_with = "blending_schemas")]
    all_schemas: Option<String>,

    /// Root directory product specification paths are relative to
    #[arg(short = 'd', long)]
    spec_root_dir: Option<PathBuf>,

    /// Model hosting the product extensions
    #[arg(short, long)]
    model_name: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file; the format follows its extension
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite the output file if it exists
    #[arg(short, long = "force-override")]
    force: bool,

    /// Sort schema components by name
    #[arg(long)]
    sorted: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Fix,
    Relaxed,
    Strict,
}

impl From<ModeArg> for MergeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fix => MergeMode::Fix,
            ModeArg::Relaxed => MergeMode::Relaxed,
            ModeArg::Strict => MergeMode::Strict,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Blend {
            input,
            schemas,
            mode,
            strict_mode,
            autodiscover,
            output,
        } => {
            let mode = if strict_mode {
                Some(MergeMode::Strict)
            } else {
                mode.map(MergeMode::from)
            };
            cmd_blend(input, schemas, mode, autodiscover, output)
        }

        Commands::Merge { schemas, output } => cmd_merge(schemas, output),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "blender", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Try to load the project config file from the current directory.
fn try_load_config() -> Result<Option<BlenderConfig>> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    config::load_config(&config_path).map_err(|e| anyhow::anyhow!(e))
}

/// Resolve the fragment locations to blend, from the command line or the
/// config, and check each one names an existing file.
fn product_locations(args: &SchemaArgs, cfg: &BlenderConfig) -> Result<Vec<FragmentLocation>> {
    let root = args
        .spec_root_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&cfg.spec_root_dir));

    let raw = match &args.all_schemas {
        Some(function) => find_product_specifications(&root, function)
            .with_context(|| format!("failed to search {}", root.display()))?,
        None if args.blending_schemas.is_empty() => cfg.blending_schemas.clone(),
        None => args.blending_schemas.clone(),
    };

    let resolver = PathResolver::new(root.clone());
    let locations = raw
        .iter()
        .map(|r| resolver.locate(r))
        .collect::<Result<Vec<_>, _>>()?;

    let missing: Vec<&FragmentLocation> = locations
        .iter()
        .filter(|l| !l.path().is_file())
        .collect();
    for location in &missing {
        warn!("{} is not a file", location.path().display());
    }
    if !missing.is_empty() {
        anyhow::bail!("all product specifications have to exist");
    }
    Ok(locations)
}

fn blend_options(args: &SchemaArgs, cfg: &BlenderConfig) -> BlendOptions {
    BlendOptions {
        target: args
            .model_name
            .clone()
            .unwrap_or_else(|| cfg.model_name.clone()),
        mode: cfg.mode,
        autodiscover: cfg.autodiscover,
        sorted: cfg.sorted,
    }
}

fn cmd_blend(
    input: Option<PathBuf>,
    schemas: SchemaArgs,
    mode: Option<MergeMode>,
    autodiscover: bool,
    output: OutputArgs,
) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();
    let input = input
        .or_else(|| cfg.input.as_ref().map(PathBuf::from))
        .context("no input spec given; pass --input-spec or set `input` in the config")?;

    let locations = product_locations(&schemas, &cfg)?;

    let mut options = blend_options(&schemas, &cfg);
    options.mode = mode.unwrap_or(options.mode);
    options.autodiscover |= autodiscover;
    options.sorted |= output.sorted;

    let blended = Blender::new(options).blend_file(&FsLoader, &input, &locations)?;

    let target = output
        .output
        .or_else(|| cfg.output.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| default_output(&input));
    write_document(&blended, &target, output.force)
}

fn cmd_merge(schemas: SchemaArgs, output: OutputArgs) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();
    let locations = product_locations(&schemas, &cfg)?;

    let mut options = blend_options(&schemas, &cfg);
    options.mode = MergeMode::Fix;
    options.sorted |= output.sorted;

    let merged = Blender::new(options).merge_schemas(&FsLoader, &locations)?;

    let target = output
        .output
        .or_else(|| cfg.output.as_ref().map(PathBuf::from))
        .context("no output file given; pass --output or set `output` in the config")?;
    write_document(&merged, &target, output.force)
}

/// `<input>.modified` next to the input spec.
fn default_output(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".modified");
    PathBuf::from(name)
}

/// Check that `path` may be written: not a directory, and not an existing
/// file unless `force` is set.
fn check_output(path: &Path, force: bool) -> Result<()> {
    if path.is_dir() {
        anyhow::bail!("{} is a directory", path.display());
    }
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force-override to overwrite.",
            path.display()
        );
    }
    Ok(())
}

fn write_document(document: &OpenApiDocument, path: &Path, force: bool) -> Result<()> {
    check_output(path, force)?;
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse::to_json(document)?,
        _ => parse::to_yaml(document)?,
    };
    info!("writing to {}", path.display());
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_appends_suffix() {
        assert_eq!(
            default_output(Path::new("api/order.yaml")),
            PathBuf::from("api/order.yaml.modified")
        );
    }

    #[test]
    fn test_check_output() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_output(dir.path(), true).is_err());

        let file = dir.path().join("out.yaml");
        assert!(check_output(&file, false).is_ok());
        fs::write(&file, "x").unwrap();
        assert!(check_output(&file, false).is_err());
        assert!(check_output(&file, true).is_ok());
    }

    #[test]
    fn test_cli_parses_blend_flags() {
        let cli = Cli::try_parse_from([
            "blender",
            "blend",
            "-i",
            "api.yaml",
            "-b",
            "ovc.yaml",
            "-b",
            "model.yaml#/definitions/Uni",
            "--strict-mode",
            "--sorted",
        ])
        .unwrap();
        let Commands::Blend {
            schemas,
            strict_mode,
            output,
            ..
        } = cli.command
        else {
            panic!("expected blend");
        };
        assert_eq!(schemas.blending_schemas.len(), 2);
        assert!(strict_mode);
        assert!(output.sorted);
    }

    #[test]
    fn test_cli_rejects_selective_and_all_schemas() {
        let parsed = Cli::try_parse_from([
            "blender",
            "merge",
            "-b",
            "ovc.yaml",
            "--all-schemas",
            "order",
        ]);
        assert!(parsed.is_err());
    }
}
