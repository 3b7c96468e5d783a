use crate::cache::{FileSlot, LayoutCache};
use crate::config::load_config;
use crate::dashboard::{Dashboard, build_dashboard, build_dashboard_uncached};
use crate::ir::parse_entity_document;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sgrid",
    version,
    about = "Clustered streamer dashboard layout and renderer"
)]
pub struct Args {
    /// Entity document (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png/json). SVG and JSON default to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON/JSON5 file (theme, themeVariables, layout, render)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Directory holding the layout cache slot
    #[arg(long = "cacheDir", conflicts_with = "no_cache")]
    pub cache_dir: Option<PathBuf>,

    /// Always recompute; never read or write the layout cache
    #[arg(long = "noCache")]
    pub no_cache: bool,

    /// PNG width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// PNG height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    run_with(&args)
}

pub fn run_with(args: &Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    config.render.width = args.width;
    config.render.height = args.height;

    let input = read_input(args.input.as_deref())?;
    let entities = parse_entity_document(&input)?;
    let dashboard = load_dashboard(entities, resolve_cache_dir(args), &config.layout);

    match args.output_format {
        OutputFormat::Json => {
            write_layout_dump(args.output.as_deref(), &dashboard)?;
        }
        OutputFormat::Svg => {
            let svg = render_svg(&dashboard, &config.theme, &config.layout, &config.render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&dashboard, &config.theme, &config.layout, &config.render);
            write_png(&svg, &output, &config.render)?;
        }
    }
    Ok(())
}

fn load_dashboard(
    entities: Vec<crate::ir::Entity>,
    cache_dir: Option<PathBuf>,
    config: &crate::config::LayoutConfig,
) -> Dashboard {
    match cache_dir {
        Some(dir) => {
            debug!(dir = %dir.display(), "using file layout cache");
            let mut cache = LayoutCache::new(FileSlot::new(dir));
            build_dashboard(entities, Some(&mut cache), config)
        }
        None => build_dashboard_uncached(entities, config),
    }
}

/// `--cacheDir` wins; otherwise a per-user directory under the system temp dir.
fn resolve_cache_dir(args: &Args) -> Option<PathBuf> {
    if args.no_cache {
        return None;
    }
    Some(
        args.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("streamgrid")),
    )
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, render: &crate::config::RenderConfig) -> Result<()> {
    crate::render::write_output_png(svg, output, render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _render: &crate::config::RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LAYOUT_CACHE_KEY;

    const ROSTER: &str = r#"[
        {"id": "a", "platform": "soop", "nickname": "Alpha", "group_name": "X"},
        {"id": "b", "platform": "chzzk", "nickname": "Beta", "group_name": "X, Y"},
        {"id": "c", "group_1": "Y"},
        {"id": "d"}
    ]"#;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("sgrid").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_flags() {
        let args = parse(&["-i", "in.json", "-e", "json", "--cacheDir", "/tmp/x", "-vv"]);
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.verbose, 2);
        assert_eq!(resolve_cache_dir(&args), Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn no_cache_disables_slot() {
        let args = parse(&["--noCache"]);
        assert_eq!(resolve_cache_dir(&args), None);
        assert!(Args::try_parse_from(["sgrid", "--noCache", "--cacheDir", "/tmp/x"]).is_err());
    }

    #[test]
    fn png_needs_output_path() {
        assert!(ensure_output(&None, "png").is_err());
        let path = PathBuf::from("out.png");
        assert_eq!(ensure_output(&Some(path.clone()), "png").unwrap(), path);
    }

    #[test]
    fn renders_svg_and_fills_cache() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("entities.json");
        let output = dir.path().join("dashboard.svg");
        let cache_dir = dir.path().join("cache");
        std::fs::write(&input, ROSTER).unwrap();

        let args = parse(&[
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--cacheDir",
            cache_dir.to_str().unwrap(),
        ]);
        run_with(&args).unwrap();

        let svg = std::fs::read_to_string(&output).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Unclustered (1)"));
        let record = std::fs::read_to_string(cache_dir.join(format!("{LAYOUT_CACHE_KEY}.json")))
            .unwrap();
        assert!(record.contains("\"signature\":\"a|b|c\""));
    }

    #[test]
    fn json_output_reports_cache_hit_on_second_run() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("entities.json");
        let output = dir.path().join("layout.json");
        let cache_dir = dir.path().join("cache");
        std::fs::write(&input, ROSTER).unwrap();

        let args = parse(&[
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "-e",
            "json",
            "--cacheDir",
            cache_dir.to_str().unwrap(),
        ]);
        run_with(&args).unwrap();
        let first: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(first["cacheHit"], false);

        run_with(&args).unwrap();
        let second: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(second["cacheHit"], true);
        assert_eq!(second["positions"], first["positions"]);
    }
}
