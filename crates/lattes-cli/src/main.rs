use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lattes::{
    Document, Input, ParserConfig, Summary, TruncationConfig, Value, ANALYSIS_BUDGET,
    SUMMARY_BUDGET,
};

#[derive(Debug, Parser)]
#[command(
    name = "lattes",
    version,
    about = "Parse Lattes CV exports and shrink them to a size budget"
)]
struct Args {
    /// JSON file with `parser` and/or `truncation` settings
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a CV export and print its summary
    Parse {
        /// Input file (defaults to stdin)
        #[arg(value_name = "INPUT")]
        input: Option<PathBuf>,
        /// Print the whole document tree instead of the summary
        #[arg(long)]
        tree: bool,
        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
    /// Shrink one or more trees to fit a budget
    Shrink {
        /// Budget in estimator units (defaults depend on the mode)
        #[arg(short, long)]
        budget: Option<usize>,
        #[arg(short, long, value_enum, default_value = "single")]
        mode: Mode,
        /// Trees as JSON, or raw `.xml` exports; in compare mode the first is the target
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,
        /// Output file (defaults to stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Single,
    Compare,
    Aggregate,
}

impl Mode {
    fn default_budget(self) -> usize {
        match self {
            Self::Single => SUMMARY_BUDGET,
            Self::Compare | Self::Aggregate => ANALYSIS_BUDGET,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    parser: ParserConfig,
    truncation: TruncationConfig,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Err(err) = run(Args::parse()) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let settings = load_settings(args.config.as_deref())?;

    match args.command {
        Command::Parse {
            input,
            tree,
            output,
        } => {
            let bytes = read_input(input.as_deref())?;
            let (document, summary) =
                parse_curriculum(&bytes, input.as_deref(), &settings.parser)
                    .context("failed to parse curriculum")?;
            info!(
                id = %summary.identifier,
                total = summary.counts.total(),
                "parsed curriculum"
            );

            let json = if tree {
                serde_json::to_string_pretty(&document)?
            } else {
                serde_json::to_string_pretty(&summary)?
            };
            write_output(output.as_deref(), json.as_bytes())
        }
        Command::Shrink {
            budget,
            mode,
            inputs,
            output,
        } => {
            let budget = budget.unwrap_or_else(|| mode.default_budget());
            let trees = inputs
                .iter()
                .map(|path| load_tree(path, &settings.parser))
                .collect::<Result<Vec<_>>>()?;

            let (payload, truncated) = shrink(mode, &trees, budget, &settings.truncation)?;
            info!(budget, truncated, "shrink finished");
            write_output(output.as_deref(), payload.as_bytes())
        }
    }
}

fn shrink(
    mode: Mode,
    trees: &[Value],
    budget: usize,
    config: &TruncationConfig,
) -> Result<(String, bool)> {
    match (mode, trees) {
        (Mode::Single, [tree]) => {
            let result = lattes::truncate(tree, budget, config);
            Ok((serde_json::to_string(&result.payload)?, result.truncated))
        }
        (Mode::Single, _) => bail!("single mode takes exactly one input"),
        (Mode::Compare, [target, peers @ ..]) => {
            let result = lattes::truncate_for_comparison(target, peers, budget, config);
            Ok((result.payload, result.truncated))
        }
        (Mode::Compare, []) => bail!("compare mode needs a target input"),
        (Mode::Aggregate, trees) => {
            let result = lattes::truncate_for_aggregate(trees, budget, config);
            Ok((result.payload, result.truncated))
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid config file {}", path.display()))
}

fn load_tree(path: &Path, parser: &ParserConfig) -> Result<Value> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read input file {}", path.display()))?;

    if path.extension().and_then(|ext| ext.to_str()) == Some("xml") {
        let (document, _) = parse_curriculum(&bytes, Some(path), parser)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        return Ok(document.into_value());
    }
    serde_json::from_slice(&bytes)
        .with_context(|| format!("input {} is not a JSON tree", path.display()))
}

fn parse_curriculum(
    bytes: &[u8],
    path: Option<&Path>,
    parser: &ParserConfig,
) -> lattes::Result<(Document, Summary)> {
    let name = path.map(|path| path.display().to_string());
    let mut input = Input::from_bytes(bytes);
    if let Some(name) = name.as_deref() {
        input = input.with_filename(name);
    }
    lattes::parse_input(&input, parser)
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("failed to read input file {}", path.display())),
        None => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("failed to read stdin")?;
            if buffer.iter().all(u8::is_ascii_whitespace) {
                bail!("no input provided on stdin");
            }
            Ok(buffer)
        }
    }
}

fn write_output(path: Option<&Path>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, data)
            .with_context(|| format!("failed to write output file {}", path.display())),
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(data).context("failed to write stdout")?;
            stdout.write_all(b"\n").context("failed to write stdout")?;
            Ok(())
        }
    }
}
