use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;

use crate::error::SirnError;
use crate::generator::generate;
use crate::log::{set_log_level, LogSpec};
use crate::parameters::GeneratorParameters;
use crate::playback::{replay, FrameRenderer, TextRenderer, Timeline};
use crate::report::{load_dataset, write_dataset, write_preview};

/// Cities and time steps shown by `generate --preview`.
const PREVIEW_CITIES: usize = 3;
const PREVIEW_STEPS: usize = 3;

#[derive(Parser, Debug)]
#[command(name = "sirn")]
#[command(about = "Generate and replay multi-city SIR epidemic data")]
pub struct Cli {
    #[command(flatten)]
    pub base: BaseArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Arguments shared by every subcommand
#[derive(Args, Debug, Default)]
pub struct BaseArgs {
    /// Enable logging: a level (`info`), `module=level` pairs, or both, comma-separated
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate synthetic SIRN data for a set of cities
    Generate(GenerateArgs),
    /// Replay a stored dataset one time step at a time
    Replay(ReplayArgs),
}

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Optional path for a JSON file of generator parameters
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of cities
    #[arg(long)]
    pub cities: Option<usize>,

    /// Maximum time step
    #[arg(long)]
    pub max_time: Option<u64>,

    /// Time step interval
    #[arg(long)]
    pub time_step: Option<u64>,

    /// Initial infected count
    #[arg(long)]
    pub initial_infected: Option<u64>,

    /// Output file (.json or .csv)
    #[arg(short, long, default_value = "sirn_data.json")]
    pub output: PathBuf,

    /// Use fixed parameters for all cities
    #[arg(long)]
    pub fixed_params: bool,

    /// Population for each city
    #[arg(long, num_args = 0..)]
    pub populations: Option<Vec<u64>>,

    /// Random seed for reproducibility
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Add random variations to the model
    #[arg(long)]
    pub stochastic: bool,

    /// Euler sub-steps per time step interval
    #[arg(long)]
    pub substeps: Option<usize>,

    /// Print a preview of the generated data
    #[arg(long)]
    pub preview: bool,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Dataset to replay (JSON)
    pub path: PathBuf,

    /// Pause between time steps, in milliseconds
    #[arg(long, default_value = "0")]
    pub delay_ms: u64,

    /// Render only the time step at this position (0-based)
    #[arg(long)]
    pub step: Option<usize>,
}

impl GenerateArgs {
    /// Starts from the config file (or the defaults) and applies every flag that was given.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn parameters(&self) -> Result<GeneratorParameters, SirnError> {
        let mut parameters = match &self.config {
            Some(path) => load_parameters(path)?,
            None => GeneratorParameters::default(),
        };
        if let Some(cities) = self.cities {
            parameters.cities = cities;
        }
        if let Some(max_time) = self.max_time {
            parameters.max_time = max_time;
        }
        if let Some(time_step) = self.time_step {
            parameters.time_step = time_step;
        }
        if let Some(initial_infected) = self.initial_infected {
            parameters.initial_infected = initial_infected;
        }
        if self.fixed_params {
            parameters.vary_params = false;
        }
        if let Some(populations) = &self.populations {
            parameters.populations = Some(populations.clone());
        }
        if self.seed.is_some() {
            parameters.seed = self.seed;
        }
        if self.stochastic {
            parameters.stochastic = true;
        }
        if let Some(substeps) = self.substeps {
            parameters.substeps = substeps;
        }
        Ok(parameters)
    }
}

fn load_parameters(path: &Path) -> Result<GeneratorParameters, SirnError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Installs the log levels requested on the command line. `--log-level` wins over `-v`.
///
/// # Errors
///
/// Returns an error if `--log-level` cannot be parsed.
pub fn configure_logging(args: &BaseArgs, out: &mut dyn Write) -> Result<(), SirnError> {
    if let Some(log_level) = &args.log_level {
        let spec: LogSpec = log_level.parse()?;
        spec.apply();
        if let Some(level) = spec.global {
            writeln!(out, "Logging enabled at level {level}")?;
        }
        for (module, level) in &spec.modules {
            writeln!(out, "Logging enabled for {module} at level {level}")?;
        }
        return Ok(());
    }
    let level = match args.verbose {
        0 => return Ok(()),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    set_log_level(level);
    Ok(())
}

/// Runs the command described by `cli`, writing user-facing output to `out`.
///
/// # Errors
///
/// Returns any error raised while configuring, generating, loading or writing data.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<(), SirnError> {
    configure_logging(&cli.base, out)?;
    match &cli.command {
        Command::Generate(args) => run_generate(args, out),
        Command::Replay(args) => run_replay(args, out),
    }
}

fn run_generate(args: &GenerateArgs, out: &mut dyn Write) -> Result<(), SirnError> {
    let parameters = args.parameters()?;
    let dataset = generate(&parameters)?;
    write_dataset(&args.output, &dataset)?;
    writeln!(
        out,
        "Generated SIRN data for {} cities saved to {}",
        parameters.cities,
        args.output.display()
    )?;
    if args.preview {
        write_preview(&dataset, PREVIEW_CITIES, PREVIEW_STEPS, out)?;
    }
    Ok(())
}

fn run_replay(args: &ReplayArgs, out: &mut dyn Write) -> Result<(), SirnError> {
    let dataset = load_dataset(&args.path)?;
    let timeline = Timeline::new(&dataset);
    writeln!(
        out,
        "Found {} cities and {} time steps",
        dataset.len(),
        timeline.len()
    )?;

    match args.step {
        Some(index) => {
            let frame = timeline.frame_at(index).ok_or_else(|| {
                SirnError::InvalidParameter(format!(
                    "time step position {index} is out of range (0..{})",
                    timeline.len()
                ))
            })?;
            TextRenderer.render(&frame, out)?;
        }
        None => {
            replay(
                &dataset,
                &TextRenderer,
                out,
                Duration::from_millis(args.delay_ms),
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::CommandFactory;
    use tempfile::tempdir;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_flags_override_defaults() {
        let cli = parse(&[
            "sirn",
            "generate",
            "--cities",
            "4",
            "--fixed-params",
            "--populations",
            "10",
            "20",
            "--seed",
            "8",
            "--stochastic",
        ]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let parameters = args.parameters().unwrap();
        assert_eq!(parameters.cities, 4);
        assert!(!parameters.vary_params);
        assert_eq!(parameters.populations, Some(vec![10, 20]));
        assert_eq!(parameters.seed, Some(8));
        assert!(parameters.stochastic);
        assert_eq!(parameters.max_time, 100);
        assert_eq!(args.output, PathBuf::from("sirn_data.json"));
    }

    #[test]
    fn bare_populations_flag_uses_fallback_population() {
        let cli = parse(&["sirn", "generate", "--cities", "2", "--populations"]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let parameters = args.parameters().unwrap();
        assert_eq!(parameters.populations, Some(vec![]));
        assert_eq!(parameters.population(0), 100);
        assert_eq!(parameters.population(1), 100);
    }

    #[test]
    fn config_file_then_flags() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("params.json");
        fs::write(&config, r#"{ "cities": 7, "max_time": 30, "seed": 1 }"#).unwrap();

        let args = GenerateArgs {
            config: Some(config),
            max_time: Some(50),
            ..GenerateArgs::default()
        };
        let parameters = args.parameters().unwrap();
        assert_eq!(parameters.cities, 7);
        assert_eq!(parameters.max_time, 50);
        assert_eq!(parameters.seed, Some(1));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = GenerateArgs {
            config: Some(PathBuf::from("does/not/exist.json")),
            ..GenerateArgs::default()
        };
        assert!(matches!(args.parameters(), Err(SirnError::IoError(_))));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["sirn", "replay", "data.json", "-vv", "--step", "2"]);
        assert_eq!(cli.base.verbose, 2);
        let Command::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert_eq!(args.step, Some(2));
        assert_eq!(args.delay_ms, 0);
    }

    #[test]
    fn generate_then_replay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let path_arg = path.to_str().unwrap();

        let mut out = Vec::new();
        run(
            &parse(&["sirn", "generate", "--cities", "2", "--output", path_arg]),
            &mut out,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Generated SIRN data for 2 cities saved to "));

        let mut out = Vec::new();
        run(&parse(&["sirn", "replay", path_arg, "--step", "0"]), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Found 2 cities and 11 time steps\nTime step 0 (1/11)\n"));
        assert!(text.contains(
            "  City 1: S=500.00 (99.8%), I=1.00 (0.2%), R=0.00 (0.0%), N=501.00"
        ));
    }

    #[test]
    fn replay_step_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"{ "0": { "0": [99, 1, 0, 100] } }"#).unwrap();

        let cli = parse(&["sirn", "replay", path.to_str().unwrap(), "--step", "1"]);
        assert!(matches!(
            run(&cli, &mut Vec::new()),
            Err(SirnError::InvalidParameter(_))
        ));
    }
}
