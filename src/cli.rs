use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::error::PlacementError;
use crate::models::Config;

/// A fully resolved run: input/output paths plus the effective configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub participants: PathBuf,
    pub programs: PathBuf,
    pub output: PathBuf,
    pub config: Config,
    pub verbose: bool,
}

pub fn command() -> Command {
    Command::new("camp-placement")
        .version("0.1")
        .about("Places camp participants into programs by ranked choice")
        .arg(
            Arg::new("participants")
                .value_name("PARTICIPANTS")
                .help("CSV with Name, Age, Cabin, Choice1..Choice4"),
        )
        .arg(
            Arg::new("programs")
                .value_name("PROGRAMS")
                .help("CSV with Program Name, Age Start, Age End, Capacity"),
        )
        .arg(
            Arg::new("output")
                .value_name("OUTPUT")
                .help("Placement CSV to write"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (created with defaults if missing)"),
        )
        .arg(
            Arg::new("trials")
                .short('t')
                .long("trials")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Number of random orderings to try"),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("SEED")
                .value_parser(value_parser!(u64))
                .help("Seed for reproducible runs"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log every trial"),
        )
}

/// Resolves parsed arguments into an [`Invocation`].
///
/// Returns `Ok(None)` when any of the three paths is missing; the caller
/// prints usage and exits successfully. Configuration problems surface
/// here, before any table is read.
pub fn resolve(matches: &ArgMatches) -> Result<Option<Invocation>> {
    let (Some(participants), Some(programs), Some(output)) = (
        matches.get_one::<String>("participants"),
        matches.get_one::<String>("programs"),
        matches.get_one::<String>("output"),
    ) else {
        return Ok(None);
    };

    let mut config = match matches.get_one::<String>("config") {
        Some(config_file) if Path::new(config_file).exists() => {
            println!("📋 Loading configuration from: {}", config_file);
            Config::load_from_file(config_file)
                .with_context(|| format!("Failed to read configuration: {}", config_file))?
        }
        Some(config_file) => {
            println!("📝 Creating default configuration file: {}", config_file);
            let default_config = Config::default();
            default_config
                .save_to_file(config_file)
                .with_context(|| format!("Failed to write configuration: {}", config_file))?;
            default_config
        }
        None => Config::default(),
    };
    if let Some(&trials) = matches.get_one::<usize>("trials") {
        config.trials = trials;
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        config.seed = Some(seed);
    }
    if config.trials == 0 {
        return Err(PlacementError::InvalidConfig("trials must be at least 1".to_string()).into());
    }

    Ok(Some(Invocation {
        participants: PathBuf::from(participants),
        programs: PathBuf::from(programs),
        output: PathBuf::from(output),
        config,
        verbose: matches.get_flag("verbose"),
    }))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::models::{DuplicatePolicy, DEFAULT_TRIALS};

    fn resolve_args(args: &[&str]) -> Result<Option<Invocation>> {
        let matches = command()
            .try_get_matches_from(std::iter::once("camp-placement").chain(args.iter().copied()))
            .expect("arguments parse");
        resolve(&matches)
    }

    #[test]
    fn missing_paths_mean_usage() {
        assert_eq!(resolve_args(&[]).unwrap(), None);
        assert_eq!(resolve_args(&["people.csv"]).unwrap(), None);
        assert_eq!(resolve_args(&["people.csv", "programs.csv"]).unwrap(), None);
        assert_eq!(resolve_args(&["--trials", "0", "people.csv"]).unwrap(), None);
    }

    #[test]
    fn three_paths_use_defaults() {
        let invocation = resolve_args(&["people.csv", "programs.csv", "out.csv"])
            .unwrap()
            .expect("complete invocation");
        assert_eq!(invocation.participants, PathBuf::from("people.csv"));
        assert_eq!(invocation.programs, PathBuf::from("programs.csv"));
        assert_eq!(invocation.output, PathBuf::from("out.csv"));
        assert_eq!(invocation.config, Config::default());
        assert_eq!(invocation.config.trials, DEFAULT_TRIALS);
        assert!(!invocation.verbose);
    }

    #[test]
    fn flags_override_configuration() {
        let invocation = resolve_args(&["-t", "25", "--seed", "9", "-v", "a.csv", "b.csv", "c.csv"])
            .unwrap()
            .expect("complete invocation");
        assert_eq!(invocation.config.trials, 25);
        assert_eq!(invocation.config.seed, Some(9));
        assert!(invocation.verbose);
    }

    #[test]
    fn zero_trials_is_rejected_before_loading() {
        // The input files do not exist; the configuration error must come first.
        let error = resolve_args(&["--trials", "0", "missing.csv", "missing.csv", "out.csv"])
            .expect_err("zero trials");
        assert!(matches!(
            error.downcast_ref::<PlacementError>(),
            Some(PlacementError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_config_file_is_created_with_defaults() {
        let dir = tempdir().expect("tempdir");
        let config_path = dir.path().join("placement.toml");
        let config_arg = config_path.to_str().expect("utf-8 path");

        let invocation = resolve_args(&["-c", config_arg, "a.csv", "b.csv", "c.csv"])
            .unwrap()
            .expect("complete invocation");
        assert_eq!(invocation.config, Config::default());
        assert!(config_path.exists());
        assert_eq!(Config::load_from_file(config_arg).unwrap(), Config::default());
    }

    #[test]
    fn existing_config_file_is_loaded_then_overridden() {
        let dir = tempdir().expect("tempdir");
        let config_path = dir.path().join("placement.toml");
        std::fs::write(
            &config_path,
            "trials = 40\nseed = 3\nduplicate_names = \"reject\"\n",
        )
        .unwrap();
        let config_arg = config_path.to_str().expect("utf-8 path");

        let invocation = resolve_args(&["-c", config_arg, "--seed", "11", "a.csv", "b.csv", "c.csv"])
            .unwrap()
            .expect("complete invocation");
        assert_eq!(invocation.config.trials, 40);
        assert_eq!(invocation.config.seed, Some(11));
        assert_eq!(invocation.config.duplicate_names, DuplicatePolicy::Reject);
    }

    #[test]
    fn zero_trials_in_config_file_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let config_path = dir.path().join("placement.toml");
        std::fs::write(&config_path, "trials = 0\nduplicate_names = \"last_wins\"\n").unwrap();
        let config_arg = config_path.to_str().expect("utf-8 path");

        assert!(resolve_args(&["-c", config_arg, "a.csv", "b.csv", "c.csv"]).is_err());
    }
}
