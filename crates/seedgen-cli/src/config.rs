use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use seedgen::{
    DEFAULT_BATCH_SIZE, DEFAULT_FILE_PREFIX, FlushPolicy, JobDescriptor, JobSource, Network,
    RecordFormat, Standard, Strength,
    pipeline::{
        DEFAULT_JOBS_PER_REQUEST, DEFAULT_RESULT_BUFFER_SIZE, DEFAULT_WORK_REQUEST_BUFFER_SIZE,
        PipelineConfig, default_worker_count,
    },
    sink_path,
};
use std::{path::PathBuf, time::Duration};

/// Command-line interface of the `seedgen` binary.
///
/// Every option of `run` can also be supplied through the environment
/// variable named in its help text; a `.env` file in the working directory
/// is loaded first.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "seedgen",
    version,
    about = "Parallel BIP-39 seed phrase generator with batched persistence"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate continuously until interrupted (Ctrl+C or SIGTERM).
    Run(RunArgs),
    /// Generate a single seed phrase and show its addresses.
    Once(OnceArgs),
    /// Print or export the English BIP-39 word list.
    Wordlist(WordlistArgs),
}

/// Where and how artifacts are appended.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Directory that receives the output file.
    ///
    /// Environment variable: `OUTPUT_DIR`
    #[arg(long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Output file name prefix. The file is `<prefix>_<words>words.txt`.
    ///
    /// Environment variable: `FILE_PREFIX`
    #[arg(long, env = "FILE_PREFIX", default_value = DEFAULT_FILE_PREFIX)]
    pub file_prefix: String,

    /// Record layout: `plain` (phrase only), `tsv` or `json` (one object per
    /// line).
    ///
    /// Environment variable: `RECORD_FORMAT`
    #[arg(long, env = "RECORD_FORMAT", default_value_t = RecordFormat::Plain)]
    pub record_format: RecordFormat,

    /// Do not persist anything.
    ///
    /// Environment variable: `NO_SAVE`
    #[arg(long, env = "NO_SAVE", default_value_t = false)]
    pub no_save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Words per phrase: 12 (128-bit) or 24 (256-bit).
    ///
    /// Environment variable: `WORDS`
    #[arg(long, env = "WORDS", default_value_t = 12)]
    pub words: usize,

    /// `bip39` for bare phrases, `bip44` to also derive an address. BIP-44
    /// jobs cycle through `--networks` in round-robin order.
    ///
    /// Environment variable: `STANDARD`
    #[arg(long, env = "STANDARD", default_value_t = Standard::Bip39)]
    pub standard: Standard,

    /// Comma separated network tags for BIP-44 jobs (BTC, ETH, LTC, DOGE).
    ///
    /// Environment variable: `NETWORKS`
    #[arg(long, env = "NETWORKS", value_delimiter = ',', default_value = "BTC")]
    pub networks: Vec<Network>,

    /// Number of worker threads. Defaults to the CPU count minus
    /// `--reserve-cores`.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS")]
    pub num_workers: Option<usize>,

    /// CPUs left free when `--num-workers` is not given.
    ///
    /// Environment variable: `RESERVE_CORES`
    #[arg(long, env = "RESERVE_CORES", default_value_t = 0)]
    pub reserve_cores: usize,

    /// Flush once this many phrases are buffered.
    ///
    /// Environment variable: `BATCH_SIZE`
    #[arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Flush a non-empty buffer at least this often, in seconds. `0`
    /// disables the time trigger.
    ///
    /// Environment variable: `FLUSH_INTERVAL_SECS`
    #[arg(long, env = "FLUSH_INTERVAL_SECS", default_value_t = 3.0)]
    pub flush_interval_secs: f64,

    /// Progress line refresh period, in milliseconds.
    ///
    /// Environment variable: `REPORT_INTERVAL_MS`
    #[arg(long, env = "REPORT_INTERVAL_MS", default_value_t = 500)]
    pub report_interval_ms: u64,

    /// Jobs sent to a worker per request.
    ///
    /// Environment variable: `JOBS_PER_REQUEST`
    #[arg(long, env = "JOBS_PER_REQUEST", default_value_t = DEFAULT_JOBS_PER_REQUEST)]
    pub jobs_per_request: usize,

    /// Requests each worker may have queued.
    ///
    /// Environment variable: `WORK_REQUEST_BUFFER_SIZE`
    #[arg(long, env = "WORK_REQUEST_BUFFER_SIZE", default_value_t = DEFAULT_WORK_REQUEST_BUFFER_SIZE)]
    pub work_request_buffer_size: usize,

    /// Results that may wait for the coordinator.
    ///
    /// Environment variable: `RESULT_BUFFER_SIZE`
    #[arg(long, env = "RESULT_BUFFER_SIZE", default_value_t = DEFAULT_RESULT_BUFFER_SIZE)]
    pub result_buffer_size: usize,

    /// How long to wait for each worker to stop, in seconds.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_SECS`
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = 3)]
    pub shutdown_timeout_secs: u64,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct OnceArgs {
    /// Words per phrase: 12 or 24.
    #[arg(long, env = "WORDS", default_value_t = 12)]
    pub words: usize,

    /// Networks to show addresses for.
    #[arg(long, env = "NETWORKS", value_delimiter = ',', default_value = "BTC,ETH")]
    pub networks: Vec<Network>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone)]
pub struct WordlistArgs {
    /// Print the numbered word list.
    #[arg(long)]
    pub show: bool,

    /// Write `bip39_wordlist.txt` and `bip39_wordlist.json`.
    #[arg(long)]
    pub save: bool,

    /// Directory for `--save`.
    #[arg(long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,
}

/// Where a run persists to. `None` means persistence is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub path: Option<PathBuf>,
    pub format: RecordFormat,
}

impl SinkConfig {
    fn from_output(output: OutputArgs, strength: Strength) -> Self {
        let path = (!output.no_save)
            .then(|| sink_path(&output.output_dir, &output.file_prefix, strength));
        Self {
            path,
            format: output.record_format,
        }
    }
}

/// Validated settings of the `run` command.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub strength: Strength,
    pub jobs: JobSource,
    pub pipeline: PipelineConfig,
    pub sink: SinkConfig,
}

impl TryFrom<RunArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: RunArgs) -> Result<Self, Self::Error> {
        let strength = Strength::from_word_count(args.words)?;

        let jobs = match args.standard {
            Standard::Bip39 => JobSource::fixed(JobDescriptor::baseline(strength)),
            Standard::Bip44 => {
                if args.networks.is_empty() {
                    bail!("NETWORKS must name at least one network for BIP44");
                }
                JobSource::round_robin(
                    unique(args.networks)
                        .into_iter()
                        .map(|n| JobDescriptor::bip44(strength, n))
                        .collect(),
                )?
            }
        };

        let num_workers = args
            .num_workers
            .unwrap_or_else(|| default_worker_count(args.reserve_cores));
        if num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }
        if args.batch_size == 0 {
            bail!("BATCH_SIZE must be greater than 0");
        }

        let max_age = if args.flush_interval_secs == 0.0 {
            None
        } else {
            Some(
                Duration::try_from_secs_f64(args.flush_interval_secs)
                    .context("FLUSH_INTERVAL_SECS must be a non-negative number of seconds")?,
            )
        };

        let pipeline = PipelineConfig {
            num_workers,
            jobs_per_request: args.jobs_per_request,
            work_request_buffer_size: args.work_request_buffer_size,
            result_buffer_size: args.result_buffer_size,
            flush: FlushPolicy {
                max_batch: Some(args.batch_size),
                max_age,
            },
            report_interval: Duration::from_millis(args.report_interval_ms),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
        };
        pipeline.validate()?;

        Ok(Self {
            strength,
            jobs,
            pipeline,
            sink: SinkConfig::from_output(args.output, strength),
        })
    }
}

/// Validated settings of the `once` command.
#[derive(Debug, Clone)]
pub struct OnceConfig {
    pub strength: Strength,
    pub networks: Vec<Network>,
    pub sink: SinkConfig,
}

impl TryFrom<OnceArgs> for OnceConfig {
    type Error = anyhow::Error;

    fn try_from(args: OnceArgs) -> Result<Self, Self::Error> {
        let strength = Strength::from_word_count(args.words)?;
        Ok(Self {
            strength,
            networks: unique(args.networks),
            sink: SinkConfig::from_output(args.output, strength),
        })
    }
}

/// Drops repeated networks, keeping first-seen order.
fn unique(networks: Vec<Network>) -> Vec<Network> {
    let mut seen = Vec::with_capacity(networks.len());
    for network in networks {
        if !seen.contains(&network) {
            seen.push(network);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Command {
        CliArgs::try_parse_from(["seedgen"].iter().chain(args))
            .unwrap()
            .command
    }

    fn run_config(args: &[&str]) -> anyhow::Result<RunConfig> {
        let mut full = vec!["run", "--num-workers", "2"];
        full.extend_from_slice(args);
        match parse(&full) {
            Command::Run(run) => RunConfig::try_from(run),
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn defaults_match_the_library() {
        let config = run_config(&[]).unwrap();
        assert_eq!(config.strength, Strength::Bits128);
        assert_eq!(config.pipeline.flush, FlushPolicy::default());
        assert_eq!(config.pipeline.report_interval, Duration::from_millis(500));
        assert_eq!(config.pipeline.jobs_per_request, 250);
        assert_eq!(
            config.sink.path,
            Some(PathBuf::from("./seed_phrases_12words.txt"))
        );
        assert_eq!(config.jobs.cycle_len(), 1);
    }

    #[test]
    fn bip44_cycles_through_networks() {
        let mut config =
            run_config(&["--words", "24", "--standard", "bip44", "--networks", "BTC,eth"]).unwrap();
        assert_eq!(config.jobs.cycle_len(), 2);
        let first = config.jobs.next().unwrap();
        assert_eq!(first, JobDescriptor::bip44(Strength::Bits256, Network::Bitcoin));
        assert_eq!(config.jobs.next().unwrap().network, Some(Network::Ethereum));
    }

    #[test]
    fn repeated_networks_are_collapsed() {
        let config = run_config(&["--standard", "bip44", "--networks", "ETH,BTC,ETH"]).unwrap();
        assert_eq!(config.jobs.cycle_len(), 2);
    }

    #[test]
    fn zero_flush_interval_disables_the_time_trigger() {
        let config = run_config(&["--flush-interval-secs", "0"]).unwrap();
        assert_eq!(config.pipeline.flush.max_age, None);
    }

    #[test]
    fn no_save_disables_the_sink() {
        let config = run_config(&["--no-save"]).unwrap();
        assert_eq!(config.sink.path, None);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(run_config(&["--words", "18"]).is_err());
        assert!(run_config(&["--batch-size", "0"]).is_err());
        assert!(run_config(&["--jobs-per-request", "0"]).is_err());
        assert!(run_config(&["--flush-interval-secs=-1"]).is_err());
        assert!(CliArgs::try_parse_from(["seedgen", "run", "--networks", "XRP"]).is_err());
    }

    #[test]
    fn once_defaults_to_btc_and_eth() {
        let Command::Once(args) = parse(&["once", "--no-save"]) else {
            panic!("expected once");
        };
        let config = OnceConfig::try_from(args).unwrap();
        assert_eq!(config.networks, vec![Network::Bitcoin, Network::Ethereum]);
        assert_eq!(config.sink.path, None);
    }
}
