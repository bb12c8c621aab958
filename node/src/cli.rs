use std::num::NonZeroUsize;
use std::time::Duration;

use lc_block_source::DEFAULT_ENDPOINT;
use lc_scan::config::{DEFAULT_PAUSE_AFTER, DEFAULT_WINDOW_SIZE};
use lc_scan::{DispatchConfig, FailurePolicy, PacingPolicy, ScanConfig};
use lp_block::ReceiverLeg;
use lp_utils::parsers::{parse_duration, parse_url};
use url::Url;

#[derive(Clone, Debug, clap::Parser)]
#[clap(
    name = "ledgerscan",
    version,
    about = "Scans the most recent blocks of an EVM chain and reports the addresses with the most extreme net movement"
)]
pub struct CliArgs {
    /// Access token of the RPC provider. It is appended to the endpoint as the last path segment.
    #[clap(env = "TOKEN", long, hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Base url of the JSON-RPC provider.
    #[clap(env = "LEDGERSCAN_ENDPOINT", long, value_parser = parse_url, default_value = DEFAULT_ENDPOINT, value_name = "URL")]
    pub endpoint: Url,

    /// Number of blocks to scan, counting backward from the tip.
    #[clap(env = "LEDGERSCAN_WINDOW_SIZE", long, default_value_t = DEFAULT_WINDOW_SIZE)]
    pub window_size: NonZeroUsize,

    /// Number of fetches to launch before the dispatch pause. Must be at least 1, use `--no-pacing` to launch
    /// every fetch at once.
    #[clap(long, default_value_t = DEFAULT_PAUSE_AFTER, value_name = "N")]
    pub pause_after: NonZeroUsize,

    /// Length of the dispatch pause.
    #[clap(long, value_parser = parse_duration, default_value = "1s")]
    pub pause: Duration,

    /// Launch every fetch without pausing.
    #[clap(long, conflicts_with_all = ["pause_after", "pause"])]
    pub no_pacing: bool,

    /// Maximum number of block fetches in flight. By default, the whole window is fetched at once.
    #[clap(env = "LEDGERSCAN_MAX_CONCURRENT_FETCHES", long, value_name = "N")]
    pub max_concurrent_fetches: Option<NonZeroUsize>,

    /// Give up on a block fetch after this long, eg. `10s` or `500ms`.
    #[clap(env = "LEDGERSCAN_FETCH_TIMEOUT", long, value_parser = parse_duration)]
    pub fetch_timeout: Option<Duration>,

    /// Leave blocks that could not be fetched out of the ranking instead of aborting the scan.
    #[clap(long)]
    pub skip_failed_blocks: bool,

    /// How the receiving side of a transfer is booked: `debit` subtracts the value from both parties,
    /// `credit` adds it to the receiver.
    #[clap(long, default_value_t = ReceiverLeg::Debit, value_name = "debit|credit")]
    pub receiver_leg: ReceiverLeg,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No access token provided, set the TOKEN environment variable or pass --token")]
    MissingToken,
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// Validated process configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Full RPC url, token included.
    pub endpoint: Url,
    pub scan: ScanConfig,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let token = args.token.as_deref().map(str::trim).filter(|token| !token.is_empty());
        let token = token.ok_or(ConfigError::MissingToken)?;
        let endpoint = lc_block_source::endpoint_with_token(&args.endpoint, token)?;

        let pacing = if args.no_pacing {
            PacingPolicy::disabled()
        } else {
            PacingPolicy::new(args.pause_after.get(), args.pause)
        };
        let failure_policy =
            if args.skip_failed_blocks { FailurePolicy::SkipFailedBlocks } else { FailurePolicy::FailFast };

        Ok(Self {
            endpoint,
            scan: ScanConfig {
                window_size: args.window_size,
                dispatch: DispatchConfig {
                    pacing,
                    max_concurrent_fetches: args.max_concurrent_fetches,
                    fetch_timeout: args.fetch_timeout,
                },
                failure_policy,
                receiver_leg: args.receiver_leg,
            },
        })
    }
}
