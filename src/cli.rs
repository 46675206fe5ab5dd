//! Command-line interface parsing for antenna
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the embed parameters, cache configuration and output mode for a lookup.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::{is_valid_namespace, CacheConfig, DEFAULT_NAMESPACE, DEFAULT_TTL_MINUTES};
use crate::data::EmbedParams;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A boolean flag got something other than true/false
    #[error("Invalid value for --{flag}: '{value}'. Expected true or false")]
    InvalidFlag { flag: &'static str, value: String },

    /// The cache namespace is not a single directory name
    #[error("Invalid cache namespace: '{0}'. Expected a single directory name")]
    InvalidNamespace(String),
}

/// antenna - YouTube and Vimeo embed code and metadata via oEmbed
#[derive(Parser, Debug)]
#[command(name = "antenna")]
#[command(about = "Fetch YouTube and Vimeo embed code and metadata via oEmbed, cached on disk")]
#[command(version)]
pub struct Cli {
    /// YouTube or Vimeo video URL
    pub url: String,

    /// Maximum embed width in pixels
    #[arg(long, value_name = "PIXELS")]
    pub max_width: Option<u32>,

    /// Maximum embed height in pixels
    #[arg(long, value_name = "PIXELS")]
    pub max_height: Option<u32>,

    /// Show the author byline on Vimeo embeds
    #[arg(long, value_name = "BOOL")]
    pub vimeo_byline: Option<String>,

    /// Show the video title on Vimeo embeds
    #[arg(long, value_name = "BOOL")]
    pub vimeo_title: Option<String>,

    /// Autoplay Vimeo embeds
    #[arg(long, value_name = "BOOL")]
    pub vimeo_autoplay: Option<String>,

    /// Print every template variable as name=value instead of just the embed code
    #[arg(long)]
    pub pair: bool,

    /// Print every template variable as a JSON object
    #[arg(long, conflicts_with = "pair")]
    pub json: bool,

    /// Cache base directory (defaults to the platform cache directory)
    #[arg(long, env = "ANTENNA_CACHE_DIR", value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Cache bucket name, created under the cache directory
    #[arg(long, env = "ANTENNA_CACHE_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub cache_namespace: String,

    /// Minutes before a cached response is refetched
    #[arg(long, env = "ANTENNA_CACHE_TTL", value_name = "MINUTES", default_value_t = DEFAULT_TTL_MINUTES)]
    pub cache_ttl: u64,

    /// Log cache and fetch activity to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// How the result set is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Embed HTML only
    #[default]
    Single,
    /// `name=value` line per template variable
    Pair,
    /// Template variables as a JSON object
    Json,
}

/// Everything a lookup needs, derived from CLI arguments
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub video_url: String,
    pub params: EmbedParams,
    pub cache: CacheConfig,
    pub output: OutputMode,
}

/// Parses a boolean flag value.
///
/// # Returns
/// * `Ok(bool)` for `true` or `false` (case-insensitive)
/// * `Err(CliError::InvalidFlag)` for anything else
pub fn parse_flag_arg(flag: &'static str, value: &str) -> Result<bool, CliError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(CliError::InvalidFlag {
            flag,
            value: value.to_string(),
        }),
    }
}

fn optional_flag(flag: &'static str, value: Option<&str>, default: bool) -> Result<bool, CliError> {
    value.map_or(Ok(default), |v| parse_flag_arg(flag, v))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if a flag value or the cache namespace is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let defaults = EmbedParams::default();
        let params = EmbedParams {
            max_width: cli.max_width.filter(|w| *w > 0),
            max_height: cli.max_height.filter(|h| *h > 0),
            vimeo_byline: optional_flag("vimeo-byline", cli.vimeo_byline.as_deref(), defaults.vimeo_byline)?,
            vimeo_title: optional_flag("vimeo-title", cli.vimeo_title.as_deref(), defaults.vimeo_title)?,
            vimeo_autoplay: optional_flag(
                "vimeo-autoplay",
                cli.vimeo_autoplay.as_deref(),
                defaults.vimeo_autoplay,
            )?,
        };

        if !is_valid_namespace(&cli.cache_namespace) {
            return Err(CliError::InvalidNamespace(cli.cache_namespace.clone()));
        }

        let cache = match &cli.cache_dir {
            Some(dir) => CacheConfig::new(dir),
            None => CacheConfig::default(),
        }
        .with_namespace(cli.cache_namespace.clone())
        .with_ttl_minutes(cli.cache_ttl);

        let output = if cli.json {
            OutputMode::Json
        } else if cli.pair {
            OutputMode::Pair
        } else {
            OutputMode::Single
        };

        Ok(StartupConfig {
            video_url: cli.url.clone(),
            params,
            cache,
            output,
        })
    }
}
