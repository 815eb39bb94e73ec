//! CLI argument definitions using Clap

use clap::{Parser, Subcommand};

/// mp3-capture - record the microphone straight to MP3
#[derive(Parser, Debug)]
#[command(name = "mp3-capture")]
#[command(version)]
#[command(about = "Record the default microphone and write MP3 bytes to stdout")]
#[command(long_about = None)]
pub struct Cli {
    /// Stop automatically after this long (e.g., 90s, 10m, 1m30s)
    #[arg(short = 'm', long, value_name = "TIME")]
    pub max_duration: Option<String>,

    /// Reject recordings larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    pub max_size: Option<u64>,

    /// MP3 bitrate in kbps
    #[arg(short = 'b', long, value_name = "KBPS")]
    pub bitrate: Option<u32>,

    /// Output sample rate in Hz
    #[arg(short = 'r', long, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Encode on the async runtime instead of a dedicated thread
    #[arg(long)]
    pub inline_encoder: bool,

    /// Print recording metadata to stderr as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Config subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "max_duration",
    "max_size_bytes",
    "bitrate",
    "sample_rate",
    "encoder",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["mp3-capture"]);
        assert!(cli.max_duration.is_none());
        assert!(cli.max_size.is_none());
        assert!(cli.bitrate.is_none());
        assert!(cli.sample_rate.is_none());
        assert!(!cli.inline_encoder);
        assert!(!cli.json);
        assert!(!cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_parses_limits() {
        let cli = Cli::parse_from(["mp3-capture", "-m", "30s", "--max-size", "1048576"]);
        assert_eq!(cli.max_duration, Some("30s".to_string()));
        assert_eq!(cli.max_size, Some(1_048_576));
    }

    #[test]
    fn cli_parses_encoder_settings() {
        let cli = Cli::parse_from([
            "mp3-capture",
            "-b",
            "128",
            "-r",
            "22050",
            "--inline-encoder",
            "--json",
        ]);
        assert_eq!(cli.bitrate, Some(128));
        assert_eq!(cli.sample_rate, Some(22_050));
        assert!(cli.inline_encoder);
        assert!(cli.json);
    }

    #[test]
    fn cli_parses_config_init() {
        let cli = Cli::parse_from(["mp3-capture", "config", "init"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Init
            })
        ));
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["mp3-capture", "config", "set", "bitrate", "96"]);
        if let Some(Commands::Config {
            action: ConfigAction::Set { key, value },
        }) = cli.command
        {
            assert_eq!(key, "bitrate");
            assert_eq!(value, "96");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("bitrate"));
        assert!(is_valid_config_key("max_size_bytes"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
