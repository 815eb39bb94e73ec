//! File-backed configuration

pub mod app_config;

pub use app_config::{
    validate_bitrate, validate_sample_rate, AppConfig, EncoderPreference, SUPPORTED_BITRATES,
    SUPPORTED_SAMPLE_RATES,
};
