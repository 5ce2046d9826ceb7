//! Server command line and configuration file loading.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use hls_translate_lib::TranslateConfig;

/// Live HLS translation server configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "hls-translate-server")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to bind the control plane and stream server to.
    #[arg(short = 'b', long, default_value = "127.0.0.1:3001")]
    pub bind: SocketAddr,

    /// Translation root directory (chunks/, audios/, stream/ live here).
    #[arg(short = 'r', long, default_value = ".")]
    pub root: PathBuf,

    /// Pipeline configuration file (TOML).
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Load the pipeline configuration, falling back to defaults when no
    /// file is given or the file cannot be read.
    pub fn load_translate_config(&self) -> TranslateConfig {
        let Some(path) = &self.config else {
            return TranslateConfig::default();
        };
        match std::fs::read_to_string(path) {
            Ok(text) => match toml::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    TranslateConfig::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                TranslateConfig::default()
            }
        }
    }
}
