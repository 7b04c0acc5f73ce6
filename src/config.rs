use std::net::SocketAddr;

use anyhow::Context as _;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// On-disk representation of the configuration, loaded with `serde_json`.
///
/// Field names are intentionally close to the recognized option set: a
/// reviewer comparing this file against the wire contract should be able to
/// do so without a mental renaming pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfFile {
    pub listener_url: String,
    pub target_host: String,
    pub target_port: u16,
    pub certificate_file_name: Utf8PathBuf,
    pub private_key_file_name: Utf8PathBuf,
    #[serde(default)]
    pub record_host: Option<String>,
    #[serde(default)]
    pub record_port: Option<u16>,
    #[serde(default = "default_log_file")]
    pub log_file: Utf8PathBuf,
    #[serde(default)]
    pub out_dir: Option<Utf8PathBuf>,
}

fn default_log_file() -> Utf8PathBuf {
    Utf8PathBuf::from("rdp-mitm.log")
}

/// Runtime configuration. Unlike `ConfFile`, addresses are pre-resolved and
/// paths are validated to exist.
#[derive(Debug, Clone)]
pub struct Conf {
    pub listener_url: String,
    pub target_host: String,
    pub target_port: u16,
    pub certificate_file_name: Utf8PathBuf,
    pub private_key_file_name: Utf8PathBuf,
    pub record_addr: Option<SocketAddr>,
    pub log_file: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,
}

impl Conf {
    pub fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
        let file: ConfFile = serde_json::from_str(&raw).context("failed to parse configuration")?;
        Self::from_file(file)
    }

    pub fn from_file(file: ConfFile) -> anyhow::Result<Self> {
        let record_addr = match (file.record_host, file.record_port) {
            (Some(host), Some(port)) => Some(
                format!("{host}:{port}")
                    .parse::<SocketAddr>()
                    .context("invalid recordHost/recordPort")?,
            ),
            _ => None,
        };

        anyhow::ensure!(
            file.certificate_file_name.exists(),
            "certificate file not found: {}",
            file.certificate_file_name
        );
        anyhow::ensure!(
            file.private_key_file_name.exists(),
            "private key file not found: {}",
            file.private_key_file_name
        );

        Ok(Self {
            listener_url: file.listener_url,
            target_host: file.target_host,
            target_port: file.target_port,
            certificate_file_name: file.certificate_file_name,
            private_key_file_name: file.private_key_file_name,
            record_addr,
            log_file: file.log_file,
            out_dir: file.out_dir.unwrap_or_else(|| Utf8PathBuf::from("out")),
        })
    }
}

/// CLI surface, overriding the config file path only — everything else is
/// recognized exclusively through the configuration file.
#[derive(Debug, clap::Parser)]
#[command(name = "rdp-mitm", about = "Man-in-the-middle interception engine for RDP")]
pub struct Cli {
    #[arg(long, default_value = "rdp-mitm.json")]
    pub config: Utf8PathBuf,
}
