//! # CLI Interface
//!
//! Stage switches keep the `0|1` form operators already script against.

use std::path::PathBuf;

use clap::Parser;

use blockcert_issuer::{Secrets, Stages};

use crate::logging::LogFormat;

/// Anchor a batch of certificates in the ledger.
///
/// Reads `unsigned_certs/*.json` under the data directory, funds the issuing
/// address, signs and commits each certificate in its own transaction and
/// broadcasts the results.
#[derive(Parser, Debug)]
#[command(name = "blockcert", version)]
pub struct BlockcertCli {
    /// Use the hosted services (1) or a local node over JSON-RPC (0).
    /// A local node cannot fund, so 0 also disables --transfer.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub remote: u8,

    /// Fund the issuing address from the storage address.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub transfer: u8,

    /// Sign certificates and create their transactions.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub create: u8,

    /// Broadcast the signed transactions.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub broadcast: u8,

    /// Require the network to be off while the issuing key is in use.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub wificheck: u8,

    /// Issuer configuration (JSON). Defaults apply when omitted.
    #[arg(long, short = 'c', env = "BLOCKCERT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Secrets file (JSON). Individual values can also come from the
    /// environment.
    #[arg(long, env = "BLOCKCERT_SECRETS")]
    pub secrets: Option<PathBuf>,

    /// Directory holding the certificate and transaction folders.
    #[arg(long, short = 'd', env = "BLOCKCERT_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Hosted wallet identifier.
    #[arg(long, env = "BLOCKCERT_WALLET_GUID", hide_env_values = true)]
    pub wallet_guid: Option<String>,

    /// Hosted wallet password.
    #[arg(long, env = "BLOCKCERT_WALLET_PASSWORD", hide_env_values = true)]
    pub wallet_password: Option<String>,

    /// API key for the hosted wallet.
    #[arg(long, env = "BLOCKCERT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Local node RPC credentials.
    #[arg(long, env = "BLOCKCERT_NODE_RPC_USER", hide_env_values = true)]
    pub node_rpc_user: Option<String>,

    #[arg(long, env = "BLOCKCERT_NODE_RPC_PASSWORD", hide_env_values = true)]
    pub node_rpc_password: Option<String>,

    /// File holding the issuing key in WIF.
    #[arg(long, env = "BLOCKCERT_KEY_FILE")]
    pub key_file: Option<PathBuf>,
}

impl BlockcertCli {
    pub fn use_remote(&self) -> bool {
        self.remote == 1
    }

    /// The enabled stages. Transfer is off whenever the local node is used.
    pub fn stages(&self) -> Stages {
        Stages {
            transfer: self.transfer == 1 && self.use_remote(),
            create: self.create == 1,
            broadcast: self.broadcast == 1,
            airgap_check: self.wificheck == 1,
        }
    }

    /// Overlay the values given on the command line or in the environment.
    pub fn apply_secrets(&self, secrets: &mut Secrets) {
        let overrides = [
            (&self.wallet_guid, &mut secrets.wallet_guid),
            (&self.wallet_password, &mut secrets.wallet_password),
            (&self.api_key, &mut secrets.api_key),
            (&self.node_rpc_user, &mut secrets.node_rpc_user),
            (&self.node_rpc_password, &mut secrets.node_rpc_password),
        ];
        for (given, target) in overrides {
            if let Some(value) = given {
                *target = value.clone();
            }
        }
        if let Some(path) = &self.key_file {
            secrets.key_file = Some(path.clone());
            secrets.wif = None;
        }
    }
}
