//! Issuer configuration and secret material.
//!
//! Both are JSON documents. Every configuration field has a default so a
//! file only needs the addresses; secrets are kept in a separate file so the
//! configuration can be shared.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use blockcert_primitives::ec::PrivateKey;
use blockcert_primitives::Network;
use blockcert_script::Address;
use blockcert_transaction::SighashScheme;

use crate::amount::{Amount, FeeSchedule};
use crate::IssuerError;

/// Base URLs of the external services.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpoints {
    /// Hosted wallet merchant API.
    pub merchant_url: String,
    /// Explorer serving `/unspent` queries.
    pub explorer_url: String,
    /// Insight API used for broadcasting.
    pub insight_url: String,
    /// Local node JSON-RPC endpoint.
    pub node_rpc_url: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        ServiceEndpoints {
            merchant_url: "http://localhost:3000".to_string(),
            explorer_url: "https://blockchain.info".to_string(),
            insight_url: "https://insight.bitpay.com/api".to_string(),
            node_rpc_url: "http://127.0.0.1:8332".to_string(),
        }
    }
}

/// Static issuer configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    pub network: Network,
    /// Address that funds and signs certificate transactions.
    pub issuing_address: String,
    /// Long-term storage address funding is drawn from.
    pub storage_address: String,
    /// Address that receives the revocation marker output.
    pub revocation_address: String,
    /// Dust floor, in display units.
    pub dust: Amount,
    /// Fee per transaction, in display units.
    pub tx_fee: Amount,
    /// Additional fee per recipient of a split transfer, in display units.
    pub per_recipient_fee: Amount,
    pub sighash: SighashScheme,
    pub poll_interval_secs: u64,
    /// Give up waiting for a confirmation after this long. Unbounded if unset.
    pub confirmation_timeout_secs: Option<u64>,
    /// `host:port` dialed to tell whether the machine is online.
    pub connectivity_probe: String,
    pub services: ServiceEndpoints,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        let fees = FeeSchedule::default();
        IssuerConfig {
            network: Network::Mainnet,
            issuing_address: String::new(),
            storage_address: String::new(),
            revocation_address: String::new(),
            dust: Amount::from_sat(fees.dust),
            tx_fee: Amount::from_sat(fees.fee),
            per_recipient_fee: Amount::from_sat(fees.per_recipient_fee),
            sighash: SighashScheme::Legacy,
            poll_interval_secs: 30,
            confirmation_timeout_secs: None,
            connectivity_probe: "8.8.8.8:53".to_string(),
            services: ServiceEndpoints::default(),
        }
    }
}

impl IssuerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, IssuerError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, IssuerError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule {
            dust: self.dust.to_sat(),
            fee: self.tx_fee.to_sat(),
            per_recipient_fee: self.per_recipient_fee.to_sat(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }

    /// Parse `address`, requiring it to be on the configured network.
    pub fn parse_address(&self, field: &str, address: &str) -> Result<Address, IssuerError> {
        if address.is_empty() {
            return Err(IssuerError::Config(format!("{} is not set", field)));
        }
        let parsed = Address::from_string(address)?;
        if parsed.network != self.network {
            return Err(IssuerError::Config(format!(
                "{} {} is a {} address, expected {}",
                field, address, parsed.network, self.network
            )));
        }
        Ok(parsed)
    }

    pub fn issuing(&self) -> Result<Address, IssuerError> {
        self.parse_address("issuing_address", &self.issuing_address)
    }

    pub fn revocation(&self) -> Result<Address, IssuerError> {
        self.parse_address("revocation_address", &self.revocation_address)
    }

    pub fn storage(&self) -> Result<Address, IssuerError> {
        self.parse_address("storage_address", &self.storage_address)
    }

    /// Check the fields every run needs.
    pub fn validate(&self) -> Result<(), IssuerError> {
        self.issuing()?;
        self.revocation()?;
        if self.dust.to_sat() == 0 {
            return Err(IssuerError::Config("dust must be positive".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(IssuerError::Config("poll_interval_secs must be positive".to_string()));
        }
        Ok(())
    }
}

/// Credentials and key material. Never logged.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Secrets {
    pub wallet_guid: String,
    pub wallet_password: String,
    pub api_key: String,
    pub node_rpc_user: String,
    pub node_rpc_password: String,
    /// File holding the issuing key in WIF.
    pub key_file: Option<PathBuf>,
    /// The issuing key in WIF, if not read from `key_file`.
    pub wif: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("Secrets")
            .field("wallet_guid", &self.wallet_guid)
            .field("wallet_password", &redact(&self.wallet_password))
            .field("api_key", &redact(&self.api_key))
            .field("node_rpc_user", &self.node_rpc_user)
            .field("node_rpc_password", &redact(&self.node_rpc_password))
            .field("key_file", &self.key_file)
            .field("wif", &self.wif.as_deref().map(redact))
            .finish()
    }
}

impl Secrets {
    pub fn from_json_file(path: &Path) -> Result<Self, IssuerError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load the issuing key and check that it controls `issuing`.
    ///
    /// The WIF's compression flag is overridden when the other encoding is
    /// the one that hashes to the issuing address.
    pub fn issuing_key(&self, issuing: &Address) -> Result<PrivateKey, IssuerError> {
        let wif = match (&self.wif, &self.key_file) {
            (Some(wif), _) => wif.clone(),
            (None, Some(path)) => fs::read_to_string(path)?,
            (None, None) => {
                return Err(IssuerError::Config(
                    "no issuing key: set wif or key_file".to_string(),
                ))
            }
        };
        controlling_key(PrivateKey::from_wif(wif.trim())?, issuing)
    }
}

/// Where the issuing key comes from.
///
/// The batch runner loads the key only when it is about to sign, after the
/// air-gap check has seen the machine go offline.
pub trait KeySource: Send + Sync {
    /// The key controlling `issuing`, or a `Config` error.
    fn load(&self, issuing: &Address) -> Result<PrivateKey, IssuerError>;
}

impl KeySource for Secrets {
    fn load(&self, issuing: &Address) -> Result<PrivateKey, IssuerError> {
        self.issuing_key(issuing)
    }
}

impl KeySource for PrivateKey {
    fn load(&self, issuing: &Address) -> Result<PrivateKey, IssuerError> {
        controlling_key(self.clone(), issuing)
    }
}

/// `key` in whichever encoding hashes to `issuing`.
fn controlling_key(key: PrivateKey, issuing: &Address) -> Result<PrivateKey, IssuerError> {
    if key.network() != issuing.network {
        return Err(IssuerError::Config(format!(
            "issuing key is for {}, address is {}",
            key.network(),
            issuing.network
        )));
    }
    let compressed = key.is_compressed();
    [compressed, !compressed]
        .into_iter()
        .map(|c| key.clone().with_compression(c))
        .find(|k| k.pub_key().hash160() == issuing.public_key_hash)
        .ok_or_else(|| {
            IssuerError::Config(format!(
                "issuing key does not control {}",
                issuing.address_string
            ))
        })
}
