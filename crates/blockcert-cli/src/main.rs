//! # blockcert
//!
//! Entry point for the `blockcert` binary. Loads the configuration and
//! secrets, picks the ledger backend and runs one issuance batch on a
//! blocking thread while Ctrl-C cancels it between certificates. The issuing
//! key file is only read by the batch itself, once the machine is offline.

mod cli;
mod logging;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use blockcert_issuer::airgap::TcpProbe;
use blockcert_issuer::{
    BatchReport, BatchRunner, CertificateState, FolderStore, IssuerConfig, LedgerBackend,
    Secrets,
};
use blockcert_services::{
    ExplorerConfig, InsightConfig, LocalNodeBackend, MerchantConfig, NodeRpcConfig,
    RemoteBackend,
};

use cli::BlockcertCli;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = BlockcertCli::parse();
    logging::init_logging(
        "blockcert=info,blockcert_issuer=info,blockcert_services=info",
        cli.log_format,
    );

    let config = match &cli.config {
        Some(path) => IssuerConfig::from_json_file(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?,
        None => IssuerConfig::default(),
    };
    config.validate().context("invalid configuration")?;

    let mut secrets = match &cli.secrets {
        Some(path) => Secrets::from_json_file(path)
            .with_context(|| format!("failed to read secrets {}", path.display()))?,
        None => Secrets::default(),
    };
    cli.apply_secrets(&mut secrets);

    let issuing = config.issuing()?;

    let store = FolderStore::open(&cli.data_dir)
        .with_context(|| format!("failed to open data directory {}", cli.data_dir.display()))?;
    let backend = build_backend(&cli, &config, &secrets);
    let stages = cli.stages();

    tracing::info!(
        issuing = %issuing,
        network = %config.network,
        backend = %backend.kind(),
        data_dir = %cli.data_dir.display(),
        "starting blockcert"
    );

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current certificate");
            watcher.cancel();
        }
    });

    let api_key = secrets.api_key.clone();
    let report = tokio::task::spawn_blocking(move || -> Result<BatchReport> {
        let probe = TcpProbe::new(config.connectivity_probe.clone(), PROBE_TIMEOUT);
        let mut runner = BatchRunner::new(config, secrets, backend.as_ref(), &store, &probe)?
            .with_api_key(api_key)
            .with_cancellation(cancel);
        match runner.run(stages) {
            Ok(report) => Ok(report),
            Err(e) => {
                log_states(runner.report());
                Err(e.into())
            }
        }
    })
    .await
    .context("batch task failed")??;

    for record in &report.broadcasts {
        println!("{}\t{}", record.uid, record.txid);
    }
    tracing::info!(
        broadcast = report.count(CertificateState::Broadcast),
        verified = report.count(CertificateState::Verified),
        "done"
    );
    Ok(())
}

fn build_backend(
    cli: &BlockcertCli,
    config: &IssuerConfig,
    secrets: &Secrets,
) -> Box<dyn LedgerBackend> {
    let services = &config.services;
    if cli.use_remote() {
        Box::new(RemoteBackend::new(
            MerchantConfig {
                base_url: services.merchant_url.clone(),
                wallet_guid: secrets.wallet_guid.clone(),
                password: secrets.wallet_password.clone(),
            },
            ExplorerConfig {
                base_url: services.explorer_url.clone(),
            },
            InsightConfig {
                base_url: services.insight_url.clone(),
            },
        ))
    } else {
        Box::new(LocalNodeBackend::new(NodeRpcConfig {
            url: services.node_rpc_url.clone(),
            user: secrets.node_rpc_user.clone(),
            password: secrets.node_rpc_password.clone(),
        }))
    }
}

fn log_states(report: &BatchReport) {
    for (uid, state) in &report.states {
        tracing::info!(uid = %uid, state = %state, "certificate state at failure");
    }
}
