mod common;

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use blockcert_issuer::committer::certificate_digest;
use blockcert_issuer::confirmation::{Clock, ManualClock};
use blockcert_issuer::verifier::embedded_digest;
use blockcert_issuer::{
    ArtifactStore, BatchRunner, CertificateState, FolderStore, IssuerConfig, IssuerError, Stage,
    Stages, VerificationCheck,
};

use common::*;

const COST: u64 = 15_500;

fn create_and_broadcast() -> Stages {
    Stages {
        transfer: false,
        create: true,
        broadcast: true,
        airgap_check: false,
    }
}

fn create_only() -> Stages {
    Stages {
        broadcast: false,
        ..create_and_broadcast()
    }
}

fn broadcast_only() -> Stages {
    Stages {
        create: false,
        ..create_and_broadcast()
    }
}

fn certificate_failure(err: &IssuerError) -> (String, Stage) {
    match err {
        IssuerError::Certificate { uid, stage, .. } => (uid.clone(), *stage),
        other => panic!("expected a certificate error, got {other}"),
    }
}

#[test]
fn test_three_certificates_issued_and_broadcast() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST, COST + 4_500, COST]));
    let store = store_with(3);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();

    let report = runner.run(create_and_broadcast()).unwrap();

    assert_eq!(report.count(CertificateState::Broadcast), 3);
    assert_eq!(report.broadcasts.len(), 3);
    assert!(report.funding.is_none());

    let submitted = ledger.submitted();
    assert_eq!(submitted.len(), 3);
    let inputs: HashSet<_> = submitted
        .iter()
        .map(|tx| tx.inputs[0].previous_output)
        .collect();
    assert_eq!(inputs.len(), 3, "every certificate spends its own input");

    // The largest output is taken first and is the only one with change.
    assert_eq!(submitted[0].outputs.len(), 4);
    assert_eq!(submitted[0].outputs[2].satoshis, 4_500);
    assert_eq!(submitted[1].outputs.len(), 3);
    assert_eq!(submitted[2].outputs.len(), 3);

    for (i, tx) in submitted.iter().enumerate() {
        let uid = format!("cert-{}", i);
        assert_eq!(tx.outputs[0].satoshis, 2_750);
        assert_eq!(tx.outputs[1].satoshis, 2_750);
        let signed = store.signed_certificate(&uid).unwrap();
        assert_eq!(embedded_digest(tx), Some(certificate_digest(&signed)));
        assert_eq!(store.digest(&uid).unwrap(), certificate_digest(&signed));
        assert!(store.unsigned_tx(&uid).is_some());
        assert_eq!(report.broadcasts[i].uid, uid);
        assert_eq!(store.sent()[&uid], report.broadcasts[i].txid);
    }

    let calls = ledger.calls();
    assert!(calls[0].starts_with("confirmed_balance "));
    assert!(calls[1].starts_with("list_unspent "));
    assert_eq!(calls.iter().filter(|c| c.starts_with("submit ")).count(), 3);

    let archives = store.archive_names();
    assert_eq!(archives.len(), 2);
    assert!(archives.iter().any(|a| a.starts_with("archive/certs/")));
    assert!(archives.iter().any(|a| a.starts_with("archive/txs/")));
}

#[test]
fn test_exact_funding_issues_without_change() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST, COST, COST]));
    let store = store_with(3);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();

    let report = runner.run(create_and_broadcast()).unwrap();

    let submitted = ledger.submitted();
    assert_eq!(submitted.len(), 3);
    let inputs: HashSet<_> = submitted
        .iter()
        .map(|tx| tx.inputs[0].previous_output)
        .collect();
    assert_eq!(inputs.len(), 3);

    for (i, tx) in submitted.iter().enumerate() {
        assert_eq!(tx.outputs.len(), 3, "no change output");
        let paid: u64 = tx.outputs.iter().map(|o| o.satoshis).sum();
        assert_eq!(paid + 10_000, COST);
        assert_eq!(tx.outputs[2].satoshis, 0);

        let record = &report.broadcasts[i];
        assert_eq!(record.uid, format!("cert-{}", i));
        assert_eq!(record.txid, tx.tx_id().to_string());
        assert_eq!(store.sent()[&record.uid], record.txid);
    }
    let txids: HashSet<_> = report.broadcasts.iter().map(|r| r.txid.clone()).collect();
    assert_eq!(txids.len(), 3);
    assert_eq!(report.count(CertificateState::Broadcast), 3);
}

#[test]
fn test_signed_certificates_carry_issuer_signature() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST]));
    let store = store_with(1);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();
    runner.run(create_only()).unwrap();

    let signed: serde_json::Value =
        serde_json::from_slice(&store.signed_certificate("cert-0").unwrap()).unwrap();
    let signature = signed["signature"].as_str().unwrap();
    assert!(blockcert_message::verify(&address_of(1), signature, b"claim-0").unwrap());
    assert_eq!(signed["badge"]["name"], "Certificate of Accomplishment");
    assert!(ledger.submitted().is_empty());
    assert_eq!(runner.report().count(CertificateState::Verified), 1);
}

#[test]
fn test_broadcast_only_run_sends_earlier_transactions() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST, COST]));
    let store = store_with(2);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();

    runner.run(create_only()).unwrap();
    assert!(ledger.submitted().is_empty());

    // Sending needs no key, so one that controls nothing is never touched.
    let mut sender = BatchRunner::new(config(), key(7), &ledger, &store, &probe).unwrap();
    let report = sender.run(broadcast_only()).unwrap();
    assert_eq!(report.count(CertificateState::Broadcast), 2);
    assert_eq!(ledger.submitted().len(), 2);
    assert_eq!(store.sent().len(), 2);
}

#[test]
fn test_altered_certificate_fails_commitment_check() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST, COST]));
    let store = store_with(2);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();
    runner.run(create_only()).unwrap();

    let signed = String::from_utf8(store.signed_certificate("cert-0").unwrap()).unwrap();
    store
        .tamper_signed_certificate("cert-0", signed.replace("Ada", "Eve").as_bytes())
        .unwrap();

    let err = runner.run(broadcast_only()).unwrap_err();
    assert_eq!(certificate_failure(&err), ("cert-0".to_string(), Stage::Verify));
    assert!(matches!(
        err.root(),
        IssuerError::Verification { check: VerificationCheck::Commitment, .. }
    ));
    assert_eq!(runner.report().state("cert-0"), Some(CertificateState::Failed));
    assert!(ledger.submitted().is_empty(), "nothing is broadcast after a failure");
}

#[test]
fn test_altered_claim_fails_signature_check() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST]));
    let store = store_with(1);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();
    runner.run(create_only()).unwrap();

    let signed = String::from_utf8(store.signed_certificate("cert-0").unwrap()).unwrap();
    store
        .tamper_signed_certificate("cert-0", signed.replace("claim-0", "claim-9").as_bytes())
        .unwrap();

    let err = runner.run(broadcast_only()).unwrap_err();
    assert!(matches!(
        err.root(),
        IssuerError::Verification { check: VerificationCheck::Signature, .. }
    ));
}

#[test]
fn test_running_out_of_inputs() {
    // Enough value in total, but only two outputs for three certificates.
    let ledger = MockLedger::remote(issuing_outputs(&[40_000, COST]));
    let store = store_with(3);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();

    let err = runner.run(create_and_broadcast()).unwrap_err();
    assert_eq!(certificate_failure(&err), ("cert-2".to_string(), Stage::Build));
    assert!(matches!(err.root(), IssuerError::NoAvailableInput));

    let report = runner.report();
    assert_eq!(report.state("cert-0"), Some(CertificateState::Verified));
    assert_eq!(report.state("cert-1"), Some(CertificateState::Verified));
    assert_eq!(report.state("cert-2"), Some(CertificateState::Failed));
    assert!(ledger.submitted().is_empty());
}

#[test]
fn test_issuing_balance_too_low_without_transfer() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST, COST]));
    let store = store_with(3);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();

    let err = runner.run(create_and_broadcast()).unwrap_err();
    match err {
        IssuerError::InsufficientFunds {
            required,
            available,
        } => {
            assert_eq!(required, 3 * COST);
            assert_eq!(available, 2 * COST);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!ledger.calls().iter().any(|c| c.starts_with("list_unspent")));
}

#[test]
fn test_input_below_cost_is_rejected() {
    let ledger = MockLedger::remote(issuing_outputs(&[100_000, COST - 1]));
    let store = store_with(2);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();

    let err = runner.run(create_and_broadcast()).unwrap_err();
    assert_eq!(certificate_failure(&err), ("cert-1".to_string(), Stage::Build));
    assert!(matches!(
        err.root(),
        IssuerError::InsufficientFunds { required: COST, available } if *available == COST - 1
    ));
    assert!(store.unsigned_tx("cert-1").is_none());
}

fn airgap_config(timeout_secs: Option<u64>) -> IssuerConfig {
    IssuerConfig {
        confirmation_timeout_secs: timeout_secs,
        ..config()
    }
}

#[test]
fn test_air_gap_waits_for_operator() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST]));
    let store = store_with(1);
    // The operator disconnects one poll late and reconnects one poll late.
    let probe = ScriptedProbe::new(&[true, true, false, false, true]);
    let (keys, loads) = WatchedKeys::new(issuer_key(), &probe);
    let clock = Arc::new(ManualClock::new());
    let mut runner = BatchRunner::new(airgap_config(None), keys, &ledger, &store, &probe)
        .unwrap()
        .with_clock(clock.clone());

    let report = runner
        .run(Stages {
            airgap_check: true,
            ..create_and_broadcast()
        })
        .unwrap();

    assert_eq!(report.count(CertificateState::Broadcast), 1);
    assert_eq!(probe.given(), vec![true, true, false, false, true]);
    assert_eq!(*loads.lock().unwrap(), vec![Some(false)], "key loaded once, offline");
    assert_eq!(clock.now(), Duration::from_secs(60));
}

#[test]
fn test_air_gap_times_out_while_online() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST]));
    let store = store_with(1);
    let probe = ScriptedProbe::online();
    let (keys, loads) = WatchedKeys::new(issuer_key(), &probe);
    let clock = Arc::new(ManualClock::new());
    let mut runner = BatchRunner::new(airgap_config(Some(120)), keys, &ledger, &store, &probe)
        .unwrap()
        .with_clock(clock.clone());

    let err = runner
        .run(Stages {
            airgap_check: true,
            ..create_and_broadcast()
        })
        .unwrap_err();
    assert!(matches!(err, IssuerError::AirGap { expected_online: false }));
    assert!(loads.lock().unwrap().is_empty(), "key never loaded while online");
    assert_eq!(clock.now(), Duration::from_secs(120));
    assert_eq!(runner.report().state("cert-0"), Some(CertificateState::Unsigned));
    assert!(store.signed_certificate("cert-0").is_err());
}

#[test]
fn test_funding_waits_for_network() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST]));
    let store = store_with(1);
    let probe = ScriptedProbe::new(&[false, false, true, true, false, true]);
    let (keys, loads) = WatchedKeys::new(issuer_key(), &probe);
    let clock = Arc::new(ManualClock::new());
    let mut runner = BatchRunner::new(airgap_config(None), keys, &ledger, &store, &probe)
        .unwrap()
        .with_clock(clock)
        .with_api_key("api-key");

    let report = runner.run(Stages::default()).unwrap();
    assert!(report.funding.is_some());
    assert_eq!(report.count(CertificateState::Broadcast), 1);
    assert_eq!(*loads.lock().unwrap(), vec![Some(false)]);
}

#[test]
fn test_cancellation_stops_before_next_certificate() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST, COST]));
    let store = store_with(2);
    let probe = ScriptedProbe::online();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe)
        .unwrap()
        .with_cancellation(cancel);

    let err = runner.run(create_and_broadcast()).unwrap_err();
    assert!(matches!(err, IssuerError::Cancelled));
    assert!(ledger.submitted().is_empty());
    assert_eq!(runner.report().count(CertificateState::Unsigned), 2);
}

#[test]
fn test_broadcast_rejection_halts_batch() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST, COST, COST])).rejecting_submission(1);
    let store = store_with(3);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();

    let err = runner.run(create_and_broadcast()).unwrap_err();
    assert_eq!(certificate_failure(&err), ("cert-1".to_string(), Stage::Broadcast));

    let report = runner.report();
    assert_eq!(report.state("cert-0"), Some(CertificateState::Broadcast));
    assert_eq!(report.state("cert-1"), Some(CertificateState::Failed));
    assert_eq!(report.state("cert-2"), Some(CertificateState::Verified));
    assert_eq!(ledger.submitted().len(), 1);
    assert_eq!(store.sent().len(), 1);
    assert!(!store.archive_names().iter().any(|a| a.starts_with("archive/txs/")));
}

#[test]
fn test_collaborator_failure_is_not_retried() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST])).failing("list_unspent");
    let store = store_with(1);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();

    let err = runner.run(create_and_broadcast()).unwrap_err();
    assert!(matches!(err, IssuerError::Collaborator { .. }));
    let queries = ledger
        .calls()
        .iter()
        .filter(|c| c.starts_with("list_unspent"))
        .count();
    assert_eq!(queries, 1);
}

#[test]
fn test_local_node_cannot_transfer() {
    let ledger = MockLedger::local(issuing_outputs(&[COST]));
    let store = store_with(1);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();

    let err = runner
        .run(Stages {
            transfer: true,
            ..create_and_broadcast()
        })
        .unwrap_err();
    assert!(matches!(err, IssuerError::Config(_)));
}

#[test]
fn test_transfer_then_issue() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST, COST]));
    let store = store_with(2);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe)
        .unwrap()
        .with_api_key("api-key");

    let report = runner
        .run(Stages {
            transfer: true,
            ..create_and_broadcast()
        })
        .unwrap();

    let funding = report.funding.clone().unwrap();
    assert_eq!(funding.temporary_addresses.len(), 2);
    assert_eq!(funding.forwarded, 2 * COST);
    assert_eq!(ledger.calls()[0], "login api-key");
    assert_eq!(report.count(CertificateState::Broadcast), 2);
}

#[test]
fn test_key_must_control_issuing_address() {
    let ledger = MockLedger::remote(issuing_outputs(&[COST]));
    let store = store_with(1);
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), key(7), &ledger, &store, &probe).unwrap();

    let err = runner.run(create_and_broadcast()).unwrap_err();
    assert!(matches!(err, IssuerError::Config(_)));
    assert!(store.signed_certificate("cert-0").is_err());
    assert!(ledger.submitted().is_empty());
}

#[test]
fn test_folder_store_batch() {
    let dir = tempfile::tempdir().unwrap();
    let store = FolderStore::open(dir.path()).unwrap();
    for i in 0..2u8 {
        fs::write(
            dir.path().join("unsigned_certs").join(format!("cert-{}.json", i)),
            certificate_json(20 + i, &format!("claim-{}", i)),
        )
        .unwrap();
    }
    // Left over from an earlier run; cleared before creating.
    fs::write(dir.path().join("sent_txs").join("stale.txt"), "old").unwrap();

    let ledger = MockLedger::remote(issuing_outputs(&[COST, COST]));
    let probe = ScriptedProbe::online();
    let mut runner = BatchRunner::new(config(), issuer_key(), &ledger, &store, &probe).unwrap();
    let report = runner.run(create_and_broadcast()).unwrap();

    for record in &report.broadcasts {
        let sent = fs::read_to_string(
            dir.path().join("sent_txs").join(format!("{}.txt", record.uid)),
        )
        .unwrap();
        assert_eq!(sent, record.txid);
        let digest = fs::read(dir.path().join("hashed_certs").join(format!("{}.txt", record.uid)))
            .unwrap();
        assert_eq!(digest.len(), 32);
        assert!(dir
            .path()
            .join("archive/certs")
            .join(&report.timestamp)
            .join(format!("{}.json", record.uid))
            .is_file());
    }
    assert!(!dir.path().join("sent_txs").join("stale.txt").exists());
    assert_eq!(store.signed_tx_uids().unwrap(), vec!["cert-0", "cert-1"]);
}
