//! Persisted artifacts of a batch.
//!
//! [`FolderStore`] keeps the on-disk layout operators already know:
//!
//! ```text
//! unsigned_certs/<uid>.json       input certificates
//! signed_certs/<uid>.json         signed certificates (canonical JSON)
//! hashed_certs/<uid>.txt          raw 32-byte digests
//! unsigned_txs/<uid>.txt          unsigned transaction hex
//! unsigned_txs_signed/<uid>.txt   signed transaction hex
//! sent_txs/<uid>.txt              broadcast txids
//! archive/certs/<timestamp>/      copies of signed_certs
//! archive/txs/<timestamp>/        copies of sent_txs
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::certificate::Certificate;
use crate::IssuerError;

pub const UNSIGNED_CERTS_DIR: &str = "unsigned_certs";
pub const SIGNED_CERTS_DIR: &str = "signed_certs";
pub const HASHED_CERTS_DIR: &str = "hashed_certs";
pub const UNSIGNED_TXS_DIR: &str = "unsigned_txs";
pub const SIGNED_TXS_DIR: &str = "unsigned_txs_signed";
pub const SENT_TXS_DIR: &str = "sent_txs";
pub const ARCHIVE_CERTS_DIR: &str = "archive/certs";
pub const ARCHIVE_TXS_DIR: &str = "archive/txs";

/// Folders emptied at the start of a run that creates transactions.
const WORKING_DIRS: [&str; 5] = [
    SIGNED_CERTS_DIR,
    HASHED_CERTS_DIR,
    UNSIGNED_TXS_DIR,
    SIGNED_TXS_DIR,
    SENT_TXS_DIR,
];

/// Storage for everything a batch reads and produces, keyed by certificate uid.
pub trait ArtifactStore: Send + Sync {
    /// All input certificates, sorted by uid.
    fn unsigned_certificates(&self) -> Result<Vec<Certificate>, IssuerError>;

    /// Empty the signed, digest, transaction and sent folders.
    fn clear_working(&self) -> Result<(), IssuerError>;

    fn put_signed_certificate(&self, uid: &str, bytes: &[u8]) -> Result<(), IssuerError>;
    fn signed_certificate(&self, uid: &str) -> Result<Vec<u8>, IssuerError>;

    fn put_digest(&self, uid: &str, digest: &[u8; 32]) -> Result<(), IssuerError>;
    fn digest(&self, uid: &str) -> Result<[u8; 32], IssuerError>;

    fn put_unsigned_tx(&self, uid: &str, hex: &str) -> Result<(), IssuerError>;

    fn put_signed_tx(&self, uid: &str, hex: &str) -> Result<(), IssuerError>;
    fn signed_tx(&self, uid: &str) -> Result<String, IssuerError>;
    /// Uids with a signed transaction, sorted.
    fn signed_tx_uids(&self) -> Result<Vec<String>, IssuerError>;

    fn put_sent(&self, uid: &str, txid: &str) -> Result<(), IssuerError>;

    /// Copy the signed certificates to `archive/certs/<timestamp>`.
    fn archive_signed_certificates(&self, timestamp: &str) -> Result<(), IssuerError>;
    /// Copy the sent txids to `archive/txs/<timestamp>`.
    fn archive_sent(&self, timestamp: &str) -> Result<(), IssuerError>;
}

fn not_found(what: &str, uid: &str) -> IssuerError {
    IssuerError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no {} for {}", what, uid),
    ))
}

fn to_digest(uid: &str, bytes: &[u8]) -> Result<[u8; 32], IssuerError> {
    bytes.try_into().map_err(|_| {
        IssuerError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("digest for {} is {} bytes", uid, bytes.len()),
        ))
    })
}

/// Directory-backed artifact store.
#[derive(Clone, Debug)]
pub struct FolderStore {
    root: PathBuf,
}

impl FolderStore {
    /// Open the store rooted at `root`, creating any missing folders.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, IssuerError> {
        let store = FolderStore { root: root.into() };
        for dir in [UNSIGNED_CERTS_DIR, ARCHIVE_CERTS_DIR, ARCHIVE_TXS_DIR]
            .into_iter()
            .chain(WORKING_DIRS)
        {
            fs::create_dir_all(store.root.join(dir))?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file(&self, dir: &str, uid: &str, ext: &str) -> PathBuf {
        self.root.join(dir).join(format!("{}.{}", uid, ext))
    }

    fn read(&self, dir: &str, uid: &str, ext: &str, what: &str) -> Result<Vec<u8>, IssuerError> {
        match fs::read(self.file(dir, uid, ext)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(what, uid)),
            Err(e) => Err(e.into()),
        }
    }

    /// Regular files in `dir` as `(uid, path)`, sorted by uid.
    ///
    /// The uid is the file name without its last extension. Hidden files are
    /// skipped, and two files with the same uid are an error.
    fn entries(&self, dir: &str) -> Result<Vec<(String, PathBuf)>, IssuerError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.root.join(dir))? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let uid = path
                .file_stem()
                .and_then(|n| n.to_str())
                .filter(|n| !n.is_empty() && !n.starts_with('.'))
                .map(str::to_string);
            if let Some(uid) = uid {
                entries.push((uid, path));
            }
        }
        entries.sort();
        if let Some(pair) = entries.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(IssuerError::InvalidCertificate(format!(
                "{} and {} both have uid {}",
                pair[0].1.display(),
                pair[1].1.display(),
                pair[0].0
            )));
        }
        Ok(entries)
    }

    fn copy_dir(&self, from: &str, to: &str, timestamp: &str) -> Result<(), IssuerError> {
        let target = self.root.join(to).join(timestamp);
        fs::create_dir_all(&target)?;
        for (_, path) in self.entries(from)? {
            if let Some(name) = path.file_name() {
                fs::copy(&path, target.join(name))?;
            }
        }
        tracing::info!(target = %target.display(), "archived {}", from);
        Ok(())
    }
}

impl ArtifactStore for FolderStore {
    fn unsigned_certificates(&self) -> Result<Vec<Certificate>, IssuerError> {
        self.entries(UNSIGNED_CERTS_DIR)?
            .into_iter()
            .map(|(uid, path)| Certificate::from_json(&uid, &fs::read(path)?))
            .collect()
    }

    fn clear_working(&self) -> Result<(), IssuerError> {
        for dir in WORKING_DIRS {
            let path = self.root.join(dir);
            if path.exists() {
                fs::remove_dir_all(&path)?;
            }
            fs::create_dir_all(&path)?;
        }
        Ok(())
    }

    fn put_signed_certificate(&self, uid: &str, bytes: &[u8]) -> Result<(), IssuerError> {
        Ok(fs::write(self.file(SIGNED_CERTS_DIR, uid, "json"), bytes)?)
    }

    fn signed_certificate(&self, uid: &str) -> Result<Vec<u8>, IssuerError> {
        self.read(SIGNED_CERTS_DIR, uid, "json", "signed certificate")
    }

    fn put_digest(&self, uid: &str, digest: &[u8; 32]) -> Result<(), IssuerError> {
        Ok(fs::write(self.file(HASHED_CERTS_DIR, uid, "txt"), digest)?)
    }

    fn digest(&self, uid: &str) -> Result<[u8; 32], IssuerError> {
        to_digest(uid, &self.read(HASHED_CERTS_DIR, uid, "txt", "digest")?)
    }

    fn put_unsigned_tx(&self, uid: &str, hex: &str) -> Result<(), IssuerError> {
        Ok(fs::write(self.file(UNSIGNED_TXS_DIR, uid, "txt"), hex)?)
    }

    fn put_signed_tx(&self, uid: &str, hex: &str) -> Result<(), IssuerError> {
        Ok(fs::write(self.file(SIGNED_TXS_DIR, uid, "txt"), hex)?)
    }

    fn signed_tx(&self, uid: &str) -> Result<String, IssuerError> {
        let bytes = self.read(SIGNED_TXS_DIR, uid, "txt", "signed transaction")?;
        String::from_utf8(bytes)
            .map_err(|e| IssuerError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    fn signed_tx_uids(&self) -> Result<Vec<String>, IssuerError> {
        Ok(self
            .entries(SIGNED_TXS_DIR)?
            .into_iter()
            .map(|(uid, _)| uid)
            .collect())
    }

    fn put_sent(&self, uid: &str, txid: &str) -> Result<(), IssuerError> {
        Ok(fs::write(self.file(SENT_TXS_DIR, uid, "txt"), txid)?)
    }

    fn archive_signed_certificates(&self, timestamp: &str) -> Result<(), IssuerError> {
        self.copy_dir(SIGNED_CERTS_DIR, ARCHIVE_CERTS_DIR, timestamp)
    }

    fn archive_sent(&self, timestamp: &str) -> Result<(), IssuerError> {
        self.copy_dir(SENT_TXS_DIR, ARCHIVE_TXS_DIR, timestamp)
    }
}

#[derive(Debug, Default)]
struct Artifacts {
    unsigned: BTreeMap<String, Vec<u8>>,
    signed: BTreeMap<String, Vec<u8>>,
    digests: BTreeMap<String, [u8; 32]>,
    unsigned_txs: BTreeMap<String, String>,
    signed_txs: BTreeMap<String, String>,
    sent: BTreeMap<String, String>,
    archives: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

/// In-memory artifact store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Artifacts>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Artifacts>, IssuerError> {
        self.inner
            .lock()
            .map_err(|_| IssuerError::Io(io::Error::new(io::ErrorKind::Other, "store lock poisoned")))
    }

    /// Add an input certificate.
    pub fn insert_unsigned(&self, uid: &str, json: &[u8]) -> Result<(), IssuerError> {
        self.lock()?.unsigned.insert(uid.to_string(), json.to_vec());
        Ok(())
    }

    pub fn unsigned_tx(&self, uid: &str) -> Option<String> {
        self.lock().ok()?.unsigned_txs.get(uid).cloned()
    }

    /// Broadcast txids by uid.
    pub fn sent(&self) -> BTreeMap<String, String> {
        self.lock().map(|a| a.sent.clone()).unwrap_or_default()
    }

    /// Names of the archives taken so far, e.g. `archive/txs/<timestamp>`.
    pub fn archive_names(&self) -> Vec<String> {
        self.lock()
            .map(|a| a.archives.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Overwrite a stored signed certificate.
    pub fn tamper_signed_certificate(&self, uid: &str, bytes: &[u8]) -> Result<(), IssuerError> {
        self.lock()?.signed.insert(uid.to_string(), bytes.to_vec());
        Ok(())
    }
}

impl ArtifactStore for MemoryStore {
    fn unsigned_certificates(&self) -> Result<Vec<Certificate>, IssuerError> {
        let artifacts = self.lock()?;
        artifacts
            .unsigned
            .iter()
            .map(|(uid, json)| Certificate::from_json(uid, json))
            .collect()
    }

    fn clear_working(&self) -> Result<(), IssuerError> {
        let mut a = self.lock()?;
        a.signed.clear();
        a.digests.clear();
        a.unsigned_txs.clear();
        a.signed_txs.clear();
        a.sent.clear();
        Ok(())
    }

    fn put_signed_certificate(&self, uid: &str, bytes: &[u8]) -> Result<(), IssuerError> {
        self.lock()?.signed.insert(uid.to_string(), bytes.to_vec());
        Ok(())
    }

    fn signed_certificate(&self, uid: &str) -> Result<Vec<u8>, IssuerError> {
        self.lock()?
            .signed
            .get(uid)
            .cloned()
            .ok_or_else(|| not_found("signed certificate", uid))
    }

    fn put_digest(&self, uid: &str, digest: &[u8; 32]) -> Result<(), IssuerError> {
        self.lock()?.digests.insert(uid.to_string(), *digest);
        Ok(())
    }

    fn digest(&self, uid: &str) -> Result<[u8; 32], IssuerError> {
        self.lock()?
            .digests
            .get(uid)
            .copied()
            .ok_or_else(|| not_found("digest", uid))
    }

    fn put_unsigned_tx(&self, uid: &str, hex: &str) -> Result<(), IssuerError> {
        self.lock()?.unsigned_txs.insert(uid.to_string(), hex.to_string());
        Ok(())
    }

    fn put_signed_tx(&self, uid: &str, hex: &str) -> Result<(), IssuerError> {
        self.lock()?.signed_txs.insert(uid.to_string(), hex.to_string());
        Ok(())
    }

    fn signed_tx(&self, uid: &str) -> Result<String, IssuerError> {
        self.lock()?
            .signed_txs
            .get(uid)
            .cloned()
            .ok_or_else(|| not_found("signed transaction", uid))
    }

    fn signed_tx_uids(&self) -> Result<Vec<String>, IssuerError> {
        Ok(self.lock()?.signed_txs.keys().cloned().collect())
    }

    fn put_sent(&self, uid: &str, txid: &str) -> Result<(), IssuerError> {
        self.lock()?.sent.insert(uid.to_string(), txid.to_string());
        Ok(())
    }

    fn archive_signed_certificates(&self, timestamp: &str) -> Result<(), IssuerError> {
        let mut a = self.lock()?;
        let copy = a.signed.clone();
        a.archives.insert(format!("{}/{}", ARCHIVE_CERTS_DIR, timestamp), copy);
        Ok(())
    }

    fn archive_sent(&self, timestamp: &str) -> Result<(), IssuerError> {
        let mut a = self.lock()?;
        let copy = a
            .sent
            .iter()
            .map(|(uid, txid)| (uid.clone(), txid.as_bytes().to_vec()))
            .collect();
        a.archives.insert(format!("{}/{}", ARCHIVE_TXS_DIR, timestamp), copy);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT: &[u8] = br#"{"recipient": {"givenName": "A", "familyName": "B", "pubkey": "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"}, "assertion": {"uid": "claim"}}"#;

    #[test]
    fn test_folder_layout_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderStore::open(dir.path()).unwrap();
        fs::write(dir.path().join(UNSIGNED_CERTS_DIR).join("bob.json"), CERT).unwrap();
        fs::write(dir.path().join(UNSIGNED_CERTS_DIR).join("alice.json"), CERT).unwrap();
        fs::create_dir(dir.path().join(UNSIGNED_CERTS_DIR).join("nested")).unwrap();

        let uids: Vec<String> = store
            .unsigned_certificates()
            .unwrap()
            .iter()
            .map(|c| c.uid().to_string())
            .collect();
        assert_eq!(uids, vec!["alice", "bob"]);

        store.put_signed_certificate("alice", b"{}").unwrap();
        store.put_digest("alice", &[9; 32]).unwrap();
        store.put_unsigned_tx("alice", "0100").unwrap();
        store.put_signed_tx("alice", "0200").unwrap();
        store.put_sent("alice", "ab".repeat(32).as_str()).unwrap();

        assert_eq!(store.signed_certificate("alice").unwrap(), b"{}");
        assert_eq!(store.digest("alice").unwrap(), [9; 32]);
        assert_eq!(fs::read(dir.path().join("hashed_certs/alice.txt")).unwrap(), vec![9; 32]);
        assert_eq!(store.signed_tx("alice").unwrap(), "0200");
        assert_eq!(store.signed_tx_uids().unwrap(), vec!["alice"]);
        assert!(dir.path().join("unsigned_txs/alice.txt").is_file());
        assert!(dir.path().join("sent_txs/alice.txt").is_file());
    }

    #[test]
    fn test_uid_keeps_inner_dots() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderStore::open(dir.path()).unwrap();
        let certs = dir.path().join(UNSIGNED_CERTS_DIR);
        fs::write(certs.join("alice.json"), CERT).unwrap();
        fs::write(certs.join("alice.2016.json"), CERT).unwrap();
        fs::write(certs.join(".DS_Store"), b"").unwrap();

        let uids: Vec<String> = store
            .unsigned_certificates()
            .unwrap()
            .iter()
            .map(|c| c.uid().to_string())
            .collect();
        assert_eq!(uids, vec!["alice", "alice.2016"]);

        store.put_signed_certificate("alice.2016", b"{}").unwrap();
        assert!(dir.path().join("signed_certs/alice.2016.json").is_file());
        assert!(store.signed_certificate("alice").is_err());
    }

    #[test]
    fn test_duplicate_uid_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderStore::open(dir.path()).unwrap();
        let certs = dir.path().join(UNSIGNED_CERTS_DIR);
        fs::write(certs.join("alice.json"), CERT).unwrap();
        fs::write(certs.join("alice.txt"), CERT).unwrap();

        match store.unsigned_certificates() {
            Err(IssuerError::InvalidCertificate(message)) => assert!(message.contains("alice")),
            other => panic!("unexpected result: {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn test_folder_archive_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderStore::open(dir.path()).unwrap();
        store.put_signed_certificate("alice", b"{\"a\":1}").unwrap();
        store.put_sent("alice", "txid").unwrap();

        store.archive_signed_certificates("20160101T000000").unwrap();
        store.archive_sent("20160101T000000").unwrap();
        assert_eq!(
            fs::read(dir.path().join("archive/certs/20160101T000000/alice.json")).unwrap(),
            b"{\"a\":1}"
        );
        assert!(dir.path().join("archive/txs/20160101T000000/alice.txt").is_file());

        store.clear_working().unwrap();
        assert!(matches!(
            store.signed_certificate("alice"),
            Err(IssuerError::Io(ref e)) if e.kind() == io::ErrorKind::NotFound
        ));
        assert!(store.signed_tx_uids().unwrap().is_empty());
        // archives survive
        assert!(dir.path().join("archive/certs/20160101T000000/alice.json").is_file());
    }

    #[test]
    fn test_folder_bad_certificate_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderStore::open(dir.path()).unwrap();
        fs::write(dir.path().join(UNSIGNED_CERTS_DIR).join("x.json"), b"{}").unwrap();
        assert!(matches!(
            store.unsigned_certificates(),
            Err(IssuerError::InvalidCertificate(_))
        ));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.insert_unsigned("b", CERT).unwrap();
        store.insert_unsigned("a", CERT).unwrap();
        let certs = store.unsigned_certificates().unwrap();
        assert_eq!(certs[0].uid(), "a");

        store.put_sent("a", "t1").unwrap();
        store.archive_sent("ts").unwrap();
        assert_eq!(store.archive_names(), vec!["archive/txs/ts"]);
        assert_eq!(store.sent().get("a").map(String::as_str), Some("t1"));

        store.clear_working().unwrap();
        assert!(store.sent().is_empty());
        assert!(store.digest("a").is_err());
        assert_eq!(store.unsigned_certificates().unwrap().len(), 2);
    }
}
