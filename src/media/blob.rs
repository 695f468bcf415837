use crate::metrics;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

static NEXT_REGISTRY: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Default)]
struct Ledger {
    next_seq: u64,
    created: u64,
    revoked: u64,
    live: HashSet<String>,
}

/// Snapshot of a registry's bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobStats {
    pub created: u64,
    pub revoked: u64,
    pub live: usize,
}

/// Issues and revokes the blob handles of one slot
///
/// Every slot owns its own registry; handles are never shared between slots.
#[derive(Clone)]
pub struct BlobRegistry {
    id: u64,
    ledger: Arc<Mutex<Ledger>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed),
            ledger: Arc::new(Mutex::new(Ledger::default())),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wrap fetched bytes in a new local handle
    pub fn create(&self, bytes: Vec<u8>) -> MediaBlob {
        let url = {
            let mut ledger = self.ledger();
            ledger.next_seq += 1;
            ledger.created += 1;
            let url = format!("blob:adslot/{}/{}", self.id, ledger.next_seq);
            ledger.live.insert(url.clone());
            url
        };

        metrics::record_blob_created();
        debug!("Created blob {} ({} bytes)", url, bytes.len());

        MediaBlob {
            url,
            bytes: bytes.into(),
            registry: self.clone(),
        }
    }

    fn revoke(&self, url: &str) {
        let removed = {
            let mut ledger = self.ledger();
            let removed = ledger.live.remove(url);
            if removed {
                ledger.revoked += 1;
            }
            removed
        };

        if removed {
            metrics::record_blob_revoked();
            debug!("Revoked blob {}", url);
        } else {
            warn!("Blob {} revoked more than once", url);
        }
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.ledger().live.contains(url)
    }

    pub fn stats(&self) -> BlobStats {
        let ledger = self.ledger();
        BlobStats {
            created: ledger.created,
            revoked: ledger.revoked,
            live: ledger.live.len(),
        }
    }
}

impl Default for BlobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BlobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobRegistry")
            .field("id", &self.id)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Local handle to fetched media
///
/// The renderer only ever sees [`MediaBlob::url`], never the remote URL.
/// The handle is revoked exactly once, when the value is dropped.
pub struct MediaBlob {
    url: String,
    bytes: Arc<[u8]>,
    registry: BlobRegistry,
}

impl MediaBlob {
    /// Opaque `blob:` URL used by the presentation layer
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for MediaBlob {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}

impl fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBlob")
            .field("url", &self.url)
            .field("len", &self.bytes.len())
            .finish()
    }
}
