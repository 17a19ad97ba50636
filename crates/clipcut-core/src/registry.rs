// crates/clipcut-core/src/registry.rs
//
// HandleRegistry: sole owner of every byte buffer exposed to a playback or
// download surface (the video preview and the extracted audio result).
//
// Lifetime rules:
//   • A handle is live from `mint` until `revoke` / `sweep_stale` / `revoke_all`.
//   • At most one record per handle value; handle values are never reused
//     (the sequence number only grows).
//   • Surfaces hold `Arc<[u8]>` clones obtained through `get`, but once the
//     registry drops its record the handle no longer resolves.
//
// Eviction (sweep_stale): a record goes when ANY of:
//   1. age              > MAX_AGE            (5 min)
//   2. idle             > MAX_IDLE && accessed at least once   (2 min)
//   3. never accessed  && age > UNTOUCHED_MAX_AGE               (1 min)
//
// The sweep runs every SWEEP_INTERVAL via `maybe_sweep` (polled once per UI
// frame) and opportunistically inside `mint` once the live count reaches
// SWEEP_WATERMARK. All mutation is single-step on `&mut self`, so the periodic
// sweep can never observe a half-finished mint or revoke.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::helpers::time::format_file_size;

// ── Tunables ──────────────────────────────────────────────────────────────────

pub const MAX_AGE:           Duration = Duration::from_secs(5 * 60);
pub const MAX_IDLE:          Duration = Duration::from_secs(2 * 60);
pub const UNTOUCHED_MAX_AGE: Duration = Duration::from_secs(60);
pub const SWEEP_INTERVAL:    Duration = Duration::from_secs(60);
/// Live count at which `mint` sweeps before inserting.
pub const SWEEP_WATERMARK:   usize = 50;
/// Live count at which `mint` gives up even after sweeping.
pub const HARD_CAPACITY:     usize = 256;

// ── BlobHandle ────────────────────────────────────────────────────────────────

/// Opaque reference to a registered buffer. Ordered by mint order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobHandle {
    seq: u64,
    id:  Uuid,
}

impl BlobHandle {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:clipcut/{}-{}", self.seq, self.id)
    }
}

// ── HandleRecord ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HandleRecord {
    pub identifier:    String,
    pub buffer:        Arc<[u8]>,
    pub mime:          Option<String>,
    pub created:       Instant,
    pub last_accessed: Instant,
    pub access_count:  u64,
    pub size_bytes:    usize,
}

impl HandleRecord {
    fn is_stale(&self, now: Instant) -> bool {
        let age  = now.saturating_duration_since(self.created);
        let idle = now.saturating_duration_since(self.last_accessed);
        age > MAX_AGE
            || (idle > MAX_IDLE && self.access_count > 0)
            || (self.access_count == 0 && age > UNTOUCHED_MAX_AGE)
    }
}

// ── HandleRegistry ────────────────────────────────────────────────────────────

pub struct HandleRegistry {
    records:    HashMap<BlobHandle, HandleRecord>,
    clock:      Box<dyn Clock>,
    next_seq:   u64,
    last_sweep: Instant,
    sweeps_run: u64,
    closed:     bool,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            records:    HashMap::new(),
            clock,
            next_seq:   1,
            last_sweep: now,
            sweeps_run: 0,
            closed:     false,
        }
    }

    /// Register `buffer` and return a fresh handle.
    ///
    /// Returns `None` when the registry is shut down or still at
    /// HARD_CAPACITY after an eviction pass. Callers treat `None` as fatal to
    /// the current operation (HandleExhaustion).
    pub fn mint(&mut self, buffer: impl Into<Arc<[u8]>>, identifier: &str) -> Option<BlobHandle> {
        self.mint_typed(buffer, identifier, None)
    }

    /// `mint` with a MIME tag recorded alongside the buffer.
    pub fn mint_typed(
        &mut self,
        buffer:     impl Into<Arc<[u8]>>,
        identifier: &str,
        mime:       Option<&str>,
    ) -> Option<BlobHandle> {
        if self.closed {
            warn!(identifier, "registry is shut down, refusing to mint");
            return None;
        }

        let buffer: Arc<[u8]> = buffer.into();
        if buffer.is_empty() {
            warn!(identifier, "empty buffer registered, this may cause playback issues");
        }

        if self.records.len() >= SWEEP_WATERMARK {
            warn!(live = self.records.len(), "too many blob handles, cleaning up old ones");
            self.sweep_stale();
        }
        if self.records.len() >= HARD_CAPACITY {
            warn!(live = self.records.len(), identifier, "blob handle capacity exhausted");
            return None;
        }

        let now    = self.clock.now();
        let handle = BlobHandle { seq: self.next_seq, id: Uuid::new_v4() };
        self.next_seq += 1;

        let size_bytes = buffer.len();
        self.records.insert(handle.clone(), HandleRecord {
            identifier:    identifier.to_string(),
            buffer,
            mime:          mime.map(str::to_string),
            created:       now,
            last_accessed: now,
            access_count:  0,
            size_bytes,
        });
        info!("created blob handle {handle} ({identifier}, {})", format_file_size(size_bytes as u64));
        Some(handle)
    }

    /// Record one access. Unknown handles are ignored.
    pub fn touch(&mut self, handle: &BlobHandle) {
        let now = self.clock.now();
        if let Some(rec) = self.records.get_mut(handle) {
            rec.last_accessed = now;
            rec.access_count += 1;
        }
    }

    /// Resolve a handle to its buffer, counting it as an access.
    pub fn get(&mut self, handle: &BlobHandle) -> Option<Arc<[u8]>> {
        self.touch(handle);
        self.records.get(handle).map(|r| Arc::clone(&r.buffer))
    }

    /// Remove the record and release the registry's reference.
    /// Returns false (and does nothing) for unknown or already-revoked handles.
    pub fn revoke(&mut self, handle: &BlobHandle) -> bool {
        match self.records.remove(handle) {
            Some(rec) => {
                let age = self.clock.now().saturating_duration_since(rec.created);
                info!(
                    "revoking blob handle {handle} ({}, {}, age: {}s)",
                    rec.identifier,
                    format_file_size(rec.size_bytes as u64),
                    age.as_secs(),
                );
                true
            }
            None => false,
        }
    }

    /// Evict every stale record. Returns the number evicted.
    pub fn sweep_stale(&mut self) -> usize {
        let now = self.clock.now();
        self.last_sweep = now;
        self.sweeps_run += 1;

        let mut stale: Vec<BlobHandle> = self.records.iter()
            .filter(|(_, rec)| rec.is_stale(now))
            .map(|(h, _)| h.clone())
            .collect();
        stale.sort();

        for handle in &stale {
            if let Some(rec) = self.records.get(handle) {
                debug!(
                    "cleaning up blob handle {handle} ({}, age: {}s, accesses: {})",
                    rec.identifier,
                    now.saturating_duration_since(rec.created).as_secs(),
                    rec.access_count,
                );
            }
            self.revoke(handle);
        }
        if !stale.is_empty() {
            info!("cleaned up {} blob handles", stale.len());
        }
        stale.len()
    }

    /// Periodic driver: sweeps once SWEEP_INTERVAL has passed since the last
    /// sweep. Cheap enough to call every frame.
    pub fn maybe_sweep(&mut self) -> usize {
        let now = self.clock.now();
        if now.saturating_duration_since(self.last_sweep) >= SWEEP_INTERVAL {
            self.sweep_stale()
        } else {
            0
        }
    }

    /// Release everything. Used on full application reset.
    pub fn revoke_all(&mut self) {
        info!("cleaning up {} blob handles", self.records.len());
        let mut handles: Vec<BlobHandle> = self.records.keys().cloned().collect();
        handles.sort();
        for handle in &handles {
            self.revoke(handle);
        }
    }

    /// Process teardown: release everything and refuse further mints.
    pub fn shutdown(&mut self) {
        self.revoke_all();
        self.closed = true;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, handle: &BlobHandle) -> bool {
        self.records.contains_key(handle)
    }

    pub fn info(&self, handle: &BlobHandle) -> Option<&HandleRecord> {
        self.records.get(handle)
    }

    pub fn sweeps_run(&self) -> u64 {
        self.sweeps_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn registry() -> (HandleRegistry, ManualClock) {
        let clock = ManualClock::new();
        (HandleRegistry::with_clock(Box::new(clock.clone())), clock)
    }

    fn bytes(n: usize) -> Vec<u8> {
        vec![7u8; n]
    }

    #[test]
    fn mint_then_revoke_restores_size() {
        let (mut reg, _) = registry();
        reg.mint(bytes(4), "keep").unwrap();
        let before = reg.len();
        let h = reg.mint(bytes(10), "tmp").unwrap();
        assert!(reg.revoke(&h));
        assert_eq!(reg.len(), before);
    }

    #[test]
    fn double_revoke_is_noop() {
        let (mut reg, _) = registry();
        let h = reg.mint(bytes(3), "x").unwrap();
        assert!(reg.revoke(&h));
        assert!(!reg.revoke(&h));
        assert!(reg.is_empty());
    }

    #[test]
    fn empty_buffer_is_accepted() {
        let (mut reg, _) = registry();
        let h = reg.mint(Vec::new(), "empty").unwrap();
        assert_eq!(reg.info(&h).unwrap().size_bytes, 0);
    }

    #[test]
    fn handles_are_monotonic() {
        let (mut reg, _) = registry();
        let a = reg.mint(bytes(1), "a").unwrap();
        let b = reg.mint(bytes(1), "b").unwrap();
        reg.revoke(&a);
        let c = reg.mint(bytes(1), "c").unwrap();
        assert!(a < b && b < c);
        assert_ne!(a.to_string(), c.to_string());
        assert!(c.to_string().starts_with("blob:clipcut/3-"));
    }

    #[test]
    fn touch_counts_and_unknown_is_ignored() {
        let (mut reg, _) = registry();
        let h = reg.mint(bytes(2), "t").unwrap();
        reg.touch(&h);
        assert!(reg.get(&h).is_some());
        assert_eq!(reg.info(&h).unwrap().access_count, 2);

        reg.revoke(&h);
        reg.touch(&h);
        assert!(reg.get(&h).is_none());
    }

    #[test]
    fn untouched_handle_expires_after_a_minute() {
        let (mut reg, clock) = registry();
        let h = reg.mint(bytes(1), "fresh").unwrap();
        clock.advance(Duration::from_secs(59));
        assert_eq!(reg.sweep_stale(), 0);
        clock.advance(Duration::from_secs(2));
        assert_eq!(reg.sweep_stale(), 1);
        assert!(!reg.contains(&h));
    }

    #[test]
    fn accessed_handle_survives_until_idle() {
        let (mut reg, clock) = registry();
        let h = reg.mint(bytes(1), "used").unwrap();
        clock.advance(Duration::from_secs(90));
        reg.touch(&h);
        clock.advance(Duration::from_secs(100));
        assert_eq!(reg.sweep_stale(), 0);
        clock.advance(Duration::from_secs(25));
        assert_eq!(reg.sweep_stale(), 1);
    }

    #[test]
    fn max_age_wins_over_recent_access() {
        let (mut reg, clock) = registry();
        let h = reg.mint(bytes(1), "old").unwrap();
        for _ in 0..6 {
            clock.advance(Duration::from_secs(55));
            reg.touch(&h);
        }
        assert_eq!(reg.sweep_stale(), 1);
    }

    #[test]
    fn sweep_is_idempotent() {
        let (mut reg, clock) = registry();
        reg.mint(bytes(1), "a").unwrap();
        let b = reg.mint(bytes(1), "b").unwrap();
        clock.advance(Duration::from_secs(70));
        reg.touch(&b);
        assert_eq!(reg.sweep_stale(), 1);
        assert_eq!(reg.sweep_stale(), 0);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn periodic_sweep_waits_for_interval() {
        let (mut reg, clock) = registry();
        reg.mint(bytes(1), "a").unwrap();
        clock.advance(Duration::from_secs(30));
        assert_eq!(reg.maybe_sweep(), 0);
        assert_eq!(reg.sweeps_run(), 0);
        clock.advance(Duration::from_secs(31));
        assert_eq!(reg.maybe_sweep(), 1);
        assert_eq!(reg.sweeps_run(), 1);
    }

    #[test]
    fn fifty_first_mint_sweeps_first() {
        let (mut reg, _) = registry();
        for i in 0..50 {
            reg.mint(bytes(1), &format!("h{i}")).unwrap();
        }
        assert_eq!(reg.sweeps_run(), 0);
        reg.mint(bytes(1), "h50").unwrap();
        assert_eq!(reg.sweeps_run(), 1);
        assert_eq!(reg.len(), 51);
    }

    #[test]
    fn watermark_sweep_evicts_stale_before_insert() {
        let (mut reg, clock) = registry();
        for i in 0..50 {
            reg.mint(bytes(1), &format!("h{i}")).unwrap();
        }
        clock.advance(Duration::from_secs(61));
        reg.mint(bytes(1), "new").unwrap();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn exhaustion_returns_none() {
        let (mut reg, _) = registry();
        for i in 0..HARD_CAPACITY {
            assert!(reg.mint(bytes(1), &format!("h{i}")).is_some());
        }
        assert!(reg.mint(bytes(1), "overflow").is_none());
    }

    #[test]
    fn revoke_all_and_shutdown() {
        let (mut reg, _) = registry();
        let h = reg.mint(bytes(8), "a").unwrap();
        let shared = reg.get(&h).unwrap();
        reg.mint(bytes(8), "b").unwrap();
        reg.revoke_all();
        assert!(reg.is_empty());
        // Surfaces keep their own clone; the handle is gone.
        assert_eq!(shared.len(), 8);
        assert!(reg.mint(bytes(1), "after-reset").is_some());

        reg.shutdown();
        assert!(reg.is_empty());
        assert!(reg.mint(bytes(1), "after-shutdown").is_none());
    }
}
