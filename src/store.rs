use std::{path::Path, sync::Arc};

use color_eyre::eyre::{self, bail, Context};
use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::watch;

use crate::reservation::Reservation;

/// Owner of reservation records.
///
/// Screens never hold on to a record, they observe it: the receiver returned
/// by [`ReservationStore::observe`] always carries the latest value for the id
/// (`None` when there is no such record) and intermediate values may be
/// skipped.
pub trait ReservationStore: Send + Sync {
    fn observe(&self, id: &str) -> watch::Receiver<Option<Reservation>>;

    /// Removes the record. The caller is not told whether anything was removed.
    fn delete_by_id(&self, id: &str);

    /// All records, ordered by purchase date then id.
    fn list(&self) -> Vec<Reservation>;
}

#[derive(Debug)]
pub struct MemoryStoreImpl {
    records: DashMap<String, Reservation>,
    watchers: DashMap<String, watch::Sender<Option<Reservation>>>,
    notifier: watch::Sender<()>,
}

#[derive(Clone, Debug)]
pub struct MemoryStore(pub Arc<MemoryStoreImpl>);

#[derive(Deserialize)]
struct SeedFile {
    #[serde(default)]
    reservation: Vec<Reservation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore(Arc::new(MemoryStoreImpl {
            records: DashMap::new(),
            watchers: DashMap::new(),
            notifier: watch::channel(()).0,
        }))
    }

    pub fn load(path: &Path) -> eyre::Result<Self> {
        let seed = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Could not read reservations from {}", path.display()))?;
        Self::from_toml(&seed)
            .wrap_err_with(|| format!("Failed to load reservations from {}", path.display()))
    }

    pub fn from_toml(seed: &str) -> eyre::Result<Self> {
        let seed: SeedFile = toml::from_str(seed).wrap_err("Malformed reservation seed")?;
        let store = Self::new();
        for reservation in seed.reservation {
            if store.0.records.contains_key(&reservation.id) {
                bail!("Duplicate reservation id `{}`", reservation.id);
            }
            store.insert(reservation);
        }
        tracing::info!(count = store.0.records.len(), "Loaded reservations");
        Ok(store)
    }

    /// Receiver poked after every mutation, used to schedule redraws.
    pub fn changes(&self) -> watch::Receiver<()> {
        self.0.notifier.subscribe()
    }

    pub fn insert(&self, reservation: Reservation) {
        let id = reservation.id.clone();
        self.0.records.insert(id.clone(), reservation.clone());
        if let Some(tx) = self.0.watchers.get(&id) {
            tx.send_replace(Some(reservation));
        }
        self.0.notifier.send_replace(());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationStore for MemoryStore {
    fn observe(&self, id: &str) -> watch::Receiver<Option<Reservation>> {
        self.0.watchers.retain(|_, tx| tx.receiver_count() > 0);
        // The watcher entry stays locked while the record is read, so a
        // concurrent insert or delete cannot slip in between the two.
        self.0
            .watchers
            .entry(id.to_owned())
            .or_insert_with(|| {
                let current = self.0.records.get(id).map(|r| r.value().clone());
                watch::channel(current).0
            })
            .subscribe()
    }

    fn delete_by_id(&self, id: &str) {
        if self.0.records.remove(id).is_none() {
            tracing::warn!(id, "Tried to delete a reservation that does not exist");
        } else {
            tracing::debug!(id, "Deleted reservation");
        }
        if let Some(tx) = self.0.watchers.get(id) {
            tx.send_replace(None);
        }
        self.0.watchers.remove_if(id, |_, tx| tx.receiver_count() == 0);
        self.0.notifier.send_replace(());
    }

    fn list(&self) -> Vec<Reservation> {
        let mut all: Vec<_> = self.0.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| {
            a.purchased_date
                .cmp(&b.purchased_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        all
    }
}
