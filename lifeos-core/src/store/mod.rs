//! Relational store
//!
//! [`Store`] owns every collection in memory and is the only way to change
//! them. Case↔Contact and Case↔Task links are stored on both records; every
//! create, update, and delete keeps the two sides in agreement and cleans up
//! references to deleted records.
//!
//! ## Commit model
//!
//! A mutation runs against a clone of the current [`State`]. When it
//! succeeds, every collection it touched is encoded and written to the
//! [`SlotStore`] in one batch, and only after the write is acknowledged does
//! the clone replace the live state. An error at any step leaves both the
//! in-memory and durable copies as they were, so a half-applied cascade is
//! never observable.

mod activity;
mod integrity;
mod links;
mod planning;
mod practice;
pub mod snapshot;

pub use integrity::IntegrityViolation;
pub use snapshot::Slot;

use crate::backend::{MemorySlots, SlotStore};
use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// How [`Store::open`] treats snapshots that fail to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Fail with [`Error::CorruptState`]
    #[default]
    Strict,
    /// Log the failure, start the collection empty, and overwrite the slot on
    /// the next commit
    DiscardCorrupt,
}

/// Every collection held by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub cases: Vec<Case>,
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub goals: Vec<Goal>,
    pub sessions: Vec<WorkSession>,
    pub contacts: Vec<Contact>,
    pub interactions: Vec<ContactInteraction>,
    pub onboarding: OnboardingState,
}

impl State {
    fn encode_slot(&self, slot: Slot) -> Result<Vec<u8>> {
        match slot {
            Slot::Cases => snapshot::encode(&self.cases),
            Slot::Projects => snapshot::encode(&self.projects),
            Slot::Tasks => snapshot::encode(&self.tasks),
            Slot::Goals => snapshot::encode(&self.goals),
            Slot::Sessions => snapshot::encode(&self.sessions),
            Slot::Contacts => snapshot::encode(&self.contacts),
            Slot::ContactInteractions => snapshot::encode(&self.interactions),
            Slot::Onboarding => snapshot::encode(&self.onboarding),
        }
    }

    /// Number of records across all collections
    pub fn record_count(&self) -> usize {
        self.cases.len()
            + self.projects.len()
            + self.tasks.len()
            + self.goals.len()
            + self.sessions.len()
            + self.contacts.len()
            + self.interactions.len()
    }
}

/// A mutation in progress: a working copy of the state plus the slots it
/// has changed.
struct Txn {
    state: State,
    touched: BTreeSet<Slot>,
    now: DateTime<Utc>,
}

impl Txn {
    fn touch(&mut self, slot: Slot) {
        self.touched.insert(slot);
    }
}

/// The relational store over a slot backend.
pub struct Store<B: SlotStore> {
    backend: B,
    state: State,
    /// Slots to rewrite on the next commit (migrated or discarded on load)
    pending: BTreeSet<Slot>,
}

impl Store<MemorySlots> {
    /// An empty store backed by fresh in-memory slots
    pub fn in_memory() -> Self {
        Self {
            backend: MemorySlots::new(),
            state: State::default(),
            pending: BTreeSet::new(),
        }
    }
}

impl<B: SlotStore> Store<B> {
    /// Load every collection from `backend` in one [`SlotStore::read_batch`].
    ///
    /// Missing slots load as empty collections. Slots from an older snapshot
    /// format are migrated and rewritten on the next commit. Undecodable slots
    /// are handled according to `policy`; snapshots from a newer format always
    /// fail with [`Error::UnsupportedVersion`]. After a discard, links to the
    /// lost records are removed and the repaired slots are rewritten on the
    /// next commit.
    pub fn open(backend: B, policy: RecoveryPolicy) -> Result<Self> {
        let keys: Vec<&str> = Slot::ALL.iter().map(Slot::key).collect();
        let raw = backend.read_batch(&keys)?;
        let mut loader = Loader {
            raw: Slot::ALL.into_iter().zip(raw).collect(),
            policy,
            pending: BTreeSet::new(),
            discarded: BTreeSet::new(),
        };

        let mut state = State {
            cases: loader.slot(Slot::Cases)?,
            projects: loader.slot(Slot::Projects)?,
            tasks: loader.slot(Slot::Tasks)?,
            goals: loader.slot(Slot::Goals)?,
            sessions: loader.slot(Slot::Sessions)?,
            contacts: loader.slot(Slot::Contacts)?,
            interactions: loader.slot(Slot::ContactInteractions)?,
            onboarding: loader.slot(Slot::Onboarding)?,
        };

        // Records in a discarded slot are gone; so are the links to them
        if !loader.discarded.is_empty() {
            let repaired = links::drop_dangling(&mut state, Utc::now());
            if !repaired.is_empty() {
                tracing::warn!(
                    slots = ?repaired.iter().map(Slot::key).collect::<Vec<_>>(),
                    "Removed links to discarded records"
                );
            }
            loader.pending.extend(repaired);
        }

        tracing::info!(
            records = state.record_count(),
            pending_rewrites = loader.pending.len(),
            "Store loaded"
        );

        Ok(Self {
            backend,
            state,
            pending: loader.pending,
        })
    }

    /// Read-only view of every collection
    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Slots that will be rewritten on the next commit
    pub fn pending_rewrites(&self) -> Vec<Slot> {
        self.pending.iter().copied().collect()
    }

    /// Write every pending slot now, without any other change.
    pub fn flush_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.mutate(|_| Ok(()))
    }

    /// Report every broken link or dangling reference in the current state
    pub fn check_integrity(&self) -> Vec<IntegrityViolation> {
        integrity::check(&self.state)
    }

    // ============================================
    // Onboarding
    // ============================================

    pub fn onboarding(&self) -> OnboardingState {
        self.state.onboarding
    }

    pub fn complete_onboarding(&mut self) -> Result<()> {
        self.set_onboarding(OnboardingState {
            first_run: false,
            completed: true,
            skipped: false,
        })
    }

    pub fn skip_onboarding(&mut self) -> Result<()> {
        self.set_onboarding(OnboardingState {
            first_run: false,
            completed: false,
            skipped: true,
        })
    }

    pub fn reset_onboarding(&mut self) -> Result<()> {
        self.set_onboarding(OnboardingState::default())
    }

    fn set_onboarding(&mut self, onboarding: OnboardingState) -> Result<()> {
        self.mutate(|txn| {
            txn.state.onboarding = onboarding;
            txn.touch(Slot::Onboarding);
            Ok(())
        })
    }

    // ============================================
    // Commit
    // ============================================

    /// Apply `f` to a working copy and commit it.
    fn mutate<R>(&mut self, f: impl FnOnce(&mut Txn) -> Result<R>) -> Result<R> {
        let mut txn = Txn {
            state: self.state.clone(),
            touched: BTreeSet::new(),
            now: Utc::now(),
        };

        let out = f(&mut txn)?;

        let mut slots = txn.touched;
        slots.extend(self.pending.iter().copied());
        if !slots.is_empty() {
            let writes = slots
                .iter()
                .map(|slot| -> Result<(&'static str, Vec<u8>)> {
                    Ok((slot.key(), txn.state.encode_slot(*slot)?))
                })
                .collect::<Result<Vec<_>>>()?;
            self.backend.write_batch(&writes)?;
            tracing::debug!(
                slots = ?slots.iter().map(Slot::key).collect::<Vec<_>>(),
                "Committed snapshot"
            );
        }

        self.state = txn.state;
        self.pending.clear();
        Ok(out)
    }
}

/// Decodes the slots of one batch read.
struct Loader {
    raw: BTreeMap<Slot, Option<Vec<u8>>>,
    policy: RecoveryPolicy,
    /// Slots to rewrite on the next commit
    pending: BTreeSet<Slot>,
    /// Slots whose contents were dropped under `DiscardCorrupt`
    discarded: BTreeSet<Slot>,
}

impl Loader {
    fn slot<T>(&mut self, slot: Slot) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let Some(bytes) = self.raw.remove(&slot).flatten() else {
            return Ok(T::default());
        };

        match snapshot::decode::<T>(slot, &bytes) {
            Ok(decoded) => {
                if decoded.needs_rewrite() {
                    tracing::info!(slot = %slot, from = decoded.version, "Migrating snapshot");
                    self.pending.insert(slot);
                }
                Ok(decoded.value)
            }
            Err(err @ Error::CorruptState { .. })
                if self.policy == RecoveryPolicy::DiscardCorrupt =>
            {
                tracing::warn!(slot = %slot, error = %err, "Discarding unreadable snapshot");
                self.pending.insert(slot);
                self.discarded.insert(slot);
                Ok(T::default())
            }
            Err(err) => Err(err),
        }
    }
}

/// Generate a fresh record id
fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Find a record by id
fn find<'a, T: Record>(items: &'a [T], id: &str) -> Result<&'a T> {
    items
        .iter()
        .find(|item| item.id() == id)
        .ok_or_else(|| Error::not_found(T::KIND, id))
}

fn find_mut<'a, T: Record>(items: &'a mut [T], id: &str) -> Result<&'a mut T> {
    items
        .iter_mut()
        .find(|item| item.id() == id)
        .ok_or_else(|| Error::not_found(T::KIND, id))
}

/// Remove a record by id, returning it
fn remove<T: Record>(items: &mut Vec<T>, id: &str) -> Result<T> {
    let index = items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| Error::not_found(T::KIND, id))?;
    Ok(items.remove(index))
}

/// Fail with NotFound unless every id names a record in `items`
fn require_all<T: Record>(items: &[T], ids: &[String]) -> Result<()> {
    ids.iter().try_for_each(|id| find(items, id).map(|_| ()))
}

fn require_opt<T: Record>(items: &[T], id: Option<&str>) -> Result<()> {
    match id {
        Some(id) => find(items, id).map(|_| ()),
        None => Ok(()),
    }
}
