//! Versioned-entity engine.
//!
//! A logical entity is one Create action (its origin) plus every Update
//! reachable through update links anchored at that origin. Links always
//! hang off the origin, so the whole revision set is one link query away.
//! Deletes are separate marker actions, linked from the origin as well; they
//! never hide revisions.
//!
//! "Latest" is the linked revision with the greatest action timestamp
//! (ties: greatest action hash), the same order `get_all_revisions` uses.
//! Concurrent updates from different peers all stay in the fan-out and the
//! timestamp rule picks one. That choice can change as more revisions
//! replicate in; it is a resolution policy, not consensus.

use crate::core::action::{ActionHashed, ActionKind, Entry, Link, Record};
use crate::core::error::LedgerError;
use crate::core::hash::ActionHash;
use crate::core::store::{LinkFrom, RecordStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;

/// A record kind the engine can version.
///
/// Each kind gets its own entry type and link tags so that kinds sharing a
/// store never see each other's links.
pub trait EntryPayload: Serialize + DeserializeOwned + Clone + fmt::Debug {
    const ENTRY_TYPE: &'static str;
    const UPDATES_LINK: &'static str;
    const DELETES_LINK: &'static str;

    /// Shape check run before anything is committed.
    fn validate(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}

pub struct VersionedEntity<'s, S: RecordStore + ?Sized, T> {
    store: &'s S,
    _kind: PhantomData<fn() -> T>,
}

impl<'s, S: RecordStore + ?Sized, T: EntryPayload> VersionedEntity<'s, S, T> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    pub fn create(&self, payload: &T) -> Result<Record, LedgerError> {
        payload.validate()?;
        let (action_hash, _) = self
            .store
            .commit_entry(T::ENTRY_TYPE, Entry::from_payload(payload)?)?;
        self.must_get(&action_hash, "newly created")
    }

    /// Append a revision. `origin` is trusted as given; `previous` must be
    /// in the local view.
    pub fn update(
        &self,
        origin: &ActionHash,
        previous: &ActionHash,
        payload: &T,
    ) -> Result<Record, LedgerError> {
        payload.validate()?;
        let action_hash = self.store.commit_update(
            previous,
            T::ENTRY_TYPE,
            Entry::from_payload(payload)?,
            &[LinkFrom {
                base: *origin,
                tag: T::UPDATES_LINK,
            }],
        )?;
        self.must_get(&action_hash, "newly updated")
    }

    /// Resolve any hash in an entity's chain to its latest known revision.
    pub fn get_latest(&self, hash: &ActionHash) -> Result<Option<Record>, LedgerError> {
        let Some(record) = self.store.get_record(hash)? else {
            return Ok(None);
        };
        self.check_kind(&record)?;
        let origin = origin_of(&record)?;

        // Candidates: every revision linked from the origin, plus one extra
        // hop for writers that linked from a revision instead. Targets that
        // have not replicated here yet are skipped.
        let origin_links = self.store.get_links(&origin, T::UPDATES_LINK)?;
        let mut targets = distinct_targets(&origin_links);
        for target in distinct_targets(&origin_links) {
            let further = self.store.get_links(&target, T::UPDATES_LINK)?;
            targets.extend(distinct_targets(&further));
        }
        targets.sort();
        targets.dedup();

        let mut candidates = Vec::with_capacity(targets.len());
        for target in &targets {
            if let Some(found) = self.store.get_record(target)?
                && found.action().entry_type() == Some(T::ENTRY_TYPE)
            {
                candidates.push(found);
            }
        }
        if let Some(latest) = latest_record(candidates) {
            return Ok(Some(latest));
        }

        if origin == *record.action_hash() {
            Ok(Some(record))
        } else {
            self.store.get_record(&origin)
        }
    }

    /// The record stored at `hash`, as is.
    pub fn get_original(&self, hash: &ActionHash) -> Result<Option<Record>, LedgerError> {
        let Some(record) = self.store.get_record(hash)? else {
            return Ok(None);
        };
        self.check_kind(&record)?;
        Ok(Some(record))
    }

    /// Origin record followed by every known revision, oldest first.
    pub fn get_all_revisions(&self, hash: &ActionHash) -> Result<Vec<Record>, LedgerError> {
        let Some(record) = self.store.get_record(hash)? else {
            return Ok(vec![]);
        };
        self.check_kind(&record)?;
        let origin = origin_of(&record)?;
        let origin_record = if origin == *record.action_hash() {
            record
        } else {
            match self.store.get_record(&origin)? {
                Some(r) => r,
                None => return Ok(vec![]),
            }
        };

        let links = self.store.get_links(&origin, T::UPDATES_LINK)?;
        let mut revisions = Vec::new();
        for target in distinct_targets(&links) {
            if let Some(r) = self.store.get_record(&target)? {
                revisions.push(r);
            }
        }
        revisions.sort_by_key(|r| (r.timestamp(), *r.action_hash()));
        revisions.insert(0, origin_record);
        Ok(revisions)
    }

    /// Mark `hash` deleted. The marker is discoverable from the entity's
    /// origin and, for a revision, from the revision itself.
    pub fn delete(&self, hash: &ActionHash) -> Result<ActionHash, LedgerError> {
        let record = self.store.get_record(hash)?.ok_or_else(|| {
            LedgerError::InvalidChainReference(format!(
                "delete target {} is not in the local view",
                hash
            ))
        })?;
        self.check_kind(&record)?;
        let origin = origin_of(&record)?;

        let mut links = vec![LinkFrom {
            base: origin,
            tag: T::DELETES_LINK,
        }];
        if origin != *hash {
            links.push(LinkFrom {
                base: *hash,
                tag: T::DELETES_LINK,
            });
        }
        self.store.commit_delete(hash, &links)
    }

    /// Every known delete marker attached to `hash`, oldest first.
    pub fn get_all_deletes(&self, hash: &ActionHash) -> Result<Vec<ActionHashed>, LedgerError> {
        if let Some(record) = self.store.get_record(hash)? {
            self.check_kind(&record)?;
        }
        let links = self.store.get_links(hash, T::DELETES_LINK)?;
        let mut deletes = Vec::new();
        for target in distinct_targets(&links) {
            let Some(record) = self.store.get_record(&target)? else {
                continue;
            };
            if matches!(record.action().kind, ActionKind::Delete { .. }) {
                deletes.push(record.signed_action);
            }
        }
        sort_oldest_first(&mut deletes);
        Ok(deletes)
    }

    pub fn get_oldest_delete(&self, hash: &ActionHash) -> Result<Option<ActionHashed>, LedgerError> {
        let deletes = self.get_all_deletes(hash)?;
        Ok(oldest_action(&deletes).cloned())
    }

    /// Decode a record of this kind into its payload.
    pub fn payload_of(&self, record: &Record) -> Result<T, LedgerError> {
        record.entry_as::<T>()?.ok_or_else(|| {
            LedgerError::NotFound(format!(
                "entry for {} is not in the local view",
                record.action_hash()
            ))
        })
    }

    fn must_get(&self, hash: &ActionHash, what: &str) -> Result<Record, LedgerError> {
        self.store.get_record(hash)?.ok_or_else(|| {
            LedgerError::NotFound(format!("could not find the {} {}", what, T::ENTRY_TYPE))
        })
    }

    fn check_kind(&self, record: &Record) -> Result<(), LedgerError> {
        match record.action().entry_type() {
            Some(t) if t == T::ENTRY_TYPE => Ok(()),
            Some(other) => Err(LedgerError::MalformedPayload(format!(
                "{} holds a {} entry, not {}",
                record.action_hash(),
                other,
                T::ENTRY_TYPE
            ))),
            None => Err(LedgerError::InvalidChainReference(format!(
                "{} is a Delete action, not a {} revision",
                record.action_hash(),
                T::ENTRY_TYPE
            ))),
        }
    }
}

fn origin_of(record: &Record) -> Result<ActionHash, LedgerError> {
    record
        .action()
        .origin(record.action_hash())
        .ok_or_else(|| {
            LedgerError::InvalidChainReference(format!(
                "{} has no origin: it is a Delete action",
                record.action_hash()
            ))
        })
}

/// Newest record by action timestamp; equal timestamps go to the greater
/// action hash.
pub fn latest_record(records: Vec<Record>) -> Option<Record> {
    records
        .into_iter()
        .max_by_key(|r| (r.timestamp(), *r.action_hash()))
}

pub fn oldest_action(actions: &[ActionHashed]) -> Option<&ActionHashed> {
    actions
        .iter()
        .min_by_key(|a| (a.action.timestamp, a.hash))
}

pub fn sort_oldest_first(actions: &mut [ActionHashed]) {
    actions.sort_by_key(|a| (a.action.timestamp, a.hash));
}

fn distinct_targets(links: &[Link]) -> Vec<ActionHash> {
    let mut seen = BTreeSet::new();
    links
        .iter()
        .filter(|l| seen.insert(l.target))
        .map(|l| l.target)
        .collect()
}
