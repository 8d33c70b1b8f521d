//! The trust graph and its flattened projection.
//!
//! Entries live in an arena addressed by [`EntryId`]; parent/child edges are ids. The
//! flattened map from subject [`CertId`] to entry is derived from the tree by
//! [`TrustCache::flatten`] and dropped on every structural change.

use crate::cert::cert_id::CertId;
use crate::cert::Certificate;
use crate::entry::CaEntry;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Handle of an entry inside a [`TrustCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised by cache lookups and construction.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CacheError {
    /// No entry has the requested id, or the id is the anchor's.
    #[error("Cache Entry Not Found")]
    NotFound,

    /// `lookup` was called before `flatten`.
    #[error("cache has not been flattened")]
    NotFlattened,

    /// An entry's issuer is missing from the cache.
    #[error("broken path to anchor: no entry for issuer {0}")]
    BrokenPath(CertId),

    /// The walk to the anchor did not terminate within the cache size.
    #[error("cycle detected on path to anchor")]
    Cycle,

    /// An `EntryId` that does not belong to this cache.
    #[error("unknown entry {0}")]
    UnknownEntry(EntryId),

    /// The anchor certificate cannot root a trust graph.
    #[error("invalid trust anchor: {0}")]
    InvalidAnchor(&'static str),
}

/// Tree of authority entries rooted at the trust anchor.
#[derive(Debug, Clone)]
pub struct TrustCache {
    entries: Vec<CaEntry>,
    flat: Option<HashMap<CertId, EntryId>>,
}

const ROOT: EntryId = EntryId(0);

impl TrustCache {
    /// Creates a cache holding only `anchor`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidAnchor`] unless the certificate is a self-signed CA.
    pub fn new(anchor: Certificate) -> Result<Self, CacheError> {
        if !anchor.is_ca() {
            return Err(CacheError::InvalidAnchor("not a CA certificate"));
        }
        if !anchor.is_self_signed() {
            return Err(CacheError::InvalidAnchor("not self-signed"));
        }
        Ok(Self::with_anchor_entry(CaEntry::anchor(anchor)))
    }

    pub(crate) fn with_anchor_entry(anchor: CaEntry) -> Self {
        Self {
            entries: vec![anchor],
            flat: None,
        }
    }

    /// Id of the anchor entry.
    pub fn root(&self) -> EntryId {
        ROOT
    }

    /// The anchor entry.
    pub fn anchor(&self) -> &CaEntry {
        &self.entries[ROOT.0]
    }

    /// Returns the entry for `id`.
    pub fn entry(&self, id: EntryId) -> Option<&CaEntry> {
        self.entries.get(id.0)
    }

    pub(crate) fn entry_mut(&mut self, id: EntryId) -> Option<&mut CaEntry> {
        self.entries.get_mut(id.0)
    }

    /// Adds a detached entry. It becomes part of the tree once attached.
    pub fn insert(&mut self, entry: CaEntry) -> EntryId {
        self.flat = None;
        self.entries.push(entry);
        EntryId(self.entries.len() - 1)
    }

    /// Appends `child` under `parent`. No uniqueness check is made.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownEntry`] if either id is not in this cache.
    pub fn attach_child(&mut self, parent: EntryId, child: EntryId) -> Result<(), CacheError> {
        if self.entry(child).is_none() {
            return Err(CacheError::UnknownEntry(child));
        }
        let parent_entry = self
            .entry_mut(parent)
            .ok_or(CacheError::UnknownEntry(parent))?;
        parent_entry.push_child(child);
        self.flat = None;
        Ok(())
    }

    /// Children of `id` in attachment order.
    pub fn children(&self, id: EntryId) -> impl Iterator<Item = (EntryId, &CaEntry)> {
        self.entry(id)
            .map(CaEntry::children)
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.entry(*child).map(|entry| (*child, entry)))
    }

    /// Pre-order walk of the tree starting at the anchor.
    pub fn walk(&self) -> Vec<EntryId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut pending = vec![ROOT];
        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            if let Some(entry) = self.entry(id) {
                pending.extend(entry.children().iter().rev().copied());
            }
        }
        order
    }

    /// Rebuilds the flattened map from the tree. Duplicate subject ids keep the last entry walked.
    pub fn flatten(&mut self) {
        let flat = self
            .walk()
            .into_iter()
            .filter(|id| *id != ROOT)
            .filter_map(|id| self.entry(id).map(|entry| (entry.subject_id().clone(), id)))
            .collect();
        self.flat = Some(flat);
    }

    /// Returns `true` if the flattened map reflects the current tree.
    pub fn is_flattened(&self) -> bool {
        self.flat.is_some()
    }

    /// The flattened map, if current.
    pub fn flattened(&self) -> Option<&HashMap<CertId, EntryId>> {
        self.flat.as_ref()
    }

    /// Number of entries in the flattened map.
    pub fn len(&self) -> usize {
        self.flat.as_ref().map_or(0, HashMap::len)
    }

    /// Returns `true` when no intermediate is flattened.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves `id` to an entry handle.
    ///
    /// # Errors
    ///
    /// - [`CacheError::NotFlattened`] before [`TrustCache::flatten`].
    /// - [`CacheError::NotFound`] for unknown ids and for the anchor's own id.
    pub fn lookup_id(&self, id: &CertId) -> Result<EntryId, CacheError> {
        let flat = self.flat.as_ref().ok_or(CacheError::NotFlattened)?;
        flat.get(id).copied().ok_or(CacheError::NotFound)
    }

    /// Resolves `id` to its entry.
    ///
    /// # Errors
    ///
    /// See [`TrustCache::lookup_id`].
    pub fn lookup(&self, id: &CertId) -> Result<&CaEntry, CacheError> {
        let entry_id = self.lookup_id(id)?;
        self.entry(entry_id).ok_or(CacheError::NotFound)
    }

    /// Entries from `id` up to and including the anchor.
    ///
    /// # Errors
    ///
    /// Returns the lookup error for `id`, [`CacheError::BrokenPath`] when an issuer is
    /// missing, or [`CacheError::Cycle`] if the walk does not reach the anchor.
    pub fn path_to_anchor(&self, id: &CertId) -> Result<Vec<&CaEntry>, CacheError> {
        let anchor = self.anchor();
        let mut current = self.lookup(id)?;
        let mut path = vec![current];
        let limit = self.len() + 1;

        while current.certificate() != anchor.certificate() {
            if path.len() > limit {
                return Err(CacheError::Cycle);
            }
            let issuer_id = current.issuer_id();
            current = if issuer_id == anchor.subject_id() {
                anchor
            } else {
                self.lookup(issuer_id)
                    .map_err(|_| CacheError::BrokenPath(issuer_id.clone()))?
            };
            path.push(current);
        }
        Ok(path)
    }

    /// Flattened intermediates in tree order.
    pub fn intermediates(&self) -> Vec<&CaEntry> {
        let Some(flat) = self.flat.as_ref() else {
            return Vec::new();
        };
        self.walk()
            .into_iter()
            .filter(|id| *id != ROOT)
            .filter_map(|id| {
                let entry = self.entry(id)?;
                (flat.get(entry.subject_id()) == Some(&id)).then_some(entry)
            })
            .collect()
    }
}
