//! Re-validation of a discovered trust graph.
//!
//! The pass walks the cache from the anchor and builds a new one containing only entries
//! whose certificates validate to the anchor with revocation checking. A failing entry is
//! recorded in the rejection registry and its whole subtree is dropped.

use crate::cache::{EntryId, TrustCache};
use crate::constants::PULLED_FROM_CACHE;
use crate::prelude::{debug, info, warn};
use crate::rejected::RejectionRegistry;
use crate::validator::PathValidator;

/// Counts produced by a validation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    /// Entries that validated.
    pub kept: usize,
    /// Entries that failed validation. Their descendants are not counted.
    pub pruned: usize,
}

/// Validates every entry of `cache` below the anchor and returns the flattened result.
///
/// The anchor entry is carried over without its children. Each other entry is cloned without
/// its previous policy outcome and validated with [`PathValidator::build_path`]; only entries
/// that validate, and their validating descendants, are kept.
pub fn validate_cache(
    cache: &TrustCache,
    validator: &PathValidator,
    registry: &RejectionRegistry,
) -> (TrustCache, ValidationSummary) {
    let mut validated = TrustCache::with_anchor_entry(cache.anchor().detached());
    let mut summary = ValidationSummary::default();
    let root = validated.root();

    validate_children(
        cache,
        cache.root(),
        &mut validated,
        root,
        validator,
        registry,
        &mut summary,
    );
    validated.flatten();

    info!(
        "Validated trust cache; kept={}, pruned={}",
        summary.kept, summary.pruned
    );
    (validated, summary)
}

fn validate_children(
    source: &TrustCache,
    source_parent: EntryId,
    target: &mut TrustCache,
    target_parent: EntryId,
    validator: &PathValidator,
    registry: &RejectionRegistry,
    summary: &mut ValidationSummary,
) {
    let children: Vec<EntryId> = source.children(source_parent).map(|(id, _)| id).collect();
    for child in children {
        let Some(entry) = source.entry(child) else {
            continue;
        };
        let mut entry = entry.detached();

        match validator.build_path(entry.certificate(), true) {
            Ok(result) => {
                debug!(
                    "Entry validated; subject={}, policies={:?}",
                    entry.certificate().subject(),
                    result.outcome.valid_policies
                );
                entry.set_policy_outcome(Some(result.outcome));
                let id = target.insert(entry);
                summary.kept += 1;
                validate_children(source, child, target, id, validator, registry, summary);
                if let Err(e) = target.attach_child(target_parent, id) {
                    warn!("Failed to attach validated entry; error={}", e);
                }
            }
            Err(e) => {
                registry.reject(entry.certificate(), e.to_string(), PULLED_FROM_CACHE);
                summary.pruned += 1;
            }
        }
    }
}
