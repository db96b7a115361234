//! Duplicate detection and reference resolution.
//!
//! Two levels: the store snapshot fetched once per job by [`prefetch`], and the keys claimed by
//! rows accepted earlier in the same run. A row is checked against both before it is accepted;
//! its keys are claimed only once it is.

use std::collections::{BTreeSet, HashMap};

use crate::entity::{NaturalKey, StoredEntity};
use crate::error::{ImportError, ImportResult};
use crate::records::KeyRef;
use crate::store::Store;
use crate::types::{EntityId, TenantId};

use super::ImportOptions;
use super::report::{RejectReason, RowError};

/// Persisted entities owning any key the job mentions.
pub(crate) type Existing = HashMap<NaturalKey, StoredEntity>;

/// One batched existence query for every key the job mentions.
pub(crate) async fn prefetch(
    store: &dyn Store,
    tenant: TenantId,
    keys: impl IntoIterator<Item = NaturalKey>,
) -> ImportResult<Existing> {
    let keys: Vec<NaturalKey> = keys.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    if keys.is_empty() {
        return Ok(Existing::new());
    }
    tracing::debug!(tenant = %tenant, keys = keys.len(), "prefetching existing keys");
    store
        .find_by_natural_keys(tenant, &keys)
        .await
        .map_err(ImportError::Lookup)
}

/// How an accepted row is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    New,
    Update(EntityId),
}

#[derive(Debug)]
pub(crate) struct Deduplicator<'a> {
    existing: &'a Existing,
    options: &'a ImportOptions,
    claimed: HashMap<NaturalKey, usize>,
}

impl<'a> Deduplicator<'a> {
    pub(crate) fn new(existing: &'a Existing, options: &'a ImportOptions) -> Self {
        Self {
            existing,
            options,
            claimed: HashMap::new(),
        }
    }

    /// Decide insert, update, or rejection for a row identified by `keys` (most specific first).
    pub(crate) fn resolve(&self, row: usize, keys: &[KeyRef]) -> Result<Resolution, RowError> {
        for k in keys {
            if let Some(first) = self.claimed.get(&k.key) {
                return Err(RowError::single(
                    row,
                    RejectReason::Duplicate,
                    format!("Duplicate {k} also appears in row {first}"),
                ));
            }
        }

        let Some((primary, secondary)) = keys.split_first() else {
            return Ok(Resolution::New);
        };
        let owner = |k: &KeyRef| self.existing.get(&k.key).map(|e| e.id);

        match owner(primary) {
            Some(id) => {
                if let Some(other) = secondary.iter().find(|&k| owner(k).is_some_and(|o| o != id)) {
                    return Err(RowError::single(
                        row,
                        RejectReason::Conflict,
                        format!("{other} already belongs to another record"),
                    ));
                }
                if self.options.skip_duplicates {
                    Err(RowError::single(
                        row,
                        RejectReason::Duplicate,
                        format!("{primary} already exists, skipped"),
                    ))
                } else if self.options.update_existing {
                    Ok(Resolution::Update(id))
                } else {
                    Err(RowError::single(
                        row,
                        RejectReason::Duplicate,
                        format!("{primary} already exists"),
                    ))
                }
            }
            None => match secondary.iter().find(|&k| owner(k).is_some()) {
                None => Ok(Resolution::New),
                Some(taken) if self.options.skip_duplicates => Err(RowError::single(
                    row,
                    RejectReason::Duplicate,
                    format!("{taken} already exists, skipped"),
                )),
                Some(taken) if self.options.update_existing => Err(RowError::single(
                    row,
                    RejectReason::Conflict,
                    format!("{taken} already belongs to another record"),
                )),
                Some(taken) => Err(RowError::single(
                    row,
                    RejectReason::Duplicate,
                    format!("{taken} already exists"),
                )),
            },
        }
    }

    /// Identity of the persisted entity `reference` points at.
    pub(crate) fn reference(&self, row: usize, reference: &KeyRef) -> Result<EntityId, RowError> {
        self.existing
            .get(&reference.key)
            .map(|e| e.id)
            .ok_or_else(|| {
                RowError::single(
                    row,
                    RejectReason::MissingReference,
                    format!("{reference} not found"),
                )
            })
    }

    /// Record the keys of an accepted row so later repeats are caught.
    pub(crate) fn claim(&mut self, row: usize, keys: &[KeyRef]) {
        for k in keys {
            self.claimed.entry(k.key.clone()).or_insert(row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Deduplicator, Existing, Resolution};
    use crate::entity::{Entity, KeyKind, SchoolClass, StoredEntity};
    use crate::pipeline::ImportOptions;
    use crate::pipeline::report::RejectReason;
    use crate::records::KeyRef;
    use crate::types::{EntityId, TenantId};

    fn stored(id: i64) -> StoredEntity {
        StoredEntity {
            id: EntityId(id),
            entity: Entity::SchoolClass(SchoolClass {
                tenant_id: TenantId(1),
                name: "placeholder".to_string(),
            }),
        }
    }

    fn keys(student_id: &str, email: &str) -> Vec<KeyRef> {
        vec![
            KeyRef::new(KeyKind::StudentId, student_id),
            KeyRef::new(KeyKind::StudentEmail, email),
        ]
    }

    fn existing() -> Existing {
        let mut map = Existing::new();
        map.insert(KeyRef::new(KeyKind::StudentId, "S-1").key, stored(10));
        map.insert(KeyRef::new(KeyKind::StudentEmail, "one@x.org").key, stored(10));
        map.insert(KeyRef::new(KeyKind::StudentEmail, "two@x.org").key, stored(20));
        map
    }

    fn options(skip: bool, update: bool) -> ImportOptions {
        ImportOptions {
            skip_duplicates: skip,
            update_existing: update,
            validate_only: false,
        }
    }

    #[test]
    fn in_file_repeat_names_the_first_row() {
        let existing = Existing::new();
        let opts = options(true, false);
        let mut d = Deduplicator::new(&existing, &opts);

        assert_eq!(d.resolve(1, &keys("S-9", "nine@x.org")), Ok(Resolution::New));
        d.claim(1, &keys("S-9", "nine@x.org"));

        let err = d.resolve(4, &keys("S-10", "NINE@x.org")).unwrap_err();
        assert_eq!(err.reason, RejectReason::Duplicate);
        assert_eq!(err.detail(), "Row 4: Duplicate Email 'NINE@x.org' also appears in row 1");
    }

    #[test]
    fn persisted_match_follows_the_options() {
        let existing = existing();

        let skip = options(true, true);
        let err = Deduplicator::new(&existing, &skip)
            .resolve(1, &keys("S-1", "one@x.org"))
            .unwrap_err();
        assert_eq!(err.messages, vec!["StudentId 'S-1' already exists, skipped"]);

        let update = options(false, true);
        assert_eq!(
            Deduplicator::new(&existing, &update).resolve(1, &keys("S-1", "one@x.org")),
            Ok(Resolution::Update(EntityId(10)))
        );

        let neither = options(false, false);
        let err = Deduplicator::new(&existing, &neither)
            .resolve(1, &keys("S-1", "one@x.org"))
            .unwrap_err();
        assert_eq!(err.messages, vec!["StudentId 'S-1' already exists"]);
    }

    #[test]
    fn secondary_key_owned_elsewhere_is_a_conflict() {
        let existing = existing();
        let update = options(false, true);
        let d = Deduplicator::new(&existing, &update);

        let err = d.resolve(2, &keys("S-1", "two@x.org")).unwrap_err();
        assert_eq!(err.reason, RejectReason::Conflict);
        assert_eq!(err.messages, vec!["Email 'two@x.org' already belongs to another record"]);

        let err = d.resolve(3, &keys("S-new", "two@x.org")).unwrap_err();
        assert_eq!(err.reason, RejectReason::Conflict);
    }

    #[test]
    fn missing_reference_is_reported() {
        let existing = existing();
        let opts = ImportOptions::default();
        let d = Deduplicator::new(&existing, &opts);
        let err = d
            .reference(5, &KeyRef::new(KeyKind::ClassName, "Grade 12"))
            .unwrap_err();
        assert_eq!(err.reason, RejectReason::MissingReference);
        assert_eq!(err.detail(), "Row 5: Class 'Grade 12' not found");
    }
}
