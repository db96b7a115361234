//! Find-or-create of side entities and the links joining them to primaries.

use std::collections::HashMap;

use crate::entity::{Entity, NaturalKey};
use crate::error::{ImportError, ImportResult};
use crate::records::{LinkDraft, SideDraft};
use crate::store::Store;
use crate::types::EntityId;

use super::commit::{CommitPlan, PlannedLink, PrimaryRef, SideRef};
use super::dedup::{Existing, Resolution};

/// Accumulates the commit plan row by row.
///
/// Side entities resolve first against those planned earlier in the run, then against the store
/// snapshot; only a key absent from both produces a new side entity. The first row that names a
/// side entity decides its details.
#[derive(Debug)]
pub(crate) struct Synthesizer<'a> {
    existing: &'a Existing,
    planned_sides: HashMap<NaturalKey, SideRef>,
    plan: CommitPlan,
}

impl<'a> Synthesizer<'a> {
    pub(crate) fn new(existing: &'a Existing, plan: CommitPlan) -> Self {
        Self {
            existing,
            planned_sides: HashMap::new(),
            plan,
        }
    }

    /// Plan the primary of an accepted row plus its side entity and link.
    pub(crate) fn add(
        &mut self,
        resolution: Resolution,
        primary: Entity,
        side: Option<SideDraft>,
        link: LinkDraft,
    ) -> PrimaryRef {
        let primary_ref = match resolution {
            Resolution::New => {
                self.plan.inserts.push(primary);
                PrimaryRef::New(self.plan.inserts.len() - 1)
            }
            Resolution::Update(id) => {
                self.plan.updates.push((id, primary));
                PrimaryRef::Existing(id)
            }
        };

        if let Some(side) = side {
            let side_ref = self.side(side);
            self.plan.links.push(PlannedLink {
                primary: primary_ref,
                side: side_ref,
                draft: link,
                replaces: None,
            });
        }
        primary_ref
    }

    fn side(&mut self, draft: SideDraft) -> SideRef {
        if let Some(planned) = self.planned_sides.get(&draft.key.key) {
            return *planned;
        }
        let side_ref = match self.existing.get(&draft.key.key) {
            Some(found) => SideRef::Existing(found.id),
            None => {
                tracing::trace!(key = %draft.key, "planning new side entity");
                self.plan.sides.push(draft.entity);
                SideRef::New(self.plan.sides.len() - 1)
            }
        };
        self.planned_sides.insert(draft.key.key, side_ref);
        side_ref
    }

    pub(crate) fn into_plan(self) -> CommitPlan {
        self.plan
    }
}

/// What reconciling planned links against the store changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LinkReconciliation {
    pub(crate) dropped: usize,
    pub(crate) replaced: usize,
}

/// Check the planned links of updated primaries against the links the store holds.
///
/// A link the store already holds is dropped. For link kinds that allow one link per primary, a
/// stored link to another side is overwritten in place. Only update-mode rows can meet stored
/// links, so this costs one lookup per updated row at most.
pub(crate) async fn reconcile_existing_links(
    store: &dyn Store,
    plan: &mut CommitPlan,
) -> ImportResult<LinkReconciliation> {
    let mut outcome = LinkReconciliation::default();
    let mut kept = Vec::with_capacity(plan.links.len());
    for mut link in std::mem::take(&mut plan.links) {
        let Some(key) = stored_link_key(&link) else {
            kept.push(link);
            continue;
        };
        let found = store
            .find_by_natural_key(plan.tenant, &key)
            .await
            .map_err(ImportError::Lookup)?;
        let Some(found) = found else {
            kept.push(link);
            continue;
        };

        let stored_side = found.entity.link_ends().map(|(_, side)| side);
        if stored_side.is_some() && stored_side == existing_side(&link) {
            outcome.dropped += 1;
        } else {
            link.replaces = Some(found.id);
            outcome.replaced += 1;
            kept.push(link);
        }
    }
    plan.links = kept;
    Ok(outcome)
}

fn stored_link_key(link: &PlannedLink) -> Option<NaturalKey> {
    let PrimaryRef::Existing(primary) = link.primary else {
        return None;
    };
    match (link.draft.owner_key(primary), existing_side(link)) {
        (Some(key), _) => Some(key),
        (None, Some(side)) => Some(link.draft.key(primary, side)),
        (None, None) => None,
    }
}

fn existing_side(link: &PlannedLink) -> Option<EntityId> {
    match link.side {
        SideRef::Existing(id) => Some(id),
        SideRef::New(_) => None,
    }
}
