//! All-or-nothing persistence of an accepted batch.
//!
//! Write order inside the one transaction: new primaries (batched), in-place updates, side
//! entities, links. A link that replaces a stored one is written as an update of that
//! identity. Links refer to rows of the earlier phases by position, so they are built
//! only once those identities exist.

use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use crate::records::LinkDraft;
use crate::store::{Store, Transaction};
use crate::types::{EntityId, TenantId};

/// A primary record: planned insert (by position) or persisted identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum PrimaryRef {
    New(usize),
    Existing(EntityId),
}

/// A side entity: planned insert (by position) or persisted identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SideRef {
    New(usize),
    Existing(EntityId),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlannedLink {
    pub(crate) primary: PrimaryRef,
    pub(crate) side: SideRef,
    pub(crate) draft: LinkDraft,
    /// Stored link this one overwrites in place.
    pub(crate) replaces: Option<EntityId>,
}

/// Everything one job will write.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommitPlan {
    pub(crate) tenant: TenantId,
    pub(crate) inserts: Vec<Entity>,
    pub(crate) updates: Vec<(EntityId, Entity)>,
    pub(crate) sides: Vec<Entity>,
    pub(crate) links: Vec<PlannedLink>,
}

impl CommitPlan {
    pub(crate) fn new(tenant: TenantId) -> Self {
        Self {
            tenant,
            inserts: Vec::new(),
            updates: Vec::new(),
            sides: Vec::new(),
            links: Vec::new(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inserts.is_empty()
            && self.updates.is_empty()
            && self.sides.is_empty()
            && self.links.is_empty()
    }
}

/// Identities assigned by a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Committed {
    pub(crate) inserted: Vec<EntityId>,
    pub(crate) sides: Vec<EntityId>,
    pub(crate) links: Vec<EntityId>,
}

impl Committed {
    pub(crate) fn primary_id(&self, primary: PrimaryRef) -> Option<EntityId> {
        match primary {
            PrimaryRef::New(pos) => self.inserted.get(pos).copied(),
            PrimaryRef::Existing(id) => Some(id),
        }
    }
}

/// Write `plan` in one transaction; on any failure roll back and return the store error.
pub(crate) async fn commit(store: &dyn Store, plan: &CommitPlan) -> StoreResult<Committed> {
    let mut tx = store.begin().await?;

    let written = write_plan(tx.as_mut(), plan).await;
    let result = match written {
        Ok(committed) => tx.commit().await.map(|()| committed),
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        tracing::error!(tenant = %plan.tenant, error = %e, "commit failed, rolling back");
        if let Err(rollback) = tx.rollback().await {
            tracing::error!(tenant = %plan.tenant, error = %rollback, "rollback failed");
        }
    }
    result
}

async fn write_plan(tx: &mut (dyn Transaction + '_), plan: &CommitPlan) -> StoreResult<Committed> {
    let inserted = tx.insert_batch(plan.inserts.clone()).await?;

    for (id, entity) in &plan.updates {
        tx.update(*id, entity.clone()).await?;
    }

    let sides = tx.insert_batch(plan.sides.clone()).await?;

    let mut committed = Committed {
        inserted,
        sides,
        links: Vec::with_capacity(plan.links.len()),
    };

    let mut links = Vec::with_capacity(plan.links.len());
    for link in &plan.links {
        let primary = committed
            .primary_id(link.primary)
            .ok_or_else(|| unresolved("primary", link))?;
        let side = match link.side {
            SideRef::New(pos) => committed.sides.get(pos).copied(),
            SideRef::Existing(id) => Some(id),
        }
        .ok_or_else(|| unresolved("side", link))?;
        let built = link.draft.build(plan.tenant, primary, side);
        match link.replaces {
            Some(id) => {
                tx.update(id, built).await?;
                committed.links.push(id);
            }
            None => links.push(built),
        }
    }
    committed.links.extend(tx.insert_batch(links).await?);

    Ok(committed)
}

fn unresolved(end: &str, link: &PlannedLink) -> StoreError {
    StoreError::Backend(format!("link refers to unplanned {end}: {link:?}"))
}
