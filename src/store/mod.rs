//! Persistence port consumed by the import pipeline.
//!
//! The pipeline only needs tenant-scoped lookups by natural key and a transaction it can insert
//! and update through. Any backend (SQL, document store, the bundled [`MemoryStore`]) can be
//! plugged in by implementing [`Store`] and [`Transaction`].

mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::entity::{Entity, NaturalKey, StoredEntity};
use crate::error::StoreResult;
use crate::types::{EntityId, TenantId};

pub use memory::MemoryStore;

/// Read side of the port plus the transaction factory.
#[async_trait]
pub trait Store: Send + Sync {
    /// Find the entity owning `key` within `tenant`.
    async fn find_by_natural_key(
        &self,
        tenant: TenantId,
        key: &NaturalKey,
    ) -> StoreResult<Option<StoredEntity>>;

    /// Batched existence query: every key from `keys` that is taken within `tenant`.
    ///
    /// The default issues one lookup per key; backends should override it with a single query.
    async fn find_by_natural_keys(
        &self,
        tenant: TenantId,
        keys: &[NaturalKey],
    ) -> StoreResult<HashMap<NaturalKey, StoredEntity>> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(entity) = self.find_by_natural_key(tenant, key).await? {
                found.insert(key.clone(), entity);
            }
        }
        Ok(found)
    }

    /// Open a transaction. Nothing written through it is visible until [`Transaction::commit`].
    async fn begin<'a>(&'a self) -> StoreResult<Box<dyn Transaction + 'a>>;
}

/// Write side of the port.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait Transaction: Send {
    /// Insert one entity and return its generated identity.
    async fn insert(&mut self, entity: Entity) -> StoreResult<EntityId>;

    /// Insert several entities, returning identities in input order.
    async fn insert_batch(&mut self, entities: Vec<Entity>) -> StoreResult<Vec<EntityId>> {
        let mut ids = Vec::with_capacity(entities.len());
        for entity in entities {
            ids.push(self.insert(entity).await?);
        }
        Ok(ids)
    }

    /// Replace the entity stored under `id`.
    async fn update(&mut self, id: EntityId, entity: Entity) -> StoreResult<()>;

    /// Make every write of this transaction visible atomically.
    async fn commit(&mut self) -> StoreResult<()>;

    /// Discard every write of this transaction.
    async fn rollback(&mut self) -> StoreResult<()>;
}
