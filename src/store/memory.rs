use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::entity::{Entity, EntityKind, NaturalKey, StoredEntity};
use crate::error::{StoreError, StoreResult};
use crate::types::{EntityId, TenantId};

use super::{Store, Transaction};

/// In-process [`Store`] with tenant-scoped unique indexes.
///
/// Transactions stage their writes against a private copy and replay them onto the shared state
/// on commit, so a failed or dropped transaction leaves nothing behind. Identities come from a
/// shared counter and are never reused, even after a rollback.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    next_id: AtomicI64,
    fail_after_writes: Mutex<Option<usize>>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    entities: BTreeMap<EntityId, Entity>,
    index: HashMap<(TenantId, NaturalKey), EntityId>,
}

#[derive(Debug, Clone)]
enum Write {
    Insert(EntityId, Entity),
    Update(EntityId, Entity),
}

impl MemoryState {
    fn claim(&self, tenant: TenantId, id: EntityId, keys: &[NaturalKey]) -> StoreResult<()> {
        for key in keys {
            if let Some(&owner) = self.index.get(&(tenant, key.clone())) {
                if owner != id {
                    return Err(StoreError::UniqueViolation {
                        key: key.clone(),
                        existing: owner,
                    });
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, write: Write) -> StoreResult<()> {
        match write {
            Write::Insert(id, entity) => {
                let tenant = entity.tenant_id();
                let keys = entity.natural_keys();
                self.claim(tenant, id, &keys)?;
                for key in keys {
                    self.index.insert((tenant, key), id);
                }
                self.entities.insert(id, entity);
            }
            Write::Update(id, entity) => {
                let previous = self.entities.get(&id).ok_or(StoreError::NotFound(id))?;
                let old_tenant = previous.tenant_id();
                let old_keys = previous.natural_keys();

                let tenant = entity.tenant_id();
                let keys = entity.natural_keys();
                self.claim(tenant, id, &keys)?;

                for key in old_keys {
                    self.index.remove(&(old_tenant, key));
                }
                for key in keys {
                    self.index.insert((tenant, key), id);
                }
                self.entities.insert(id, entity);
            }
        }
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            next_id: AtomicI64::new(1),
            fail_after_writes: Mutex::new(None),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn allocate_id(&self) -> EntityId {
        EntityId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Insert and commit an entity directly, bypassing transactions.
    ///
    /// Used to load reference data (classes, existing students) the pipeline looks up.
    pub fn seed(&self, entity: Entity) -> StoreResult<EntityId> {
        let id = self.allocate_id();
        self.lock()?.apply(Write::Insert(id, entity))?;
        Ok(id)
    }

    /// Make the next transaction fail on the write following the first `writes` successful ones.
    pub fn fail_after_writes(&self, writes: usize) {
        if let Ok(mut slot) = self.fail_after_writes.lock() {
            *slot = Some(writes);
        }
    }

    /// Committed entity by identity.
    pub fn get(&self, id: EntityId) -> Option<Entity> {
        self.lock().ok()?.entities.get(&id).cloned()
    }

    /// Committed entities of `kind`, in identity order.
    pub fn entities(&self, kind: EntityKind) -> Vec<StoredEntity> {
        match self.lock() {
            Ok(state) => state
                .entities
                .iter()
                .filter(|(_, e)| e.kind() == kind)
                .map(|(id, e)| StoredEntity {
                    id: *id,
                    entity: e.clone(),
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Number of committed entities of `kind`.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities(kind).len()
    }

    /// Number of committed entities of any kind.
    pub fn len(&self) -> usize {
        self.lock().map(|s| s.entities.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entities", &self.len())
            .finish()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_by_natural_key(
        &self,
        tenant: TenantId,
        key: &NaturalKey,
    ) -> StoreResult<Option<StoredEntity>> {
        let state = self.lock()?;
        Ok(state.index.get(&(tenant, key.clone())).and_then(|id| {
            state.entities.get(id).map(|e| StoredEntity {
                id: *id,
                entity: e.clone(),
            })
        }))
    }

    async fn find_by_natural_keys(
        &self,
        tenant: TenantId,
        keys: &[NaturalKey],
    ) -> StoreResult<HashMap<NaturalKey, StoredEntity>> {
        let state = self.lock()?;
        let mut found = HashMap::new();
        for key in keys {
            let Some(id) = state.index.get(&(tenant, key.clone())) else {
                continue;
            };
            if let Some(entity) = state.entities.get(id) {
                found.insert(
                    key.clone(),
                    StoredEntity {
                        id: *id,
                        entity: entity.clone(),
                    },
                );
            }
        }
        Ok(found)
    }

    async fn begin<'a>(&'a self) -> StoreResult<Box<dyn Transaction + 'a>> {
        let working = self.lock()?.clone();
        let fail_at = self
            .fail_after_writes
            .lock()
            .map(|mut slot| slot.take())
            .unwrap_or(None);
        Ok(Box::new(MemoryTransaction {
            store: self,
            working,
            writes: Vec::new(),
            fail_at,
            active: true,
        }))
    }
}

struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    working: MemoryState,
    writes: Vec<Write>,
    fail_at: Option<usize>,
    active: bool,
}

impl MemoryTransaction<'_> {
    fn stage(&mut self, write: Write) -> StoreResult<()> {
        if !self.active {
            return Err(StoreError::TransactionClosed);
        }
        if self.fail_at == Some(self.writes.len()) {
            return Err(StoreError::Backend(format!(
                "injected failure on write {}",
                self.writes.len() + 1
            )));
        }
        self.working.apply(write.clone())?;
        self.writes.push(write);
        Ok(())
    }
}

#[async_trait]
impl<'a> Transaction for MemoryTransaction<'a> {
    async fn insert(&mut self, entity: Entity) -> StoreResult<EntityId> {
        let id = self.store.allocate_id();
        self.stage(Write::Insert(id, entity))?;
        Ok(id)
    }

    async fn update(&mut self, id: EntityId, entity: Entity) -> StoreResult<()> {
        self.stage(Write::Update(id, entity))
    }

    async fn commit(&mut self) -> StoreResult<()> {
        if !self.active {
            return Err(StoreError::TransactionClosed);
        }
        self.active = false;

        let mut state = self.store.lock()?;
        let mut next = state.clone();
        for write in self.writes.drain(..) {
            next.apply(write)?;
        }
        *state = next;
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        self.active = false;
        self.writes.clear();
        Ok(())
    }
}
