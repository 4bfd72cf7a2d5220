//! Repository capability and an in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::resource::Resource;

/// CRUD capability over one resource kind.
#[async_trait]
pub trait Repository<E: Send + 'static>: Send + Sync {
    /// Persist a new entity, returning the stored copy.
    async fn add(&self, entity: E) -> Result<E, CoreError>;

    /// Persist changes to an existing entity.
    async fn save(&self, entity: E) -> Result<E, CoreError>;

    /// Delete an entity, returning the removed copy.
    async fn remove(&self, entity: E) -> Result<E, CoreError>;

    async fn get(&self, id: &str) -> Result<E, CoreError>;

    async fn list(&self) -> Result<Vec<E>, CoreError>;
}

/// Process-local repository keyed by [`Resource::id`], ordered by id.
#[derive(Debug)]
pub struct MemoryRepository<E> {
    items: Mutex<BTreeMap<String, E>>,
}

impl<E> MemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, E>>, CoreError> {
        self.items
            .lock()
            .map_err(|_| CoreError::Internal("repository lock poisoned".into()))
    }
}

impl<E> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E> Repository<E> for MemoryRepository<E>
where
    E: Resource + Clone,
{
    async fn add(&self, entity: E) -> Result<E, CoreError> {
        let mut items = self.lock()?;
        let id = entity.id();
        if items.contains_key(&id) {
            return Err(CoreError::Duplicate(format!("{} {id} already exists", E::KIND)));
        }
        items.insert(id, entity.clone());
        Ok(entity)
    }

    async fn save(&self, entity: E) -> Result<E, CoreError> {
        let mut items = self.lock()?;
        let id = entity.id();
        match items.get_mut(&id) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(entity)
            }
            None => Err(CoreError::NotFound {
                entity: E::KIND,
                id,
            }),
        }
    }

    async fn remove(&self, entity: E) -> Result<E, CoreError> {
        let id = entity.id();
        self.lock()?
            .remove(&id)
            .map(|_| entity)
            .ok_or(CoreError::NotFound {
                entity: E::KIND,
                id,
            })
    }

    async fn get(&self, id: &str) -> Result<E, CoreError> {
        self.lock()?
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: E::KIND,
                id: id.to_string(),
            })
    }

    async fn list(&self) -> Result<Vec<E>, CoreError> {
        Ok(self.lock()?.values().cloned().collect())
    }
}
