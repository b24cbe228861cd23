use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{Repository, StoreError};
use crate::models::EmailKeyed;

/// In-process repository keyed by email.
///
/// `add_one` goes through the map's entry API, so the unique-email check and
/// the insert are a single atomic step, matching the database constraint.
#[derive(Clone)]
pub struct MemoryRepository<T> {
    rows: Arc<DashMap<String, T>>,
}

impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self {
            rows: Arc::new(DashMap::new()),
        }
    }
}

impl<T: EmailKeyed + Clone> MemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = T>) -> Self {
        let repo = Self::new();
        for row in rows {
            repo.rows.insert(row.email().to_string(), row);
        }
        repo
    }

    pub fn get(&self, email: &str) -> Option<T> {
        self.rows.get(email).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl<T> Repository<T> for MemoryRepository<T>
where
    T: EmailKeyed + Clone + Send + Sync + 'static,
{
    async fn find_one_by_email(&self, email: &str) -> Result<Option<T>, StoreError> {
        Ok(self.get(email))
    }

    async fn add_one(&self, entity: &T) -> Result<T, StoreError> {
        match self.rows.entry(entity.email().to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(entity.email().to_string())),
            Entry::Vacant(slot) => {
                slot.insert(entity.clone());
                Ok(entity.clone())
            }
        }
    }

    async fn update_one(&self, entity: &T) -> Result<T, StoreError> {
        match self.rows.get_mut(entity.email()) {
            Some(mut row) => {
                *row = entity.clone();
                Ok(entity.clone())
            }
            None => Err(StoreError::NotFound(entity.email().to_string())),
        }
    }
}
