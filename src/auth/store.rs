use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::auth::session::SessionData;

/// In-place change applied to a record while the store holds it exclusively.
pub type SessionEdit<'a> = Box<dyn FnOnce(&mut SessionData) + Send + 'a>;

/// Server-side session records, keyed by the id carried in the `sid` cookie.
///
/// Writes go through [`SessionStore::update`] and [`SessionStore::rotate`] so
/// that concurrent requests on one session only touch the fields they own.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns `None` for unknown or expired ids.
    async fn load(&self, id: &str) -> anyhow::Result<Option<SessionData>>;

    /// Applies `edit` to the live record under `id`. With `create`, a missing
    /// or expired record is replaced by a fresh one first; without it the
    /// edit is dropped and `false` returned.
    async fn update(&self, id: &str, create: bool, edit: SessionEdit<'_>) -> anyhow::Result<bool>;

    /// Moves the live record from `old_id` to `new_id`, applying `edit` on
    /// the way. `false` when there is nothing to move.
    async fn rotate(&self, old_id: &str, new_id: &str, edit: SessionEdit<'_>) -> anyhow::Result<bool>;

    async fn destroy(&self, id: &str) -> anyhow::Result<()>;

    /// Drops expired records, returning how many were removed.
    async fn purge_expired(&self) -> anyhow::Result<usize>;
}

/// Single-process store. Sessions are lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<String, SessionData>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> anyhow::Result<Option<SessionData>> {
        let now = now();
        {
            let map = self.records.read().await;
            match map.get(id) {
                None => return Ok(None),
                Some(data) if !data.is_expired(now) => return Ok(Some(data.clone())),
                Some(_) => {}
            }
        }
        self.records.write().await.remove(id);
        Ok(None)
    }

    async fn update(&self, id: &str, create: bool, edit: SessionEdit<'_>) -> anyhow::Result<bool> {
        let now = now();
        let mut map = self.records.write().await;
        let data = match map.entry(id.to_string()) {
            Entry::Occupied(e) if !e.get().is_expired(now) => e.into_mut(),
            Entry::Occupied(e) if create => {
                let data = e.into_mut();
                *data = SessionData::new();
                data
            }
            Entry::Vacant(e) if create => e.insert(SessionData::new()),
            Entry::Occupied(e) => {
                e.remove();
                return Ok(false);
            }
            Entry::Vacant(_) => return Ok(false),
        };
        edit(data);
        Ok(true)
    }

    async fn rotate(&self, old_id: &str, new_id: &str, edit: SessionEdit<'_>) -> anyhow::Result<bool> {
        let now = now();
        let mut map = self.records.write().await;
        let Some(mut data) = map.remove(old_id).filter(|d| !d.is_expired(now)) else {
            return Ok(false);
        };
        edit(&mut data);
        map.insert(new_id.to_string(), data);
        Ok(true)
    }

    async fn destroy(&self, id: &str) -> anyhow::Result<()> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn purge_expired(&self) -> anyhow::Result<usize> {
        let now = now();
        let mut map = self.records.write().await;
        let before = map.len();
        map.retain(|_, data| !data.is_expired(now));
        Ok(before - map.len())
    }
}
