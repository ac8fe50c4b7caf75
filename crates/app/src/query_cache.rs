use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use agora_core::CoreError;
use agora_core::domain::comments::Comment;
use agora_core::domain::communities::Community;
use agora_core::domain::posts::Post;
use agora_core::domain::votes::Vote;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

const MAX_READ_ATTEMPTS: usize = 3;
const IDLE_STALE_MULTIPLE: u32 = 4;
const MIN_IDLE_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Posts,
    CommunityPosts(i64),
    Post(i64),
    Comments(i64),
    Votes(i64),
    Communities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Posts,
    Comments { post_id: i64 },
    Votes { post_id: i64 },
    Communities,
}

impl QueryKey {
    // posts carry comment and like counts, so they follow comments and votes too
    pub fn depends_on(self, resource: Resource) -> bool {
        match (self, resource) {
            (QueryKey::Posts | QueryKey::CommunityPosts(_), Resource::Posts)
            | (QueryKey::Posts | QueryKey::CommunityPosts(_), Resource::Comments { .. })
            | (QueryKey::Posts | QueryKey::CommunityPosts(_), Resource::Votes { .. }) => true,
            (QueryKey::Post(id), Resource::Comments { post_id })
            | (QueryKey::Post(id), Resource::Votes { post_id }) => id == post_id,
            (QueryKey::Comments(id), Resource::Comments { post_id }) => id == post_id,
            (QueryKey::Votes(id), Resource::Votes { post_id }) => id == post_id,
            (QueryKey::Communities, Resource::Communities) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum QueryData {
    Posts(Vec<Post>),
    Post(Post),
    Comments(Vec<Comment>),
    Votes(Vec<Vote>),
    Communities(Vec<Community>),
}

pub trait Cached: Clone {
    fn into_data(self) -> QueryData;
    fn from_data(data: &QueryData) -> Option<&Self>;
}

macro_rules! cached {
    ($ty:ty, $variant:ident) => {
        impl Cached for $ty {
            fn into_data(self) -> QueryData {
                QueryData::$variant(self)
            }

            fn from_data(data: &QueryData) -> Option<&Self> {
                match data {
                    QueryData::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

cached!(Vec<Post>, Posts);
cached!(Post, Post);
cached!(Vec<Comment>, Comments);
cached!(Vec<Vote>, Votes);
cached!(Vec<Community>, Communities);

#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Pending,
    Error(String),
    Success(T),
}

#[derive(Debug)]
struct Entry {
    generation: u64,
    data: Option<QueryData>,
    fetched_at: Option<Instant>,
    stale: bool,
    error: Option<String>,
    last_read: Instant,
}

impl Entry {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            data: None,
            fetched_at: None,
            stale: false,
            error: None,
            last_read: Instant::now(),
        }
    }

    fn fresh(&self, stale_time: Duration) -> Option<&QueryData> {
        if self.stale {
            return None;
        }
        let fetched_at = self.fetched_at?;
        if fetched_at.elapsed() >= stale_time {
            return None;
        }
        self.data.as_ref()
    }
}

#[derive(Debug, Default)]
struct Entries {
    next_generation: u64,
    map: HashMap<QueryKey, Entry>,
}

impl Entries {
    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn entry(&mut self, key: QueryKey) -> &mut Entry {
        let generation = self.next_generation + 1;
        match self.map.entry(key) {
            MapEntry::Occupied(entry) => entry.into_mut(),
            MapEntry::Vacant(entry) => {
                self.next_generation = generation;
                entry.insert(Entry::new(generation))
            }
        }
    }
}

/// Process-wide read cache shared by every view through [`crate::forum::Forum`].
///
/// Each entry carries a generation taken from one counter. Invalidation, eviction and
/// `clear` move entries to a new generation, and a response is only stored when the
/// generation it started under is still current. Entries no view has read for
/// `idle_after` are dropped by [`QueryCache::evict_idle`].
#[derive(Debug, Clone)]
pub struct QueryCache {
    entries: Arc<RwLock<Entries>>,
    stale_time: Duration,
    idle_after: Duration,
}

impl QueryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries::default())),
            stale_time,
            idle_after: (stale_time * IDLE_STALE_MULTIPLE).max(MIN_IDLE_AFTER),
        }
    }

    pub fn idle_after(&self) -> Duration {
        self.idle_after
    }

    pub async fn read<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, CoreError>
    where
        T: Cached,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        self.load(key, fetch, true).await
    }

    /// Refetches `key` without counting as a read, so background refreshes never keep an
    /// abandoned entry alive.
    pub async fn refresh<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, CoreError>
    where
        T: Cached,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        self.invalidate_key(key).await;
        self.load(key, fetch, false).await
    }

    async fn load<T, F, Fut>(&self, key: QueryKey, fetch: F, touch: bool) -> Result<T, CoreError>
    where
        T: Cached,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let generation = {
                let mut entries = self.entries.write().await;
                let entry = entries.entry(key);
                if touch {
                    entry.last_read = Instant::now();
                }
                if let Some(value) = entry.fresh(self.stale_time).and_then(T::from_data) {
                    return Ok(value.clone());
                }
                entry.generation
            };

            let result = fetch().await;

            let mut entries = self.entries.write().await;
            let entry = entries.entry(key);
            if entry.generation != generation {
                debug!(?key, attempt, "discarding response for invalidated query");
                if attempt < MAX_READ_ATTEMPTS {
                    continue;
                }
                return result;
            }
            match &result {
                Ok(value) => {
                    entry.data = Some(value.clone().into_data());
                    entry.fetched_at = Some(Instant::now());
                    entry.stale = false;
                    entry.error = None;
                }
                Err(err) => {
                    entry.error = Some(err.to_string());
                }
            }
            return result;
        }
    }

    pub async fn invalidate(&self, resource: Resource) -> usize {
        let mut entries = self.entries.write().await;
        let keys: Vec<QueryKey> = entries
            .map
            .keys()
            .copied()
            .filter(|key| key.depends_on(resource))
            .collect();
        for key in &keys {
            let generation = entries.bump();
            if let Some(entry) = entries.map.get_mut(key) {
                entry.generation = generation;
                entry.stale = true;
            }
        }
        debug!(?resource, invalidated = keys.len(), "invalidated cached queries");
        keys.len()
    }

    pub async fn invalidate_key(&self, key: QueryKey) {
        let mut entries = self.entries.write().await;
        let generation = entries.bump();
        if let Some(entry) = entries.map.get_mut(&key) {
            entry.generation = generation;
            entry.stale = true;
        }
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let dropped = entries.map.len();
        entries.map.clear();
        debug!(dropped, "query cache cleared");
    }

    pub async fn keys(&self) -> Vec<QueryKey> {
        self.entries.read().await.map.keys().copied().collect()
    }

    pub async fn active_keys(&self) -> Vec<QueryKey> {
        let entries = self.entries.read().await;
        entries
            .map
            .iter()
            .filter(|(_, entry)| entry.last_read.elapsed() < self.idle_after)
            .map(|(key, _)| *key)
            .collect()
    }

    pub async fn evict_idle(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.map.len();
        let idle_after = self.idle_after;
        entries
            .map
            .retain(|_, entry| entry.last_read.elapsed() < idle_after);
        let evicted = before - entries.map.len();
        if evicted > 0 {
            debug!(evicted, "evicted idle queries");
        }
        evicted
    }

    pub async fn state<T: Cached>(&self, key: QueryKey) -> Option<QueryState<T>> {
        let entries = self.entries.read().await;
        let entry = entries.map.get(&key)?;
        if let Some(error) = entry.error.as_ref() {
            return Some(QueryState::Error(error.clone()));
        }
        let state = match entry.data.as_ref().and_then(T::from_data) {
            Some(value) => QueryState::Success(value.clone()),
            None => QueryState::Pending,
        };
        Some(state)
    }
}
