use crate::domain::post::{seed_posts, BlogPost};
use crate::domain::settings::AutoBlogSettings;
use crate::storage::{KvBackend, LockFile, LockGuard};
use crate::time::clock::Clock;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub const POSTS_KEY: &str = "tradenexus_blogs";
pub const SETTINGS_KEY: &str = "tradenexus_settings";

const STORE_LOCK: &str = "store";
const RUN_LOCK: &str = "autoblog-run";

/// Owner of the canonical post list and auto-blog settings.
///
/// Every operation is a full read-modify-write of one key, serialised within
/// the process and, for shared backends, across processes. Callers must
/// re-read instead of caching values across awaits.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
    write_lock: Arc<Mutex<()>>,
    store_lock: Option<LockFile>,
}

struct Exclusive<'a> {
    _shared: Option<LockGuard>,
    _local: MutexGuard<'a, ()>,
}

impl Store {
    pub fn new(backend: Arc<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        let store_lock = backend.lock_file(STORE_LOCK);
        Self {
            backend,
            clock,
            write_lock: Arc::new(Mutex::new(())),
            store_lock,
        }
    }

    /// Cross-process guard for auto-blog runs; `None` for private backends.
    pub fn run_lock(&self) -> Option<LockFile> {
        self.backend.lock_file(RUN_LOCK)
    }

    async fn exclusive(&self) -> anyhow::Result<Exclusive<'_>> {
        let local = self.write_lock.lock().await;
        let shared = match &self.store_lock {
            Some(lock) => Some(lock.acquire().await?),
            None => None,
        };
        Ok(Exclusive {
            _shared: shared,
            _local: local,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// All posts, newest first. Seeds example posts on first access.
    pub async fn list_posts(&self) -> anyhow::Result<Vec<BlogPost>> {
        let _guard = self.exclusive().await?;
        self.load_posts().await
    }

    async fn load_posts(&self) -> anyhow::Result<Vec<BlogPost>> {
        if let Some(posts) = self.read_json::<Vec<BlogPost>>(POSTS_KEY).await? {
            return Ok(posts);
        }

        let seeded = seed_posts(self.clock.now_millis());
        self.write_json(POSTS_KEY, &seeded).await?;
        tracing::info!(count = seeded.len(), "seeded example posts");
        Ok(seeded)
    }

    pub async fn get_post(&self, id: &str) -> anyhow::Result<Option<BlogPost>> {
        Ok(self.list_posts().await?.into_iter().find(|p| p.id == id))
    }

    /// Prepends `post`. Identifier uniqueness is the caller's responsibility.
    pub async fn add_post(&self, post: BlogPost) -> anyhow::Result<()> {
        let _guard = self.exclusive().await?;
        let mut posts = self.load_posts().await?;
        posts.insert(0, post);
        self.write_json(POSTS_KEY, &posts).await
    }

    /// Removes the post with `id`. Absent ids are a silent no-op.
    pub async fn delete_post(&self, id: &str) -> anyhow::Result<()> {
        let _guard = self.exclusive().await?;
        let mut posts = self.load_posts().await?;
        posts.retain(|p| p.id != id);
        self.write_json(POSTS_KEY, &posts).await
    }

    /// Current settings, writing the defaults on first access.
    pub async fn get_settings(&self) -> anyhow::Result<AutoBlogSettings> {
        let _guard = self.exclusive().await?;
        if let Some(settings) = self.read_json::<AutoBlogSettings>(SETTINGS_KEY).await? {
            return Ok(settings);
        }

        let defaults = AutoBlogSettings::default();
        self.write_json(SETTINGS_KEY, &defaults).await?;
        Ok(defaults)
    }

    pub async fn update_settings(&self, settings: &AutoBlogSettings) -> anyhow::Result<()> {
        let _guard = self.exclusive().await?;
        self.write_json(SETTINGS_KEY, settings).await
    }

    /// Applies `f` to the current settings and writes the result back as one
    /// serialised read-modify-write. Returns the stored value.
    pub async fn modify_settings<F>(&self, f: F) -> anyhow::Result<AutoBlogSettings>
    where
        F: FnOnce(&mut AutoBlogSettings) -> anyhow::Result<()>,
    {
        let _guard = self.exclusive().await?;
        let mut settings = self
            .read_json::<AutoBlogSettings>(SETTINGS_KEY)
            .await?
            .unwrap_or_default();
        f(&mut settings)?;
        self.write_json(SETTINGS_KEY, &settings).await?;
        Ok(settings)
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let Some(raw) = self
            .backend
            .get(key)
            .await
            .with_context(|| format!("store read failed (key={key})"))?
        else {
            return Ok(None);
        };

        let value = serde_json::from_str::<T>(&raw)
            .with_context(|| format!("malformed JSON in store (key={key})"))?;
        Ok(Some(value))
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize store value (key={key})"))?;
        self.backend
            .set(key, &raw)
            .await
            .with_context(|| format!("store write failed (key={key})"))
    }
}
