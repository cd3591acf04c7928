use crate::autoblog::random::RandomSource;
use crate::domain::post::{BlogPost, PostDefaults};
use crate::llm::ContentGenerator;
use crate::storage::Store;
use crate::time::clock::Clock;
use anyhow::{ensure, Context};
use std::sync::Arc;

/// Generate-assemble-store pipeline shared by the trigger and operator actions.
#[derive(Clone)]
pub struct Publisher {
    store: Store,
    generator: Arc<dyn ContentGenerator>,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn RandomSource>,
}

impl Publisher {
    pub fn new(
        store: Store,
        generator: Arc<dyn ContentGenerator>,
        clock: Arc<dyn Clock>,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            generator,
            clock,
            rng,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn rng(&self) -> &dyn RandomSource {
        self.rng.as_ref()
    }

    /// Generates a post for `topic` and prepends it to the store.
    pub async fn publish(&self, topic: &str, defaults: PostDefaults) -> anyhow::Result<BlogPost> {
        let draft = self
            .generator
            .generate(topic)
            .await
            .with_context(|| format!("generation failed (topic={topic})"))?;

        let post = BlogPost::from_draft(
            draft,
            defaults,
            self.clock.now_millis(),
            self.rng.next_u64(),
        );
        self.store.add_post(post.clone()).await?;

        tracing::info!(
            %topic,
            post_id = %post.id,
            title = %post.title,
            provider = self.generator.provider().as_str(),
            "published blog post"
        );
        Ok(post)
    }

    /// Operator-initiated generation for a chosen topic. Settings are untouched.
    pub async fn publish_manual(&self, topic: &str) -> anyhow::Result<BlogPost> {
        let topic = topic.trim();
        ensure!(!topic.is_empty(), "topic must be non-empty");
        self.publish(topic, PostDefaults::MANUAL).await
    }
}
