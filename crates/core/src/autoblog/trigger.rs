use crate::autoblog::publish::Publisher;
use crate::autoblog::random::choose;
use crate::autoblog::status::{PublishedPost, TriggerError, TriggerState, TriggerStatus};
use crate::domain::post::PostDefaults;
use crate::domain::settings::AutoBlogSettings;
use crate::storage::LockGuard;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Result of one eligibility check.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Disabled,
    NotDue {
        elapsed_hours: f64,
        frequency_hours: f64,
    },
    /// Another run held the guard; nothing was done.
    Busy,
    Published(PublishedPost),
    Failed(String),
}

/// Why an operator-forced run did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ForcedRunRejected {
    #[error("an auto-blog run is already in progress")]
    Busy,
    #[error("auto-blog is disabled")]
    Disabled,
}

struct RunPermit<'a> {
    _shared: Option<LockGuard>,
    _local: MutexGuard<'a, ()>,
}

/// Periodic auto-publish check.
///
/// The check-then-act sequence (read settings, generate, store post, stamp
/// `last_run`) runs under one guard: an in-process mutex plus, for file-backed
/// stores, a lock file that other processes on the same store also take. No two
/// runs publish for the same window, whether they share a process or not.
pub struct AutoBlogTrigger {
    publisher: Publisher,
    run_guard: Mutex<()>,
    status: watch::Sender<TriggerStatus>,
}

impl AutoBlogTrigger {
    pub fn new(publisher: Publisher) -> Self {
        let (status, _) = watch::channel(TriggerStatus::default());
        Self {
            publisher,
            run_guard: Mutex::new(()),
            status,
        }
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn status(&self) -> TriggerStatus {
        self.status.borrow().clone()
    }

    /// Scheduled check. Never returns an error; failures are logged, recorded in
    /// the status, and leave `last_run` untouched so the next tick retries.
    pub async fn tick(&self) -> TickOutcome {
        let _permit = match self.try_begin() {
            Ok(Some(permit)) => permit,
            Ok(None) => {
                tracing::warn!("auto blog run already in progress; skipping tick");
                return TickOutcome::Busy;
            }
            Err(err) => return self.fail(self.publisher.clock().now_millis(), err),
        };

        let started_at = self.publisher.clock().now_millis();
        self.status
            .send_modify(|s| s.last_checked_at = Some(started_at));

        let settings = match self.publisher.store().get_settings().await {
            Ok(settings) => settings,
            Err(err) => return self.fail(started_at, err),
        };

        if !settings.is_enabled {
            tracing::debug!("auto blog disabled");
            return TickOutcome::Disabled;
        }

        let elapsed_hours = settings.hours_since_last_run(started_at);
        if !settings.is_due(started_at) {
            tracing::debug!(
                elapsed_hours,
                frequency_hours = settings.frequency_hours,
                "auto blog not due"
            );
            return TickOutcome::NotDue {
                elapsed_hours,
                frequency_hours: settings.frequency_hours,
            };
        }

        tracing::info!(
            elapsed_hours,
            frequency_hours = settings.frequency_hours,
            "auto blog triggered"
        );
        match self.run(&settings, started_at, PostDefaults::AUTO).await {
            Ok(published) => TickOutcome::Published(published),
            Err(err) => self.fail(started_at, err),
        }
    }

    /// Operator-forced run: skips the elapsed-time check but still requires the
    /// feature to be enabled. Errors go back to the caller.
    pub async fn trigger_now(&self) -> anyhow::Result<PublishedPost> {
        let started_at = self.publisher.clock().now_millis();
        let result = self.forced_run(started_at).await;
        if let Err(err) = &result {
            if err.downcast_ref::<ForcedRunRejected>().is_none() {
                self.record_error(started_at, err);
            }
        }
        result
    }

    async fn forced_run(&self, started_at: i64) -> anyhow::Result<PublishedPost> {
        let Some(_permit) = self.try_begin()? else {
            return Err(ForcedRunRejected::Busy.into());
        };

        let settings = self.publisher.store().get_settings().await?;
        if !settings.is_enabled {
            return Err(ForcedRunRejected::Disabled.into());
        }

        tracing::info!("auto blog forced by operator");
        self.run(&settings, started_at, PostDefaults::AUTO_FORCED)
            .await
    }

    /// Takes the in-process guard, then the store's cross-process run lock if
    /// the backend has one. `Ok(None)` means another run holds either.
    fn try_begin(&self) -> anyhow::Result<Option<RunPermit<'_>>> {
        let Ok(local) = self.run_guard.try_lock() else {
            return Ok(None);
        };
        let shared = match self.publisher.store().run_lock() {
            Some(lock) => match lock.try_acquire()? {
                Some(held) => Some(held),
                None => return Ok(None),
            },
            None => None,
        };
        Ok(Some(RunPermit {
            _shared: shared,
            _local: local,
        }))
    }

    /// Runs `tick` every `period` until the handle is aborted. The first check
    /// happens one full period after spawning.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await; // first tick completes immediately
            loop {
                interval.tick().await;
                let _ = self.tick().await;
            }
        })
    }

    async fn run(
        &self,
        settings: &AutoBlogSettings,
        started_at: i64,
        defaults: PostDefaults,
    ) -> anyhow::Result<PublishedPost> {
        let topic = choose(self.publisher.rng(), &settings.topics)
            .cloned()
            .context("no topics configured for auto-blog")?;

        self.status.send_modify(|s| {
            s.state = TriggerState::Generating {
                topic: topic.clone(),
                started_at,
            }
        });

        let result = self.publish_and_stamp(&topic, started_at, defaults).await;

        self.status.send_modify(|s| {
            s.state = TriggerState::Idle;
            if let Ok(published) = &result {
                s.last_published = Some(published.clone());
                s.last_error = None;
            }
        });
        result
    }

    async fn publish_and_stamp(
        &self,
        topic: &str,
        started_at: i64,
        defaults: PostDefaults,
    ) -> anyhow::Result<PublishedPost> {
        let post = self.publisher.publish(topic, defaults).await?;

        // Stamp the check start, not the completion time. Settings are re-read so
        // edits made while generating are kept.
        self.publisher
            .store()
            .modify_settings(|s| {
                s.last_run = s.last_run.max(started_at);
                Ok(())
            })
            .await
            .context("failed to record auto-blog last run")?;

        Ok(PublishedPost {
            post_id: post.id,
            title: post.title,
            topic: topic.to_string(),
            published_at: post.timestamp,
        })
    }

    fn fail(&self, at: i64, err: anyhow::Error) -> TickOutcome {
        tracing::error!(error = %format!("{err:#}"), "auto blog failed");
        self.record_error(at, &err);
        TickOutcome::Failed(format!("{err:#}"))
    }

    fn record_error(&self, at: i64, err: &anyhow::Error) {
        let message = format!("{err:#}");
        self.status.send_modify(|s| {
            s.state = TriggerState::Idle;
            s.last_error = Some(TriggerError { message, at });
        });
    }
}
