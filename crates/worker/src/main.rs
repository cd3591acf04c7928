use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradenexus_core::autoblog::random::OsRandom;
use tradenexus_core::autoblog::{AutoBlogTrigger, Publisher, TickOutcome};
use tradenexus_core::llm::gemini::GeminiClient;
use tradenexus_core::llm::ContentGenerator;
use tradenexus_core::storage::{FileKv, KvBackend, MemoryKv, Store};
use tradenexus_core::time::clock::{Clock, SystemClock};

#[derive(Debug, Parser)]
#[command(name = "tradenexus_worker")]
struct Args {
    /// Use a throwaway in-memory store instead of TRADENEXUS_STORE_DIR.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single auto-blog eligibility check (for cron-driven deployments).
    Tick {
        /// Report whether a run is due without generating anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a post for a topic and publish it.
    Generate {
        #[arg(long)]
        topic: String,

        /// Print the generated draft without storing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print all posts as JSON, newest first.
    List,

    /// Delete a post by id.
    Delete {
        #[arg(long)]
        id: String,
    },

    /// Inspect or change auto-blog settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    Enable,
    Disable,
    AddTopic { topic: String },
    Frequency { hours: f64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = tradenexus_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backend: Arc<dyn KvBackend> = if args.ephemeral {
        Arc::new(MemoryKv::new())
    } else {
        Arc::new(FileKv::open(&settings.store_dir).await?)
    };
    let store = Store::new(backend, clock.clone());
    tracing::debug!(backend = store.backend_name(), "store opened");

    match args.command {
        Command::Tick { dry_run: true } => {
            let s = store.get_settings().await?;
            let now = clock.now_millis();
            tracing::info!(
                enabled = s.is_enabled,
                elapsed_hours = s.hours_since_last_run(now),
                frequency_hours = s.frequency_hours,
                due = s.is_enabled && s.is_due(now),
                dry_run = true,
                "auto blog check"
            );
        }
        Command::Tick { dry_run: false } => {
            let generator = Arc::new(GeminiClient::from_settings(&settings)?);
            let publisher = Publisher::new(store, generator, clock, Arc::new(OsRandom));
            let trigger = AutoBlogTrigger::new(publisher);

            match trigger.tick().await {
                TickOutcome::Published(p) => {
                    tracing::info!(post_id = %p.post_id, topic = %p.topic, "auto blog published");
                    println!("{}", serde_json::to_string_pretty(&p)?);
                }
                TickOutcome::Failed(message) => {
                    sentry_anyhow::capture_anyhow(&anyhow::anyhow!(message.clone()));
                    tracing::error!(error = %message, "auto blog tick failed");
                }
                other => tracing::info!(outcome = ?other, "auto blog tick finished"),
            }
        }
        Command::Generate {
            topic,
            dry_run: true,
        } => {
            let generator = GeminiClient::from_settings(&settings)?;
            let draft = generator
                .generate(&topic)
                .await
                .with_context(|| format!("generation failed (topic={topic})"))?;
            println!("{}", serde_json::to_string_pretty(&draft)?);
        }
        Command::Generate {
            topic,
            dry_run: false,
        } => {
            let generator = Arc::new(GeminiClient::from_settings(&settings)?);
            let publisher = Publisher::new(store, generator, clock, Arc::new(OsRandom));
            let post = publisher.publish_manual(&topic).await.map_err(|e| {
                sentry_anyhow::capture_anyhow(&e);
                e
            })?;
            println!("{}", serde_json::to_string_pretty(&post)?);
        }
        Command::List => {
            let posts = store.list_posts().await?;
            println!("{}", serde_json::to_string_pretty(&posts)?);
        }
        Command::Delete { id } => {
            store.delete_post(&id).await?;
            tracing::info!(post_id = %id, "post deleted");
        }
        Command::Settings { action } => {
            let updated = match action {
                SettingsAction::Show => store.get_settings().await?,
                SettingsAction::Enable => {
                    store
                        .modify_settings(|s| {
                            s.is_enabled = true;
                            Ok(())
                        })
                        .await?
                }
                SettingsAction::Disable => {
                    store
                        .modify_settings(|s| {
                            s.is_enabled = false;
                            Ok(())
                        })
                        .await?
                }
                SettingsAction::AddTopic { topic } => {
                    store
                        .modify_settings(|s| s.add_topic(&topic).map(|_| ()))
                        .await?
                }
                SettingsAction::Frequency { hours } => {
                    store
                        .modify_settings(|s| s.set_frequency_hours(hours))
                        .await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
    }

    Ok(())
}

fn init_sentry(settings: &tradenexus_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
