//! End-to-end walkthrough of the conference service against in-memory
//! backends.
//!
//! ```sh
//! LOG_FILTER=debug cargo run -p conference-service --bin demo
//! ```

use conference_core::ConferenceError;
use conference_core::filter::ConferenceFilter;
use conference_runtime::metrics::MetricsServer;
use conference_service::background::{AnnouncementScheduler, ChannelTaskQueue, TaskWorker, TracingMailer};
use conference_service::forms::{ConferenceForm, SessionForm};
use conference_service::{Config, ConferenceEnvironment, ConferenceService};
use conference_testing::{InMemoryCache, InMemoryEntityStore, fixtures};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&config.log_filter)?)
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(?config, "Configuration loaded");

    let metrics = match config.metrics_addr {
        Some(addr) => {
            let mut server = MetricsServer::new(addr);
            server.start()?;
            Some(server)
        },
        None => None,
    };

    let (queue, receiver) = ChannelTaskQueue::new(config.background.task_queue_capacity);
    let env = ConferenceEnvironment::new(
        Arc::new(InMemoryEntityStore::new()),
        Arc::new(InMemoryCache::new()),
        Arc::new(queue),
    )
    .with_retry_policy(config.retry_policy());
    let service = ConferenceService::new(env);

    let (shutdown, signal) = watch::channel(false);
    let worker = TaskWorker::new(service.clone(), Arc::new(TracingMailer), receiver).spawn(signal.clone());
    let scheduler = AnnouncementScheduler::new(service.clone(), config.announcement_refresh_interval()).spawn(signal);

    run_walkthrough(&service).await?;

    shutdown.send(true)?;
    scheduler.await?;
    worker.await?;

    if let Some(body) = metrics.as_ref().and_then(MetricsServer::render) {
        info!("Metrics snapshot:\n{body}");
    }
    Ok(())
}

async fn run_walkthrough(service: &ConferenceService) -> Result<(), ConferenceError> {
    let organizer = fixtures::identity("organizer");
    let conference = service
        .create_conference(
            &organizer,
            &ConferenceForm {
                name: Some("RustConf".into()),
                city: Some("Montreal".into()),
                topics: Some(vec!["Rust".into(), "Systems".into()]),
                start_date: Some("2026-09-08".into()),
                end_date: Some("2026-09-11".into()),
                max_attendees: Some(4),
                ..ConferenceForm::default()
            },
        )
        .await?;
    let websafe = conference.key.to_websafe();
    info!(conference = %websafe, "Created conference");

    for (name, speaker) in [("Async in depth", "ferris"), ("Unsafe audits", "ferris"), ("Const generics", "corro")] {
        service
            .create_session(
                &organizer,
                &websafe,
                &SessionForm {
                    name: Some(name.into()),
                    speaker: Some(speaker.into()),
                    date: Some("2026-09-09".into()),
                    start_time: Some("10:00".into()),
                    duration: Some(45),
                    ..SessionForm::default()
                },
            )
            .await?;
    }

    for user in ["alice", "bob", "carol"] {
        service.register(&fixtures::identity(user), &websafe).await?;
    }
    let dave = fixtures::identity("dave");
    service.register(&dave, &websafe).await?;
    if let Err(err) = service.register(&fixtures::identity("erin"), &websafe).await {
        warn!(code = err.code(), "Registration rejected as expected");
    }

    let sessions = service.conference_sessions(&websafe).await?;
    if let Some(session) = sessions.first() {
        service.add_to_wishlist(&dave, &session.key.to_websafe()).await?;
    }
    info!(wishlist = service.wishlist(&dave).await?.len(), "Wishlist");

    let found = service
        .query_conferences(&[
            ConferenceFilter::new("CITY", "EQ", "Montreal"),
            ConferenceFilter::new("MAX_ATTENDEES", "GT", "2"),
        ])
        .await?;
    info!(results = found.len(), "Query executed");

    service.unregister(&dave, &websafe).await?;
    info!(announcement = %service.refresh_announcement().await?, "Announcement");

    // Refresh inline rather than waiting on the worker
    let featured = service.refresh_featured_speaker(&conference.key).await?;
    info!(%featured, "Featured speaker");
    Ok(())
}
