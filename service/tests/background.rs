//! Task worker and announcement scheduler.

#![allow(clippy::unwrap_used)]

use conference_core::cache::{ANNOUNCEMENT_KEY, featured_speaker_key};
use conference_core::error::TaskError;
use conference_core::task::{Task, TaskQueue};
use conference_service::background::{
    AnnouncementScheduler, CONFIRMATION_SUBJECT, ChannelTaskQueue, Email, MailError, Mailer, TaskWorker,
};
use conference_service::forms::{ConferenceForm, SessionForm};
use conference_service::{ConferenceEnvironment, ConferenceService};
use conference_testing::{InMemoryCache, InMemoryEntityStore, fixtures};
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

impl Mailer for RecordingMailer {
    fn send(&self, email: Email) -> BoxFuture<'_, Result<(), MailError>> {
        self.sent.lock().unwrap().push(email);
        Box::pin(async { Ok(()) })
    }
}

struct FailingMailer;

impl Mailer for FailingMailer {
    fn send(&self, _email: Email) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async { Err(MailError("relay down".into())) })
    }
}

fn channel_service(capacity: usize) -> (ConferenceService, InMemoryCache, tokio::sync::mpsc::Receiver<Task>) {
    let (queue, receiver) = ChannelTaskQueue::new(capacity);
    let cache = InMemoryCache::new();
    let env = ConferenceEnvironment::new(
        Arc::new(InMemoryEntityStore::new()),
        Arc::new(cache.clone()),
        Arc::new(queue),
    );
    (ConferenceService::new(env), cache, receiver)
}

#[tokio::test]
async fn worker_sends_confirmation_and_refreshes_featured_speaker() {
    let (service, cache, receiver) = channel_service(16);
    let mailer = Arc::new(RecordingMailer::default());
    let organizer = fixtures::identity("organizer");

    let conference = service
        .create_conference(
            &organizer,
            &ConferenceForm {
                name: Some("RustConf".into()),
                city: Some("Portland".into()),
                ..ConferenceForm::default()
            },
        )
        .await
        .unwrap();
    service
        .create_session(
            &organizer,
            &conference.key.to_websafe(),
            &SessionForm {
                name: Some("Ownership".into()),
                speaker: Some("ada".into()),
                ..SessionForm::default()
            },
        )
        .await
        .unwrap();

    let (shutdown, signal) = watch::channel(false);
    let worker = TaskWorker::new(service.clone(), mailer.clone(), receiver).spawn(signal);
    shutdown.send(true).unwrap();
    worker.await.unwrap();

    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "organizer@example.com");
    assert_eq!(sent[0].subject, CONFIRMATION_SUBJECT);
    assert!(sent[0].body.contains("Name: RustConf"));
    assert!(sent[0].body.contains("City: Portland"));
    assert_eq!(
        cache.entry(&featured_speaker_key(&conference.key)).as_deref(),
        Some("Featured speaker: ada. Sessions: Ownership")
    );
}

#[tokio::test]
async fn failed_task_does_not_stop_the_worker() {
    let (service, cache, receiver) = channel_service(16);
    let queue = service.environment().tasks.clone();
    let conference = fixtures::conference("organizer", 1, "Empty", 10);
    queue
        .enqueue(Task::SendConfirmationEmail {
            email: "organizer@example.com".into(),
            conference_info: "Name: Empty".into(),
        })
        .await
        .unwrap();
    queue
        .enqueue(Task::RefreshFeaturedSpeaker {
            conference: conference.key.clone(),
        })
        .await
        .unwrap();

    let (shutdown, signal) = watch::channel(false);
    let worker = TaskWorker::new(service, Arc::new(FailingMailer), receiver).spawn(signal);
    shutdown.send(true).unwrap();
    worker.await.unwrap();

    // The refresh ran after the failed email and found no speakers.
    assert!(!cache.contains_key(&featured_speaker_key(&conference.key)));
}

#[tokio::test]
async fn full_queue_is_reported_to_the_producer() {
    let (queue, _receiver) = ChannelTaskQueue::new(1);
    let task = Task::RefreshFeaturedSpeaker {
        conference: fixtures::conference("organizer", 1, "Busy", 10).key,
    };

    queue.enqueue(task.clone()).await.unwrap();
    let err = queue.enqueue(task).await.unwrap_err();

    assert_eq!(err, TaskError::Full);
}

#[tokio::test]
async fn closed_queue_does_not_fail_conference_creation() {
    let (service, _cache, receiver) = channel_service(4);
    drop(receiver);

    let conference = service
        .create_conference(
            &fixtures::identity("organizer"),
            &ConferenceForm {
                name: Some("Still Created".into()),
                ..ConferenceForm::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(service.get_conference(&conference.key.to_websafe()).await.unwrap(), conference);
}

#[tokio::test]
async fn scheduler_refreshes_until_shutdown() {
    let (service, cache, _receiver) = channel_service(16);
    let organizer = fixtures::identity("organizer");
    let conference = service
        .create_conference(
            &organizer,
            &ConferenceForm {
                name: Some("Tiny".into()),
                max_attendees: Some(2),
                ..ConferenceForm::default()
            },
        )
        .await
        .unwrap();

    let (shutdown, signal) = watch::channel(false);
    let scheduler = AnnouncementScheduler::new(service.clone(), Duration::from_millis(50)).spawn(signal);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(cache.entry(ANNOUNCEMENT_KEY).unwrap().ends_with("Tiny"));

    service
        .update_conference(
            &organizer,
            &conference.key.to_websafe(),
            &ConferenceForm {
                max_attendees: Some(100),
                ..ConferenceForm::default()
            },
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!cache.contains_key(ANNOUNCEMENT_KEY));

    shutdown.send(true).unwrap();
    scheduler.await.unwrap();
}
