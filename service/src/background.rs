//! Background processing: the task queue consumer and the announcement
//! scheduler.
//!
//! # Example
//!
//! ```rust,no_run
//! use conference_service::background::{AnnouncementScheduler, ChannelTaskQueue, TaskWorker, TracingMailer};
//! # use conference_service::ConferenceService;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::sync::watch;
//!
//! # fn example(service: ConferenceService) {
//! let (queue, receiver) = ChannelTaskQueue::new(256);
//! // hand `queue` to the service environment, then:
//! let (shutdown, signal) = watch::channel(false);
//! let worker = TaskWorker::new(service.clone(), Arc::new(TracingMailer), receiver).spawn(signal.clone());
//! let scheduler = AnnouncementScheduler::new(service, Duration::from_secs(3600)).spawn(signal);
//! # }
//! ```

use crate::service::ConferenceService;
use conference_core::error::{ConferenceError, TaskError};
use conference_core::task::{Task, TaskQueue};
use conference_runtime::metrics::TaskMetrics;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Subject line of the conference confirmation email.
pub const CONFIRMATION_SUBJECT: &str = "You created a new Conference!";

/// Errors from delivering an email.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Errors from processing one task.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The conference operation behind the task failed
    #[error(transparent)]
    Conference(#[from] ConferenceError),
    /// The email could not be delivered
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// An outgoing email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Email {
    /// Recipient
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

impl Email {
    /// Confirmation sent to the organizer of a new conference.
    #[must_use]
    pub fn conference_confirmation(to: &str, conference_info: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: CONFIRMATION_SUBJECT.to_string(),
            body: format!("Hi, you have created a following conference:\r\n\r\n{conference_info}"),
        }
    }
}

/// Email delivery.
pub trait Mailer: Send + Sync {
    /// Deliver `email`.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] if delivery fails.
    fn send(&self, email: Email) -> BoxFuture<'_, Result<(), MailError>>;
}

/// [`Mailer`] that only logs what it would send.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingMailer;

impl Mailer for TracingMailer {
    fn send(&self, email: Email) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
            Ok(())
        })
    }
}

/// Bounded in-process [`TaskQueue`] backed by a tokio channel.
#[derive(Clone, Debug)]
pub struct ChannelTaskQueue {
    sender: mpsc::Sender<Task>,
}

impl ChannelTaskQueue {
    /// Create a queue holding at most `capacity` pending tasks, and the
    /// receiver a [`TaskWorker`] consumes.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Task>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl TaskQueue for ChannelTaskQueue {
    fn enqueue(&self, task: Task) -> BoxFuture<'_, Result<(), TaskError>> {
        let result = self.sender.try_send(task).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => TaskError::Full,
            mpsc::error::TrySendError::Closed(_) => TaskError::Closed,
        });
        Box::pin(async move { result })
    }
}

/// Consumes tasks from a [`ChannelTaskQueue`].
pub struct TaskWorker {
    service: ConferenceService,
    mailer: Arc<dyn Mailer>,
    receiver: mpsc::Receiver<Task>,
}

impl TaskWorker {
    /// Creates a new `TaskWorker`.
    #[must_use]
    pub fn new(service: ConferenceService, mailer: Arc<dyn Mailer>, receiver: mpsc::Receiver<Task>) -> Self {
        Self {
            service,
            mailer,
            receiver,
        }
    }

    /// Run on a tokio task until `shutdown` turns `true` or the queue closes.
    #[must_use]
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Process tasks in arrival order. A failed task is logged and dropped.
    ///
    /// On shutdown, tasks already queued are processed before returning.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Task worker started");
        loop {
            tokio::select! {
                task = self.receiver.recv() => match task {
                    Some(task) => self.handle(task).await,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.receiver.close();
                        while let Some(task) = self.receiver.recv().await {
                            self.handle(task).await;
                        }
                        break;
                    }
                }
            }
        }
        tracing::info!("Task worker stopped");
    }

    async fn handle(&self, task: Task) {
        let name = task.name();
        match self.process(task).await {
            Ok(()) => TaskMetrics::record_processed(name),
            Err(error) => {
                TaskMetrics::record_failed(name);
                tracing::error!(task = name, %error, "Task failed");
            },
        }
    }

    /// Process a single task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError`] if the underlying operation or delivery fails.
    pub async fn process(&self, task: Task) -> Result<(), WorkerError> {
        match task {
            Task::SendConfirmationEmail { email, conference_info } => {
                self.mailer
                    .send(Email::conference_confirmation(&email, &conference_info))
                    .await?;
            },
            Task::RefreshFeaturedSpeaker { conference } => {
                self.service.refresh_featured_speaker(&conference).await?;
            },
        }
        Ok(())
    }
}

/// Periodically recomputes the announcement.
pub struct AnnouncementScheduler {
    service: ConferenceService,
    interval: Duration,
}

impl AnnouncementScheduler {
    /// Creates a new `AnnouncementScheduler`.
    #[must_use]
    pub const fn new(service: ConferenceService, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Run on a tokio task until `shutdown` turns `true` or its sender is dropped.
    #[must_use]
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Refresh immediately, then once per interval.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "Announcement scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(error) = self.service.refresh_announcement().await {
                        tracing::warn!(%error, "Announcement refresh failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Announcement scheduler stopped");
    }
}
