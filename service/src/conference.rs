//! Conference creation, editing and queries.

use crate::forms::{
    ConferenceForm, DEFAULT_CITY, DEFAULT_TOPICS, check_date_order, non_blank, parse_date, required,
};
use crate::service::{ConferenceService, require_organizer};
use chrono::Datelike;
use conference_core::error::{ConferenceError, Result, ValidationError};
use conference_core::filter::{ConferenceFilter, build_query_plan};
use conference_core::key::{ConferenceKey, EntityKey, EntityKind};
use conference_core::model::{CallerIdentity, Conference, Entity};
use conference_core::store::{Property, Query, SortOrder};
use conference_core::task::Task;
use conference_runtime::run_transaction;
use tracing::instrument;

fn month_of(start: Option<chrono::NaiveDate>) -> u32 {
    start.map_or(0, |date| date.month())
}

fn conferences(entities: Vec<Entity>) -> Vec<Conference> {
    entities.into_iter().filter_map(Entity::into_conference).collect()
}

/// Trimmed form topics with blank entries dropped.
fn non_blank_topics(form: &ConferenceForm) -> Vec<String> {
    form.topics
        .iter()
        .flatten()
        .filter_map(|topic| non_blank(Some(topic.as_str())))
        .collect()
}

/// Plain-text summary sent to the organizer.
fn confirmation_summary(conference: &Conference) -> String {
    let mut summary = format!("Name: {}", conference.name);
    if let Some(description) = &conference.description {
        summary.push_str(&format!("\r\nDescription: {description}"));
    }
    if let Some(city) = &conference.city {
        summary.push_str(&format!("\r\nCity: {city}"));
    }
    summary.push_str(&format!("\r\nTopics: {}", conference.topics.join(", ")));
    if let Some(start) = conference.start_date {
        summary.push_str(&format!("\r\nStart date: {start}"));
    }
    if let Some(end) = conference.end_date {
        summary.push_str(&format!("\r\nEnd date: {end}"));
    }
    summary.push_str(&format!("\r\nMax attendees: {}", conference.max_attendees));
    summary
}

impl ConferenceService {
    /// Create a conference organized by the caller.
    ///
    /// Missing city, topics and capacity take their defaults. Seats available
    /// start equal to max attendees. The organizer is sent a confirmation
    /// through the task queue.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: missing name, unparseable date, end before start
    /// - `Store`: entity store failure
    #[instrument(skip_all, fields(user_id = %identity.user_id))]
    pub async fn create_conference(&self, identity: &CallerIdentity, form: &ConferenceForm) -> Result<Conference> {
        let name = required("name", form.name.as_deref())?;
        let start_date = parse_date("startDate", form.start_date.as_deref())?;
        let end_date = parse_date("endDate", form.end_date.as_deref())?;
        check_date_order(start_date, end_date)?;

        let topics = non_blank_topics(form);
        let topics = if topics.is_empty() {
            DEFAULT_TOPICS.iter().map(ToString::to_string).collect()
        } else {
            topics
        };
        let max_attendees = form.max_attendees.unwrap_or(0);

        let profile = self.get_profile(identity).await?;
        let parent: EntityKey = profile.key.clone().into();
        let id = self.env.store.allocate_id(&parent, EntityKind::Conference).await?;

        let conference = Conference {
            key: ConferenceKey::new(profile.key, id),
            name,
            description: non_blank(form.description.as_deref()),
            organizer_user_id: identity.user_id.clone(),
            topics,
            city: Some(non_blank(form.city.as_deref()).unwrap_or_else(|| DEFAULT_CITY.to_string())),
            start_date,
            end_date,
            month: month_of(start_date),
            max_attendees,
            seats_available: max_attendees,
        };
        self.env.store.put(conference.clone().into()).await?;
        tracing::info!(conference = %conference.key, name = %conference.name, "Conference created");

        self.enqueue(Task::SendConfirmationEmail {
            email: identity.email.clone(),
            conference_info: confirmation_summary(&conference),
        })
        .await;

        Ok(conference)
    }

    /// Overwrite the provided fields of a conference the caller organizes.
    ///
    /// A new capacity keeps the number of taken seats: seats available shift
    /// by the difference. Runs as a transaction over the conference because
    /// the seat count races with registration.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: invalid key or date, end before start, capacity below
    ///   current registrations
    /// - `NotFound`: no such conference
    /// - `Forbidden`: caller is not the organizer
    /// - `Store`: entity store failure
    #[instrument(skip_all, fields(user_id = %identity.user_id, conference = websafe_key))]
    pub async fn update_conference(
        &self,
        identity: &CallerIdentity,
        websafe_key: &str,
        form: &ConferenceForm,
    ) -> Result<Conference> {
        let key: EntityKey = ConferenceKey::from_websafe(websafe_key)?.into();
        let start_date = parse_date("startDate", form.start_date.as_deref())?;
        let end_date = parse_date("endDate", form.end_date.as_deref())?;
        let store = &self.env.store;
        let key = &key;

        let updated = run_transaction(&self.env.retry, "update_conference", || async move {
            let mut txn = store.begin(vec![key.clone()]).await?;
            let mut conference = txn
                .get(key)
                .await?
                .and_then(Entity::into_conference)
                .ok_or_else(|| ConferenceError::not_found(EntityKind::Conference, websafe_key))?;
            require_organizer(identity, &conference, "update the conference")?;

            if let Some(name) = non_blank(form.name.as_deref()) {
                conference.name = name;
            }
            if let Some(description) = non_blank(form.description.as_deref()) {
                conference.description = Some(description);
            }
            if let Some(city) = non_blank(form.city.as_deref()) {
                conference.city = Some(city);
            }
            let topics = non_blank_topics(form);
            if !topics.is_empty() {
                conference.topics = topics;
            }
            if start_date.is_some() {
                conference.start_date = start_date;
                conference.month = month_of(start_date);
            }
            if end_date.is_some() {
                conference.end_date = end_date;
            }
            check_date_order(conference.start_date, conference.end_date)?;

            if let Some(max_attendees) = form.max_attendees {
                let registered = conference.seats_taken();
                if max_attendees < registered {
                    return Err(ValidationError::MaxAttendeesBelowRegistrations {
                        requested: max_attendees,
                        registered,
                    }
                    .into());
                }
                conference.max_attendees = max_attendees;
                conference.seats_available = max_attendees - registered;
            }

            txn.put(conference.clone().into())?;
            txn.commit().await?;
            Ok(conference)
        })
        .await?;

        tracing::info!(seats_available = updated.seats_available, "Conference updated");
        Ok(updated)
    }

    /// The conference a websafe key names.
    ///
    /// # Errors
    ///
    /// `BadRequest` for a malformed key, `NotFound` when it does not resolve.
    pub async fn get_conference(&self, websafe_key: &str) -> Result<Conference> {
        self.load_conference(websafe_key).await
    }

    /// Conferences organized by the caller, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `Store` errors from the entity store.
    #[instrument(skip_all, fields(user_id = %identity.user_id))]
    pub async fn conferences_created(&self, identity: &CallerIdentity) -> Result<Vec<Conference>> {
        let query = Query::new(EntityKind::Conference)
            .with_ancestor(identity.profile_key())
            .order_by(SortOrder::ascending(Property::Name));
        Ok(conferences(self.env.store.query(&query).await?))
    }

    /// Conferences the caller is registered for, in registration order.
    ///
    /// # Errors
    ///
    /// Returns `Store` errors from the entity store.
    #[instrument(skip_all, fields(user_id = %identity.user_id))]
    pub async fn conferences_to_attend(&self, identity: &CallerIdentity) -> Result<Vec<Conference>> {
        let profile = self.get_profile(identity).await?;
        let keys: Vec<EntityKey> = profile
            .conference_keys_to_attend
            .into_iter()
            .map(EntityKey::from)
            .collect();
        let found = self.env.store.get_multi(&keys).await?;
        Ok(conferences(found.into_iter().flatten().collect()))
    }

    /// Validate `filters` and run the resulting query.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: invalid field, operator or value, or inequality
    ///   filters on more than one field
    /// - `Store`: entity store failure
    #[instrument(skip_all, fields(filters = filters.len()))]
    pub async fn query_conferences(&self, filters: &[ConferenceFilter]) -> Result<Vec<Conference>> {
        let plan = build_query_plan(filters)?;
        let results = conferences(self.env.store.query(&plan.to_query()).await?);
        tracing::debug!(results = results.len(), "Conference query executed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use crate::forms::ConferenceForm;
    use crate::testing::service;
    use conference_core::error::{ConferenceError, ErrorKind};
    use conference_core::key::EntityKind;
    use conference_core::task::Task;
    use conference_testing::fixtures;

    fn form(name: &str) -> ConferenceForm {
        ConferenceForm {
            name: Some(name.into()),
            ..ConferenceForm::default()
        }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_derives_fields() {
        let (service, backends) = service();
        let identity = fixtures::identity("org");

        let conference = service
            .create_conference(
                &identity,
                &ConferenceForm {
                    start_date: Some("2026-05-01".into()),
                    end_date: Some("2026-05-03".into()),
                    max_attendees: Some(40),
                    ..form("RustConf")
                },
            )
            .await
            .unwrap();

        assert_eq!(conference.city.as_deref(), Some("Default City"));
        assert_eq!(conference.topics, vec!["Default", "Topic"]);
        assert_eq!(conference.month, 5);
        assert_eq!(conference.seats_available, 40);
        assert_eq!(conference.organizer_user_id, "org");
        assert_eq!(conference.key.organizer, identity.profile_key());
        assert_eq!(backends.store.count(EntityKind::Profile), 1);

        let tasks = backends.tasks.tasks();
        assert!(matches!(
            &tasks[..],
            [Task::SendConfirmationEmail { email, conference_info }]
                if email == "org@example.com" && conference_info.contains("RustConf")
        ));
    }

    #[tokio::test]
    async fn create_without_start_date_has_month_zero() {
        let (service, _) = service();
        let conference = service
            .create_conference(&fixtures::identity("org"), &form("Undated"))
            .await
            .unwrap();

        assert_eq!(conference.month, 0);
        assert_eq!(conference.max_attendees, 0);
        assert_eq!(conference.seats_available, 0);
    }

    #[tokio::test]
    async fn create_rejects_missing_name_and_reversed_dates() {
        let (service, backends) = service();
        let identity = fixtures::identity("org");

        let err = service
            .create_conference(&identity, &ConferenceForm::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MISSING_FIELD");

        let err = service
            .create_conference(
                &identity,
                &ConferenceForm {
                    start_date: Some("2026-05-03".into()),
                    end_date: Some("2026-05-01".into()),
                    ..form("Backwards")
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "END_BEFORE_START");
        assert_eq!(backends.store.count(EntityKind::Conference), 0);
    }

    #[tokio::test]
    async fn enqueue_failure_does_not_fail_creation() {
        let (service, backends) = service();
        backends.tasks.close();

        let created = service.create_conference(&fixtures::identity("org"), &form("Quiet")).await;

        assert!(created.is_ok());
        assert_eq!(backends.store.count(EntityKind::Conference), 1);
    }

    #[tokio::test]
    async fn update_shifts_seats_by_capacity_delta() {
        let (service, _) = service();
        let organizer = fixtures::identity("org");
        let conference = service
            .create_conference(&organizer, &ConferenceForm { max_attendees: Some(10), ..form("Resize") })
            .await
            .unwrap();
        let websafe = conference.key.to_websafe();
        service.register(&fixtures::identity("a"), &websafe).await.unwrap();
        service.register(&fixtures::identity("b"), &websafe).await.unwrap();

        let grown = service
            .update_conference(&organizer, &websafe, &ConferenceForm { max_attendees: Some(20), ..ConferenceForm::default() })
            .await
            .unwrap();
        assert_eq!((grown.max_attendees, grown.seats_available), (20, 18));

        let err = service
            .update_conference(&organizer, &websafe, &ConferenceForm { max_attendees: Some(1), ..ConferenceForm::default() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MAX_ATTENDEES_BELOW_REGISTRATIONS");
    }

    #[tokio::test]
    async fn update_rederives_month_and_requires_organizer() {
        let (service, _) = service();
        let organizer = fixtures::identity("org");
        let conference = service.create_conference(&organizer, &form("Moving")).await.unwrap();
        let websafe = conference.key.to_websafe();

        let updated = service
            .update_conference(
                &organizer,
                &websafe,
                &ConferenceForm {
                    start_date: Some("2026-09-10".into()),
                    city: Some("Lisbon".into()),
                    ..ConferenceForm::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.month, 9);
        assert_eq!(updated.city.as_deref(), Some("Lisbon"));
        assert_eq!(updated.name, "Moving");

        let err = service
            .update_conference(&fixtures::identity("intruder"), &websafe, &form("Stolen"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn update_drops_blank_topics_like_create() {
        let (service, _) = service();
        let organizer = fixtures::identity("org");
        let conference = service.create_conference(&organizer, &form("Topical")).await.unwrap();
        let websafe = conference.key.to_websafe();
        let topics = |topics: &[&str]| ConferenceForm {
            topics: Some(topics.iter().map(ToString::to_string).collect()),
            ..ConferenceForm::default()
        };

        let updated = service
            .update_conference(&organizer, &websafe, &topics(&[" Rust ", "", "  ", "Async"]))
            .await
            .unwrap();
        assert_eq!(updated.topics, vec!["Rust", "Async"]);

        let unchanged = service
            .update_conference(&organizer, &websafe, &topics(&["", " "]))
            .await
            .unwrap();
        assert_eq!(unchanged.topics, vec!["Rust", "Async"]);
    }

    #[tokio::test]
    async fn created_and_attending_lists() {
        let (service, _) = service();
        let organizer = fixtures::identity("org");
        let attendee = fixtures::identity("att");
        for name in ["Zeta", "Alpha"] {
            service
                .create_conference(&organizer, &ConferenceForm { max_attendees: Some(5), ..form(name) })
                .await
                .unwrap();
        }

        let created = service.conferences_created(&organizer).await.unwrap();
        let names: Vec<_> = created.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        assert!(service.conferences_created(&attendee).await.unwrap().is_empty());

        service.register(&attendee, &created[1].key.to_websafe()).await.unwrap();
        let attending = service.conferences_to_attend(&attendee).await.unwrap();
        assert_eq!(attending.len(), 1);
        assert_eq!(attending[0].name, "Zeta");
    }

    #[tokio::test]
    async fn get_conference_distinguishes_bad_and_unknown_keys() {
        let (service, _) = service();
        let unknown = fixtures::conference("org", 99, "Ghost", 1).key.to_websafe();

        let err = service.get_conference(&unknown).await.unwrap_err();
        assert!(matches!(err, ConferenceError::NotFound { kind: EntityKind::Conference, .. }));

        let err = service.get_conference("not a key").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_KEY");
    }
}
