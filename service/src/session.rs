//! Session creation and listing.

use crate::forms::{SessionForm, non_blank, parse_date, parse_time, required};
use crate::service::{ConferenceService, require_organizer};
use chrono::{NaiveDate, TimeDelta};
use conference_core::error::{Result, ValidationError};
use conference_core::key::{EntityKey, EntityKind, SessionKey};
use conference_core::model::{CallerIdentity, Conference, Entity, Session, SessionType};
use conference_core::store::{Operator, Property, PropertyFilter, Query};
use conference_core::task::Task;
use tracing::instrument;

fn sessions(entities: Vec<Entity>) -> Vec<Session> {
    entities.into_iter().filter_map(Entity::into_session).collect()
}

/// A session date must fall inside a fully dated conference.
fn check_in_range(conference: &Conference, date: Option<NaiveDate>) -> Result<()> {
    if let (Some(date), Some(start), Some(end)) = (date, conference.start_date, conference.end_date) {
        if date < start || date > end {
            return Err(ValidationError::SessionDateOutOfRange {
                date: date.to_string(),
                start: start.to_string(),
                end: end.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

impl ConferenceService {
    /// Add a session to a conference the caller organizes.
    ///
    /// The end time is the start time plus `duration` minutes, wrapping past
    /// midnight; it is unset unless both are given. A featured speaker refresh
    /// is enqueued for the conference.
    ///
    /// # Errors
    ///
    /// - `BadRequest`: invalid key, missing name, unparseable date or time,
    ///   date outside the conference dates
    /// - `NotFound`: no such conference
    /// - `Forbidden`: caller is not the organizer
    /// - `Store`: entity store failure
    #[instrument(skip_all, fields(user_id = %identity.user_id, conference = conference_key))]
    pub async fn create_session(
        &self,
        identity: &CallerIdentity,
        conference_key: &str,
        form: &SessionForm,
    ) -> Result<Session> {
        let conference = self.load_conference(conference_key).await?;
        require_organizer(identity, &conference, "add sessions to the conference")?;

        let name = required("name", form.name.as_deref())?;
        let date = parse_date("date", form.date.as_deref())?;
        let start_time = parse_time("startTime", form.start_time.as_deref())?;
        check_in_range(&conference, date)?;
        let end_time = start_time
            .zip(form.duration)
            .map(|(start, minutes)| start + TimeDelta::minutes(i64::from(minutes)));

        let parent: EntityKey = conference.key.clone().into();
        let id = self.env.store.allocate_id(&parent, EntityKind::Session).await?;
        let session = Session {
            key: SessionKey::new(conference.key.clone(), id),
            name,
            highlights: non_blank(form.highlights.as_deref()),
            speaker: non_blank(form.speaker.as_deref()),
            session_type: form.session_type.unwrap_or_default(),
            date,
            start_time,
            end_time,
        };
        self.env.store.put(session.clone().into()).await?;
        tracing::info!(session = %session.key, speaker = ?session.speaker, "Session created");

        self.enqueue(Task::RefreshFeaturedSpeaker {
            conference: conference.key,
        })
        .await;

        Ok(session)
    }

    /// Every session of a conference, in creation order.
    ///
    /// # Errors
    ///
    /// `BadRequest` for a malformed key, `NotFound` when it does not resolve,
    /// `Store` for entity store failures.
    pub async fn conference_sessions(&self, conference_key: &str) -> Result<Vec<Session>> {
        let conference = self.load_conference(conference_key).await?;
        let query = Query::new(EntityKind::Session).with_ancestor(conference.key);
        Ok(sessions(self.env.store.query(&query).await?))
    }

    /// Sessions of a conference with the given format.
    ///
    /// # Errors
    ///
    /// As [`conference_sessions`](Self::conference_sessions).
    pub async fn conference_sessions_by_type(
        &self,
        conference_key: &str,
        session_type: SessionType,
    ) -> Result<Vec<Session>> {
        let conference = self.load_conference(conference_key).await?;
        let query = Query::new(EntityKind::Session)
            .with_ancestor(conference.key)
            .filter(PropertyFilter::new(Property::SessionType, Operator::Eq, session_type.as_str()));
        Ok(sessions(self.env.store.query(&query).await?))
    }

    /// Sessions given by `speaker` across all conferences.
    ///
    /// # Errors
    ///
    /// Returns `Store` errors from the entity store.
    pub async fn sessions_by_speaker(&self, speaker: &str) -> Result<Vec<Session>> {
        let query =
            Query::new(EntityKind::Session).filter(PropertyFilter::new(Property::Speaker, Operator::Eq, speaker));
        Ok(sessions(self.env.store.query(&query).await?))
    }
}

#[cfg(test)]
mod tests {
    use crate::forms::{ConferenceForm, SessionForm};
    use crate::testing::service;
    use chrono::NaiveTime;
    use conference_core::error::ErrorKind;
    use conference_core::key::EntityKind;
    use conference_core::model::SessionType;
    use conference_core::task::Task;
    use conference_testing::fixtures;

    fn session_form(name: &str) -> SessionForm {
        SessionForm {
            name: Some(name.into()),
            ..SessionForm::default()
        }
    }

    async fn dated_conference(service: &crate::ConferenceService) -> String {
        service
            .create_conference(
                &fixtures::identity("org"),
                &ConferenceForm {
                    name: Some("Dated".into()),
                    start_date: Some("2026-05-01".into()),
                    end_date: Some("2026-05-03".into()),
                    ..ConferenceForm::default()
                },
            )
            .await
            .unwrap()
            .key
            .to_websafe()
    }

    #[tokio::test]
    async fn end_time_is_start_plus_duration() {
        let (service, backends) = service();
        let conference = dated_conference(&service).await;

        let session = service
            .create_session(
                &fixtures::identity("org"),
                &conference,
                &SessionForm {
                    date: Some("2026-05-02".into()),
                    start_time: Some("09:30".into()),
                    duration: Some(90),
                    session_type: Some(SessionType::Keynote),
                    speaker: Some("grace".into()),
                    ..session_form("Opening")
                },
            )
            .await
            .unwrap();

        assert_eq!(session.end_time, NaiveTime::from_hms_opt(11, 0, 0));
        assert_eq!(session.date, Some(fixtures::date(2026, 5, 2)));
        assert!(backends.tasks.tasks().contains(&Task::RefreshFeaturedSpeaker {
            conference: session.key.conference.clone(),
        }));
    }

    #[tokio::test]
    async fn date_outside_conference_is_rejected_and_not_persisted() {
        let (service, backends) = service();
        let conference = dated_conference(&service).await;

        for date in ["2026-04-30", "2026-05-04"] {
            let err = service
                .create_session(
                    &fixtures::identity("org"),
                    &conference,
                    &SessionForm {
                        date: Some(date.into()),
                        ..session_form("Off by one")
                    },
                )
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest);
            assert_eq!(err.code(), "SESSION_DATE_OUT_OF_RANGE");
        }

        for date in ["2026-05-01", "2026-05-03"] {
            let created = service
                .create_session(
                    &fixtures::identity("org"),
                    &conference,
                    &SessionForm {
                        date: Some(date.into()),
                        ..session_form("Edge")
                    },
                )
                .await;
            assert!(created.is_ok());
        }
        assert_eq!(backends.store.count(EntityKind::Session), 2);
    }

    #[tokio::test]
    async fn only_the_organizer_adds_sessions() {
        let (service, backends) = service();
        let conference = dated_conference(&service).await;

        let err = service
            .create_session(&fixtures::identity("guest"), &conference, &session_form("Hijack"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(backends.store.count(EntityKind::Session), 0);
    }

    #[tokio::test]
    async fn listings_by_conference_type_and_speaker() {
        let (service, _) = service();
        let organizer = fixtures::identity("org");
        let conference = dated_conference(&service).await;
        for (name, kind, speaker) in [
            ("Talk", SessionType::Lecture, "grace"),
            ("Hack", SessionType::Workshop, "ada"),
            ("Deep dive", SessionType::Workshop, "grace"),
        ] {
            service
                .create_session(
                    &organizer,
                    &conference,
                    &SessionForm {
                        session_type: Some(kind),
                        speaker: Some(speaker.into()),
                        ..session_form(name)
                    },
                )
                .await
                .unwrap();
        }

        let all = service.conference_sessions(&conference).await.unwrap();
        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Talk", "Hack", "Deep dive"]);

        let workshops = service
            .conference_sessions_by_type(&conference, SessionType::Workshop)
            .await
            .unwrap();
        assert_eq!(workshops.len(), 2);

        let by_grace = service.sessions_by_speaker("grace").await.unwrap();
        assert_eq!(by_grace.len(), 2);
        assert!(service.sessions_by_speaker("nobody").await.unwrap().is_empty());
    }
}
