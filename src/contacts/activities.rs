use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::crud::ApiResult;
use crate::core::shared::enums::ActivityType;
use crate::core::shared::schema::activities;
use crate::core::shared::state::AppState;
use crate::core::store::{Entity, ForeignKey};
use crate::security::auth_api::{AuthenticatedUser, Module};
use crate::security::validation::{Validate, ValidationResult, Validator};

/// Call, email, meeting, task or note logged against a lead, deal or contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = activities)]
#[diesel(treat_none_as_null = true)]
pub struct Activity {
    pub id: Uuid,
    pub activity_type: ActivityType,
    pub subject: String,
    pub description: Option<String>,
    pub lead_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub is_completed: bool,
    pub assigned_to_id: Option<Uuid>,
    pub created_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityInput {
    pub activity_type: ActivityType,
    pub subject: String,
    pub description: Option<String>,
    pub lead_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub is_completed: bool,
    pub assigned_to_id: Option<Uuid>,
}

impl Validate for ActivityInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.subject, "subject", 200)
            .optional_range(self.duration_minutes, "duration_minutes", Some(0), Some(24 * 60))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<Uuid>,
    /// Strictly after this instant; unscheduled activities never match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_after: Option<DateTime<Utc>>,
}

impl Entity for Activity {
    const TABLE: &'static str = "activities";
    const LABEL: &'static str = "Activity";
    const MODULE: Module = Module::Crm;

    type Input = ActivityInput;
    type Filter = ActivityFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_input(id: Uuid, input: ActivityInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            activity_type: input.activity_type,
            subject: input.subject,
            description: input.description,
            lead_id: input.lead_id,
            deal_id: input.deal_id,
            contact_id: input.contact_id,
            scheduled_at: input.scheduled_at,
            duration_minutes: input.duration_minutes,
            is_completed: input.is_completed,
            assigned_to_id: input.assigned_to_id,
            created_by_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_input(&mut self, input: ActivityInput, now: DateTime<Utc>) {
        *self = Self {
            id: self.id,
            created_by_id: self.created_by_id,
            created_at: self.created_at,
            ..Self::from_input(self.id, input, now)
        };
    }

    fn matches(&self, f: &ActivityFilter) -> bool {
        f.lead_id.map_or(true, |id| self.lead_id == Some(id))
            && f.deal_id.map_or(true, |id| self.deal_id == Some(id))
            && f.contact_id.map_or(true, |id| self.contact_id == Some(id))
            && f.is_completed.map_or(true, |v| self.is_completed == v)
            && f.assigned_to_id.map_or(true, |id| self.assigned_to_id == Some(id))
            && f
                .scheduled_after
                .map_or(true, |after| self.scheduled_at.is_some_and(|at| at > after))
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![
            ForeignKey::cascade("lead_id", "leads", self.lead_id),
            ForeignKey::cascade("deal_id", "deals", self.deal_id),
            ForeignKey::cascade("contact_id", "contacts", self.contact_id),
            ForeignKey::set_null("assigned_to_id", "users", self.assigned_to_id),
            ForeignKey::set_null("created_by_id", "users", self.created_by_id),
        ]
    }

    fn stamp_creator(&mut self, user_id: Uuid) {
        self.created_by_id = Some(user_id);
    }
}

/// The caller's open activities scheduled after now, soonest first.
pub async fn upcoming_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<Activity>>> {
    user.require_read(Module::Crm)?;

    let rows = state
        .store
        .upcoming_activities(user.user_id, Utc::now())
        .await?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::enums::UserRole;
    use crate::core::shared::test_utils::{add_user, caller, test_state};
    use crate::core::store::EntityStore;
    use chrono::Duration;

    fn activity(subject: &str, at: Option<DateTime<Utc>>, owner: Uuid, done: bool) -> Activity {
        Activity::from_input(
            Uuid::new_v4(),
            ActivityInput {
                subject: subject.into(),
                scheduled_at: at,
                assigned_to_id: Some(owner),
                is_completed: done,
                activity_type: ActivityType::Call,
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_scheduled_after_excludes_unscheduled() {
        let now = Utc::now();
        let owner = Uuid::new_v4();
        let filter = ActivityFilter {
            scheduled_after: Some(now),
            ..Default::default()
        };
        assert!(activity("later", Some(now + Duration::hours(1)), owner, false).matches(&filter));
        assert!(!activity("earlier", Some(now - Duration::hours(1)), owner, false).matches(&filter));
        assert!(!activity("someday", None, owner, false).matches(&filter));
    }

    #[tokio::test]
    async fn test_upcoming_is_own_open_and_sorted() {
        let state = test_state();
        let me = caller(UserRole::Sales);
        let someone_else = Uuid::new_v4();
        add_user(&state, me.user_id, "me").await;
        add_user(&state, someone_else, "other").await;

        let now = Utc::now();
        let rows = [
            activity("in two days", Some(now + Duration::days(2)), me.user_id, false),
            activity("tomorrow", Some(now + Duration::days(1)), me.user_id, false),
            activity("done", Some(now + Duration::days(1)), me.user_id, true),
            activity("yesterday", Some(now - Duration::days(1)), me.user_id, false),
            activity("not mine", Some(now + Duration::days(1)), someone_else, false),
        ];
        for row in rows {
            EntityStore::<Activity>::insert(state.store.as_ref(), row).await.unwrap();
        }

        let Json(upcoming) = upcoming_activities(State(state), Extension(me)).await.unwrap();
        let subjects: Vec<&str> = upcoming.iter().map(|a| a.subject.as_str()).collect();
        assert_eq!(subjects, vec!["tomorrow", "in two days"]);
    }

    #[tokio::test]
    async fn test_upcoming_is_not_capped() {
        let state = test_state();
        let me = caller(UserRole::Sales);
        add_user(&state, me.user_id, "busy").await;

        let now = Utc::now();
        let mut soonest =
            activity("first thing", Some(now + Duration::minutes(5)), me.user_id, false);
        soonest.created_at = now - Duration::days(7);
        EntityStore::<Activity>::insert(state.store.as_ref(), soonest.clone()).await.unwrap();
        for i in 0..110 {
            let at = Some(now + Duration::hours(i + 1));
            let row = activity(&format!("call {i}"), at, me.user_id, false);
            EntityStore::<Activity>::insert(state.store.as_ref(), row).await.unwrap();
        }

        let Json(upcoming) = upcoming_activities(State(state), Extension(me)).await.unwrap();
        assert_eq!(upcoming.len(), 111);
        assert_eq!(upcoming[0].id, soonest.id);
        assert_eq!(upcoming[110].subject, "call 109");
    }
}
