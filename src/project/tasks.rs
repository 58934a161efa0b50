use axum::{extract::State, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::crud::ApiResult;
use crate::core::shared::enums::{Priority, TaskStatus};
use crate::core::shared::schema::tasks;
use crate::core::shared::state::AppState;
use crate::core::store::{Entity, ForeignKey};
use crate::security::auth_api::{AuthenticatedUser, Module};
use crate::security::validation::{Validate, ValidationResult, Validator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub created_by_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub completion_percentage: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date.is_some_and(|due| due < today)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub completion_percentage: i32,
}

impl Validate for TaskInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.title, "title", 200)
            .optional_range(self.estimated_hours, "estimated_hours", Some(0.0), None)
            .range(
                self.completion_percentage,
                "completion_percentage",
                Some(0),
                Some(100),
            )
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Due strictly before this date; tasks without a due date never match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_before: Option<NaiveDate>,
    /// `true`: neither completed nor cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
}

impl Entity for Task {
    const TABLE: &'static str = "tasks";
    const LABEL: &'static str = "Task";
    const MODULE: Module = Module::Projects;

    type Input = TaskInput;
    type Filter = TaskFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_input(id: Uuid, input: TaskInput, now: DateTime<Utc>) -> Self {
        let mut task = Self {
            id,
            title: String::new(),
            description: None,
            project_id: None,
            assigned_to_id: None,
            created_by_id: None,
            due_date: None,
            estimated_hours: None,
            status: TaskStatus::default(),
            priority: Priority::default(),
            completion_percentage: 0,
            created_at: now,
            updated_at: now,
        };
        task.apply_input(input, now);
        task
    }

    fn apply_input(&mut self, input: TaskInput, now: DateTime<Utc>) {
        self.title = input.title;
        self.description = input.description;
        self.project_id = input.project_id;
        self.assigned_to_id = input.assigned_to_id;
        self.due_date = input.due_date;
        self.estimated_hours = input.estimated_hours;
        self.status = input.status;
        self.priority = input.priority;
        self.completion_percentage = input.completion_percentage;
        self.updated_at = now;
    }

    fn matches(&self, f: &TaskFilter) -> bool {
        f.project_id.map_or(true, |id| self.project_id == Some(id))
            && f.assigned_to_id.map_or(true, |id| self.assigned_to_id == Some(id))
            && f.status.map_or(true, |s| self.status == s)
            && f.priority.map_or(true, |p| self.priority == p)
            && f.due_before.map_or(true, |d| self.due_date.is_some_and(|due| due < d))
            && f.open.map_or(true, |open| self.status.is_open() == open)
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![
            ForeignKey::cascade("project_id", "projects", self.project_id),
            ForeignKey::set_null("assigned_to_id", "users", self.assigned_to_id),
            ForeignKey::set_null("created_by_id", "users", self.created_by_id),
        ]
    }

    fn stamp_creator(&mut self, user_id: Uuid) {
        self.created_by_id = Some(user_id);
    }
}

/// Every open task whose due date has passed, most overdue first.
pub async fn overdue_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<Task>>> {
    user.require_read(Module::Projects)?;

    let rows = state.store.overdue_tasks(Utc::now().date_naive()).await?;
    Ok(Json(rows))
}
