use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::{Priority, ProjectStatus};
use crate::core::shared::schema::projects;
use crate::core::store::{Entity, ForeignKey};
use crate::security::auth_api::Module;
use crate::security::validation::{Validate, ValidationError, ValidationResult, Validator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = projects)]
#[diesel(treat_none_as_null = true)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub company_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInput {
    pub name: String,
    pub description: Option<String>,
    pub company_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub status: ProjectStatus,
    pub priority: Priority,
}

impl Validate for ProjectInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.name, "name", 200)
            .optional_range(self.budget, "budget", Some(0.0), None)
            .custom(|| match (self.start_date, self.end_date) {
                (Some(start), Some(end)) if end < start => Some(ValidationError::Custom(
                    "end_date must not be before start_date".to_string(),
                )),
                _ => None,
            })
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
}

impl Entity for Project {
    const TABLE: &'static str = "projects";
    const LABEL: &'static str = "Project";
    const MODULE: Module = Module::Projects;

    type Input = ProjectInput;
    type Filter = ProjectFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_input(id: Uuid, input: ProjectInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            company_id: input.company_id,
            manager_id: input.manager_id,
            start_date: input.start_date,
            end_date: input.end_date,
            budget: input.budget,
            status: input.status,
            priority: input.priority,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_input(&mut self, input: ProjectInput, now: DateTime<Utc>) {
        *self = Self {
            created_at: self.created_at,
            ..Self::from_input(self.id, input, now)
        };
    }

    fn matches(&self, f: &ProjectFilter) -> bool {
        f.status.map_or(true, |s| self.status == s)
            && f.manager_id.map_or(true, |id| self.manager_id == Some(id))
            && f.company_id.map_or(true, |id| self.company_id == Some(id))
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![
            ForeignKey::restrict("company_id", "companies", self.company_id),
            ForeignKey::set_null("manager_id", "users", self.manager_id),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_before_start_rejected() {
        let input = ProjectInput {
            name: "Migration".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 1),
            ..Default::default()
        };
        let err = input.validate().unwrap_err();
        assert!(err.summary().contains("end_date"));

        let same_day = ProjectInput {
            end_date: input.start_date,
            ..input
        };
        assert!(same_day.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let input: ProjectInput = serde_json::from_str(r#"{"name":"Migration"}"#).unwrap();
        let project = Project::from_input(Uuid::new_v4(), input, Utc::now());
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(project.priority, Priority::Medium);
    }
}
