use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::schema::designations;
use crate::core::store::{Entity, ForeignKey};
use crate::security::auth_api::Module;
use crate::security::validation::{Validate, ValidationResult, Validator};

/// Job title within a department, with its place in the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = designations)]
#[diesel(treat_none_as_null = true)]
pub struct Designation {
    pub id: Uuid,
    pub title: String,
    pub department_id: Option<Uuid>,
    /// 0 is the top of the hierarchy.
    pub level: Option<i32>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignationInput {
    pub title: String,
    pub department_id: Option<Uuid>,
    pub level: Option<i32>,
    pub description: Option<String>,
    pub is_active: bool,
}

impl Default for DesignationInput {
    fn default() -> Self {
        Self {
            title: String::new(),
            department_id: None,
            level: None,
            description: None,
            is_active: true,
        }
    }
}

impl Validate for DesignationInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.title, "title", 100)
            .optional_range(self.level, "level", Some(0), None)
            .optional_text(self.description.as_deref(), "description", 1000)
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignationFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Entity for Designation {
    const TABLE: &'static str = "designations";
    const LABEL: &'static str = "Designation";
    const MODULE: Module = Module::Hr;

    type Input = DesignationInput;
    type Filter = DesignationFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_input(id: Uuid, input: DesignationInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: input.title,
            department_id: input.department_id,
            level: input.level,
            description: input.description,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_input(&mut self, input: DesignationInput, now: DateTime<Utc>) {
        self.title = input.title;
        self.department_id = input.department_id;
        self.level = input.level;
        self.description = input.description;
        self.is_active = input.is_active;
        self.updated_at = now;
    }

    fn matches(&self, f: &DesignationFilter) -> bool {
        f.department_id.map_or(true, |id| self.department_id == Some(id))
            && f.is_active.map_or(true, |v| self.is_active == v)
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![ForeignKey::restrict("department_id", "departments", self.department_id)]
    }
}
