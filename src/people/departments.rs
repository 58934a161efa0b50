use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::schema::departments;
use crate::core::shared::utils::contains_ci;
use crate::core::store::{Entity, ForeignKey};
use crate::security::auth_api::Module;
use crate::security::validation::{Validate, ValidationResult, Validator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = departments)]
#[diesel(treat_none_as_null = true)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Head of department; an employee, not a login.
    pub manager_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepartmentInput {
    pub name: String,
    pub description: Option<String>,
    pub manager_id: Option<Uuid>,
    pub is_active: bool,
}

impl Default for DepartmentInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            manager_id: None,
            is_active: true,
        }
    }
}

impl Validate for DepartmentInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.name, "name", 100)
            .optional_text(self.description.as_deref(), "description", 1000)
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepartmentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Entity for Department {
    const TABLE: &'static str = "departments";
    const LABEL: &'static str = "Department";
    const MODULE: Module = Module::Hr;

    type Input = DepartmentInput;
    type Filter = DepartmentFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_input(id: Uuid, input: DepartmentInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            manager_id: input.manager_id,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_input(&mut self, input: DepartmentInput, now: DateTime<Utc>) {
        self.name = input.name;
        self.description = input.description;
        self.manager_id = input.manager_id;
        self.is_active = input.is_active;
        self.updated_at = now;
    }

    fn matches(&self, f: &DepartmentFilter) -> bool {
        f.is_active.map_or(true, |v| self.is_active == v)
            && f.search.as_deref().map_or(true, |q| {
                contains_ci(&self.name, q)
                    || self.description.as_deref().is_some_and(|d| contains_ci(d, q))
            })
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![ForeignKey::set_null("manager_id", "employees", self.manager_id)]
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone())]
    }
}
