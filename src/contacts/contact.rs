use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::schema::contacts;
use crate::core::shared::utils::contains_ci;
use crate::core::store::{Entity, ForeignKey};
use crate::security::auth_api::Module;
use crate::security::validation::{Validate, ValidationResult, Validator};

/// A person at a customer company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = contacts)]
#[diesel(treat_none_as_null = true)]
pub struct Contact {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub job_title: Option<String>,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInput {
    pub company_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub job_title: Option<String>,
    pub is_primary: bool,
    pub is_active: bool,
}

impl Default for ContactInput {
    fn default() -> Self {
        Self {
            company_id: None,
            first_name: String::new(),
            last_name: String::new(),
            email: None,
            phone: None,
            mobile: None,
            job_title: None,
            is_primary: false,
            is_active: true,
        }
    }
}

impl Validate for ContactInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.first_name, "first_name", 50)
            .text(&self.last_name, "last_name", 50)
            .optional_email(self.email.as_deref())
            .optional_phone(self.phone.as_deref())
            .optional_phone(self.mobile.as_deref())
            .optional_text(self.job_title.as_deref(), "job_title", 100)
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
    /// Matches first name, last name or email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Entity for Contact {
    const TABLE: &'static str = "contacts";
    const LABEL: &'static str = "Contact";
    const MODULE: Module = Module::Crm;

    type Input = ContactInput;
    type Filter = ContactFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_input(id: Uuid, input: ContactInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            company_id: input.company_id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            mobile: input.mobile,
            job_title: input.job_title,
            is_primary: input.is_primary,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_input(&mut self, input: ContactInput, now: DateTime<Utc>) {
        *self = Self {
            id: self.id,
            created_at: self.created_at,
            ..Self::from_input(self.id, input, now)
        };
    }

    fn matches(&self, f: &ContactFilter) -> bool {
        f.company_id.map_or(true, |id| self.company_id == Some(id))
            && f.is_primary.map_or(true, |v| self.is_primary == v)
            && f.search.as_deref().map_or(true, |q| {
                contains_ci(&self.first_name, q)
                    || contains_ci(&self.last_name, q)
                    || self.email.as_deref().is_some_and(|e| contains_ci(e, q))
            })
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![ForeignKey::restrict("company_id", "companies", self.company_id)]
    }
}
