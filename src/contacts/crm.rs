use axum::{extract::State, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::crud::ApiResult;
use crate::core::shared::enums::{DealStage, LeadStatus};
use crate::core::shared::schema::{deals, leads};
use crate::core::shared::state::AppState;
use crate::core::store::{Entity, ForeignKey};
use crate::dashboards::StageRevenue;
use crate::security::auth_api::{AuthenticatedUser, Module};
use crate::security::validation::{Validate, ValidationError, ValidationResult, Validator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = leads)]
#[diesel(treat_none_as_null = true)]
pub struct Lead {
    pub id: Uuid,
    pub title: String,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub estimated_value: Option<f64>,
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub assigned_to_id: Option<Uuid>,
    pub created_by_id: Option<Uuid>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadInput {
    pub title: String,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub estimated_value: Option<f64>,
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub assigned_to_id: Option<Uuid>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl Validate for LeadInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.title, "title", 200)
            .optional_text(self.source.as_deref(), "source", 100)
            .optional_range(self.estimated_value, "estimated_value", Some(0.0), None)
            .range(self.probability, "probability", Some(0), Some(100))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
}

impl Entity for Lead {
    const TABLE: &'static str = "leads";
    const LABEL: &'static str = "Lead";
    const MODULE: Module = Module::Crm;

    type Input = LeadInput;
    type Filter = LeadFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_input(id: Uuid, input: LeadInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: input.title,
            company_id: input.company_id,
            contact_id: input.contact_id,
            source: input.source,
            status: input.status,
            estimated_value: input.estimated_value,
            probability: input.probability,
            expected_close_date: input.expected_close_date,
            assigned_to_id: input.assigned_to_id,
            created_by_id: None,
            description: input.description,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_input(&mut self, input: LeadInput, now: DateTime<Utc>) {
        *self = Self {
            id: self.id,
            created_by_id: self.created_by_id,
            created_at: self.created_at,
            ..Self::from_input(self.id, input, now)
        };
    }

    fn matches(&self, f: &LeadFilter) -> bool {
        f.status.map_or(true, |s| self.status == s)
            && f.assigned_to_id.map_or(true, |id| self.assigned_to_id == Some(id))
            && f.company_id.map_or(true, |id| self.company_id == Some(id))
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![
            ForeignKey::restrict("company_id", "companies", self.company_id),
            ForeignKey::restrict("contact_id", "contacts", self.contact_id),
            ForeignKey::set_null("assigned_to_id", "users", self.assigned_to_id),
            ForeignKey::set_null("created_by_id", "users", self.created_by_id),
        ]
    }

    fn stamp_creator(&mut self, user_id: Uuid) {
        self.created_by_id = Some(user_id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = deals)]
#[diesel(treat_none_as_null = true)]
pub struct Deal {
    pub id: Uuid,
    pub title: String,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub stage: DealStage,
    pub value: f64,
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub actual_close_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DealInput {
    pub title: String,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub stage: DealStage,
    /// Required; kept optional here so a missing value is reported.
    pub value: Option<f64>,
    pub probability: i32,
    pub expected_close_date: Option<NaiveDate>,
    pub actual_close_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
    pub description: Option<String>,
}

impl Validate for DealInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.title, "title", 200)
            .custom(|| {
                self.value
                    .is_none()
                    .then(|| ValidationError::Required("value".to_string()))
            })
            .optional_range(self.value, "value", Some(0.0), None)
            .range(self.probability, "probability", Some(0), Some(100))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<DealStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
}

impl Entity for Deal {
    const TABLE: &'static str = "deals";
    const LABEL: &'static str = "Deal";
    const MODULE: Module = Module::Crm;

    type Input = DealInput;
    type Filter = DealFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_input(id: Uuid, input: DealInput, now: DateTime<Utc>) -> Self {
        let mut deal = Self {
            id,
            title: String::new(),
            company_id: None,
            contact_id: None,
            lead_id: None,
            stage: DealStage::default(),
            value: 0.0,
            probability: 0,
            expected_close_date: None,
            actual_close_date: None,
            owner_id: None,
            description: None,
            created_at: now,
            updated_at: now,
        };
        deal.apply_input(input, now);
        deal
    }

    /// Moving into a closed stage without a close date stamps today's date.
    fn apply_input(&mut self, input: DealInput, now: DateTime<Utc>) {
        self.title = input.title;
        self.company_id = input.company_id;
        self.contact_id = input.contact_id;
        self.lead_id = input.lead_id;
        self.stage = input.stage;
        self.value = input.value.unwrap_or_default();
        self.probability = input.probability;
        self.expected_close_date = input.expected_close_date;
        self.actual_close_date = input
            .actual_close_date
            .or_else(|| input.stage.is_closed().then(|| now.date_naive()));
        self.owner_id = input.owner_id;
        self.description = input.description;
        self.updated_at = now;
    }

    fn matches(&self, f: &DealFilter) -> bool {
        f.stage.map_or(true, |s| self.stage == s)
            && f.owner_id.map_or(true, |id| self.owner_id == Some(id))
            && f.company_id.map_or(true, |id| self.company_id == Some(id))
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![
            ForeignKey::restrict("company_id", "companies", self.company_id),
            ForeignKey::restrict("contact_id", "contacts", self.contact_id),
            ForeignKey::set_null("lead_id", "leads", self.lead_id),
            ForeignKey::set_null("owner_id", "users", self.owner_id),
        ]
    }
}

/// `GET /api/v1/deals/revenue/by-stage`
pub async fn revenue_by_stage(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<StageRevenue>>> {
    user.require_read(Module::Crm)?;
    Ok(Json(state.store.revenue_by_stage().await?))
}
