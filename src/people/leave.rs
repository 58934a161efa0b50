//! Leave types and the requests filed against them.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::api::crud::ApiResult;
use crate::core::shared::enums::LeaveStatus;
use crate::core::shared::schema::{leave_requests, leave_types};
use crate::core::shared::state::AppState;
use crate::core::store::{Entity, EntityStore, ForeignKey};
use crate::security::auth_api::{AuthenticatedUser, Module};
use crate::security::validation::{Validate, ValidationError, ValidationResult, Validator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = leave_types)]
#[diesel(treat_none_as_null = true)]
pub struct LeaveType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub max_days_per_year: Option<i32>,
    pub is_paid: bool,
    pub requires_approval: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaveTypeInput {
    pub name: String,
    pub description: Option<String>,
    pub max_days_per_year: Option<i32>,
    pub is_paid: bool,
    pub requires_approval: bool,
    pub is_active: bool,
}

impl Default for LeaveTypeInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            max_days_per_year: None,
            is_paid: true,
            requires_approval: true,
            is_active: true,
        }
    }
}

impl Validate for LeaveTypeInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.name, "name", 50)
            .optional_range(self.max_days_per_year, "max_days_per_year", Some(0), Some(366))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaveTypeFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Entity for LeaveType {
    const TABLE: &'static str = "leave_types";
    const PATH: &'static str = "leave-types";
    const LABEL: &'static str = "Leave type";
    const MODULE: Module = Module::Hr;

    type Input = LeaveTypeInput;
    type Filter = LeaveTypeFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_input(id: Uuid, input: LeaveTypeInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            max_days_per_year: input.max_days_per_year,
            is_paid: input.is_paid,
            requires_approval: input.requires_approval,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_input(&mut self, input: LeaveTypeInput, now: DateTime<Utc>) {
        *self = Self {
            id: self.id,
            created_at: self.created_at,
            ..Self::from_input(self.id, input, now)
        };
    }

    fn matches(&self, f: &LeaveTypeFilter) -> bool {
        f.is_active.map_or(true, |v| self.is_active == v)
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone())]
    }
}

/// Time off asked for by one employee. Requests start out pending and only
/// [`approve_leave_request`] moves them to approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = leave_requests)]
#[diesel(treat_none_as_null = true)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub leave_type_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_requested: i32,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub approved_by_id: Option<Uuid>,
    pub approval_date: Option<DateTime<Utc>>,
    pub approval_comments: Option<String>,
    pub created_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaveRequestInput {
    pub employee_id: Option<Uuid>,
    pub leave_type_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days_requested: i32,
    pub reason: Option<String>,
}

impl Validate for LeaveRequestInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        let required = |missing: bool, field: &str| {
            missing.then(|| ValidationError::Required(field.to_string()))
        };
        Validator::new()
            .custom(|| required(self.employee_id.is_none(), "employee_id"))
            .custom(|| required(self.leave_type_id.is_none(), "leave_type_id"))
            .custom(|| required(self.start_date.is_none(), "start_date"))
            .custom(|| required(self.end_date.is_none(), "end_date"))
            .custom(|| match (self.start_date, self.end_date) {
                (Some(start), Some(end)) if end < start => Some(ValidationError::Custom(
                    "end_date must not be before start_date".to_string(),
                )),
                _ => None,
            })
            .range(self.days_requested, "days_requested", Some(1), None)
            .optional_text(self.reason.as_deref(), "reason", 1000)
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaveRequestFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeaveStatus>,
}

impl Entity for LeaveRequest {
    const TABLE: &'static str = "leave_requests";
    const PATH: &'static str = "leave-requests";
    const LABEL: &'static str = "Leave request";
    const MODULE: Module = Module::Hr;

    type Input = LeaveRequestInput;
    type Filter = LeaveRequestFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Required fields are checked by [`Validate`] before this runs.
    fn from_input(id: Uuid, input: LeaveRequestInput, now: DateTime<Utc>) -> Self {
        let mut request = Self {
            id,
            employee_id: Uuid::nil(),
            leave_type_id: Uuid::nil(),
            start_date: now.date_naive(),
            end_date: now.date_naive(),
            days_requested: 0,
            reason: None,
            status: LeaveStatus::Pending,
            approved_by_id: None,
            approval_date: None,
            approval_comments: None,
            created_by_id: None,
            created_at: now,
            updated_at: now,
        };
        request.apply_input(input, now);
        request
    }

    /// The approval fields are left alone.
    fn apply_input(&mut self, input: LeaveRequestInput, now: DateTime<Utc>) {
        self.employee_id = input.employee_id.unwrap_or(self.employee_id);
        self.leave_type_id = input.leave_type_id.unwrap_or(self.leave_type_id);
        self.start_date = input.start_date.unwrap_or(self.start_date);
        self.end_date = input.end_date.unwrap_or(self.end_date);
        self.days_requested = input.days_requested;
        self.reason = input.reason;
        self.updated_at = now;
    }

    fn matches(&self, f: &LeaveRequestFilter) -> bool {
        f.employee_id.map_or(true, |id| self.employee_id == id)
            && f.status.map_or(true, |s| self.status == s)
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![
            ForeignKey::cascade("employee_id", "employees", Some(self.employee_id)),
            ForeignKey::restrict("leave_type_id", "leave_types", Some(self.leave_type_id)),
            ForeignKey::set_null("approved_by_id", "users", self.approved_by_id),
            ForeignKey::set_null("created_by_id", "users", self.created_by_id),
        ]
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![(
            "period",
            format!("{}:{}:{}", self.employee_id, self.start_date, self.end_date),
        )]
    }

    fn stamp_creator(&mut self, user_id: Uuid) {
        self.created_by_id = Some(user_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub message: String,
    pub success: bool,
}

/// `PUT /leave-requests/:id/approve`: marks the request approved by the caller.
pub async fn approve_leave_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ActionResponse>> {
    user.require_write(Module::Hr)?;
    let Path(id) = id?;

    let mut request = EntityStore::<LeaveRequest>::get(state.store.as_ref(), id).await?;
    let now = Utc::now();
    request.status = LeaveStatus::Approved;
    request.approved_by_id = Some(user.user_id);
    request.approval_date = Some(now);
    request.updated_at = now;
    EntityStore::<LeaveRequest>::replace(state.store.as_ref(), request).await?;

    info!("{} approved leave request {}", user.username, id);
    Ok(Json(ActionResponse {
        message: "Leave request approved".to_string(),
        success: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::enums::UserRole;
    use crate::core::shared::test_utils::{add_user, caller, test_state};
    use crate::people::{Employee, EmployeeInput};

    fn input(employee_id: Uuid, leave_type_id: Uuid) -> LeaveRequestInput {
        LeaveRequestInput {
            employee_id: Some(employee_id),
            leave_type_id: Some(leave_type_id),
            start_date: NaiveDate::from_ymd_opt(2025, 8, 4),
            end_date: NaiveDate::from_ymd_opt(2025, 8, 8),
            days_requested: 5,
            reason: Some("Summer holiday".into()),
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(input(Uuid::new_v4(), Uuid::new_v4()).validate().is_ok());

        let backwards = LeaveRequestInput {
            end_date: NaiveDate::from_ymd_opt(2025, 8, 1),
            days_requested: 0,
            ..input(Uuid::new_v4(), Uuid::new_v4())
        };
        let err = backwards.validate().unwrap_err();
        assert_eq!(err.errors().len(), 2, "{}", err.summary());

        let err = LeaveRequestInput::default().validate().unwrap_err();
        let summary = err.summary();
        assert!(summary.contains("employee_id"));
        assert!(summary.contains("leave_type_id"));
        assert!(summary.contains("start_date"));
    }

    #[test]
    fn test_update_keeps_approval() {
        let now = Utc::now();
        let approver = Uuid::new_v4();
        let mut request = LeaveRequest::from_input(
            Uuid::new_v4(),
            input(Uuid::new_v4(), Uuid::new_v4()),
            now,
        );
        assert_eq!(request.status, LeaveStatus::Pending);
        request.status = LeaveStatus::Approved;
        request.approved_by_id = Some(approver);

        let mut edit = input(request.employee_id, request.leave_type_id);
        edit.reason = None;
        request.apply_input(edit, now);
        assert_eq!(request.status, LeaveStatus::Approved);
        assert_eq!(request.approved_by_id, Some(approver));
        assert_eq!(request.reason, None);
    }

    #[test]
    fn test_leave_type_defaults() {
        let input: LeaveTypeInput = serde_json::from_str(r#"{"name":"Annual"}"#).unwrap();
        assert!(input.is_paid && input.requires_approval && input.is_active);
        assert!(input.validate().is_ok());
    }

    #[tokio::test]
    async fn test_approve_records_approver() {
        let state = test_state();
        let hr = caller(UserRole::Hr);
        add_user(&state, hr.user_id, "hr-lead").await;

        let employee = Employee::from_input(
            Uuid::new_v4(),
            EmployeeInput {
                employee_code: "EMP-042".into(),
                first_name: "Dorothy".into(),
                last_name: "Vaughan".into(),
                hire_date: NaiveDate::from_ymd_opt(2020, 1, 6),
                ..Default::default()
            },
            Utc::now(),
        );
        let annual = LeaveType::from_input(
            Uuid::new_v4(),
            LeaveTypeInput {
                name: "Annual".into(),
                ..Default::default()
            },
            Utc::now(),
        );
        let store = state.store.as_ref();
        EntityStore::<Employee>::insert(store, employee.clone()).await.unwrap();
        EntityStore::<LeaveType>::insert(store, annual.clone()).await.unwrap();
        let request = LeaveRequest::from_input(Uuid::new_v4(), input(employee.id, annual.id), Utc::now());
        EntityStore::<LeaveRequest>::insert(store, request.clone()).await.unwrap();

        let Json(body) = approve_leave_request(
            State(Arc::clone(&state)),
            Extension(hr.clone()),
            Ok(Path(request.id)),
        )
        .await
        .unwrap();
        assert!(body.success);
        assert_eq!(body.message, "Leave request approved");

        let stored = EntityStore::<LeaveRequest>::get(state.store.as_ref(), request.id)
            .await
            .unwrap();
        assert_eq!(stored.status, LeaveStatus::Approved);
        assert_eq!(stored.approved_by_id, Some(hr.user_id));
        assert!(stored.approval_date.is_some());

        let err = approve_leave_request(State(state), Extension(hr), Ok(Path(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "not_found");
    }

    #[tokio::test]
    async fn test_approve_needs_hr_write() {
        let err = approve_leave_request(
            State(test_state()),
            Extension(caller(UserRole::Sales)),
            Ok(Path(Uuid::new_v4())),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "insufficient_permissions");
    }
}
