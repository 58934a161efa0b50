use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::EmployeeStatus;
use crate::core::shared::schema::employees;
use crate::core::shared::utils::contains_ci;
use crate::core::store::{Entity, ForeignKey};
use crate::security::auth_api::Module;
use crate::security::validation::{Validate, ValidationError, ValidationResult, Validator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = employees)]
#[diesel(treat_none_as_null = true)]
pub struct Employee {
    pub id: Uuid,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub user_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub hire_date: NaiveDate,
    pub employment_type: Option<String>,
    pub status: EmployeeStatus,
    pub salary: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeInput {
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub user_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub employment_type: Option<String>,
    pub status: EmployeeStatus,
    pub salary: Option<f64>,
}

impl Validate for EmployeeInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.employee_code, "employee_code", 20)
            .text(&self.first_name, "first_name", 50)
            .text(&self.last_name, "last_name", 50)
            .optional_email(self.email.as_deref())
            .optional_phone(self.phone.as_deref())
            .optional_text(self.job_title.as_deref(), "job_title", 100)
            .optional_text(self.employment_type.as_deref(), "employment_type", 20)
            .custom(|| {
                self.hire_date
                    .is_none()
                    .then(|| ValidationError::Required("hire_date".to_string()))
            })
            .optional_range(self.salary, "salary", Some(0.0), None)
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeeFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EmployeeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<Uuid>,
    /// Matches names, employee code or email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Entity for Employee {
    const TABLE: &'static str = "employees";
    const LABEL: &'static str = "Employee";
    const MODULE: Module = Module::Hr;

    type Input = EmployeeInput;
    type Filter = EmployeeFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_input(id: Uuid, input: EmployeeInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            employee_code: input.employee_code,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            user_id: input.user_id,
            department_id: input.department_id,
            designation_id: input.designation_id,
            manager_id: input.manager_id,
            job_title: input.job_title,
            hire_date: input.hire_date.unwrap_or_else(|| now.date_naive()),
            employment_type: input.employment_type,
            status: input.status,
            salary: input.salary,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_input(&mut self, input: EmployeeInput, now: DateTime<Utc>) {
        let hire_date = input.hire_date.unwrap_or(self.hire_date);
        *self = Self {
            id: self.id,
            created_at: self.created_at,
            hire_date,
            ..Self::from_input(self.id, input, now)
        };
    }

    fn matches(&self, f: &EmployeeFilter) -> bool {
        f.department_id.map_or(true, |id| self.department_id == Some(id))
            && f.status.map_or(true, |s| self.status == s)
            && f.manager_id.map_or(true, |id| self.manager_id == Some(id))
            && f.search.as_deref().map_or(true, |q| {
                contains_ci(&self.first_name, q)
                    || contains_ci(&self.last_name, q)
                    || contains_ci(&self.employee_code, q)
                    || self.email.as_deref().is_some_and(|e| contains_ci(e, q))
            })
    }

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        vec![
            ForeignKey::set_null("user_id", "users", self.user_id),
            ForeignKey::restrict("department_id", "departments", self.department_id),
            ForeignKey::restrict("designation_id", "designations", self.designation_id),
            ForeignKey::set_null("manager_id", "employees", self.manager_id),
        ]
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("employee_code", self.employee_code.clone())]
    }
}
