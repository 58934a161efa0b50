//! Persistent store abstraction.
//!
//! Every business record implements [`Entity`]; every backend implements
//! [`EntityStore`] for each entity plus the aggregate queries in [`CrmStore`].
//! The API layer only ever talks to `Arc<dyn CrmStore>`.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contacts::{Activity, Company, Contact, Deal, Lead};
use crate::dashboards::{DashboardSummary, HrMetrics, RevenueTrend, StageRevenue};
use crate::directory::User;
use crate::people::{Department, Designation, Employee, LeaveRequest, LeaveType};
use crate::project::{Project, Task};
use crate::security::auth_api::Module;
use crate::security::validation::{Validate, ValidationError, ValidationResult, Validator};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("duplicate value for {0}")]
    UniqueViolation(String),
    #[error("constraint violation: {0}")]
    ForeignKeyViolation(String),
    #[error("check constraint violated: {0}")]
    CheckViolation(String),
    #[error("database connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// What happens to a referencing row when its target is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Restrict,
    Cascade,
    SetNull,
}

/// One foreign-key column of a row. `id` is `None` when the column is null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub table: &'static str,
    pub id: Option<Uuid>,
    pub on_delete: OnDelete,
}

impl ForeignKey {
    pub fn restrict(column: &'static str, table: &'static str, id: Option<Uuid>) -> Self {
        Self {
            column,
            table,
            id,
            on_delete: OnDelete::Restrict,
        }
    }

    pub fn cascade(column: &'static str, table: &'static str, id: Option<Uuid>) -> Self {
        Self {
            column,
            table,
            id,
            on_delete: OnDelete::Cascade,
        }
    }

    pub fn set_null(column: &'static str, table: &'static str, id: Option<Uuid>) -> Self {
        Self {
            column,
            table,
            id,
            on_delete: OnDelete::SetNull,
        }
    }
}

/// Page window for list queries. Pages are 1-based.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
        }
    }

    pub fn all() -> Self {
        Self::new(1, MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// `None` when the page lies beyond any addressable row.
    pub fn checked_offset(&self) -> Option<i64> {
        (self.page.unwrap_or(1).max(1) - 1).checked_mul(self.limit())
    }

    pub fn offset(&self) -> i64 {
        (self.page.unwrap_or(1).max(1) - 1).saturating_mul(self.limit())
    }
}

impl Validate for Pagination {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .custom(|| {
                self.checked_offset().is_none().then(|| ValidationError::InvalidRange {
                    field: "page".to_string(),
                    min: "1".to_string(),
                    max: (i64::MAX / self.limit()).saturating_add(1).to_string(),
                })
            })
            .validate()
    }
}

/// A flat business record with a store-assigned identifier.
///
/// `Input` is the set of mutable fields submitted by a form; `Filter` is the
/// list query bound to a view. `from_input` builds a fresh row and
/// `apply_input` replaces every mutable field of an existing one.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;
    /// Collection segment under `/api/v1`.
    const PATH: &'static str = Self::TABLE;
    const LABEL: &'static str;
    const MODULE: Module;

    type Input: Clone + Serialize + DeserializeOwned + Validate + Send + Sync + 'static;
    type Filter: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static;

    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn from_input(id: Uuid, input: Self::Input, now: DateTime<Utc>) -> Self;
    fn apply_input(&mut self, input: Self::Input, now: DateTime<Utc>);
    fn matches(&self, filter: &Self::Filter) -> bool;

    fn foreign_keys(&self) -> Vec<ForeignKey> {
        Vec::new()
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Records the signed-in user as the creator, for entities that track it.
    fn stamp_creator(&mut self, _user_id: Uuid) {}

    /// Copy safe to return to clients.
    fn redacted(self) -> Self {
        self
    }
}

#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    /// Matching rows, newest first.
    async fn list(&self, filter: E::Filter, page: Pagination) -> Result<Vec<E>, StoreError>;
    async fn get(&self, id: Uuid) -> Result<E, StoreError>;
    async fn insert(&self, row: E) -> Result<E, StoreError>;
    async fn replace(&self, row: E) -> Result<E, StoreError>;
    async fn remove(&self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CrmStore:
    EntityStore<User>
    + EntityStore<Company>
    + EntityStore<Contact>
    + EntityStore<Lead>
    + EntityStore<Deal>
    + EntityStore<Activity>
    + EntityStore<Department>
    + EntityStore<Designation>
    + EntityStore<Employee>
    + EntityStore<LeaveType>
    + EntityStore<LeaveRequest>
    + EntityStore<Project>
    + EntityStore<Task>
{
    /// The account whose username or email equals `identifier`, ignoring case.
    async fn find_user_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError>;

    /// Every open task due before `today`, most overdue first.
    async fn overdue_tasks(&self, today: NaiveDate) -> Result<Vec<Task>, StoreError>;

    /// Every incomplete activity assigned to `user_id` and scheduled after
    /// `now`, soonest first.
    async fn upcoming_activities(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Activity>, StoreError>;

    async fn revenue_by_stage(&self) -> Result<Vec<StageRevenue>, StoreError>;
    async fn dashboard_summary(&self) -> Result<DashboardSummary, StoreError>;

    /// Won revenue per calendar month of `year`, by deal creation date.
    async fn revenue_trends(&self, year: i32) -> Result<Vec<RevenueTrend>, StoreError>;

    /// Headcount per active department, hires since `hired_since` and leave
    /// approval figures.
    async fn hr_metrics(&self, hired_since: NaiveDate) -> Result<HrMetrics, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_caps() {
        let page = Pagination::default();
        assert_eq!(page.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset(), 0);

        let page = Pagination::new(3, 10);
        assert_eq!(page.limit(), 10);
        assert_eq!(page.offset(), 20);

        let page = Pagination::new(0, 1000);
        assert_eq!(page.limit(), MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_huge_page_is_rejected_not_overflowed() {
        let page = Pagination {
            page: Some(i64::MAX),
            size: None,
        };
        assert_eq!(page.checked_offset(), None);
        assert_eq!(page.offset(), i64::MAX);
        let err = page.validate().unwrap_err();
        assert!(err.summary().contains("page"));

        let last = Pagination::new(i64::MAX / MAX_PAGE_SIZE, MAX_PAGE_SIZE);
        assert!(last.validate().is_ok());
        assert!(Pagination::default().validate().is_ok());
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(StoreError::NotFound("Company").to_string(), "Company not found");
        assert_eq!(
            StoreError::UniqueViolation("companies.name".into()).to_string(),
            "duplicate value for companies.name"
        );
    }
}
