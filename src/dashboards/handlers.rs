use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::{Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::types::{DashboardSummary, HrMetrics, RevenueTrend};
use crate::api::crud::ApiResult;
use crate::core::shared::state::AppState;
use crate::security::auth_api::{AuthenticatedUser, Module};
use crate::security::validation::{Validate, ValidationResult, Validator};

/// Hiring trends look back this many days.
pub const HIRING_WINDOW_DAYS: i64 = 180;

/// Aggregate counts and revenue for the landing page. Open to every
/// signed-in role; the figures are computed by the store in one pass.
pub async fn handle_get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<DashboardSummary>> {
    debug!("Dashboard requested by {}", user.username);
    Ok(Json(state.store.dashboard_summary().await?))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevenueTrendQuery {
    /// Defaults to the current year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl Validate for RevenueTrendQuery {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .optional_range(self.year, "year", Some(1), Some(9999))
            .validate()
    }
}

/// Won revenue per month of one year, January first.
pub async fn handle_get_revenue_trends(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    query: Result<Query<RevenueTrendQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<RevenueTrend>>> {
    user.require_read(Module::Crm)?;
    let Query(query) = query?;
    query.validate()?;

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    Ok(Json(state.store.revenue_trends(year).await?))
}

pub async fn handle_get_hr_metrics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<HrMetrics>> {
    user.require_read(Module::Hr)?;
    let since = Utc::now().date_naive() - Duration::days(HIRING_WINDOW_DAYS);
    Ok(Json(state.store.hr_metrics(since).await?))
}

pub fn configure_dashboards_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(handle_get_dashboard))
        .route("/analytics/revenue/trends", get(handle_get_revenue_trends))
        .route("/analytics/hr/metrics", get(handle_get_hr_metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::{Company, CompanyInput, Deal, DealInput};
    use crate::core::shared::enums::{DealStage, UserRole};
    use crate::core::shared::test_utils::{caller, test_state};
    use crate::core::store::{Entity, EntityStore};
    use chrono::Utc;
    use uuid::Uuid;

    fn deal(stage: DealStage, value: f64) -> Deal {
        Deal::from_input(
            Uuid::new_v4(),
            DealInput {
                title: format!("{stage} deal"),
                stage,
                value: Some(value),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_summary_reflects_store() {
        let state = test_state();
        let acme = Company::from_input(
            Uuid::new_v4(),
            CompanyInput {
                name: "Acme Corp".into(),
                ..Default::default()
            },
            Utc::now(),
        );
        EntityStore::<Company>::insert(state.store.as_ref(), acme).await.unwrap();
        for row in [
            deal(DealStage::Prospecting, 1_000.0),
            deal(DealStage::Negotiation, 4_000.0),
            deal(DealStage::ClosedWon, 10_000.0),
            deal(DealStage::ClosedLost, 500.0),
        ] {
            EntityStore::<Deal>::insert(state.store.as_ref(), row).await.unwrap();
        }

        let Json(summary) = handle_get_dashboard(State(state), Extension(caller(UserRole::Support)))
            .await
            .unwrap();

        assert_eq!(summary.counts.companies, 1);
        assert_eq!(summary.counts.deals, 4);
        assert_eq!(summary.active_companies, 1);
        assert_eq!(summary.revenue_by_stage.len(), DealStage::ALL.len());
        assert_eq!(summary.pipeline_value, 5_000.0);
        assert_eq!(summary.won_revenue, 10_000.0);
    }

    #[tokio::test]
    async fn test_revenue_trends_rejects_bad_year_and_checks_role() {
        let err = handle_get_revenue_trends(
            State(test_state()),
            Extension(caller(UserRole::Sales)),
            Ok(Query(RevenueTrendQuery { year: Some(0) })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "validation_error");

        let err = handle_get_revenue_trends(
            State(test_state()),
            Extension(caller(UserRole::Employee)),
            Ok(Query(RevenueTrendQuery::default())),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "insufficient_permissions");
    }

    #[tokio::test]
    async fn test_revenue_trends_count_won_deals_only() {
        let state = test_state();
        for row in [
            deal(DealStage::ClosedWon, 3_000.0),
            deal(DealStage::ClosedWon, 1_000.0),
            deal(DealStage::Negotiation, 9_000.0),
        ] {
            EntityStore::<Deal>::insert(state.store.as_ref(), row).await.unwrap();
        }

        let today = Utc::now().date_naive();
        let Json(trends) = handle_get_revenue_trends(
            State(state),
            Extension(caller(UserRole::Manager)),
            Ok(Query(RevenueTrendQuery::default())),
        )
        .await
        .unwrap();
        let month = &trends[today.month0() as usize];
        assert_eq!(trends.len(), 12);
        assert_eq!(month.deals, 2);
        assert_eq!(month.revenue, 4_000.0);
        assert_eq!(month.avg_deal_size, 2_000.0);
    }

    #[tokio::test]
    async fn test_hr_metrics_distribution_and_hires() {
        use crate::people::{Department, DepartmentInput, Employee, EmployeeInput};

        let state = test_state();
        let store = state.store.as_ref();
        let engineering = Department::from_input(
            Uuid::new_v4(),
            DepartmentInput {
                name: "Engineering".into(),
                ..Default::default()
            },
            Utc::now(),
        );
        EntityStore::<Department>::insert(store, engineering.clone()).await.unwrap();

        let today = Utc::now().date_naive();
        for (code, hired) in [("E-1", today), ("E-2", today - Duration::days(400))] {
            let employee = Employee::from_input(
                Uuid::new_v4(),
                EmployeeInput {
                    employee_code: code.into(),
                    first_name: "Mary".into(),
                    last_name: "Jackson".into(),
                    department_id: Some(engineering.id),
                    hire_date: Some(hired),
                    ..Default::default()
                },
                Utc::now(),
            );
            EntityStore::<Employee>::insert(store, employee).await.unwrap();
        }

        let Json(metrics) = handle_get_hr_metrics(State(state), Extension(caller(UserRole::Hr)))
            .await
            .unwrap();
        assert_eq!(metrics.department_distribution.len(), 1);
        assert_eq!(metrics.department_distribution[0].department, "Engineering");
        assert_eq!(metrics.department_distribution[0].count, 2);
        assert_eq!(metrics.hiring_trends.len(), 1);
        assert_eq!(metrics.hiring_trends[0].hires, 1);
        assert_eq!(metrics.leave_metrics.total_requests, 0);
        assert_eq!(metrics.leave_metrics.approval_rate, 0.0);
    }
}
