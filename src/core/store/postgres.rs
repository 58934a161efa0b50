//! Diesel-backed store.
//!
//! Each entity gets the same five statements through `pg_entity_store!`;
//! the per-entity part is the boxed filter query. Referential actions
//! (RESTRICT, CASCADE, SET NULL) are left to the schema.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::dsl::{count, sum};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::HashMap;
use uuid::Uuid;

use super::{CrmStore, Entity, EntityStore, Pagination, StoreError};
use crate::contacts::{
    Activity, ActivityFilter, Company, CompanyFilter, Contact, ContactFilter, Deal, DealFilter,
    Lead, LeadFilter,
};
use crate::core::shared::enums::{
    DealStage, EmployeeStatus, LeaveStatus, ProjectStatus, TaskStatus,
};
use crate::core::shared::schema::{
    activities, companies, contacts, deals, departments, designations, employees, leads,
    leave_requests, leave_types, projects, tasks, users,
};
use crate::core::shared::utils::{like_pattern, DbPool};
use crate::dashboards::{
    DashboardSummary, DepartmentDistribution, DepartmentHeadcount, EntityCounts, HrMetrics,
    LeaveMetrics, MonthlyHires, RevenueTrend, StageRevenue,
};
use crate::directory::{User, UserFilter};
use crate::people::{
    Department, DepartmentFilter, Designation, DesignationFilter, Employee, EmployeeFilter,
    LeaveRequest, LeaveRequestFilter, LeaveType, LeaveTypeFilter,
};
use crate::project::{Project, ProjectFilter, Task, TaskFilter};

diesel::define_sql_function! {
    fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text;
}

const CLOSED_TASKS: [TaskStatus; 2] = [TaskStatus::Completed, TaskStatus::Cancelled];

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Runs a blocking diesel closure on the blocking pool.
    async fn run<T, F>(&self, label: &'static str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, DieselError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Connection(e.to_string()))?;
            f(&mut conn).map_err(|e| from_diesel(e, label))
        })
        .await
        .map_err(|e| StoreError::Query(format!("blocking task failed: {e}")))?
    }
}

pub fn from_diesel(error: DieselError, label: &'static str) -> StoreError {
    match error {
        DieselError::NotFound => StoreError::NotFound(label),
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::UniqueViolation => StoreError::UniqueViolation(unique_message(
                label,
                info.table_name(),
                info.constraint_name(),
            )),
            DatabaseErrorKind::ForeignKeyViolation => {
                StoreError::ForeignKeyViolation(info.message().to_string())
            }
            DatabaseErrorKind::CheckViolation | DatabaseErrorKind::NotNullViolation => {
                StoreError::CheckViolation(info.message().to_string())
            }
            DatabaseErrorKind::ClosedConnection => {
                StoreError::Connection(info.message().to_string())
            }
            _ => StoreError::Query(info.message().to_string()),
        },
        other => StoreError::Query(other.to_string()),
    }
}

/// `companies_name_key` becomes "Company with this name already exists".
fn unique_message(label: &str, table: Option<&str>, constraint: Option<&str>) -> String {
    let column = constraint
        .and_then(|c| c.strip_suffix("_key"))
        .and_then(|c| match table {
            Some(table) => c.strip_prefix(table).and_then(|c| c.strip_prefix('_')),
            None => c.split_once('_').map(|(_, col)| col),
        });
    match column {
        Some(column) => format!("{label} with this {column} already exists"),
        None => format!("{label} already exists"),
    }
}

macro_rules! pg_entity_store {
    ($entity:ty, $table:ident, $filter:ident) => {
        #[async_trait]
        impl EntityStore<$entity> for PgStore {
            async fn list(
                &self,
                filter: <$entity as Entity>::Filter,
                page: Pagination,
            ) -> Result<Vec<$entity>, StoreError> {
                self.run(<$entity as Entity>::LABEL, move |conn| {
                    $filter(filter)
                        .order(($table::created_at.desc(), $table::id.desc()))
                        .limit(page.limit())
                        .offset(page.offset())
                        .load::<$entity>(conn)
                })
                .await
            }

            async fn get(&self, id: Uuid) -> Result<$entity, StoreError> {
                self.run(<$entity as Entity>::LABEL, move |conn| {
                    $table::table.find(id).first::<$entity>(conn)
                })
                .await
            }

            async fn insert(&self, row: $entity) -> Result<$entity, StoreError> {
                self.run(<$entity as Entity>::LABEL, move |conn| {
                    diesel::insert_into($table::table)
                        .values(&row)
                        .get_result::<$entity>(conn)
                })
                .await
            }

            async fn replace(&self, row: $entity) -> Result<$entity, StoreError> {
                self.run(<$entity as Entity>::LABEL, move |conn| {
                    diesel::update($table::table.find(row.id))
                        .set(&row)
                        .get_result::<$entity>(conn)
                })
                .await
            }

            async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
                self.run(<$entity as Entity>::LABEL, move |conn| {
                    let deleted = diesel::delete($table::table.find(id)).execute(conn)?;
                    if deleted == 0 {
                        return Err(DieselError::NotFound);
                    }
                    Ok(())
                })
                .await
            }
        }
    };
}

fn user_query(f: UserFilter) -> users::BoxedQuery<'static, Pg> {
    let mut q = users::table.into_boxed();
    if let Some(role) = f.role {
        q = q.filter(users::role.eq(role));
    }
    if let Some(is_active) = f.is_active {
        q = q.filter(users::is_active.eq(is_active));
    }
    if let Some(username) = f.username {
        q = q.filter(users::username.ilike(like_pattern(&username)));
    }
    if let Some(email) = f.email {
        q = q.filter(users::email.ilike(like_pattern(&email)));
    }
    q
}

fn company_query(f: CompanyFilter) -> companies::BoxedQuery<'static, Pg> {
    let mut q = companies::table.into_boxed();
    if let Some(industry) = f.industry {
        q = q.filter(companies::industry.eq(industry));
    }
    if let Some(size) = f.size {
        q = q.filter(companies::size.eq(size));
    }
    if let Some(is_active) = f.is_active {
        q = q.filter(companies::is_active.eq(is_active));
    }
    if let Some(search) = f.search {
        let pattern = like_pattern(&search);
        q = q.filter(
            companies::name
                .ilike(pattern.clone())
                .or(companies::industry.ilike(pattern.clone()))
                .or(companies::city.ilike(pattern)),
        );
    }
    q
}

fn contact_query(f: ContactFilter) -> contacts::BoxedQuery<'static, Pg> {
    let mut q = contacts::table.into_boxed();
    if let Some(company_id) = f.company_id {
        q = q.filter(contacts::company_id.eq(company_id));
    }
    if let Some(is_primary) = f.is_primary {
        q = q.filter(contacts::is_primary.eq(is_primary));
    }
    if let Some(search) = f.search {
        let pattern = like_pattern(&search);
        q = q.filter(
            contacts::first_name
                .ilike(pattern.clone())
                .or(contacts::last_name.ilike(pattern.clone()))
                .or(contacts::email.ilike(pattern)),
        );
    }
    q
}

fn lead_query(f: LeadFilter) -> leads::BoxedQuery<'static, Pg> {
    let mut q = leads::table.into_boxed();
    if let Some(status) = f.status {
        q = q.filter(leads::status.eq(status));
    }
    if let Some(assigned_to_id) = f.assigned_to_id {
        q = q.filter(leads::assigned_to_id.eq(assigned_to_id));
    }
    if let Some(company_id) = f.company_id {
        q = q.filter(leads::company_id.eq(company_id));
    }
    q
}

fn deal_query(f: DealFilter) -> deals::BoxedQuery<'static, Pg> {
    let mut q = deals::table.into_boxed();
    if let Some(stage) = f.stage {
        q = q.filter(deals::stage.eq(stage));
    }
    if let Some(owner_id) = f.owner_id {
        q = q.filter(deals::owner_id.eq(owner_id));
    }
    if let Some(company_id) = f.company_id {
        q = q.filter(deals::company_id.eq(company_id));
    }
    q
}

fn activity_query(f: ActivityFilter) -> activities::BoxedQuery<'static, Pg> {
    let mut q = activities::table.into_boxed();
    if let Some(lead_id) = f.lead_id {
        q = q.filter(activities::lead_id.eq(lead_id));
    }
    if let Some(deal_id) = f.deal_id {
        q = q.filter(activities::deal_id.eq(deal_id));
    }
    if let Some(contact_id) = f.contact_id {
        q = q.filter(activities::contact_id.eq(contact_id));
    }
    if let Some(is_completed) = f.is_completed {
        q = q.filter(activities::is_completed.eq(is_completed));
    }
    if let Some(assigned_to_id) = f.assigned_to_id {
        q = q.filter(activities::assigned_to_id.eq(assigned_to_id));
    }
    if let Some(after) = f.scheduled_after {
        q = q.filter(activities::scheduled_at.gt(after));
    }
    q
}

fn department_query(f: DepartmentFilter) -> departments::BoxedQuery<'static, Pg> {
    let mut q = departments::table.into_boxed();
    if let Some(is_active) = f.is_active {
        q = q.filter(departments::is_active.eq(is_active));
    }
    if let Some(search) = f.search {
        let pattern = like_pattern(&search);
        q = q.filter(
            departments::name
                .ilike(pattern.clone())
                .or(departments::description.ilike(pattern)),
        );
    }
    q
}

fn employee_query(f: EmployeeFilter) -> employees::BoxedQuery<'static, Pg> {
    let mut q = employees::table.into_boxed();
    if let Some(department_id) = f.department_id {
        q = q.filter(employees::department_id.eq(department_id));
    }
    if let Some(status) = f.status {
        q = q.filter(employees::status.eq(status));
    }
    if let Some(manager_id) = f.manager_id {
        q = q.filter(employees::manager_id.eq(manager_id));
    }
    if let Some(search) = f.search {
        let pattern = like_pattern(&search);
        q = q.filter(
            employees::first_name
                .ilike(pattern.clone())
                .or(employees::last_name.ilike(pattern.clone()))
                .or(employees::employee_code.ilike(pattern.clone()))
                .or(employees::email.ilike(pattern)),
        );
    }
    q
}

fn project_query(f: ProjectFilter) -> projects::BoxedQuery<'static, Pg> {
    let mut q = projects::table.into_boxed();
    if let Some(status) = f.status {
        q = q.filter(projects::status.eq(status));
    }
    if let Some(manager_id) = f.manager_id {
        q = q.filter(projects::manager_id.eq(manager_id));
    }
    if let Some(company_id) = f.company_id {
        q = q.filter(projects::company_id.eq(company_id));
    }
    q
}

fn task_query(f: TaskFilter) -> tasks::BoxedQuery<'static, Pg> {
    let mut q = tasks::table.into_boxed();
    if let Some(project_id) = f.project_id {
        q = q.filter(tasks::project_id.eq(project_id));
    }
    if let Some(assigned_to_id) = f.assigned_to_id {
        q = q.filter(tasks::assigned_to_id.eq(assigned_to_id));
    }
    if let Some(status) = f.status {
        q = q.filter(tasks::status.eq(status));
    }
    if let Some(priority) = f.priority {
        q = q.filter(tasks::priority.eq(priority));
    }
    if let Some(due_before) = f.due_before {
        q = q.filter(tasks::due_date.lt(due_before));
    }
    if let Some(open) = f.open {
        q = if open {
            q.filter(tasks::status.ne_all(CLOSED_TASKS.to_vec()))
        } else {
            q.filter(tasks::status.eq_any(CLOSED_TASKS.to_vec()))
        };
    }
    q
}

fn designation_query(f: DesignationFilter) -> designations::BoxedQuery<'static, Pg> {
    let mut q = designations::table.into_boxed();
    if let Some(department_id) = f.department_id {
        q = q.filter(designations::department_id.eq(department_id));
    }
    if let Some(is_active) = f.is_active {
        q = q.filter(designations::is_active.eq(is_active));
    }
    q
}

fn leave_type_query(f: LeaveTypeFilter) -> leave_types::BoxedQuery<'static, Pg> {
    let mut q = leave_types::table.into_boxed();
    if let Some(is_active) = f.is_active {
        q = q.filter(leave_types::is_active.eq(is_active));
    }
    q
}

fn leave_request_query(f: LeaveRequestFilter) -> leave_requests::BoxedQuery<'static, Pg> {
    let mut q = leave_requests::table.into_boxed();
    if let Some(employee_id) = f.employee_id {
        q = q.filter(leave_requests::employee_id.eq(employee_id));
    }
    if let Some(status) = f.status {
        q = q.filter(leave_requests::status.eq(status));
    }
    q
}

pg_entity_store!(User, users, user_query);
pg_entity_store!(Company, companies, company_query);
pg_entity_store!(Contact, contacts, contact_query);
pg_entity_store!(Lead, leads, lead_query);
pg_entity_store!(Deal, deals, deal_query);
pg_entity_store!(Activity, activities, activity_query);
pg_entity_store!(Department, departments, department_query);
pg_entity_store!(Designation, designations, designation_query);
pg_entity_store!(Employee, employees, employee_query);
pg_entity_store!(LeaveType, leave_types, leave_type_query);
pg_entity_store!(LeaveRequest, leave_requests, leave_request_query);
pg_entity_store!(Project, projects, project_query);
pg_entity_store!(Task, tasks, task_query);

fn load_revenue(conn: &mut PgConnection) -> Result<Vec<StageRevenue>, DieselError> {
    let rows: Vec<(DealStage, i64, Option<f64>)> = deals::table
        .group_by(deals::stage)
        .select((deals::stage, count(deals::id), sum(deals::value)))
        .load(conn)?;
    Ok(StageRevenue::from_groups(rows))
}

/// Headcount per department over every employee status.
fn employees_per_department(conn: &mut PgConnection) -> Result<HashMap<Uuid, i64>, DieselError> {
    Ok(employees::table
        .filter(employees::department_id.is_not_null())
        .group_by(employees::department_id)
        .select((employees::department_id, count(employees::id)))
        .load::<(Option<Uuid>, i64)>(conn)?
        .into_iter()
        .filter_map(|(id, n)| id.map(|id| (id, n)))
        .collect())
}

fn year_bounds(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let end = NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?.and_hms_opt(0, 0, 0)?;
    Some((start.and_utc(), end.and_utc()))
}

#[async_trait]
impl CrmStore for PgStore {
    async fn find_user_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let needle = identifier.trim().to_lowercase();
        self.run(User::LABEL, move |conn| {
            users::table
                .filter(
                    lower(users::username)
                        .eq(&needle)
                        .or(lower(users::email).eq(&needle)),
                )
                .first::<User>(conn)
                .optional()
        })
        .await
    }

    async fn overdue_tasks(&self, today: NaiveDate) -> Result<Vec<Task>, StoreError> {
        self.run(Task::LABEL, move |conn| {
            tasks::table
                .filter(tasks::due_date.lt(today))
                .filter(tasks::status.ne_all(CLOSED_TASKS.to_vec()))
                .order((tasks::due_date.asc(), tasks::created_at.asc(), tasks::id.asc()))
                .load::<Task>(conn)
        })
        .await
    }

    async fn upcoming_activities(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Activity>, StoreError> {
        self.run(Activity::LABEL, move |conn| {
            activities::table
                .filter(activities::assigned_to_id.eq(user_id))
                .filter(activities::is_completed.eq(false))
                .filter(activities::scheduled_at.gt(now))
                .order((
                    activities::scheduled_at.asc(),
                    activities::created_at.asc(),
                    activities::id.asc(),
                ))
                .load::<Activity>(conn)
        })
        .await
    }

    async fn revenue_by_stage(&self) -> Result<Vec<StageRevenue>, StoreError> {
        self.run(Deal::LABEL, load_revenue).await
    }

    async fn dashboard_summary(&self) -> Result<DashboardSummary, StoreError> {
        self.run("Dashboard", |conn| {
            conn.build_transaction().read_only().run(|conn| {
                let counts = EntityCounts {
                    users: users::table.count().get_result(conn)?,
                    companies: companies::table.count().get_result(conn)?,
                    contacts: contacts::table.count().get_result(conn)?,
                    leads: leads::table.count().get_result(conn)?,
                    deals: deals::table.count().get_result(conn)?,
                    activities: activities::table.count().get_result(conn)?,
                    departments: departments::table.count().get_result(conn)?,
                    employees: employees::table.count().get_result(conn)?,
                    projects: projects::table.count().get_result(conn)?,
                    tasks: tasks::table.count().get_result(conn)?,
                };

                let active_employees: i64 = employees::table
                    .filter(employees::status.eq(EmployeeStatus::Active))
                    .count()
                    .get_result(conn)?;
                let open_tasks: i64 = tasks::table
                    .filter(tasks::status.ne_all(CLOSED_TASKS.to_vec()))
                    .count()
                    .get_result(conn)?;
                let active_companies: i64 = companies::table
                    .filter(companies::is_active.eq(true))
                    .count()
                    .get_result(conn)?;
                let completed_projects: i64 = projects::table
                    .filter(projects::status.eq(ProjectStatus::Completed))
                    .count()
                    .get_result(conn)?;

                let active_per_department: HashMap<Uuid, i64> = employees::table
                    .filter(employees::status.eq(EmployeeStatus::Active))
                    .filter(employees::department_id.is_not_null())
                    .group_by(employees::department_id)
                    .select((employees::department_id, count(employees::id)))
                    .load::<(Option<Uuid>, i64)>(conn)?
                    .into_iter()
                    .filter_map(|(id, n)| id.map(|id| (id, n)))
                    .collect();

                let headcount = departments::table
                    .filter(departments::is_active.eq(true))
                    .order(departments::name.asc())
                    .select((departments::id, departments::name))
                    .load::<(Uuid, String)>(conn)?
                    .into_iter()
                    .map(|(id, name)| DepartmentHeadcount {
                        department_id: id,
                        name,
                        active_employees: active_per_department.get(&id).copied().unwrap_or(0),
                    })
                    .collect();

                Ok(DashboardSummary::new(
                    counts,
                    active_employees,
                    open_tasks,
                    active_companies,
                    completed_projects,
                    load_revenue(conn)?,
                    headcount,
                ))
            })
        })
        .await
    }

    async fn revenue_trends(&self, year: i32) -> Result<Vec<RevenueTrend>, StoreError> {
        let Some((start, end)) = year_bounds(year) else {
            return Ok(RevenueTrend::monthly(year, Vec::new()));
        };
        self.run(Deal::LABEL, move |conn| {
            let won: Vec<(DateTime<Utc>, f64)> = deals::table
                .filter(deals::stage.eq(DealStage::ClosedWon))
                .filter(deals::created_at.ge(start))
                .filter(deals::created_at.lt(end))
                .select((deals::created_at, deals::value))
                .load(conn)?;
            Ok(RevenueTrend::monthly(
                year,
                won.into_iter().map(|(at, value)| (at.date_naive(), value)),
            ))
        })
        .await
    }

    async fn hr_metrics(&self, hired_since: NaiveDate) -> Result<HrMetrics, StoreError> {
        self.run("HR metrics", move |conn| {
            conn.build_transaction().read_only().run(|conn| {
                let per_department = employees_per_department(conn)?;
                let department_distribution = departments::table
                    .filter(departments::is_active.eq(true))
                    .order(departments::name.asc())
                    .select((departments::id, departments::name))
                    .load::<(Uuid, String)>(conn)?
                    .into_iter()
                    .map(|(id, name)| DepartmentDistribution {
                        department: name,
                        count: per_department.get(&id).copied().unwrap_or(0),
                    })
                    .collect();

                let hire_dates: Vec<NaiveDate> = employees::table
                    .filter(employees::hire_date.ge(hired_since))
                    .select(employees::hire_date)
                    .load(conn)?;

                let total: i64 = leave_requests::table.count().get_result(conn)?;
                let approved: i64 = leave_requests::table
                    .filter(leave_requests::status.eq(LeaveStatus::Approved))
                    .count()
                    .get_result(conn)?;

                Ok(HrMetrics {
                    department_distribution,
                    hiring_trends: MonthlyHires::group(hire_dates),
                    leave_metrics: LeaveMetrics::new(total, approved),
                })
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::DatabaseErrorInformation;

    struct Info {
        message: &'static str,
        constraint: Option<&'static str>,
    }

    impl DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            self.message
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn db_error(kind: DatabaseErrorKind, constraint: Option<&'static str>) -> DieselError {
        DieselError::DatabaseError(
            kind,
            Box::new(Info {
                message: "violates constraint",
                constraint,
            }),
        )
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(from_diesel(DieselError::NotFound, "Deal"), StoreError::NotFound("Deal"));
        assert_eq!(
            from_diesel(
                db_error(DatabaseErrorKind::UniqueViolation, Some("companies_name_key")),
                "Company"
            ),
            StoreError::UniqueViolation("Company with this name already exists".into())
        );
        assert!(matches!(
            from_diesel(db_error(DatabaseErrorKind::ForeignKeyViolation, None), "Company"),
            StoreError::ForeignKeyViolation(_)
        ));
        assert!(matches!(
            from_diesel(db_error(DatabaseErrorKind::CheckViolation, None), "Lead"),
            StoreError::CheckViolation(_)
        ));
    }

    #[test]
    fn test_unique_message_without_constraint() {
        assert_eq!(unique_message("User", None, None), "User already exists");
        assert_eq!(
            unique_message("Employee", None, Some("employees_employee_code_key")),
            "Employee with this employee_code already exists"
        );
        assert_eq!(
            unique_message("Leave type", Some("leave_types"), Some("leave_types_name_key")),
            "Leave type with this name already exists"
        );
        assert_eq!(
            unique_message("User", Some("users"), Some("users_email_key")),
            "User with this email already exists"
        );
    }
}
