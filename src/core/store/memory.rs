//! In-process store used for `memory://` and the test suite.
//!
//! Rows are kept as JSON values keyed by table name. Unique keys and foreign
//! keys are recorded next to each row so inserts, updates and deletes can
//! enforce the same rules the relational schema declares.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CrmStore, Entity, EntityStore, ForeignKey, OnDelete, Pagination, StoreError};
use crate::contacts::{Activity, ActivityFilter, Company, Deal};
use crate::core::shared::enums::{DealStage, EmployeeStatus, LeaveStatus, ProjectStatus};
use crate::dashboards::{
    DashboardSummary, DepartmentDistribution, DepartmentHeadcount, EntityCounts, HrMetrics,
    LeaveMetrics, MonthlyHires, RevenueTrend, StageRevenue,
};
use crate::directory::User;
use crate::people::{Department, Employee, LeaveRequest};
use crate::project::{Project, Task};

#[derive(Debug, Clone)]
struct Row {
    value: Value,
    created_at: DateTime<Utc>,
    refs: Vec<ForeignKey>,
    unique: Vec<(&'static str, String)>,
}

type Table = BTreeMap<Uuid, Row>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of one table, decoded. Used by the aggregate queries.
    async fn all<E: Entity>(&self) -> Result<Vec<E>, StoreError> {
        let tables = self.tables.read().await;
        tables
            .get(E::TABLE)
            .map(|table| table.values().map(decode::<E>).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn count(&self, table: &'static str) -> i64 {
        let tables = self.tables.read().await;
        tables.get(table).map_or(0, |t| t.len() as i64)
    }
}

fn decode<E: Entity>(row: &Row) -> Result<E, StoreError> {
    serde_json::from_value(row.value.clone())
        .map_err(|e| StoreError::Query(format!("corrupt {} row: {e}", E::LABEL)))
}

fn encode<E: Entity>(row: &E) -> Result<Row, StoreError> {
    let value = serde_json::to_value(row)
        .map_err(|e| StoreError::Query(format!("cannot encode {}: {e}", E::LABEL)))?;
    Ok(Row {
        value,
        created_at: row.created_at(),
        refs: row.foreign_keys(),
        unique: row.unique_keys(),
    })
}

fn check_unique<E: Entity>(
    tables: &HashMap<&'static str, Table>,
    row: &Row,
    own_id: Uuid,
) -> Result<(), StoreError> {
    let Some(table) = tables.get(E::TABLE) else {
        return Ok(());
    };
    for (column, value) in &row.unique {
        let taken = table
            .iter()
            .filter(|(id, _)| **id != own_id)
            .any(|(_, other)| other.unique.iter().any(|(c, v)| c == column && v == value));
        if taken {
            return Err(StoreError::UniqueViolation(format!(
                "{} with {} '{}' already exists",
                E::LABEL,
                column,
                value
            )));
        }
    }
    Ok(())
}

fn check_references<E: Entity>(
    tables: &HashMap<&'static str, Table>,
    row: &Row,
) -> Result<(), StoreError> {
    for fk in &row.refs {
        let Some(target) = fk.id else { continue };
        let exists = tables.get(fk.table).is_some_and(|t| t.contains_key(&target));
        if !exists {
            return Err(StoreError::ForeignKeyViolation(format!(
                "{} references a missing row in {} ({} = {})",
                E::LABEL,
                fk.table,
                fk.column,
                target
            )));
        }
    }
    Ok(())
}

/// Every row removed by deleting `root`, following ON DELETE CASCADE edges.
fn cascade_closure(
    tables: &HashMap<&'static str, Table>,
    root: (&'static str, Uuid),
) -> Vec<(&'static str, Uuid)> {
    let mut doomed = vec![root];
    let mut cursor = 0;
    while cursor < doomed.len() {
        let (target_table, target_id) = doomed[cursor];
        for (table_name, rows) in tables {
            for (row_id, row) in rows {
                let cascades = row.refs.iter().any(|fk| {
                    fk.on_delete == OnDelete::Cascade
                        && fk.table == target_table
                        && fk.id == Some(target_id)
                });
                if cascades && !doomed.contains(&(*table_name, *row_id)) {
                    doomed.push((*table_name, *row_id));
                }
            }
        }
        cursor += 1;
    }
    doomed
}

#[async_trait]
impl<E: Entity> EntityStore<E> for MemoryStore {
    async fn list(&self, filter: E::Filter, page: Pagination) -> Result<Vec<E>, StoreError> {
        let mut rows: Vec<E> = self
            .all::<E>()
            .await?
            .into_iter()
            .filter(|row| row.matches(&filter))
            .collect();

        rows.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(page.limit() as usize)
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<E, StoreError> {
        let tables = self.tables.read().await;
        let row = tables
            .get(E::TABLE)
            .and_then(|t| t.get(&id))
            .ok_or(StoreError::NotFound(E::LABEL))?;
        decode(row)
    }

    async fn insert(&self, row: E) -> Result<E, StoreError> {
        let encoded = encode(&row)?;
        let mut tables = self.tables.write().await;

        let exists = tables.get(E::TABLE).is_some_and(|t| t.contains_key(&row.id()));
        if exists {
            return Err(StoreError::UniqueViolation(format!("{} id already exists", E::LABEL)));
        }
        check_unique::<E>(&tables, &encoded, row.id())?;
        check_references::<E>(&tables, &encoded)?;

        tables.entry(E::TABLE).or_default().insert(row.id(), encoded);
        Ok(row)
    }

    async fn replace(&self, row: E) -> Result<E, StoreError> {
        let encoded = encode(&row)?;
        let mut tables = self.tables.write().await;

        let exists = tables.get(E::TABLE).is_some_and(|t| t.contains_key(&row.id()));
        if !exists {
            return Err(StoreError::NotFound(E::LABEL));
        }
        check_unique::<E>(&tables, &encoded, row.id())?;
        check_references::<E>(&tables, &encoded)?;

        tables.entry(E::TABLE).or_default().insert(row.id(), encoded);
        Ok(row)
    }

    async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        let exists = tables.get(E::TABLE).is_some_and(|t| t.contains_key(&id));
        if !exists {
            return Err(StoreError::NotFound(E::LABEL));
        }

        let doomed = cascade_closure(&tables, (E::TABLE, id));

        for (table_name, rows) in tables.iter() {
            for (row_id, row) in rows {
                if doomed.contains(&(*table_name, *row_id)) {
                    continue;
                }
                let blocker = row.refs.iter().find(|fk| {
                    fk.on_delete == OnDelete::Restrict
                        && fk.id.is_some_and(|target| doomed.contains(&(fk.table, target)))
                });
                if let Some(fk) = blocker {
                    return Err(StoreError::ForeignKeyViolation(format!(
                        "{} is still referenced by {} ({})",
                        E::LABEL,
                        table_name,
                        fk.column
                    )));
                }
            }
        }

        for rows in tables.values_mut() {
            for row in rows.values_mut() {
                for fk in row.refs.iter_mut() {
                    let hit = fk.on_delete == OnDelete::SetNull
                        && fk.id.is_some_and(|target| doomed.contains(&(fk.table, target)));
                    if hit {
                        fk.id = None;
                        if let Some(fields) = row.value.as_object_mut() {
                            fields.insert(fk.column.to_string(), Value::Null);
                        }
                    }
                }
            }
        }

        for (table_name, row_id) in doomed {
            if let Some(rows) = tables.get_mut(table_name) {
                rows.remove(&row_id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CrmStore for MemoryStore {
    async fn find_user_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let needle = identifier.trim().to_lowercase();
        Ok(self.all::<User>().await?.into_iter().find(|u| {
            u.username.to_lowercase() == needle || u.email.to_lowercase() == needle
        }))
    }

    async fn overdue_tasks(&self, today: NaiveDate) -> Result<Vec<Task>, StoreError> {
        let mut rows: Vec<Task> = self
            .all::<Task>()
            .await?
            .into_iter()
            .filter(|t| t.is_overdue(today))
            .collect();
        rows.sort_by_key(|t| (t.due_date, t.created_at, t.id));
        Ok(rows)
    }

    async fn upcoming_activities(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Activity>, StoreError> {
        let filter = ActivityFilter {
            assigned_to_id: Some(user_id),
            is_completed: Some(false),
            scheduled_after: Some(now),
            ..Default::default()
        };
        let mut rows: Vec<Activity> = self
            .all::<Activity>()
            .await?
            .into_iter()
            .filter(|a| a.matches(&filter))
            .collect();
        rows.sort_by_key(|a| (a.scheduled_at, a.created_at, a.id));
        Ok(rows)
    }

    async fn revenue_by_stage(&self) -> Result<Vec<StageRevenue>, StoreError> {
        let deals = self.all::<Deal>().await?;
        Ok(StageRevenue::tally(deals.iter().map(|d| (d.stage, d.value))))
    }

    async fn dashboard_summary(&self) -> Result<DashboardSummary, StoreError> {
        let counts = EntityCounts {
            users: self.count(crate::directory::User::TABLE).await,
            companies: self.count(Company::TABLE).await,
            contacts: self.count(crate::contacts::Contact::TABLE).await,
            leads: self.count(crate::contacts::Lead::TABLE).await,
            deals: self.count(Deal::TABLE).await,
            activities: self.count(crate::contacts::Activity::TABLE).await,
            departments: self.count(Department::TABLE).await,
            employees: self.count(Employee::TABLE).await,
            projects: self.count(Project::TABLE).await,
            tasks: self.count(Task::TABLE).await,
        };

        let companies = self.all::<Company>().await?;
        let employees = self.all::<Employee>().await?;
        let projects = self.all::<Project>().await?;
        let tasks = self.all::<Task>().await?;
        let mut departments = self.all::<Department>().await?;
        departments.sort_by(|a, b| a.name.cmp(&b.name));

        let active: Vec<&Employee> = employees
            .iter()
            .filter(|e| e.status == EmployeeStatus::Active)
            .collect();

        let headcount = departments
            .iter()
            .filter(|d| d.is_active)
            .map(|d| DepartmentHeadcount {
                department_id: d.id,
                name: d.name.clone(),
                active_employees: active
                    .iter()
                    .filter(|e| e.department_id == Some(d.id))
                    .count() as i64,
            })
            .collect();

        Ok(DashboardSummary::new(
            counts,
            active.len() as i64,
            tasks.iter().filter(|t| t.status.is_open()).count() as i64,
            companies.iter().filter(|c| c.is_active).count() as i64,
            projects
                .iter()
                .filter(|p| p.status == ProjectStatus::Completed)
                .count() as i64,
            self.revenue_by_stage().await?,
            headcount,
        ))
    }

    async fn revenue_trends(&self, year: i32) -> Result<Vec<RevenueTrend>, StoreError> {
        let deals = self.all::<Deal>().await?;
        Ok(RevenueTrend::monthly(
            year,
            deals
                .iter()
                .filter(|d| d.stage == DealStage::ClosedWon)
                .map(|d| (d.created_at.date_naive(), d.value)),
        ))
    }

    async fn hr_metrics(&self, hired_since: NaiveDate) -> Result<HrMetrics, StoreError> {
        let employees = self.all::<Employee>().await?;
        let requests = self.all::<LeaveRequest>().await?;
        let mut departments = self.all::<Department>().await?;
        departments.retain(|d| d.is_active);
        departments.sort_by(|a, b| a.name.cmp(&b.name));

        let department_distribution = departments
            .into_iter()
            .map(|d| DepartmentDistribution {
                count: employees
                    .iter()
                    .filter(|e| e.department_id == Some(d.id))
                    .count() as i64,
                department: d.name,
            })
            .collect();

        let approved = requests
            .iter()
            .filter(|r| r.status == LeaveStatus::Approved)
            .count() as i64;

        Ok(HrMetrics {
            department_distribution,
            hiring_trends: MonthlyHires::group(
                employees
                    .iter()
                    .map(|e| e.hire_date)
                    .filter(|hired| *hired >= hired_since),
            ),
            leave_metrics: LeaveMetrics::new(requests.len() as i64, approved),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::{CompanyInput, Contact, ContactInput};

    fn company(name: &str) -> Company {
        Company::from_input(
            Uuid::new_v4(),
            CompanyInput {
                name: name.to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    fn contact(company_id: Option<Uuid>) -> Contact {
        Contact::from_input(
            Uuid::new_v4(),
            ContactInput {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                company_id,
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_unique_name_enforced() {
        let store = MemoryStore::new();
        EntityStore::<Company>::insert(&store, company("Acme Corp")).await.unwrap();

        let err = EntityStore::<Company>::insert(&store, company("Acme Corp"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_missing_reference_rejected() {
        let store = MemoryStore::new();
        let err = EntityStore::<Contact>::insert(&store, contact(Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
    }

    #[tokio::test]
    async fn test_restrict_blocks_delete() {
        let store = MemoryStore::new();
        let acme = EntityStore::<Company>::insert(&store, company("Acme Corp")).await.unwrap();
        let ada = EntityStore::<Contact>::insert(&store, contact(Some(acme.id))).await.unwrap();

        let err = EntityStore::<Company>::remove(&store, acme.id).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
        assert!(EntityStore::<Company>::get(&store, acme.id).await.is_ok());

        EntityStore::<Contact>::remove(&store, ada.id).await.unwrap();
        EntityStore::<Company>::remove(&store, acme.id).await.unwrap();
        assert_eq!(
            EntityStore::<Company>::get(&store, acme.id).await.unwrap_err(),
            StoreError::NotFound("Company")
        );
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_paginated() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for i in 0..5 {
            let mut row = company(&format!("Company {i}"));
            row.created_at = base + chrono::Duration::seconds(i);
            EntityStore::<Company>::insert(&store, row).await.unwrap();
        }

        let first: Vec<Company> =
            EntityStore::<Company>::list(&store, Default::default(), Pagination::new(1, 2))
                .await
                .unwrap();
        assert_eq!(
            first.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["Company 4", "Company 3"]
        );

        let last: Vec<Company> =
            EntityStore::<Company>::list(&store, Default::default(), Pagination::new(3, 2))
                .await
                .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].name, "Company 0");
    }
}
