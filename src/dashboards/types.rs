use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::DealStage;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub users: i64,
    pub companies: i64,
    pub contacts: i64,
    pub leads: i64,
    pub deals: i64,
    pub activities: i64,
    pub departments: i64,
    pub employees: i64,
    pub projects: i64,
    pub tasks: i64,
}

/// Deals currently sitting in one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRevenue {
    pub stage: DealStage,
    pub deal_count: i64,
    pub total_value: f64,
}

impl StageRevenue {
    fn zeroed() -> Vec<Self> {
        DealStage::ALL
            .iter()
            .map(|stage| Self {
                stage: *stage,
                deal_count: 0,
                total_value: 0.0,
            })
            .collect()
    }

    /// One entry per stage in pipeline order, empty stages reported as zero.
    pub fn tally(deals: impl IntoIterator<Item = (DealStage, f64)>) -> Vec<Self> {
        let mut stages = Self::zeroed();
        for (stage, value) in deals {
            if let Some(entry) = stages.iter_mut().find(|s| s.stage == stage) {
                entry.deal_count += 1;
                entry.total_value += value;
            }
        }
        stages
    }

    /// Same shape as [`StageRevenue::tally`], from `GROUP BY stage` rows.
    pub fn from_groups(groups: impl IntoIterator<Item = (DealStage, i64, Option<f64>)>) -> Vec<Self> {
        let mut stages = Self::zeroed();
        for (stage, deal_count, total) in groups {
            if let Some(entry) = stages.iter_mut().find(|s| s.stage == stage) {
                entry.deal_count = deal_count;
                entry.total_value = total.unwrap_or(0.0);
            }
        }
        stages
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentHeadcount {
    pub department_id: Uuid,
    pub name: String,
    pub active_employees: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub counts: EntityCounts,
    pub active_employees: i64,
    pub open_tasks: i64,
    pub active_companies: i64,
    pub completed_projects: i64,
    pub revenue_by_stage: Vec<StageRevenue>,
    /// Sum over every stage that is not closed.
    pub pipeline_value: f64,
    /// Total of `closed_won`.
    pub won_revenue: f64,
    pub departments: Vec<DepartmentHeadcount>,
}

impl DashboardSummary {
    pub fn new(
        counts: EntityCounts,
        active_employees: i64,
        open_tasks: i64,
        active_companies: i64,
        completed_projects: i64,
        revenue_by_stage: Vec<StageRevenue>,
        departments: Vec<DepartmentHeadcount>,
    ) -> Self {
        let pipeline_value = revenue_by_stage
            .iter()
            .filter(|s| !s.stage.is_closed())
            .map(|s| s.total_value)
            .sum();
        let won_revenue = revenue_by_stage
            .iter()
            .filter(|s| s.stage == DealStage::ClosedWon)
            .map(|s| s.total_value)
            .sum();

        Self {
            counts,
            active_employees,
            open_tasks,
            active_companies,
            completed_projects,
            revenue_by_stage,
            pipeline_value,
            won_revenue,
            departments,
        }
    }
}

/// Won deals created in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueTrend {
    pub month: u32,
    pub period: String,
    pub revenue: f64,
    pub deals: i64,
    pub avg_deal_size: f64,
}

impl RevenueTrend {
    /// Twelve entries, January first, from `(created_on, value)` pairs of
    /// won deals. Dates outside `year` are ignored.
    pub fn monthly(year: i32, deals: impl IntoIterator<Item = (NaiveDate, f64)>) -> Vec<Self> {
        let mut months: Vec<Self> = MONTHS
            .iter()
            .zip(1u32..)
            .map(|(name, month)| Self {
                month,
                period: name.to_string(),
                revenue: 0.0,
                deals: 0,
                avg_deal_size: 0.0,
            })
            .collect();

        for (date, value) in deals {
            if date.year() != year {
                continue;
            }
            if let Some(entry) = months.get_mut(date.month0() as usize) {
                entry.revenue += value;
                entry.deals += 1;
            }
        }
        for entry in &mut months {
            if entry.deals > 0 {
                entry.avg_deal_size = entry.revenue / entry.deals as f64;
            }
        }
        months
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentDistribution {
    pub department: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyHires {
    pub year: i32,
    pub month: u32,
    pub hires: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveMetrics {
    pub total_requests: i64,
    pub approved_requests: i64,
    /// Percentage, 0 when there are no requests.
    pub approval_rate: f64,
}

impl LeaveMetrics {
    pub fn new(total_requests: i64, approved_requests: i64) -> Self {
        Self {
            total_requests,
            approved_requests,
            approval_rate: approved_requests as f64 / total_requests.max(1) as f64 * 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrMetrics {
    pub department_distribution: Vec<DepartmentDistribution>,
    pub hiring_trends: Vec<MonthlyHires>,
    pub leave_metrics: LeaveMetrics,
}

impl MonthlyHires {
    /// Hires grouped by calendar month, oldest month first.
    pub fn group(hire_dates: impl IntoIterator<Item = NaiveDate>) -> Vec<Self> {
        let mut months: Vec<Self> = Vec::new();
        let mut dates: Vec<NaiveDate> = hire_dates.into_iter().collect();
        dates.sort();
        for date in dates {
            match months.last_mut() {
                Some(last) if last.year == date.year() && last.month == date.month() => {
                    last.hires += 1
                }
                _ => months.push(Self {
                    year: date.year(),
                    month: date.month(),
                    hires: 1,
                }),
            }
        }
        months
    }
}
