use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::schema::companies;
use crate::core::shared::utils::contains_ci;
use crate::core::store::Entity;
use crate::security::auth_api::Module;
use crate::security::validation::{Validate, ValidationResult, Validator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = companies)]
#[diesel(treat_none_as_null = true)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub annual_revenue: Option<f64>,
    pub employee_count: Option<i32>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyInput {
    pub name: String,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub annual_revenue: Option<f64>,
    pub employee_count: Option<i32>,
    pub description: Option<String>,
    pub is_active: bool,
}

impl Default for CompanyInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            industry: None,
            size: None,
            website: None,
            phone: None,
            email: None,
            address: None,
            city: None,
            country: None,
            annual_revenue: None,
            employee_count: None,
            description: None,
            is_active: true,
        }
    }
}

impl Validate for CompanyInput {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.name, "name", 200)
            .optional_text(self.industry.as_deref(), "industry", 100)
            .optional_text(self.size.as_deref(), "size", 50)
            .optional_url(self.website.as_deref())
            .optional_phone(self.phone.as_deref())
            .optional_email(self.email.as_deref())
            .optional_text(self.city.as_deref(), "city", 100)
            .optional_text(self.country.as_deref(), "country", 100)
            .optional_range(self.annual_revenue, "annual_revenue", Some(0.0), None)
            .optional_range(self.employee_count, "employee_count", Some(0), None)
            .validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyFilter {
    /// Matches name, industry or city.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Entity for Company {
    const TABLE: &'static str = "companies";
    const LABEL: &'static str = "Company";
    const MODULE: Module = Module::Crm;

    type Input = CompanyInput;
    type Filter = CompanyFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_input(id: Uuid, input: CompanyInput, now: DateTime<Utc>) -> Self {
        let mut company = Self {
            id,
            name: String::new(),
            industry: None,
            size: None,
            website: None,
            phone: None,
            email: None,
            address: None,
            city: None,
            country: None,
            annual_revenue: None,
            employee_count: None,
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        company.apply_input(input, now);
        company
    }

    fn apply_input(&mut self, input: CompanyInput, now: DateTime<Utc>) {
        self.name = input.name;
        self.industry = input.industry;
        self.size = input.size;
        self.website = input.website;
        self.phone = input.phone;
        self.email = input.email;
        self.address = input.address;
        self.city = input.city;
        self.country = input.country;
        self.annual_revenue = input.annual_revenue;
        self.employee_count = input.employee_count;
        self.description = input.description;
        self.is_active = input.is_active;
        self.updated_at = now;
    }

    fn matches(&self, f: &CompanyFilter) -> bool {
        let search = f.search.as_deref().map_or(true, |q| {
            contains_ci(&self.name, q)
                || self.industry.as_deref().is_some_and(|v| contains_ci(v, q))
                || self.city.as_deref().is_some_and(|v| contains_ci(v, q))
        });
        search
            && f.industry.as_ref().map_or(true, |v| self.industry.as_ref() == Some(v))
            && f.size.as_ref().map_or(true, |v| self.size.as_ref() == Some(v))
            && f.is_active.map_or(true, |v| self.is_active == v)
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Company {
        Company::from_input(
            Uuid::new_v4(),
            CompanyInput {
                name: "Acme Corp".into(),
                industry: Some("Technology".into()),
                city: Some("Lisbon".into()),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_defaults_to_active() {
        let input: CompanyInput = serde_json::from_str(r#"{"name":"Acme Corp"}"#).unwrap();
        assert!(input.is_active);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_values_wider_than_columns() {
        let input = CompanyInput {
            name: "Acme Corp".into(),
            phone: Some("+1 (555) 010-2030 x99".into()),
            email: Some(format!("sales@{}.{}.example.com", "a".repeat(50), "b".repeat(40))),
            ..Default::default()
        };
        assert_eq!(input.validate().unwrap_err().errors().len(), 2);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let input = CompanyInput {
            name: String::new(),
            email: Some("not-an-email".into()),
            employee_count: Some(-1),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.errors().len(), 3);
    }

    #[test]
    fn test_filter_search_spans_fields() {
        let company = acme();
        let by = |q: &str| CompanyFilter {
            search: Some(q.into()),
            ..Default::default()
        };
        assert!(company.matches(&by("acme")));
        assert!(company.matches(&by("TECH")));
        assert!(company.matches(&by("lisb")));
        assert!(!company.matches(&by("globex")));

        let inactive_only = CompanyFilter {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(!company.matches(&inactive_only));
    }

    #[test]
    fn test_apply_input_keeps_identity() {
        let mut company = acme();
        let (id, created) = (company.id, company.created_at);
        let later = created + chrono::Duration::minutes(5);

        company.apply_input(
            CompanyInput {
                name: "Acme Corporation".into(),
                ..Default::default()
            },
            later,
        );
        assert_eq!(company.id, id);
        assert_eq!(company.created_at, created);
        assert_eq!(company.updated_at, later);
        assert_eq!(company.industry, None);
    }
}
