use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::api::ApiClient;
use super::error::ClientError;
use crate::core::store::{Entity, Pagination};
use crate::dashboards::DashboardSummary;
use crate::security::validation::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
}

/// Transient message shown after a user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

/// List screen for one entity type.
///
/// Mutations never patch `rows`; after every submitted create, update or
/// delete the list is fetched again with the current filter.
pub struct EntityView<E: Entity> {
    client: Arc<ApiClient>,
    pub filter: E::Filter,
    pub page: Pagination,
    rows: Vec<E>,
    notifications: Vec<Notification>,
}

impl<E: Entity> EntityView<E> {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            filter: E::Filter::default(),
            page: Pagination::default(),
            rows: Vec::new(),
            notifications: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: E::Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn rows(&self) -> &[E] {
        &self.rows
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub async fn refresh(&mut self) -> Result<&[E], ClientError> {
        if let Err(e) = self.fetch().await {
            self.notifications.push(Notification::error(e.to_string()));
            return Err(e);
        }
        Ok(&self.rows)
    }

    async fn fetch(&mut self) -> Result<(), ClientError> {
        self.rows = self.client.list::<E>(&self.filter, self.page).await?;
        Ok(())
    }

    /// Re-fetch after a mutation. Only the mutation's outcome is notified;
    /// a failed re-fetch keeps the previous rows.
    async fn reload(&mut self, outcome: &Result<impl Sized, ClientError>) {
        if matches!(outcome, Err(e) if e.requires_login()) {
            return;
        }
        if let Err(e) = self.fetch().await {
            debug!("{} list refresh failed: {}", E::LABEL, e);
        }
    }

    fn report<T>(&mut self, outcome: &Result<T, ClientError>, done: &str) {
        self.notifications.push(match outcome {
            Ok(_) => Notification::success(format!("{} {}", E::LABEL, done)),
            Err(e) => Notification::error(e.to_string()),
        });
    }

    fn invalid(&mut self, input: &E::Input) -> Option<ClientError> {
        let errors = input.validate().err()?;
        let error = ClientError::Validation(errors.summary());
        self.notifications.push(Notification::error(error.to_string()));
        Some(error)
    }

    /// Checks the form locally first; nothing is sent when it is invalid.
    pub async fn create(&mut self, input: E::Input) -> Result<E, ClientError> {
        if let Some(error) = self.invalid(&input) {
            return Err(error);
        }
        let outcome = self.client.create::<E>(&input).await;
        self.report(&outcome, "created");
        self.reload(&outcome).await;
        outcome
    }

    pub async fn update(&mut self, id: Uuid, input: E::Input) -> Result<E, ClientError> {
        if let Some(error) = self.invalid(&input) {
            return Err(error);
        }
        let outcome = self.client.update::<E>(id, &input).await;
        self.report(&outcome, "updated");
        self.reload(&outcome).await;
        outcome
    }

    /// Returns `Ok(false)` without contacting the server when `confirm`
    /// declines.
    pub async fn delete(
        &mut self,
        id: Uuid,
        confirm: impl FnOnce(Option<&E>) -> bool,
    ) -> Result<bool, ClientError> {
        let row = self.rows.iter().find(|row| row.id() == id);
        if !confirm(row) {
            return Ok(false);
        }
        let outcome = self.client.delete::<E>(id).await;
        self.report(&outcome, "deleted");
        self.reload(&outcome).await;
        outcome.map(|()| true)
    }
}

/// Landing page. The aggregate is computed server-side and kept until the
/// next `load`.
#[derive(Debug, Default)]
pub struct DashboardView {
    pub summary: Option<DashboardSummary>,
}

impl DashboardView {
    pub async fn load(&mut self, client: &ApiClient) -> Result<&DashboardSummary, ClientError> {
        let summary = client.dashboard().await?;
        Ok(self.summary.insert(summary))
    }
}
