use chrono::Utc;
use db::{
    models::{
        invoice::{Invoice, InvoiceSource},
        mechanic::Mechanic,
        motorcycle::Motorcycle,
        work_session::{CreateWorkSession, UpdateWorkSession, WorkSession, WorkSessionSummary},
        work_status::WorkStatus,
    },
    pagination::{Page, PageRequest},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::validation::{ValidationErrors, clean};

#[derive(Debug, Error)]
pub enum WorkSessionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("work session not found")]
    NotFound,
    #[error("work session is already invoiced")]
    AlreadyInvoiced,
    #[error("work session is {0}")]
    InvalidState(WorkStatus),
}

pub struct WorkSessionService;

impl WorkSessionService {
    pub async fn list(
        pool: &SqlitePool,
        request: &PageRequest,
        status: Option<WorkStatus>,
    ) -> Result<Page<WorkSessionSummary>, WorkSessionError> {
        Ok(WorkSession::find_page(pool, request, status).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<WorkSessionSummary, WorkSessionError> {
        WorkSession::find_summary_by_id(pool, id)
            .await?
            .ok_or(WorkSessionError::NotFound)
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateWorkSession,
    ) -> Result<WorkSession, WorkSessionError> {
        let data = CreateWorkSession {
            description: clean(&data.description),
            ..data.clone()
        };
        let motorcycle = Motorcycle::find_by_id(pool, data.motorcycle_id).await?;
        let mechanic_ok = Self::mechanic_usable(pool, data.mechanic_id).await?;

        let mut errors = ValidationErrors::of(&data);
        errors
            .check(
                "motorcycle_id",
                motorcycle.is_some(),
                "The selected motorcycle is invalid.",
            )
            .check(
                "mechanic_id",
                mechanic_ok,
                "The selected mechanic is invalid or inactive.",
            );
        errors.into_result()?;
        let Some(motorcycle) = motorcycle else {
            return Err(WorkSessionError::NotFound);
        };

        let session =
            WorkSession::create(pool, Uuid::new_v4(), motorcycle.customer_id, &data).await?;
        info!(
            work_session_id = %session.id,
            session_type = %session.session_type,
            "Work session created"
        );
        Ok(session)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateWorkSession,
    ) -> Result<WorkSession, WorkSessionError> {
        Self::get(pool, id).await?;
        Self::ensure_not_invoiced(pool, id).await?;
        let data = UpdateWorkSession {
            description: clean(&data.description),
            ..data.clone()
        };
        let mechanic_ok = Self::mechanic_usable(pool, data.mechanic_id).await?;

        let mut errors = ValidationErrors::of(&data);
        errors.check(
            "mechanic_id",
            mechanic_ok,
            "The selected mechanic is invalid or inactive.",
        );
        errors.into_result()?;

        WorkSession::update(pool, id, &data)
            .await?
            .ok_or(WorkSessionError::NotFound)
    }

    pub async fn start(pool: &SqlitePool, id: Uuid) -> Result<WorkSession, WorkSessionError> {
        let session = Self::get(pool, id).await?.session;
        match session.status() {
            WorkStatus::Completed => Err(WorkSessionError::InvalidState(WorkStatus::Completed)),
            WorkStatus::InProgress => Ok(session),
            WorkStatus::Pending => {
                let started = WorkSession::set_progress(pool, id, Some(Utc::now()), None)
                    .await?
                    .ok_or(WorkSessionError::NotFound)?;
                info!(work_session_id = %id, "Work session started");
                Ok(started)
            }
        }
    }

    pub async fn complete(pool: &SqlitePool, id: Uuid) -> Result<WorkSession, WorkSessionError> {
        let session = Self::get(pool, id).await?.session;
        if session.status() == WorkStatus::Completed {
            return Err(WorkSessionError::InvalidState(WorkStatus::Completed));
        }
        let now = Utc::now();
        let completed =
            WorkSession::set_progress(pool, id, Some(session.started_at.unwrap_or(now)), Some(now))
                .await?
                .ok_or(WorkSessionError::NotFound)?;
        info!(work_session_id = %id, "Work session completed");
        Ok(completed)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), WorkSessionError> {
        Self::get(pool, id).await?;
        Self::ensure_not_invoiced(pool, id).await?;
        WorkSession::delete(pool, id).await?;
        info!(work_session_id = %id, "Work session deleted");
        Ok(())
    }

    async fn mechanic_usable(
        pool: &SqlitePool,
        mechanic_id: Option<Uuid>,
    ) -> Result<bool, WorkSessionError> {
        Ok(match mechanic_id {
            Some(id) => Mechanic::find_by_id(pool, id)
                .await?
                .is_some_and(|m| m.active),
            None => true,
        })
    }

    async fn ensure_not_invoiced(pool: &SqlitePool, id: Uuid) -> Result<(), WorkSessionError> {
        match Invoice::find_by_source(pool, InvoiceSource::WorkSession(id)).await? {
            Some(_) => Err(WorkSessionError::AlreadyInvoiced),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use db::models::work_session::SessionType;

    use super::*;
    use crate::services::{
        billing::{BillingService, GenerateInvoice},
        config::Config,
        test_support,
    };

    async fn dyno_run(pool: &SqlitePool) -> WorkSession {
        let customer = test_support::customer(pool, "rider@example.com").await;
        let motorcycle = test_support::motorcycle(pool, customer.id).await;
        let data = CreateWorkSession {
            motorcycle_id: motorcycle.id,
            mechanic_id: None,
            session_type: Some(SessionType::Dyno),
            description: "Baseline dyno run".to_string(),
            labor_hours: Some(1.5),
        };
        WorkSessionService::create(pool, &data).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_takes_owner_from_motorcycle() {
        let pool = test_support::pool().await;
        let session = dyno_run(&pool).await;
        let summary = WorkSessionService::get(&pool, session.id).await.unwrap();
        assert_eq!(summary.session_type, SessionType::Dyno);
        assert_eq!(summary.status, WorkStatus::Pending);
        assert!(summary.customer_name.starts_with("Ada"));
    }

    #[tokio::test]
    async fn test_status_follows_dates() {
        let pool = test_support::pool().await;
        let session = dyno_run(&pool).await;

        WorkSessionService::start(&pool, session.id).await.unwrap();
        assert_eq!(
            WorkSessionService::get(&pool, session.id).await.unwrap().status,
            WorkStatus::InProgress
        );

        WorkSessionService::complete(&pool, session.id).await.unwrap();
        let page = WorkSessionService::list(
            &pool,
            &PageRequest::default(),
            Some(WorkStatus::Completed),
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].status, WorkStatus::Completed);
    }

    #[tokio::test]
    async fn test_rejects_inactive_mechanic() {
        let pool = test_support::pool().await;
        let session = dyno_run(&pool).await;
        let mechanic = test_support::mechanic(&pool, "sam@shop.example").await;
        Mechanic::set_active(&pool, mechanic.id, false).await.unwrap();

        let update = UpdateWorkSession {
            mechanic_id: Some(mechanic.id),
            session_type: SessionType::Tuning,
            description: "Fuel map".to_string(),
            labor_hours: 2.0,
        };
        let err = WorkSessionService::update(&pool, session.id, &update)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkSessionError::Validation(ref v) if v.has("mechanic_id")));
    }

    #[tokio::test]
    async fn test_invoiced_session_is_locked() {
        let pool = test_support::pool().await;
        let session = dyno_run(&pool).await;
        WorkSessionService::complete(&pool, session.id).await.unwrap();
        BillingService::generate_from_work_session(
            &pool,
            session.id,
            &GenerateInvoice::default(),
            &Config::default(),
        )
        .await
        .unwrap();

        let update = UpdateWorkSession {
            mechanic_id: None,
            session_type: SessionType::Dyno,
            description: "Second pull".to_string(),
            labor_hours: 3.0,
        };
        assert!(matches!(
            WorkSessionService::update(&pool, session.id, &update).await,
            Err(WorkSessionError::AlreadyInvoiced)
        ));
        assert!(matches!(
            WorkSessionService::delete(&pool, session.id).await,
            Err(WorkSessionError::AlreadyInvoiced)
        ));

        let kept = WorkSessionService::get(&pool, session.id).await.unwrap();
        assert_eq!(kept.session.description, "Baseline dyno run");
        assert_eq!(kept.session.labor_hours, 1.5);
    }
}
