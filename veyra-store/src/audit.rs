use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use veyra_core::ports::{AuditRecord, AuditSink, NotificationKind, NotificationSink};

/// Insert-only audit trail. Write failures are logged and dropped; an audit
/// outage must never fail a booking or payment.
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn record(&self, entry: AuditRecord) {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (id, actor_id, action, entity, entity_id, before, after, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.entity)
        .bind(&entry.entity_id)
        .bind(&entry.before)
        .bind(&entry.after)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            warn!(action = %entry.action, error = %err, "audit write dropped");
        }
    }
}

/// Durable in-app notifications, same best-effort contract as the audit sink.
pub struct PostgresNotificationSink {
    pool: PgPool,
}

impl PostgresNotificationSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for PostgresNotificationSink {
    async fn notify(&self, user_id: Uuid, kind: NotificationKind, payload: serde_json::Value) {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, type, payload, is_read, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(kind.as_str())
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            warn!(%user_id, error = %err, "notification write dropped");
        }
    }
}
