use bson::oid::ObjectId;
use chrono::Utc;
use serde_json::Value;

use crate::{error::AppResult, models::AuditEntry, store::Store};

pub async fn log_audit(
    store: &dyn Store,
    user_id: Option<&str>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let entry = AuditEntry {
        id: ObjectId::new(),
        user_id: user_id.map(str::to_string),
        action: action.to_string(),
        resource: resource.map(str::to_string),
        metadata,
        created_at: Utc::now(),
    };
    store.record_audit(&entry).await?;

    Ok(())
}

/// Records the entry, logging instead of failing when the store refuses it.
pub async fn audit_best_effort(
    store: &dyn Store,
    user_id: Option<&str>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) {
    if let Err(err) = log_audit(store, user_id, action, resource, metadata).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
