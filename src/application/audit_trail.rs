//! Audit emission for handlers.

use crate::domain::audit::AuditRecord;
use crate::ports::AuditSink;

/// Appends a record after the state change it describes has been written.
///
/// The change is already durable at this point, so a failed append is
/// logged instead of failing the operation.
pub async fn emit(sink: &dyn AuditSink, record: AuditRecord) {
    if let Err(e) = sink.append(&record).await {
        tracing::error!(
            action = %record.action,
            actor_id = %record.actor_id,
            error = %e,
            "Failed to append audit record"
        );
    }
}
