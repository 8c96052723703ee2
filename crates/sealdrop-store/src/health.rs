//! Storage health check

use anyhow::Result;
use opendal::{ErrorKind, Operator};

/// Verify the storage backend answers by listing the share prefix.
///
/// A prefix that does not exist yet (nothing uploaded) counts as healthy.
pub async fn check_health(op: &Operator, prefix: &str) -> Result<()> {
    let dir = if prefix.is_empty() {
        "/".to_string()
    } else {
        format!("{}/", prefix.trim_end_matches('/'))
    };
    match op.list(&dir).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::anyhow!("storage health check failed: {e}")),
    }
}

/// Returns true if storage is reachable, false otherwise (non-panicking)
pub async fn is_healthy(op: &Operator, prefix: &str) -> bool {
    check_health(op, prefix).await.is_ok()
}
