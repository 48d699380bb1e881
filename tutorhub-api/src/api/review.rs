//! Approve/reject plumbing shared by the moderated resources

use serde::Deserialize;
use sqlx::SqlitePool;
use tutorhub_common::db::ApprovalStatus;
use tutorhub_common::resources::{self, keys};

use crate::db::moderation::{self, Moderated};
use crate::db::versioning::{self, Versioned};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
}

impl StatusChange {
    /// Validated decision: `PENDING` is not a decision, a rejection needs a reason
    pub fn decision(&self) -> ApiResult<(ApprovalStatus, Option<&str>)> {
        match self.status {
            ApprovalStatus::Pending => Err(ApiError::bad_request_with(
                keys::INVALID_STATUS,
                &[self.status.as_str()],
            )),
            ApprovalStatus::Approve => Ok((ApprovalStatus::Approve, None)),
            ApprovalStatus::Reject => {
                let reason = self
                    .rejection_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| ApiError::bad_request(keys::REJECTION_REASON_REQUIRED))?;
                Ok((ApprovalStatus::Reject, Some(reason)))
            }
        }
    }
}

fn moderated(kind: Versioned) -> Moderated {
    match kind {
        Versioned::Curriculum => Moderated::Curriculums,
        Versioned::Exercise => Moderated::Exercises,
        Versioned::Syllabus => Moderated::Syllabuses,
    }
}

/// Record a decision on one version of a lineage
///
/// Approval deactivates every other version and activates this one in the
/// same transaction. Returns false when the row was no longer pending.
pub async fn review_version(
    pool: &SqlitePool,
    kind: Versioned,
    id: i64,
    status: ApprovalStatus,
    reason: Option<&str>,
    reviewer_id: i64,
) -> ApiResult<bool> {
    let mut tx = pool.begin().await?;
    if !moderation::review(&mut *tx, moderated(kind), id, status, reason, reviewer_id).await? {
        return Ok(false);
    }

    if status == ApprovalStatus::Approve {
        let root = versioning::lineage_root(&mut *tx, kind, id)
            .await?
            .unwrap_or(id);
        versioning::deactivate_previous_versions(&mut *tx, kind, root, id).await?;
        versioning::activate(&mut *tx, kind, id).await?;
    }

    tx.commit().await?;
    Ok(true)
}

/// Lineage root and version number for a new version of `original_id`
pub async fn next_version(pool: &SqlitePool, kind: Versioned, original_id: i64) -> ApiResult<(i64, i64)> {
    let root = versioning::lineage_root(pool, kind, original_id)
        .await?
        .unwrap_or(original_id);
    let version = versioning::next_version_number(pool, kind, root).await?;
    Ok((root, version))
}

/// 400 "Only pending <entity> can be deleted."
pub fn only_pending_deletable(entity: &str) -> ApiError {
    let resources = resources::global();
    ApiError::BadRequest(resources.format(
        keys::ONLY_PENDING_DELETABLE,
        &[&resources.entity(entity).to_lowercase()],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(status: ApprovalStatus, reason: Option<&str>) -> StatusChange {
        StatusChange {
            status,
            rejection_reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn test_reject_needs_reason() {
        assert!(change(ApprovalStatus::Reject, None).decision().is_err());
        assert!(change(ApprovalStatus::Reject, Some("   ")).decision().is_err());
        assert_eq!(
            change(ApprovalStatus::Reject, Some(" blurry scan ")).decision().unwrap(),
            (ApprovalStatus::Reject, Some("blurry scan"))
        );
    }

    #[test]
    fn test_pending_is_not_a_decision() {
        assert!(change(ApprovalStatus::Pending, None).decision().is_err());
    }

    #[test]
    fn test_approve_drops_reason() {
        assert_eq!(
            change(ApprovalStatus::Approve, Some("ignored")).decision().unwrap(),
            (ApprovalStatus::Approve, None)
        );
    }
}
