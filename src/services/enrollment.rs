use serde_json::json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::core::time::primitive_now_utc;
use crate::db::types::{EnrollmentStatus, GroupState};
use crate::repositories;
use crate::services::capacity;

pub(crate) struct EnrollCandidate<'a> {
    pub(crate) existing_student_id: Option<&'a str>,
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) email: &'a str,
    pub(crate) phone: Option<&'a str>,
}

/// The shared enrollment path: lock the group row, re-check capacity under
/// the lock, create (or reuse) the student and insert the enrollment edge.
/// Callers add their own state transition and audit row before committing.
pub(crate) async fn enroll_into_group(
    tx: &mut Transaction<'_, Postgres>,
    group_id: &str,
    candidate: EnrollCandidate<'_>,
) -> Result<String, ApiError> {
    let group = repositories::groups::find_by_id_for_update(&mut **tx, group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to lock group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    if group.state != GroupState::Active {
        return Err(ApiError::InvalidOperation("Group is not accepting enrollments".to_string()));
    }

    let enrolled = repositories::enrollments::count_enrolled(&mut **tx, group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to count enrollment"))?;

    if !capacity::capacity_ok(group.capacity, enrolled, 1) {
        return Err(ApiError::CapacityExceeded(
            "Group is at capacity".to_string(),
            Some(json!({ "group_id": group_id, "waitlist_hint": true })),
        ));
    }

    let now = primitive_now_utc();
    if let Some(existing) = candidate.existing_student_id {
        let already = repositories::enrollments::is_enrolled(&mut **tx, existing, group_id)
            .await
            .map_err(|e| ApiError::db(e, "Failed to check enrollment"))?;
        if already {
            return Err(ApiError::DuplicateEntry(
                "Student is already enrolled in this group".to_string(),
            ));
        }
    }

    let student_id = match candidate.existing_student_id {
        Some(id) => id.to_string(),
        None => {
            let student = repositories::students::create(
                &mut **tx,
                repositories::students::CreateStudent {
                    id: &Uuid::new_v4().to_string(),
                    first_name: candidate.first_name,
                    last_name: candidate.last_name,
                    email: candidate.email,
                    phone: candidate.phone,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await
            .map_err(|e| ApiError::db(e, "Failed to create student"))?;
            student.id
        }
    };

    repositories::enrollments::create(
        &mut **tx,
        repositories::enrollments::CreateEnrollment {
            id: &Uuid::new_v4().to_string(),
            student_id: &student_id,
            group_id,
            status: EnrollmentStatus::Enrolled,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to create enrollment"))?;

    Ok(student_id)
}
