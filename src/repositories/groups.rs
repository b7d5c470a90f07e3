use time::Date;

use crate::db::models::Group;
use crate::db::types::GroupState;

const COLUMNS: &str = "\
    id, name, course_id, teacher_id, capacity, start_date, end_date, state, \
    created_at, updated_at, deleted_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(&format!(
        "SELECT {COLUMNS} FROM groups WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Row-lock the group that owns the contended invariant (capacity, waitlist
/// positions). Concurrent writers queue here.
pub(crate) async fn find_by_id_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(&format!(
        "SELECT {COLUMNS} FROM groups WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) struct CreateGroup<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) teacher_id: Option<&'a str>,
    pub(crate) capacity: i32,
    pub(crate) start_date: Date,
    pub(crate) end_date: Date,
    pub(crate) state: GroupState,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateGroup<'_>,
) -> Result<Group, sqlx::Error> {
    sqlx::query_as::<_, Group>(&format!(
        "INSERT INTO groups (
            id, name, course_id, teacher_id, capacity, start_date, end_date,
            state, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.course_id)
    .bind(params.teacher_id)
    .bind(params.capacity)
    .bind(params.start_date)
    .bind(params.end_date)
    .bind(params.state)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}
