use serde::{Deserialize, Serialize};
use time::Date;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Group;
use crate::db::types::GroupState;
use crate::schemas::{deserialize_date, format_date};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GroupCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(alias = "courseId")]
    pub(crate) course_id: String,
    #[serde(default)]
    #[serde(alias = "teacherId")]
    pub(crate) teacher_id: Option<String>,
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub(crate) capacity: i32,
    #[serde(alias = "startDate", deserialize_with = "deserialize_date")]
    pub(crate) start_date: Date,
    #[serde(alias = "endDate", deserialize_with = "deserialize_date")]
    pub(crate) end_date: Date,
    #[serde(default = "default_state")]
    pub(crate) state: GroupState,
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) course_id: String,
    pub(crate) teacher_id: Option<String>,
    pub(crate) capacity: i32,
    pub(crate) current_enrollment: i64,
    pub(crate) start_date: String,
    pub(crate) end_date: String,
    pub(crate) state: GroupState,
    pub(crate) created_at: String,
}

impl GroupResponse {
    pub(crate) fn from_db(group: Group, current_enrollment: i64) -> Self {
        Self {
            id: group.id,
            name: group.name,
            course_id: group.course_id,
            teacher_id: group.teacher_id,
            capacity: group.capacity,
            current_enrollment,
            start_date: format_date(group.start_date),
            end_date: format_date(group.end_date),
            state: group.state,
            created_at: format_primitive(group.created_at),
        }
    }
}

fn default_state() -> GroupState {
    GroupState::Planned
}
