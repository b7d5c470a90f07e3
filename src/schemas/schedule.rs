use serde::{Deserialize, Serialize};
use time::{PrimitiveDateTime, Time};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{CalendarEvent, Exam, TimetableEntry};
use crate::schemas::{deserialize_datetime, deserialize_time, format_time};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TimetableEntryCreate {
    #[serde(alias = "groupId")]
    pub(crate) group_id: String,
    #[validate(range(min = 0, max = 6, message = "weekday must be 0 (Monday) through 6 (Sunday)"))]
    pub(crate) weekday: i16,
    #[serde(alias = "startTime", deserialize_with = "deserialize_time")]
    pub(crate) start_time: Time,
    #[serde(alias = "endTime", deserialize_with = "deserialize_time")]
    pub(crate) end_time: Time,
    #[serde(default)]
    pub(crate) room: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TimetableEntryResponse {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) weekday: i16,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) room: Option<String>,
    pub(crate) created_at: String,
}

impl TimetableEntryResponse {
    pub(crate) fn from_db(entry: TimetableEntry) -> Self {
        Self {
            id: entry.id,
            group_id: entry.group_id,
            weekday: entry.weekday,
            start_time: format_time(entry.start_time),
            end_time: format_time(entry.end_time),
            room: entry.room,
            created_at: format_primitive(entry.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[serde(alias = "groupId")]
    pub(crate) group_id: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(alias = "startsAt", deserialize_with = "deserialize_datetime")]
    pub(crate) starts_at: PrimitiveDateTime,
    #[serde(alias = "endsAt", deserialize_with = "deserialize_datetime")]
    pub(crate) ends_at: PrimitiveDateTime,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) title: String,
    pub(crate) starts_at: String,
    pub(crate) ends_at: String,
    pub(crate) created_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            group_id: exam.group_id,
            title: exam.title,
            starts_at: format_primitive(exam.starts_at),
            ends_at: format_primitive(exam.ends_at),
            created_at: format_primitive(exam.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CalendarEventCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(alias = "startsAt", deserialize_with = "deserialize_datetime")]
    pub(crate) starts_at: PrimitiveDateTime,
    #[serde(alias = "endsAt", deserialize_with = "deserialize_datetime")]
    pub(crate) ends_at: PrimitiveDateTime,
    #[serde(default)]
    #[serde(alias = "groupId")]
    pub(crate) group_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "courseId")]
    pub(crate) course_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "teacherId")]
    pub(crate) teacher_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CalendarEventResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) starts_at: String,
    pub(crate) ends_at: String,
    pub(crate) group_id: Option<String>,
    pub(crate) course_id: Option<String>,
    pub(crate) teacher_id: Option<String>,
    pub(crate) created_at: String,
}

impl CalendarEventResponse {
    pub(crate) fn from_db(event: CalendarEvent) -> Self {
        Self {
            id: event.id,
            title: event.title,
            starts_at: format_primitive(event.starts_at),
            ends_at: format_primitive(event.ends_at),
            group_id: event.group_id,
            course_id: event.course_id,
            teacher_id: event.teacher_id,
            created_at: format_primitive(event.created_at),
        }
    }
}
