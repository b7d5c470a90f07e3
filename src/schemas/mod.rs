use std::collections::HashMap;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime, Time, UtcOffset,
};

pub(crate) mod application;
pub(crate) mod attendance;
pub(crate) mod audit;
pub(crate) mod auth;
pub(crate) mod course;
pub(crate) mod group;
pub(crate) mod invoice;
pub(crate) mod schedule;
pub(crate) mod user;
pub(crate) mod waitlist;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
}

pub(crate) fn format_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.to_string())
}

pub(crate) fn format_time(value: Time) -> String {
    value
        .format(&format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| value.to_string())
}

pub(crate) fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw, &format_description!("[year]-[month]-[day]")).ok()
}

fn parse_time_flexible(raw: &str) -> Option<Time> {
    if let Ok(value) = Time::parse(raw, &format_description!("[hour]:[minute]:[second]")) {
        return Some(value);
    }
    Time::parse(raw, &format_description!("[hour]:[minute]")).ok()
}

/// Accepts Rfc3339 as well as the timezone-less "YYYY-MM-DDTHH:MM[:SS]"
/// that datetime-local inputs send; everything normalises to UTC.
pub(crate) fn parse_datetime_flexible(raw: &str) -> Option<PrimitiveDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        let utc = value.to_offset(UtcOffset::UTC);
        return Some(PrimitiveDateTime::new(utc.date(), utc.time()));
    }

    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value);
    }
    PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {raw}")))
}

pub(crate) fn deserialize_time<'de, D>(deserializer: D) -> Result<Time, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time_flexible(&raw).ok_or_else(|| D::Error::custom(format!("invalid time: {raw}")))
}

pub(crate) fn deserialize_datetime<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}
