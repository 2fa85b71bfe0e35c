//! Session name display normalization

use std::fmt::Display;

use chrono::{Local, TimeZone};

use crate::models::{SessionEncoding, TaskKind};

/// Display format of a session timestamp
pub const SESSION_TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Format a session name for display, using local time.
///
/// `<prefix>_<unixEpochSeconds>` names of epoch-suffixed kinds become
/// `<prefix>_YYYY-MM-DD_HH:MM:SS`. Everything else is returned unchanged,
/// so formatting an already formatted name is a no-op.
pub fn format_session_name(session_name: &str, kind: TaskKind) -> String {
    format_session_name_in(session_name, kind, &Local)
}

/// Same as [`format_session_name`] in an explicit time zone
pub fn format_session_name_in<Tz>(session_name: &str, kind: TaskKind, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if kind.session_encoding() != SessionEncoding::EpochSuffix {
        return session_name.to_string();
    }

    let Some((prefix, suffix)) = session_name.rsplit_once('_') else {
        return session_name.to_string();
    };
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return session_name.to_string();
    }

    let formatted = suffix
        .parse::<i64>()
        .ok()
        .and_then(|secs| tz.timestamp_opt(secs, 0).single())
        .map(|time| time.format(SESSION_TIME_FORMAT).to_string());

    match formatted {
        Some(time) => format!("{}_{}", prefix, time),
        // Out of range epochs are shown as received
        None => session_name.to_string(),
    }
}
