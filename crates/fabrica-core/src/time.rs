use time::OffsetDateTime;

use crate::error::Result;

/// Current time in UTC.
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Format a timestamp as RFC 3339 for API responses.
pub fn to_rfc3339(datetime: OffsetDateTime) -> Result<String> {
    Ok(datetime.format(&time::format_description::well_known::Rfc3339)?)
}
