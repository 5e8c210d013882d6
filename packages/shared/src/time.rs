use chrono::{DateTime, FixedOffset, Utc};

fn jst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap() // JST is UTC+9
}

/// Convert a UTC instant into JST.
pub fn to_jst(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.with_timezone(&jst())
}

/// Format a UTC instant as `HH:MM` in JST, for compact chat rendering.
pub fn to_jst_clock(at: DateTime<Utc>) -> String {
    to_jst(at).format("%H:%M").to_string()
}
