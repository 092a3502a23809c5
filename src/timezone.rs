use serde::{Deserialize, Serialize};
use time::{macros::format_description, Duration, OffsetDateTime};

pub const UNKNOWN_TIME: &str = "--:--";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneOffset {
    pub name: String,
    pub offset_minutes: i32,
}

impl ZoneOffset {
    pub fn new(name: &str, offset_minutes: i32) -> Self {
        Self {
            name: name.to_string(),
            offset_minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTime {
    pub name: String,
    pub display: String,
}

pub fn default_zones() -> Vec<ZoneOffset> {
    vec![
        ZoneOffset::new("Honolulu", -600),
        ZoneOffset::new("Los Angeles", -420),
        ZoneOffset::new("Denver", -360),
        ZoneOffset::new("Chicago", -300),
        ZoneOffset::new("New York", -240),
        ZoneOffset::new("Berlin", 120),
        ZoneOffset::new("Beijing", 480),
        ZoneOffset::new("Shanghai", 480),
    ]
}

/// Local wall-clock time of `base` in each zone, `h:mm AM`.
///
/// Offsets apply to `base` as given (UTC for clock instants). Never fails:
/// a missing base, or one the offset pushes out of range, shows
/// [`UNKNOWN_TIME`] for that zone.
pub fn project(base: Option<OffsetDateTime>, zones: &[ZoneOffset]) -> Vec<ZoneTime> {
    zones
        .iter()
        .map(|z| ZoneTime {
            name: z.name.clone(),
            display: base
                .and_then(|b| local_time(b, z.offset_minutes))
                .unwrap_or_else(|| UNKNOWN_TIME.to_string()),
        })
        .collect()
}

fn local_time(base: OffsetDateTime, offset_minutes: i32) -> Option<String> {
    let shifted = base.checked_add(Duration::minutes(i64::from(offset_minutes)))?;
    shifted
        .format(format_description!(
            "[hour repr:12 padding:none]:[minute] [period]"
        ))
        .ok()
}
