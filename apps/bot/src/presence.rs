use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local};
use serenity::all::{ActivityData, Context};
use tokio::task::JoinHandle;

pub const ROTATION: Duration = Duration::from_secs(30);

/// Status line: the version on even ticks, the local time on odd ones.
pub fn presence_text(show_version: bool, version: &str, now: DateTime<FixedOffset>) -> String {
    if !show_version {
        return format!("Time - {}", now.format("%H:%M (%:z)"));
    }
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("Version - {version}")
    }
}

/// Alternates the bot's custom status between version and local time.
pub fn spawn_rotation(ctx: Context, version: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut show_version = true;
        let mut tick = tokio::time::interval(ROTATION);

        loop {
            tick.tick().await;
            let text = presence_text(show_version, &version, Local::now().fixed_offset());
            ctx.set_activity(Some(ActivityData::custom(text)));
            show_version = !show_version;
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32, min: u32, offset_hours: i32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 7, hour, min, 0)
            .unwrap()
    }

    #[test]
    fn version_is_prefixed_unless_tagged() {
        let now = at(9, 0, 0);
        assert_eq!(presence_text(true, "v1.2.0", now), "v1.2.0");
        assert_eq!(presence_text(true, "1.2.0", now), "Version - 1.2.0");
    }

    #[test]
    fn time_shows_offset() {
        assert_eq!(presence_text(false, "v1.2.0", at(16, 5, 7)), "Time - 16:05 (+07:00)");
        assert_eq!(presence_text(false, "v1.2.0", at(9, 30, -4)), "Time - 09:30 (-04:00)");
    }
}
