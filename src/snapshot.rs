//! Raw item -> snapshot row. Pure apart from the `created_at` stamp the
//! caller passes in.
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{RawItem, SnapshotRecord};

/// Items at or under this many seconds are short-form.
pub const SHORT_FORM_MAX_SECS: i64 = 60;

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("valid duration regex")
});

/// Channel-level context shared by every snapshot of one channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelContext<'a> {
    pub channel_id: &'a str,
    pub display_name: &'a str,
    pub run_date: NaiveDate,
}

/// `"{dt}:{channel_id}:{item_id}"`. Never includes anything time-of-day dependent.
pub fn idempotency_key(run_date: NaiveDate, channel_id: &str, item_id: &str) -> String {
    format!("{}:{}:{}", run_date.format("%Y-%m-%d"), channel_id, item_id)
}

/// Parse an ISO 8601 duration (`PT1H2M3S`, `P1DT5M`, `PT45S`) into seconds.
/// Returns `None` for anything that is not a duration.
pub fn parse_iso8601_duration(raw: &str) -> Option<i64> {
    let caps = ISO_DURATION.captures(raw.trim())?;
    // "P" and "PT" alone match the pattern but carry no components.
    if caps.iter().skip(1).all(|c| c.is_none()) {
        return None;
    }
    let part = |idx: usize| -> Option<i64> {
        caps.get(idx)
            .map_or(Some(0), |m| m.as_str().parse::<i64>().ok())
    };
    let secs = part(1)?
        .checked_mul(7 * 86_400)?
        .checked_add(part(2)?.checked_mul(86_400)?)?
        .checked_add(part(3)?.checked_mul(3_600)?)?
        .checked_add(part(4)?.checked_mul(60)?)?
        .checked_add(part(5)?)?;
    Some(secs)
}

/// Short-form means a known duration of at most a minute. An unparseable
/// duration is never short-form.
pub fn is_short_form(duration_sec: Option<i64>) -> bool {
    matches!(duration_sec, Some(d) if d <= SHORT_FORM_MAX_SECS)
}

fn saturating_count(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

pub fn build_snapshot(
    ctx: ChannelContext<'_>,
    item: &RawItem,
    created_at: DateTime<Utc>,
) -> SnapshotRecord {
    let duration_sec = parse_iso8601_duration(&item.duration);
    SnapshotRecord {
        dt: ctx.run_date,
        channel_id: ctx.channel_id.to_string(),
        video_id: item.id.clone(),
        title: item.title.clone(),
        channel_name: ctx.display_name.to_string(),
        tags: item.tags.clone(),
        is_short: is_short_form(duration_sec),
        views: saturating_count(item.statistics.views),
        likes: saturating_count(item.statistics.likes),
        comments: saturating_count(item.statistics.comments),
        published_at: item.published_at,
        created_at,
        duration_sec,
        content_details: item.content_details.as_ref().map(|v| v.to_string()),
        topic_details: item.topic_categories.clone(),
        insert_id: idempotency_key(ctx.run_date, ctx.channel_id, &item.id),
    }
}

/// Transform every item of one channel with a single `created_at` stamp.
pub fn build_snapshots(
    ctx: ChannelContext<'_>,
    items: &[RawItem],
    created_at: DateTime<Utc>,
) -> Vec<SnapshotRecord> {
    items
        .iter()
        .map(|item| build_snapshot(ctx, item, created_at))
        .collect()
}
