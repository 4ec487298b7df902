use serde_json::Value;
use tracing::warn;

use crate::config::{Config, NOTICE_KEEP, NOTICE_WINDOW_DAYS};
use crate::error::Result;
use crate::types::{now_ms, Notice, NoticesOutcome};

use super::format_date;

/// Message types retained from the notification feed.
const NOTICE_TYPES: &[&str] = &["FLR", "CME", "SEP", "GST", "RBE"];

/// Lowercased storm-class indicators that flip the elevated watch.
const WATCH_INDICATORS: &[&str] =
    &["g1", "g2", "g3", "g4", "g5", "m-class", "x-class", "cme"];

const SUMMARY_MAX_CHARS: usize = 140;

/// Fetch DONKI notices for a trailing window. A failed request yields
/// `Unavailable`; a successful request with no matching notices yields
/// `Available` with an empty list — consumers render those differently.
pub async fn fetch_notifications(
    client: &reqwest::Client,
    cfg: &Config,
    window_days: i64,
) -> NoticesOutcome {
    match try_fetch(client, cfg, window_days).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("DONKI fetch failed: {e}");
            NoticesOutcome::Unavailable
        }
    }
}

async fn try_fetch(
    client: &reqwest::Client,
    cfg: &Config,
    window_days: i64,
) -> Result<NoticesOutcome> {
    let end = now_ms();
    let start = end - window_days.max(0) * 24 * 3_600 * 1_000;
    let url = format!(
        "{}/DONKI/notifications?type=all&startDate={}&endDate={}&api_key={}",
        cfg.donki_base_url,
        format_date(start),
        format_date(end),
        cfg.nasa_api_key,
    );

    let body: Value = client.get(&url).send().await?.error_for_status()?.json().await?;
    Ok(classify_notices(&body))
}

/// Filter a raw DONKI response down to the retained notice types and decide
/// the elevated watch. Tolerates a non-array body (treated as no notices).
pub fn classify_notices(body: &Value) -> NoticesOutcome {
    let Some(items) = body.as_array() else {
        return NoticesOutcome::Available {
            notices: Vec::new(),
            elevated_watch: false,
        };
    };

    let mut notices = Vec::new();
    let mut elevated_watch = false;
    for item in items {
        let message_type = item
            .get("messageType")
            .and_then(|t| t.as_str())
            .unwrap_or("");
        if !NOTICE_TYPES.contains(&message_type) {
            continue;
        }
        if notices.len() >= NOTICE_KEEP {
            break;
        }

        let body_text = item.get("messageBody").and_then(|b| b.as_str()).unwrap_or("");
        if is_watch_indicator(body_text) {
            elevated_watch = true;
        }

        notices.push(Notice {
            message_type: message_type.to_string(),
            issued_at: item
                .get("messageIssueTime")
                .and_then(|t| t.as_str())
                .unwrap_or("")
                .to_string(),
            summary: summarize(body_text),
        });
    }

    NoticesOutcome::Available {
        notices,
        elevated_watch,
    }
}

fn is_watch_indicator(body: &str) -> bool {
    let lower = body.to_lowercase();
    WATCH_INDICATORS.iter().any(|ind| lower.contains(ind))
}

/// First line of the body, truncated on a char boundary.
fn summarize(body: &str) -> String {
    let first_line = body.lines().next().unwrap_or("");
    first_line.chars().take(SUMMARY_MAX_CHARS).collect()
}

pub fn default_window_days() -> i64 {
    NOTICE_WINDOW_DAYS
}
