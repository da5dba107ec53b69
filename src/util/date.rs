// src/util/date.rs
use chrono::{DateTime, Datelike, FixedOffset, Local, Offset, Utc};

const ZH_WEEKDAYS: [&str; 7] = ["周一", "周二", "周三", "周四", "周五", "周六", "周日"];
const JA_WEEKDAYS: [&str; 7] = ["月", "火", "水", "木", "金", "土", "日"];

/// Renders note creation timestamps the way exports show them.
///
/// Chinese and Japanese locales use `yyyy年 M月 d日 (EEE)`, everything else
/// uses `EEE d MMM yyyy`, e.g. `Wed 14 Oct 2026`.
#[derive(Debug, Clone)]
pub struct DateFormatter {
    language: String,
    offset: FixedOffset,
}

impl DateFormatter {
    pub fn new(locale: &str, offset: FixedOffset) -> Self {
        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self { language, offset }
    }

    /// Formatter in the machine's current UTC offset
    pub fn local(locale: &str) -> Self {
        Self::new(locale, Local::now().offset().fix())
    }

    /// Format milliseconds since the epoch; out-of-range values print as-is
    pub fn format(&self, timestamp_ms: i64) -> String {
        let Some(utc) = DateTime::<Utc>::from_timestamp_millis(timestamp_ms) else {
            return timestamp_ms.to_string();
        };
        let date = utc.with_timezone(&self.offset);
        let weekday = date.weekday().num_days_from_monday() as usize;

        match self.language.as_str() {
            "zh" => format!(
                "{}年 {}月 {}日 ({})",
                date.year(),
                date.month(),
                date.day(),
                ZH_WEEKDAYS[weekday]
            ),
            "ja" => format!(
                "{}年 {}月 {}日 ({})",
                date.year(),
                date.month(),
                date.day(),
                JA_WEEKDAYS[weekday]
            ),
            _ => date.format("%a %-d %b %Y").to_string(),
        }
    }
}
