//! Relative look-back windows selected by short duration tokens.

use chrono::{DateTime, Duration, Utc};

/// A look-back window ending at "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    FifteenSeconds,
    OneMinute,
    FiveMinutes,
    TenMinutes,
    #[default]
    OneHour,
    OneDay,
    OneWeek,
}

impl TimeWindow {
    /// Parse a duration token (`15s`, `1m`, `5m`, `10m`, `1h`, `1d`, `1w`).
    ///
    /// Unrecognized tokens fall back to `1h`.
    #[must_use]
    pub fn parse_or_default(token: &str) -> Self {
        match token {
            "15s" => Self::FifteenSeconds,
            "1m" => Self::OneMinute,
            "5m" => Self::FiveMinutes,
            "10m" => Self::TenMinutes,
            "1d" => Self::OneDay,
            "1w" => Self::OneWeek,
            _ => Self::OneHour,
        }
    }

    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::FifteenSeconds => "15s",
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::TenMinutes => "10m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
        }
    }

    #[must_use]
    pub fn duration(self) -> Duration {
        match self {
            Self::FifteenSeconds => Duration::seconds(15),
            Self::OneMinute => Duration::minutes(1),
            Self::FiveMinutes => Duration::minutes(5),
            Self::TenMinutes => Duration::minutes(10),
            Self::OneHour => Duration::hours(1),
            Self::OneDay => Duration::days(1),
            Self::OneWeek => Duration::weeks(1),
        }
    }

    /// The inclusive `[now - duration, now]` range.
    #[must_use]
    pub fn range_ending_at(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - self.duration(), now)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tokens_round_trip() {
        for token in ["15s", "1m", "5m", "10m", "1h", "1d", "1w"] {
            assert_eq!(TimeWindow::parse_or_default(token).token(), token);
        }
    }

    #[test]
    fn unknown_token_defaults_to_one_hour() {
        assert_eq!(TimeWindow::parse_or_default("3y"), TimeWindow::OneHour);
        assert_eq!(TimeWindow::parse_or_default(""), TimeWindow::OneHour);
    }

    #[test]
    fn durations_match_tokens() {
        assert_eq!(TimeWindow::FifteenSeconds.duration().num_milliseconds(), 15_000);
        assert_eq!(TimeWindow::TenMinutes.duration().num_milliseconds(), 600_000);
        assert_eq!(TimeWindow::OneWeek.duration().num_milliseconds(), 604_800_000);
    }

    #[test]
    fn range_ends_at_now() {
        let now = DateTime::from_timestamp(1_750_000_000, 0).expect("valid timestamp");
        let (start, end) = TimeWindow::FiveMinutes.range_ending_at(now);
        assert_eq!(end, now);
        assert_eq!((end - start).num_seconds(), 300);
    }
}
