//! Date arithmetic and `{{path}}` template substitution.
//!
//! "Local" time is a fixed UTC offset taken from configuration; all
//! instants are carried as `DateTime<Utc>`.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};

use autoevent_core::{FieldValue, TimeKind};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Temporal extent of a produced event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Date parsing and calendar arithmetic in the configured local offset.
#[derive(Debug, Clone, Copy)]
pub struct Temporal {
    offset: FixedOffset,
}

impl Temporal {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Interpret a field value as an instant.
    ///
    /// Accepts dates, RFC 3339 strings, naive date/datetime strings (read
    /// in the local offset) and epoch milliseconds. Everything else is `None`.
    pub fn to_date(&self, value: &FieldValue) -> Option<DateTime<Utc>> {
        match value {
            FieldValue::Date(d) => Some(*d),
            FieldValue::Number(ms) if ms.is_finite() => {
                DateTime::from_timestamp_millis(*ms as i64)
            }
            FieldValue::Text(s) => self.parse_date_str(s),
            _ => None,
        }
    }

    pub fn parse_date_str(&self, input: &str) -> Option<DateTime<Utc>> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Ok(d) = DateTime::parse_from_rfc3339(input) {
            return Some(d.with_timezone(&Utc));
        }
        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return self.from_local(naive);
            }
        }
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|date| self.from_local(date.and_time(NaiveTime::MIN)))
    }

    /// Truncate to local midnight. `None` at the edges of the representable range.
    pub fn start_of_day(&self, date: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = date.with_timezone(&self.offset).date_naive();
        self.from_local(local.and_time(NaiveTime::MIN))
    }

    /// Local calendar day as `YYYY-MM-DD`.
    pub fn calendar_day(&self, date: DateTime<Utc>) -> String {
        date.with_timezone(&self.offset)
            .format("%Y-%m-%d")
            .to_string()
    }

    fn from_local(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        let shift = Duration::try_seconds(i64::from(self.offset.local_minus_utc()))?;
        naive
            .checked_sub_signed(shift)
            .map(|utc| Utc.from_utc_datetime(&utc))
    }
}

impl Default for Temporal {
    fn default() -> Self {
        Self::utc()
    }
}

/// Derive an event's start/end from its anchor date.
///
/// Unrecognized kinds get point semantics. `None` when the end of an
/// interval falls outside the representable range.
pub fn compute_range(base: DateTime<Utc>, kind: TimeKind, interval_days: Option<i64>) -> Option<DateRange> {
    let range = match kind {
        TimeKind::Deadline => DateRange {
            start: None,
            end: Some(base),
        },
        TimeKind::Interval => {
            let days = interval_days.unwrap_or(1).max(1);
            let end = Duration::try_days(days).and_then(|span| base.checked_add_signed(span))?;
            DateRange {
                start: Some(base),
                end: Some(end),
            }
        }
        TimeKind::Point
        | TimeKind::RecurringMonthly
        | TimeKind::RecurringYearly
        | TimeKind::Unrecognized => DateRange {
            start: Some(base),
            end: None,
        },
    };
    Some(range)
}

/// Replace every `{{dotted.path}}` token with the text form of the value it
/// resolves to in `ctx`. Unresolved paths render as the empty string; an
/// unterminated `{{` is kept literally.
pub fn render_template(template: &str, ctx: &FieldValue) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            break;
        };
        out.push_str(&rest[..open]);
        out.push_str(&ctx.lookup(after_open[..close].trim()).to_text());
        rest = &after_open[close + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn to_date_accepts_supported_shapes() {
        let t = Temporal::utc();
        let expected = at("2025-03-10T08:30:00Z");
        assert_eq!(t.to_date(&FieldValue::Date(expected)), Some(expected));
        assert_eq!(t.to_date(&"2025-03-10T08:30:00Z".into()), Some(expected));
        assert_eq!(t.to_date(&"2025-03-10T10:30:00+02:00".into()), Some(expected));
        assert_eq!(t.to_date(&"2025-03-10T08:30:00".into()), Some(expected));
        assert_eq!(t.to_date(&"2025-03-10 08:30".into()), Some(expected));
        assert_eq!(
            t.to_date(&FieldValue::Number(expected.timestamp_millis() as f64)),
            Some(expected)
        );
        assert_eq!(t.to_date(&"2025-03-10".into()), Some(at("2025-03-10T00:00:00Z")));
    }

    #[test]
    fn to_date_rejects_everything_else() {
        let t = Temporal::utc();
        assert_eq!(t.to_date(&"not-a-date".into()), None);
        assert_eq!(t.to_date(&"".into()), None);
        assert_eq!(t.to_date(&FieldValue::Null), None);
        assert_eq!(t.to_date(&FieldValue::Bool(true)), None);
        assert_eq!(t.to_date(&FieldValue::Number(f64::NAN)), None);
        assert_eq!(t.to_date(&FieldValue::List(vec![])), None);
    }

    #[test]
    fn naive_strings_read_in_local_offset() {
        let t = Temporal::new(FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(
            t.to_date(&"2025-03-10T08:30:00".into()),
            Some(at("2025-03-10T06:30:00Z"))
        );
    }

    #[test]
    fn start_of_day_truncates_to_local_midnight() {
        let utc = Temporal::utc();
        assert_eq!(
            utc.start_of_day(at("2025-03-10T23:59:59Z")),
            Some(at("2025-03-10T00:00:00Z"))
        );

        // 23:30 UTC is already the next day at +02:00.
        let rome_summer = Temporal::new(FixedOffset::east_opt(2 * 3600).unwrap());
        let instant = at("2025-06-10T23:30:00Z");
        assert_eq!(rome_summer.start_of_day(instant), Some(at("2025-06-10T22:00:00Z")));
        assert_eq!(rome_summer.calendar_day(instant), "2025-06-11");
    }

    #[test]
    fn range_per_time_kind() {
        let base = at("2025-03-10T00:00:00Z");

        let point = compute_range(base, TimeKind::Point, None).unwrap();
        assert_eq!(point.start, Some(base));
        assert_eq!(point.end, None);

        let deadline = compute_range(base, TimeKind::Deadline, None).unwrap();
        assert_eq!(deadline.start, None);
        assert_eq!(deadline.end, Some(base));

        let interval = compute_range(base, TimeKind::Interval, Some(3)).unwrap();
        assert_eq!(interval.start, Some(base));
        assert_eq!(interval.end, Some(at("2025-03-13T00:00:00Z")));

        let recurring = compute_range(base, TimeKind::RecurringYearly, Some(3)).unwrap();
        assert_eq!(recurring.end, None);
    }

    #[test]
    fn interval_is_at_least_one_day() {
        let base = at("2025-03-10T00:00:00Z");
        for days in [None, Some(0), Some(-4)] {
            let range = compute_range(base, TimeKind::Interval, days).unwrap();
            assert_eq!(range.end, Some(at("2025-03-11T00:00:00Z")));
        }
    }

    #[test]
    fn interval_past_the_representable_range_is_none() {
        let near_max = DateTime::<Utc>::MAX_UTC - Duration::hours(1);
        assert_eq!(compute_range(near_max, TimeKind::Interval, Some(1)), None);
        // Too many days for a `Duration` at all.
        let base = at("2025-03-10T00:00:00Z");
        assert_eq!(compute_range(base, TimeKind::Interval, Some(1_000_000_000_000)), None);
        // Kinds without an end never overflow.
        assert!(compute_range(near_max, TimeKind::Point, None).is_some());
    }

    #[test]
    fn start_of_day_at_the_minimum_is_none_east_of_utc() {
        let east = Temporal::new(FixedOffset::east_opt(3600).unwrap());
        assert_eq!(east.start_of_day(DateTime::<Utc>::MIN_UTC), None);
    }

    #[test]
    fn unrecognized_kind_behaves_like_point() {
        let base = at("2025-03-10T00:00:00Z");
        assert_eq!(
            compute_range(base, TimeKind::Unrecognized, Some(9)),
            compute_range(base, TimeKind::Point, None)
        );
    }

    #[test]
    fn render_substitutes_paths() {
        let ctx = FieldValue::from(json!({
            "after": { "code": "ORD-7", "qty": 12, "tags": ["a", "b"] },
            "value": "Taglio"
        }));
        assert_eq!(
            render_template("Order {{after.code}} -> {{ value }}", &ctx),
            "Order ORD-7 -> Taglio"
        );
        assert_eq!(render_template("qty={{after.qty}}", &ctx), "qty=12");
        assert_eq!(render_template("{{after.tags}}", &ctx), r#"["a","b"]"#);
        assert_eq!(render_template("[{{after.missing}}]", &ctx), "[]");
    }

    #[test]
    fn render_keeps_literal_text() {
        let ctx = FieldValue::Null;
        assert_eq!(render_template("no tokens here", &ctx), "no tokens here");
        assert_eq!(render_template("open {{ never closed", &ctx), "open {{ never closed");
        assert_eq!(render_template("a } b {", &ctx), "a } b {");
    }
}
