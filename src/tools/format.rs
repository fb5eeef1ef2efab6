// Human-readable formatting for markdown tool output (Brazilian locale).

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// `1234.5` → `R$ 1.234,50`
pub fn brl(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let units = (cents / 100).to_string();

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("{}R$ {},{:02}", sign, grouped, cents % 100)
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .ok()
}

/// `2026-10-18...` → `18/10/2026`. Unparseable input is returned as-is.
pub fn date_br(value: &str) -> String {
    parse_datetime(value)
        .map(|dt| dt.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| value.to_string())
}

pub fn datetime_br(value: &str) -> String {
    parse_datetime(value)
        .map(|dt| dt.format("%d/%m/%Y %H:%M:%S").to_string())
        .unwrap_or_else(|| value.to_string())
}

pub fn opt_date_br(value: Option<&str>) -> String {
    value.map(date_br).unwrap_or_else(|| "-".to_string())
}

pub fn opt_datetime_br(value: Option<&str>) -> String {
    value.map(datetime_br).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brl_groups_thousands_and_rounds_cents() {
        assert_eq!(brl(0.0), "R$ 0,00");
        assert_eq!(brl(1234.5), "R$ 1.234,50");
        assert_eq!(brl(350000.0), "R$ 350.000,00");
        assert_eq!(brl(1_250_999.999), "R$ 1.251.000,00");
        assert_eq!(brl(-12.3), "-R$ 12,30");
    }

    #[test]
    fn dates_render_day_first() {
        assert_eq!(date_br("2026-10-18"), "18/10/2026");
        assert_eq!(date_br("2026-10-18T09:05:00-03:00"), "18/10/2026");
        assert_eq!(datetime_br("2026-10-18T09:05:00"), "18/10/2026 09:05:00");
        assert_eq!(date_br("ontem"), "ontem");
        assert_eq!(opt_date_br(None), "-");
    }
}
