//! # 화면 출력용 유틸리티
//!
//! - `escape_html()` / `unescape_html()`: HTML 특수문자 치환 (XSS 방지)
//! - `format_date_at()`: 상대 날짜 ("Kemarin", "3 hari yang lalu") 또는 인도네시아어 전체 날짜
//! - `is_valid_email()`: 이메일 형식 검증
//! - `nl2br()`: 줄바꿈을 `<br>`로

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Asia/Jakarta (WIB, UTC+7, 서머타임 없음)
const JAKARTA_OFFSET_SECS: i32 = 7 * 3600;

pub const INVALID_DATE: &str = "Tanggal tidak valid";

/// `& < > " '` 다섯 문자만 치환합니다. 나머지 문자는 그대로 둡니다.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `escape_html`의 역변환
pub fn unescape_html(text: &str) -> String {
    const ENTITIES: [(&str, char); 5] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#039;", '\''),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'outer: while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        for (entity, ch) in ENTITIES {
            if let Some(after) = rest.strip_prefix(entity) {
                out.push(ch);
                rest = after;
                continue 'outer;
            }
        }
        out.push('&');
        rest = &rest[1..];
    }
    out.push_str(rest);
    out
}

/// 이스케이프된 텍스트의 줄바꿈을 `<br>`로 바꿉니다.
pub fn nl2br(escaped: &str) -> String {
    escaped.replace("\r\n", "\n").replace('\n', "<br>")
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// 날짜 차이(일)를 올림으로 계산합니다. 12시간 전도 1일입니다.
fn diff_days(date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (now - date).num_milliseconds().abs();
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    (millis + DAY_MS - 1) / DAY_MS
}

/// 상대 날짜 문자열
///
/// - 1일 → "Kemarin"
/// - 2~6일 → "N hari yang lalu"
/// - 그 외 → "9 Oktober 2026" (WIB 기준)
pub fn format_date_at(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match diff_days(date, now) {
        1 => "Kemarin".to_string(),
        days @ 2..=6 => format!("{} hari yang lalu", days),
        _ => format_full_date(date),
    }
}

/// RFC 3339 문자열을 받아 포맷합니다. 파싱할 수 없으면 "Tanggal tidak valid".
pub fn format_date_str_at(date: &str, now: DateTime<Utc>) -> String {
    match DateTime::parse_from_rfc3339(date) {
        Ok(parsed) => format_date_at(parsed.with_timezone(&Utc), now),
        Err(_) => INVALID_DATE.to_string(),
    }
}

pub fn format_full_date(date: DateTime<Utc>) -> String {
    let Some(offset) = FixedOffset::east_opt(JAKARTA_OFFSET_SECS) else {
        return INVALID_DATE.to_string();
    };
    let local = date.with_timezone(&offset);
    format!(
        "{} {} {}",
        local.day(),
        MONTHS_ID[local.month0() as usize],
        local.year()
    )
}

/// 푸터에 표시할 현재 연도 (WIB 기준)
pub fn current_year(now: DateTime<Utc>) -> i32 {
    FixedOffset::east_opt(JAKARTA_OFFSET_SECS)
        .map(|offset| now.with_timezone(&offset).year())
        .unwrap_or_else(|| now.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn escapes_exactly_the_five_special_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#039;s&lt;/a&gt;"
        );
        let plain = "Halo dunia! 100% (ok) #1 / é";
        assert_eq!(escape_html(plain), plain);
    }

    #[test]
    fn escape_then_unescape_round_trips_ascii() {
        let samples = [
            "",
            "plain",
            "<script>alert('x')</script>",
            "&amp; already escaped",
            "a&b<c>d\"e'f",
            "&#039;&quot;",
            "& alone &",
        ];
        for sample in samples {
            assert_eq!(unescape_html(&escape_html(sample)), sample);
        }
    }

    #[test]
    fn newlines_become_breaks() {
        assert_eq!(nl2br("a\nb\r\nc"), "a<br>b<br>c");
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.id"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user example@x.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn relative_dates() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();

        assert_eq!(format_date_at(now - Duration::hours(24), now), "Kemarin");
        assert_eq!(format_date_at(now - Duration::days(3), now), "3 hari yang lalu");
        assert_eq!(format_date_at(now - Duration::days(6), now), "6 hari yang lalu");
        assert_eq!(format_date_at(now - Duration::days(10), now), "9 Oktober 2026");
    }

    #[test]
    fn full_date_uses_jakarta_time() {
        // 17:30 UTC on 31 Dec is already 1 Jan in Jakarta
        let date = Utc.with_ymd_and_hms(2025, 12, 31, 17, 30, 0).unwrap();
        assert_eq!(format_full_date(date), "1 Januari 2026");
        assert_eq!(current_year(date), 2026);
    }

    #[test]
    fn invalid_date_string() {
        let now = Utc::now();
        assert_eq!(format_date_str_at("kemarin sore", now), INVALID_DATE);
        assert_eq!(
            format_date_str_at(&(now - Duration::days(2)).to_rfc3339(), now),
            "2 hari yang lalu"
        );
    }
}
