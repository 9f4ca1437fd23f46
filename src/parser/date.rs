//! RFC 2822 date-time parsing (§3.3 and the obsolete forms of §4.3).
//!
//! The grammar is applied leniently: comments may nest and appear anywhere,
//! whitespace between tokens is free-form (including none), seconds are
//! optional, and two-digit years, military zone letters and US zone names are
//! understood. Anything that still does not fit fails with
//! [`MimeError::InvalidDateFormat`]; no default timestamp is ever substituted.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};

use crate::error::{MimeError, Result};

/// How the zone of a parsed date was written. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSource {
    /// `+HHMM` / `-HHMM`.
    Numeric,
    /// `UT`, `GMT`, `EST`, ….
    Named,
    /// Single military letter.
    Military,
    /// No zone at all; read as `-0000`.
    Missing,
}

/// A parsed date-time: the absolute instant plus the offset it was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDateTime {
    pub utc: DateTime<Utc>,
    pub offset: FixedOffset,
    pub zone: ZoneSource,
}

impl ParsedDateTime {
    /// The instant as wall-clock time in the offset it was written in.
    pub fn local(&self) -> DateTime<FixedOffset> {
        self.utc.with_timezone(&self.offset)
    }

    /// Whether the zone came from a name or letter rather than digits.
    pub fn is_named_zone(&self) -> bool {
        matches!(self.zone, ZoneSource::Named | ZoneSource::Military)
    }
}

/// Parse an RFC 2822 date-time into a UTC timestamp.
///
/// ```
/// use mimetree::parser::date::parse_date;
///
/// let dt = parse_date("Fri, 21 Nov 1997 09:55:06 -0600").unwrap();
/// assert_eq!(dt.to_rfc3339(), "1997-11-21T15:55:06+00:00");
/// ```
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    parse_date_time(input).map(|parsed| parsed.utc)
}

/// Parse an RFC 2822 date-time, keeping the offset and how it was written.
pub fn parse_date_time(input: &str) -> Result<ParsedDateTime> {
    let text = strip_comments(input);
    let mut s = Scanner::new(&text);

    s.skip_ws();
    let day_name = match s.peek_alpha().and_then(weekday_from_name) {
        Some(weekday) => {
            s.alpha();
            s.skip_ws();
            s.eat(b',');
            Some(weekday)
        }
        None => None,
    };

    s.skip_date_separator();
    let day = s
        .digits(1, 2)
        .ok_or_else(|| MimeError::date(input, "missing day of month"))?;

    s.skip_date_separator();
    let month = s
        .alpha()
        .and_then(month_from_name)
        .ok_or_else(|| MimeError::date(input, "missing or unknown month"))?;

    s.skip_date_separator();
    let year_digits = s
        .digit_str(2, 4)
        .ok_or_else(|| MimeError::date(input, "missing year"))?;
    let year = expand_year(year_digits);

    s.skip_ws();
    let hour = s
        .digits(1, 2)
        .ok_or_else(|| MimeError::date(input, "missing hour"))?;
    s.skip_ws();
    if !s.eat(b':') {
        return Err(MimeError::date(input, "expected ':' after hour"));
    }
    s.skip_ws();
    let minute = s
        .digits(1, 2)
        .ok_or_else(|| MimeError::date(input, "missing minute"))?;

    let before_seconds = s.pos;
    s.skip_ws();
    let second = if s.eat(b':') {
        s.skip_ws();
        s.digits(1, 2)
            .ok_or_else(|| MimeError::date(input, "missing second after ':'"))?
    } else {
        s.pos = before_seconds;
        0
    };

    s.skip_ws();
    let (offset_secs, zone) = parse_zone(&mut s, input)?;

    s.skip_ws();
    if !s.at_end() {
        return Err(MimeError::date(
            input,
            format!("unexpected trailing text '{}'", s.rest()),
        ));
    }

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| MimeError::date(input, "day out of range for month"))?;
    let time = if second == 60 {
        NaiveTime::from_hms_milli_opt(hour, minute, 59, 1_000)
    } else {
        NaiveTime::from_hms_opt(hour, minute, second)
    }
    .ok_or_else(|| MimeError::date(input, "time of day out of range"))?;

    if let Some(expected) = day_name {
        if date.weekday() != expected {
            return Err(MimeError::date(
                input,
                format!("day name {expected} does not match {}", date.weekday()),
            ));
        }
    }

    let offset = FixedOffset::east_opt(offset_secs)
        .ok_or_else(|| MimeError::date(input, "zone offset out of range"))?;
    let local = NaiveDateTime::new(date, time);
    let utc = DateTime::<Utc>::from_naive_utc_and_offset(
        local - chrono::Duration::seconds(i64::from(offset_secs)),
        Utc,
    );

    Ok(ParsedDateTime { utc, offset, zone })
}

/// Remove parenthesized comments, nesting included, replacing each with a
/// single space. A backslash quotes the next character inside a comment and
/// an unterminated comment runs to the end of the input.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut depth = 0usize;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '(' => {
                if depth == 0 {
                    out.push(' ');
                }
                depth += 1;
            }
            ')' if depth > 0 => depth -= 1,
            '\\' if depth > 0 => {
                chars.next();
            }
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }
    out
}

fn parse_zone(s: &mut Scanner<'_>, input: &str) -> Result<(i32, ZoneSource)> {
    if s.at_end() {
        return Ok((0, ZoneSource::Missing));
    }

    if let Some(sign) = s.eat_sign() {
        let digits = s
            .digit_str(4, 4)
            .ok_or_else(|| MimeError::date(input, "numeric zone must be four digits"))?;
        let hours: i32 = digits[..2].parse().unwrap_or(0);
        let minutes: i32 = digits[2..].parse().unwrap_or(0);
        if minutes > 59 {
            return Err(MimeError::date(input, "zone minutes out of range"));
        }

        // Redundant zone name after the offset ("+0000 GMT") is tolerated.
        let after_offset = s.pos;
        s.skip_ws();
        match s.peek_alpha() {
            Some(name) if named_zone(name).is_some() => {
                s.alpha();
            }
            _ => s.pos = after_offset,
        }
        return Ok((sign * (hours * 3600 + minutes * 60), ZoneSource::Numeric));
    }

    let name = s
        .alpha()
        .ok_or_else(|| MimeError::date(input, format!("unrecognized zone '{}'", s.rest())))?;
    if let Some(hours) = named_zone(name) {
        return Ok((hours * 3600, ZoneSource::Named));
    }
    if name.len() == 1 {
        if let Some(hours) = military_zone(name.as_bytes()[0]) {
            return Ok((hours * 3600, ZoneSource::Military));
        }
    }
    Err(MimeError::date(input, format!("unrecognized zone '{name}'")))
}

/// Fixed offsets (hours) of the zone names RFC 2822 §4.3 allows. Daylight
/// variants are fixed offsets too; no calendar rules are applied.
fn named_zone(name: &str) -> Option<i32> {
    let hours = match name.to_ascii_uppercase().as_str() {
        "UT" | "GMT" | "UTC" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        _ => return None,
    };
    Some(hours)
}

/// Military zone letters: A–I are +1…+9, K–M +10…+12, N–Y −1…−12, Z is
/// UTC. J is not a zone.
fn military_zone(letter: u8) -> Option<i32> {
    let letter = letter.to_ascii_uppercase();
    match letter {
        b'A'..=b'I' => Some(i32::from(letter - b'A') + 1),
        b'K'..=b'M' => Some(i32::from(letter - b'A')),
        b'N'..=b'Y' => Some(-(i32::from(letter - b'N') + 1)),
        b'Z' => Some(0),
        _ => None,
    }
}

/// Two-digit years: 00–49 → 20xx, 50–99 → 19xx. Three-digit years add 1900.
fn expand_year(digits: &str) -> i32 {
    let value: i32 = digits.parse().unwrap_or(0);
    match digits.len() {
        2 if value < 50 => 2000 + value,
        2 => 1900 + value,
        3 => 1900 + value,
        _ => value,
    }
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    if name.len() < 3 {
        return None;
    }
    const DAYS: [(&str, Weekday); 7] = [
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sunday", Weekday::Sun),
    ];
    let lower = name.to_ascii_lowercase();
    DAYS.iter()
        .find(|(full, _)| (lower.len() == 3 && full.starts_with(&lower)) || *full == lower)
        .map(|(_, day)| *day)
}

fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    if name.len() < 3 {
        return None;
    }
    let lower = name.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|full| (lower.len() == 3 && full.starts_with(&lower)) || *full == lower)
        .map(|i| i as u32 + 1)
}

/// Byte cursor over the comment-free date text.
struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn rest(&self) -> &'a str {
        self.text.get(self.pos..).unwrap_or("")
    }

    fn skip_ws(&mut self) {
        while self.pos < self.text.len() && self.bytes()[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Whitespace, optionally with one `-` (IMAP-style `16-Jul-2025`).
    fn skip_date_separator(&mut self) {
        self.skip_ws();
        if self.eat(b'-') {
            self.skip_ws();
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.bytes().get(self.pos) == Some(&byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_sign(&mut self) -> Option<i32> {
        if self.eat(b'+') {
            Some(1)
        } else if self.eat(b'-') {
            Some(-1)
        } else {
            None
        }
    }

    fn alpha_len(&self) -> usize {
        self.bytes()[self.pos..]
            .iter()
            .take_while(|b| b.is_ascii_alphabetic())
            .count()
    }

    fn peek_alpha(&self) -> Option<&'a str> {
        let len = self.alpha_len();
        (len > 0).then(|| &self.text[self.pos..self.pos + len])
    }

    fn alpha(&mut self) -> Option<&'a str> {
        let word = self.peek_alpha()?;
        self.pos += word.len();
        Some(word)
    }

    /// A run of `min..=max` ASCII digits; longer runs are rejected.
    fn digit_str(&mut self, min: usize, max: usize) -> Option<&'a str> {
        let len = self.bytes()[self.pos..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if len < min || len > max {
            return None;
        }
        let digits = &self.text[self.pos..self.pos + len];
        self.pos += len;
        Some(digits)
    }

    fn digits(&mut self, min: usize, max: usize) -> Option<u32> {
        self.digit_str(min, max)?.parse().ok()
    }
}
