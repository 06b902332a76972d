use chrono::{prelude::*, Duration, Months};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::capture::{CaptureError, TaskInput};
use crate::model::{NewTask, Priority, DEFAULT_ESTIMATED_MINUTES};

/// Result of inline token parsing from the capture text.
#[derive(Debug, Default)]
struct InlineTokens {
    title_words: Vec<String>,
    tags: Vec<String>,
    due_date: Option<DateTime<Utc>>,
    estimated_minutes: Option<u32>,
    priority: Option<Priority>,
}

/// Validate a [`TaskInput`] and turn it into a [`NewTask`] ready for the store.
///
/// Inline tokens (`#tag`, `due:`, `t:`, `p:`) are lifted out of the title;
/// explicit fields on the input win over inline ones.
pub fn prepare_new_task(input: &TaskInput) -> Result<NewTask, CaptureError> {
    prepare_new_task_at(input, Local::now())
}

pub fn prepare_new_task_at(
    input: &TaskInput,
    now_local: DateTime<Local>,
) -> Result<NewTask, CaptureError> {
    input.require_text()?;
    let raw_text = input.text.join(" ");
    let inline = parse_inline_tokens(&raw_text, now_local)?;

    let title = inline.title_words.join(" ").trim().to_string();
    if title.is_empty() {
        return Err(CaptureError::EmptyTitle);
    }

    let due_date = match &input.due_date {
        Some(spec) => Some(parse_date_spec_at(spec, now_local)?),
        None => inline.due_date,
    };

    let estimated_minutes = input
        .estimated_minutes
        .or(inline.estimated_minutes)
        .unwrap_or(DEFAULT_ESTIMATED_MINUTES);
    if estimated_minutes == 0 {
        return Err(CaptureError::NonPositiveEstimate);
    }

    let priority = input.priority.or(inline.priority).unwrap_or_default();
    let tags = merge_tags(inline.tags, &input.tags);

    Ok(NewTask {
        title,
        description: input
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        due_date,
        priority,
        estimated_minutes,
        tags,
    })
}

fn parse_inline_tokens(text: &str, now_local: DateTime<Local>) -> Result<InlineTokens, CaptureError> {
    let mut result = InlineTokens::default();

    for raw_piece in text.split_whitespace() {
        let (piece, trailing) = strip_trailing_punctuation(raw_piece);
        let matched = if piece.starts_with('#') && piece.len() > 1 {
            result.tags.push(piece.trim_start_matches('#').to_string());
            true
        } else if let Some(spec) = piece.strip_prefix("due:") {
            result.due_date = Some(parse_date_spec_at(spec, now_local)?);
            true
        } else if let Some(spec) = piece.strip_prefix("t:") {
            result.estimated_minutes = Some(parse_duration_minutes(spec)?);
            true
        } else if let Some(spec) = piece.strip_prefix("p:") {
            result.priority = Some(spec.parse::<Priority>()?);
            true
        } else {
            false
        };

        if matched {
            if let Some(rest) = trailing {
                push_trailing(&mut result.title_words, rest);
            }
        } else {
            result.title_words.push(raw_piece.to_string());
        }
    }

    Ok(result)
}

/// Trim, strip a leading `#`, drop empties and suppress exact duplicates,
/// keeping first-seen order.
pub fn normalize_tags(values: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for value in values {
        let tag = value.trim().trim_start_matches('#').trim();
        if tag.is_empty() || result.iter().any(|existing| existing == tag) {
            continue;
        }
        result.push(tag.to_string());
    }
    result
}

fn merge_tags(inline: Vec<String>, explicit: &[String]) -> Vec<String> {
    let mut combined = inline;
    combined.extend(explicit.iter().cloned());
    normalize_tags(&combined)
}

pub fn parse_duration_minutes(spec: &str) -> Result<u32, CaptureError> {
    let normalized = spec.trim().to_ascii_lowercase();
    let invalid = || CaptureError::InvalidDuration(spec.to_string());
    if let Some(number) = normalized.strip_suffix('m') {
        number.parse::<u32>().map_err(|_| invalid())
    } else if let Some(number) = normalized.strip_suffix('h') {
        number
            .parse::<u32>()
            .map(|hours| hours.saturating_mul(60))
            .map_err(|_| invalid())
    } else {
        normalized.parse::<u32>().map_err(|_| invalid())
    }
}

fn strip_trailing_punctuation(input: &str) -> (String, Option<String>) {
    static PUNCT_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[,;.!?]+$").ok());
    match PUNCT_RE.as_ref().and_then(|re| re.find(input)) {
        Some(mat) if mat.start() > 0 => {
            let token = input[..mat.start()].to_string();
            let trailing = input[mat.start()..].to_string();
            (token, Some(trailing))
        }
        _ => (input.to_string(), None),
    }
}

fn push_trailing(words: &mut Vec<String>, trailing: String) {
    if let Some(last) = words.last_mut() {
        last.push_str(&trailing);
    }
}

pub fn parse_date_spec(spec: &str) -> Result<DateTime<Utc>, CaptureError> {
    parse_date_spec_at(spec, Local::now())
}

pub fn parse_date_spec_at(
    spec: &str,
    now_local: DateTime<Local>,
) -> Result<DateTime<Utc>, CaptureError> {
    let trimmed = spec.trim();
    let invalid = || CaptureError::InvalidDate(spec.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let lower = trimmed.to_ascii_lowercase();
    match lower.as_str() {
        "now" => return Ok(now_local.with_timezone(&Utc)),
        "today" => return morning_of(now_local.date_naive()).ok_or_else(invalid),
        "tomorrow" => {
            let date = now_local.date_naive() + Duration::days(1);
            return morning_of(date).ok_or_else(invalid);
        }
        _ => {}
    }

    if lower.starts_with('+') {
        return parse_relative_spec(&lower, now_local).ok_or_else(invalid);
    }

    if let Some(weekday) = parse_weekday(&lower) {
        let mut days_ahead = (weekday.num_days_from_monday() as i64
            - now_local.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        if days_ahead == 0 {
            days_ahead = 7;
        }
        let date = now_local.date_naive() + Duration::days(days_ahead);
        return morning_of(date).ok_or_else(invalid);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return morning_of(date).ok_or_else(invalid);
    }

    if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H:%M") {
        let dt = now_local.date_naive().and_time(time);
        return Local
            .from_local_datetime(&dt)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(invalid);
    }

    Err(invalid())
}

/// Dates without a time resolve to 09:00 local.
fn morning_of(date: NaiveDate) -> Option<DateTime<Utc>> {
    let dt = date.and_hms_opt(9, 0, 0)?;
    Local
        .from_local_datetime(&dt)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

fn parse_relative_spec(spec: &str, now_local: DateTime<Local>) -> Option<DateTime<Utc>> {
    if spec.len() < 3 {
        return None;
    }
    let (number_part, unit) = spec[1..].split_at(spec.len() - 2);
    let value: i64 = number_part.parse().ok()?;
    let shifted = match unit {
        "d" => now_local + Duration::days(value),
        "w" => now_local + Duration::weeks(value),
        "m" => now_local.checked_add_months(Months::new(u32::try_from(value).ok()?))?,
        _ => return None,
    };
    Some(shifted.with_timezone(&Utc))
}

fn parse_weekday(label: &str) -> Option<Weekday> {
    match label {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn noon() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 3, 11, 12, 0, 0)
            .earliest()
            .unwrap()
    }

    #[test]
    fn parses_inline_tokens() {
        let input = TaskInput {
            text: words("Email Alice #work due:tomorrow t:45m p:high"),
            tags: vec!["#q4".into(), "work".into()],
            ..TaskInput::default()
        };

        let task = prepare_new_task_at(&input, noon()).unwrap();
        assert_eq!(task.title, "Email Alice");
        assert_eq!(task.tags, vec!["work", "q4"]);
        assert_eq!(task.estimated_minutes, 45);
        assert_eq!(task.priority, Priority::High);
        let due = task.due_date.expect("due date").with_timezone(&Local);
        assert_eq!(due.date_naive().to_string(), "2026-03-12");
    }

    #[test]
    fn explicit_fields_override_inline_tokens() {
        let input = TaskInput {
            text: words("Ship release p:low t:2h"),
            priority: Some(Priority::Urgent),
            estimated_minutes: Some(15),
            due_date: Some("2026-04-01".into()),
            ..TaskInput::default()
        };

        let task = prepare_new_task_at(&input, noon()).unwrap();
        assert_eq!(task.priority, Priority::Urgent);
        assert_eq!(task.estimated_minutes, 15);
        let due = task.due_date.expect("due").with_timezone(&Local);
        assert_eq!(due.date_naive().to_string(), "2026-04-01");
    }

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let input = TaskInput {
            text: words("Water plants"),
            ..TaskInput::default()
        };
        let task = prepare_new_task_at(&input, noon()).unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.estimated_minutes, 30);
        assert!(task.due_date.is_none());
        assert_eq!(task.description, "");
    }

    #[test]
    fn trailing_punctuation_stays_in_title() {
        let input = TaskInput {
            text: words("Pay rent #home, today"),
            ..TaskInput::default()
        };
        let task = prepare_new_task_at(&input, noon()).unwrap();
        assert_eq!(task.title, "Pay rent, today");
        assert_eq!(task.tags, vec!["home"]);
    }

    #[test]
    fn title_made_only_of_tokens_is_rejected() {
        let input = TaskInput {
            text: words("#errand due:today"),
            ..TaskInput::default()
        };
        assert_eq!(
            prepare_new_task_at(&input, noon()),
            Err(CaptureError::EmptyTitle)
        );
    }

    #[test]
    fn zero_estimate_is_rejected() {
        let input = TaskInput {
            text: words("Nap"),
            estimated_minutes: Some(0),
            ..TaskInput::default()
        };
        assert_eq!(
            prepare_new_task_at(&input, noon()),
            Err(CaptureError::NonPositiveEstimate)
        );
    }

    #[rstest]
    #[case("30", 30)]
    #[case("45m", 45)]
    #[case("2h", 120)]
    fn parses_time_shorthand(#[case] raw: &str, #[case] minutes: u32) {
        assert_eq!(parse_duration_minutes(raw).unwrap(), minutes);
    }

    #[test]
    fn rejects_garbage_duration() {
        assert!(matches!(
            parse_duration_minutes("soon"),
            Err(CaptureError::InvalidDuration(_))
        ));
    }

    #[rstest]
    #[case("+3d", "2026-03-14")]
    #[case("+1w", "2026-03-18")]
    #[case("fri", "2026-03-13")]
    #[case("wed", "2026-03-18")]
    #[case("2026-12-24", "2026-12-24")]
    fn resolves_date_specs(#[case] spec: &str, #[case] expected: &str) {
        let parsed = parse_date_spec_at(spec, noon()).unwrap();
        assert_eq!(
            parsed.with_timezone(&Local).date_naive().to_string(),
            expected
        );
    }

    #[test]
    fn unknown_date_spec_is_an_error() {
        assert_eq!(
            parse_date_spec_at("someday", noon()),
            Err(CaptureError::InvalidDate("someday".into()))
        );
    }

    #[test]
    fn normalize_tags_is_case_sensitive() {
        let tags = normalize_tags(&["Work".into(), "#work".into(), " Work ".into(), "".into()]);
        assert_eq!(tags, vec!["Work", "work"]);
    }
}
