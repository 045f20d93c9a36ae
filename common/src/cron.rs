// Cron matching for pipeline schedules
//
// Pipeline schedules use a restricted five-field cron dialect: each field is
// either `*` or a comma-separated list of integers. Ranges and step values
// are not part of the dialect and are reported as errors instead of being
// approximated. Evaluation is always against UTC.

use crate::errors::CronError;
use crate::models::Pipeline;
use chrono::{DateTime, Datelike, Timelike, Utc};
use cron::Schedule as CronSchedule;
use std::collections::HashSet;
use std::str::FromStr;

/// Evaluate a single cron field against one time component.
///
/// The field is `*` (matches any value) or a comma-separated list of
/// non-negative integers. Blank entries left behind by stray commas are
/// skipped. Returns true on the first entry equal to `target`.
///
/// # Errors
/// `CronError::UnsupportedSyntax` if the field contains `-` or `/`;
/// `CronError::InvalidValue` if an entry scanned before a match is not a
/// non-negative integer.
pub fn field_matches(field: &str, target: u32) -> Result<bool, CronError> {
    let field = field.trim();

    if field == "*" {
        return Ok(true);
    }

    if field.contains('-') {
        return Err(CronError::UnsupportedSyntax { token: '-' });
    }
    if field.contains('/') {
        return Err(CronError::UnsupportedSyntax { token: '/' });
    }

    for part in field.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let value: u32 = part.parse().map_err(|_| CronError::InvalidValue {
            part: part.to_string(),
        })?;
        if value == target {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Returns true if `at` falls inside the cron schedule.
///
/// `cron` must hold exactly five space-separated fields: minute, hour,
/// day of month, month, day of week. Day of week is 0 = Sunday through
/// 6 = Saturday. With `at = None` the current UTC instant is used; the
/// reference time zone is fixed so a schedule means the same thing on
/// every host.
///
/// # Errors
/// `CronError::FieldCount` for anything other than five fields, plus any
/// error from [`field_matches`]. All five fields are evaluated, so a
/// defective later field is reported even when an earlier one already
/// failed to match.
pub fn cron_matches(cron: &str, at: Option<DateTime<Utc>>) -> Result<bool, CronError> {
    let at = at.unwrap_or_else(Utc::now);

    let fields: Vec<&str> = cron.trim().split(' ').collect();
    if fields.len() != 5 {
        return Err(CronError::FieldCount {
            found: fields.len(),
        });
    }

    // ISO weekday runs 1 = Monday through 7 = Sunday; the field convention
    // wants Sunday as 0.
    let weekday = match at.weekday().number_from_monday() {
        7 => 0,
        n => n,
    };

    let minute = field_matches(fields[0], at.minute())?;
    let hour = field_matches(fields[1], at.hour())?;
    let day_of_month = field_matches(fields[2], at.day())?;
    let month = field_matches(fields[3], at.month())?;
    let day_of_week = field_matches(fields[4], weekday)?;

    Ok(minute && hour && day_of_month && month && day_of_week)
}

/// Returns true if `cron` is acceptable as a stored schedule.
///
/// This is a syntax gate, not a dialect check: after requiring exactly five
/// whitespace-separated fields, the expression is handed to the
/// general-purpose `cron` parser, which also admits ranges and step values
/// that [`cron_matches`] later refuses. A schedule can therefore validate
/// here and still fail at match time; which side is authoritative is an
/// open product question, so neither is changed to match the other.
///
/// Never fails: every defect collapses to `false`.
pub fn is_valid_cron(cron: &str) -> bool {
    let cron = cron.trim();
    if cron.is_empty() {
        return false;
    }

    let fields: Vec<&str> = cron.split_whitespace().collect();
    if fields.len() != 5 {
        return false;
    }

    CronSchedule::from_str(&normalize_for_parser(&fields)).is_ok()
}

/// Rewrites a five-field expression into the seven-field form the `cron`
/// parser expects: a seconds field is prepended, and bare integers in the
/// day-of-week field are shifted from the 0 = Sunday numbering onto the
/// parser's 1 = Sunday numbering. Everything else in that field passes
/// through untouched so the parser stays the permissive authority.
fn normalize_for_parser(fields: &[&str]) -> String {
    let day_of_week = fields[4]
        .split(',')
        .map(|part| {
            let part = part.trim();
            match part.parse::<u32>() {
                Ok(n) if n <= 6 => (n + 1).to_string(),
                _ => part.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "0 {} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], day_of_week
    )
}

/// Returns the ids of the pipelines due at `at`.
///
/// A pipeline is due when at least one of its schedules matches; a pipeline
/// without schedules is never due. The result is a set, so a pipeline with
/// several matching schedules appears once.
///
/// # Errors
/// Propagates the first [`CronError`] hit while evaluating a schedule.
pub fn select_due_pipelines(
    pipelines: &[Pipeline],
    at: DateTime<Utc>,
) -> Result<HashSet<i64>, CronError> {
    let mut due = HashSet::new();

    for pipeline in pipelines {
        for schedule in &pipeline.schedules {
            if cron_matches(&schedule.cron, Some(at))? {
                due.insert(pipeline.id);
                break;
            }
        }
    }

    Ok(due)
}
