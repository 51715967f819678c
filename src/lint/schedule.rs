//! Cron schedule syntax.
//!
//! Accepts the standard five-field form (`minute hour day-of-month month
//! day-of-week`) and the named descriptors understood by the scheduler.
//! Each field is a comma-separated list of `*`, `value`, `low-high`, any of
//! which may carry a `/step`. Month and weekday fields also take three-letter
//! names (`JAN`, `MON`), and `?` is allowed for the two day fields.

const DESCRIPTORS: &[&str] = &[
    "@yearly",
    "@annually",
    "@monthly",
    "@weekly",
    "@daily",
    "@midnight",
    "@hourly"
];

const MONTH_NAMES: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec"
];

const WEEKDAY_NAMES: &[&str] = &["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

struct Field {
    min:           u32,
    max:           u32,
    names:         &'static [&'static str],
    allows_any_of: bool
}

const FIELDS: [Field; 5] = [
    Field {
        min:           0,
        max:           59,
        names:         &[],
        allows_any_of: false
    },
    Field {
        min:           0,
        max:           23,
        names:         &[],
        allows_any_of: false
    },
    Field {
        min:           1,
        max:           31,
        names:         &[],
        allows_any_of: true
    },
    Field {
        min:           1,
        max:           12,
        names:         MONTH_NAMES,
        allows_any_of: false
    },
    Field {
        min:           0,
        max:           6,
        names:         WEEKDAY_NAMES,
        allows_any_of: true
    }
];

/// Whether `schedule` is a five-field cron expression or a descriptor.
pub fn is_valid_schedule(schedule: &str) -> bool {
    let schedule = schedule.trim();
    if schedule.starts_with('@') {
        return is_valid_descriptor(schedule);
    }

    let parts: Vec<&str> = schedule.split_whitespace().collect();
    parts.len() == FIELDS.len()
        && parts
            .iter()
            .zip(FIELDS.iter())
            .all(|(part, field)| parse_field(part, field).is_some())
}

fn is_valid_descriptor(schedule: &str) -> bool {
    let lower = schedule.to_ascii_lowercase();
    if DESCRIPTORS.contains(&lower.as_str()) {
        return true;
    }
    match lower.strip_prefix("@every ") {
        Some(duration) => is_valid_duration(duration.trim()),
        None => false
    }
}

/// Go-style durations such as `90s`, `1h30m` or `1.5h`.
fn is_valid_duration(duration: &str) -> bool {
    const UNITS: &[&str] = &["ns", "us", "µs", "ms", "s", "m", "h"];

    let mut rest = duration;
    if rest.is_empty() {
        return false;
    }
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 || rest[..number_len].parse::<f64>().is_err() {
            return false;
        }
        rest = &rest[number_len..];
        // longest unit first so "ms" is not read as "m"
        let Some(unit) = UNITS
            .iter()
            .filter(|u| rest.starts_with(*u))
            .max_by_key(|u| u.len())
        else {
            return false;
        };
        rest = &rest[unit.len()..];
    }
    true
}

fn parse_field(part: &str, field: &Field) -> Option<()> {
    for item in part.split(',') {
        parse_item(item, field)?;
    }
    Some(())
}

fn parse_item(item: &str, field: &Field) -> Option<()> {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (item, None)
    };

    if let Some(step) = step {
        let step: u32 = step.parse().ok()?;
        if step == 0 {
            return None;
        }
    }

    if range == "*" || (range == "?" && field.allows_any_of) {
        return Some(());
    }

    let (low, high) = match range.split_once('-') {
        Some((low, high)) => (parse_value(low, field)?, parse_value(high, field)?),
        None => {
            let value = parse_value(range, field)?;
            (value, value)
        }
    };
    (low <= high).then_some(())
}

fn parse_value(value: &str, field: &Field) -> Option<u32> {
    let number = match value.parse::<u32>() {
        Ok(number) => number,
        Err(_) => {
            let lower = value.to_ascii_lowercase();
            let index = field.names.iter().position(|n| *n == lower)? as u32;
            // names start at the field minimum (JAN = 1, SUN = 0)
            index + field.min
        }
    };
    (field.min..=field.max).contains(&number).then_some(number)
}
