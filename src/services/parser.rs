use crate::models::{CalorieLevel, COULD_NOT_ESTIMATE, NOT_RECOGNIZED};

/// First run of ASCII digits in `raw`, if any.
fn first_digit_run(raw: &str) -> Option<&str> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let rest = &raw[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Turns a free-text calorie answer into "<n> kcal/100g".
///
/// Any digit run is accepted as-is, so "1,250" yields "1 kcal/100g" and
/// implausible values like "99999" pass through unchanged.
pub fn extract_calories(raw: &str) -> String {
    match first_digit_run(raw) {
        Some(digits) => format!("{} kcal/100g", digits),
        None => COULD_NOT_ESTIMATE.to_string(),
    }
}

pub fn normalize_name(raw: Option<&str>) -> String {
    let name = raw.map(|s| s.trim().to_lowercase()).unwrap_or_default();

    if name.is_empty() {
        NOT_RECOGNIZED.to_string()
    } else {
        name
    }
}

pub fn calorie_level(calories: &str) -> CalorieLevel {
    // A digit run too long for u64 is still "a lot".
    match first_digit_run(calories) {
        None => CalorieLevel::Unknown,
        Some(digits) => match digits.parse::<u64>() {
            Ok(n) if n < 100 => CalorieLevel::Low,
            Ok(n) if n < 300 => CalorieLevel::Moderate,
            _ => CalorieLevel::High,
        },
    }
}
