//! Uniform input validation.
//!
//! Each entity declares one rule table (field → constraint); every entry point
//! runs its payload through [`validate`] before touching the database, so the
//! same field is checked the same way everywhere.

use rust_decimal::Decimal;
use serde_json::Value;

use super::DomainError;

#[derive(Debug, Clone, Copy)]
pub enum Constraint {
    /// Field must be present and non-empty
    Required,
    /// String length limit
    MaxLen(usize),
    /// Must contain '@' and a domain part
    Email,
    /// Parseable two-decimal amount, >= 0
    Money,
    /// Parseable two-decimal amount, > 0
    PositiveMoney,
    /// Exact set of allowed string values
    OneOf(&'static [&'static str]),
    /// Exactly n ASCII digits
    Digits(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub field: &'static str,
    pub constraint: Constraint,
}

pub const fn rule(field: &'static str, constraint: Constraint) -> Rule {
    Rule { field, constraint }
}

/// Check a JSON payload against a rule table. Fails on the first violated
/// rule with a message naming the field.
pub fn validate(rules: &[Rule], payload: &Value) -> Result<(), DomainError> {
    for rule in rules {
        let value = payload.get(rule.field);
        let text = value.and_then(Value::as_str).map(str::trim);

        match rule.constraint {
            Constraint::Required => {
                let missing = match value {
                    None | Some(Value::Null) => true,
                    Some(Value::String(_)) => text.map(str::is_empty).unwrap_or(true),
                    _ => false,
                };
                if missing {
                    return Err(violation(rule.field, "is required"));
                }
            }
            Constraint::MaxLen(max) => {
                if let Some(s) = text {
                    if s.chars().count() > max {
                        return Err(violation(
                            rule.field,
                            &format!("must be at most {} characters", max),
                        ));
                    }
                }
            }
            Constraint::Email => {
                if let Some(s) = text {
                    let valid = s
                        .split_once('@')
                        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
                        .unwrap_or(false);
                    if !valid {
                        return Err(violation(rule.field, "must be a valid email address"));
                    }
                }
            }
            Constraint::Money | Constraint::PositiveMoney => {
                if let Some(s) = text {
                    let amount = s.parse::<Decimal>().ok();
                    let ok = match (rule.constraint, amount) {
                        (Constraint::Money, Some(a)) => a >= Decimal::ZERO,
                        (Constraint::PositiveMoney, Some(a)) => a > Decimal::ZERO,
                        _ => false,
                    };
                    if !ok {
                        return Err(violation(rule.field, "must be a valid amount"));
                    }
                }
            }
            Constraint::OneOf(allowed) => {
                if let Some(s) = text {
                    if !allowed.contains(&s) {
                        return Err(violation(
                            rule.field,
                            &format!("must be one of: {}", allowed.join(", ")),
                        ));
                    }
                }
            }
            Constraint::Digits(n) => {
                if let Some(s) = text {
                    if s.len() != n || !s.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(violation(rule.field, &format!("must be {} digits", n)));
                    }
                }
            }
        }
    }
    Ok(())
}

fn violation(field: &str, reason: &str) -> DomainError {
    DomainError::Validation(format!("'{}' {}", field, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: &[Rule] = &[
        rule("name", Constraint::Required),
        rule("name", Constraint::MaxLen(10)),
        rule("email", Constraint::Email),
        rule("price_per_day", Constraint::PositiveMoney),
        rule("condition", Constraint::OneOf(&["excellent", "good", "damaged"])),
        rule("code", Constraint::Digits(7)),
    ];

    #[test]
    fn accepts_valid_payload() {
        let payload = json!({
            "name": "Tiller",
            "email": "a@b.com",
            "price_per_day": "120.00",
            "condition": "good",
            "code": "1234567",
        });
        assert!(validate(RULES, &payload).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = validate(RULES, &json!({ "name": "  " })).unwrap_err();
        assert!(err.to_string().contains("'name'"));
    }

    #[test]
    fn rejects_out_of_set_value() {
        let payload = json!({ "name": "x", "condition": "pristine" });
        assert!(validate(RULES, &payload).is_err());
    }

    #[test]
    fn rejects_non_positive_price() {
        let payload = json!({ "name": "x", "price_per_day": "0" });
        assert!(validate(RULES, &payload).is_err());
        let payload = json!({ "name": "x", "price_per_day": "abc" });
        assert!(validate(RULES, &payload).is_err());
    }

    #[test]
    fn rejects_short_code() {
        let payload = json!({ "name": "x", "code": "123" });
        assert!(validate(RULES, &payload).is_err());
    }
}
