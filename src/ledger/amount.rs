//! Amount cleaning for brokerage exports
//!
//! Exports format money as currency text: `$1,234.56`, and accounting
//! negatives in parentheses: `($1,234.56)`.

use rust_decimal::Decimal;
use std::str::FromStr;

const STRIPPED_CHARS: [char; 4] = ['$', ',', '(', ')'];

/// Clean a raw amount cell into a decimal.
///
/// Returns `None` for anything that does not parse; such values are
/// missing data and must be skipped by sums, never treated as zero.
pub fn clean_amount(raw: &str) -> Option<Decimal> {
    let negative = raw.contains('(');

    let stripped: String = raw.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect();
    let stripped = stripped.trim();

    if stripped.is_empty() {
        return None;
    }

    let candidate = if negative {
        format!("-{}", stripped)
    } else {
        stripped.to_string()
    };

    Decimal::from_str(&candidate)
        .or_else(|_| Decimal::from_scientific(&candidate))
        .ok()
}

/// Sum the present values, skipping missing ones.
///
/// `None` when the total leaves the `Decimal` range.
pub fn sum_present<I>(amounts: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Option<Decimal>>,
{
    amounts
        .into_iter()
        .flatten()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_currency_formatting_is_stripped() {
        assert_eq!(clean_amount("$1,234.56"), Some(dec("1234.56")));
    }

    #[test]
    fn test_parentheses_mean_negative() {
        assert_eq!(clean_amount("($500.00)"), Some(dec("-500.00")));
        assert_eq!(clean_amount("($1,234.56)"), Some(dec("-1234.56")));
    }

    #[test]
    fn test_plain_numbers_pass_through() {
        assert_eq!(clean_amount("42"), Some(dec("42")));
        assert_eq!(clean_amount("-3.5"), Some(dec("-3.5")));
        assert_eq!(clean_amount(" 7.25 "), Some(dec("7.25")));
    }

    #[test]
    fn test_unparseable_is_missing() {
        assert_eq!(clean_amount("abc"), None);
        assert_eq!(clean_amount(""), None);
        assert_eq!(clean_amount("$"), None);
        assert_eq!(clean_amount("-(5)"), None);
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let once = clean_amount("($2,000.10)").unwrap();
        assert_eq!(clean_amount(&once.to_string()), Some(once));
    }

    #[test]
    fn test_missing_values_are_excluded_from_sums() {
        let total = sum_present(vec![
            clean_amount("$10.00"),
            clean_amount("abc"),
            clean_amount("($2.50)"),
        ]);
        assert_eq!(total, Some(dec("7.50")));
    }

    #[test]
    fn test_sum_out_of_range_is_none() {
        let huge = clean_amount("$50,000,000,000,000,000,000,000,000,000");
        assert_eq!(huge, Some(dec("50000000000000000000000000000")));
        assert_eq!(sum_present(vec![huge, huge]), None);
        assert!(sum_present(vec![huge, clean_amount("($1.00)")]).is_some());
    }
}
