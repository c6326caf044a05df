use chrono::NaiveDate;

/// Format an account balance for display, marking debt explicitly
pub fn format_balance(balance: f64) -> String {
    if balance < 0.0 {
        format!("{:.2} (debt)", balance.abs())
    } else {
        format!("{:.2}", balance)
    }
}

/// Format a date to a more readable format
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_balance() {
        assert_eq!(format_balance(12.5), "12.50");
        assert_eq!(format_balance(0.0), "0.00");
        assert_eq!(format_balance(-48.0), "48.00 (debt)");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(format_date(date), "Feb 29, 2024");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Bog'bon ko'chasi", 5), "Bo...");
    }
}
