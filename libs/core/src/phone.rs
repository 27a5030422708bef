//! Phone number and message text helpers.

use once_cell::sync::Lazy;
use regex::Regex;

/// E.164: a `+`, a non-zero digit, up to fourteen more digits.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid regex"));

pub const MAX_MESSAGE_LENGTH: usize = 4096;
pub const MAX_BROADCAST_RECIPIENTS: usize = 1000;

pub fn is_valid_phone_number(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Keeps only the digits.
pub fn digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Normalises user input to `+<digits>`.
///
/// ```
/// assert_eq!(waflow_core::phone::format_phone_number("(555) 010-9999"), "+5550109999");
/// ```
pub fn format_phone_number(phone: &str) -> String {
    format!("+{}", digits(phone))
}

/// Whether two spellings refer to the same number, ignoring `+` and punctuation.
pub fn same_number(a: &str, b: &str) -> bool {
    let a = digits(a);
    !a.is_empty() && a == digits(b)
}

/// Caps text at [`MAX_MESSAGE_LENGTH`] characters, ending truncated text with `...`.
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_LENGTH {
        return message.to_string();
    }
    let mut out: String = message.chars().take(MAX_MESSAGE_LENGTH - 3).collect();
    out.push_str("...");
    out
}
