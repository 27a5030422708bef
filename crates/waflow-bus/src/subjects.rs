pub const SUBJECT_PREFIX: &str = "waflow.whatsapp";

/// Makes a value safe to use as a single subject token.
pub fn sanitize_token(raw: &str) -> String {
    let token: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    if token.is_empty() {
        "unknown".into()
    } else {
        token
    }
}

/// `waflow.whatsapp.in.<phone_number_id>.<from>`
pub fn inbound_subject(phone_number_id: &str, from: &str) -> String {
    format!(
        "{SUBJECT_PREFIX}.in.{}.{}",
        sanitize_token(phone_number_id),
        sanitize_token(from)
    )
}

/// `waflow.whatsapp.status.<phone_number_id>`
pub fn status_subject(phone_number_id: &str) -> String {
    format!("{SUBJECT_PREFIX}.status.{}", sanitize_token(phone_number_id))
}
