//! Input validation: age, poster captions, ticket URLs, VK handles

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Minimum accepted age, inclusive
pub const MIN_AGE: i64 = 14;

/// Maximum accepted age, inclusive
pub const MAX_AGE: i64 = 100;

/// Maximum poster caption length in characters (Telegram caption limit)
pub const MAX_CAPTION_CHARS: usize = 1024;

/// VK profile link or handle: vk.com/id12345, vk.com/some.name, with or without scheme
static VK_PROFILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:https?://)?(?:www\.)?vk\.com/(id\d+|[A-Za-z0-9_\.]+)").unwrap());

/// Parses an age reply, accepting only integers in [MIN_AGE, MAX_AGE].
///
/// Returns a user-facing corrective message on failure; the caller re-prompts
/// without advancing the registration step.
pub fn parse_age(text: &str) -> Result<i64, String> {
    let age: i64 = text
        .trim()
        .parse()
        .map_err(|_| "Пожалуйста, укажите возраст числом. Например: 18".to_string())?;
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(format!(
            "Возраст должен быть от {} до {} лет. Попробуйте еще раз.",
            MIN_AGE, MAX_AGE
        ));
    }
    Ok(age)
}

/// Validates a poster caption (length only; content is up to the admin).
pub fn validate_caption(caption: &str) -> Result<(), String> {
    let len = caption.chars().count();
    if len > MAX_CAPTION_CHARS {
        return Err(format!(
            "Подпись слишком длинная: {} символов (максимум {}).",
            len, MAX_CAPTION_CHARS
        ));
    }
    Ok(())
}

/// Validates a ticket URL: must parse, carry an http/https scheme and a host.
pub fn validate_ticket_url(raw: &str) -> Result<(), String> {
    let url =
        Url::parse(raw.trim()).map_err(|_| "Ссылка не распознана. Пример: https://example.com/tickets".to_string())?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err("Ссылка должна начинаться с http:// или https://".to_string());
    }
    if url.host_str().is_none() {
        return Err("В ссылке не указан адрес сайта.".to_string());
    }
    Ok(())
}

/// Extracts a VK handle from free text.
///
/// Accepts vk.com profile links (returns the path segment) and bare numeric
/// ids (normalized to "id<digits>").
pub fn extract_vk_handle(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(caps) = VK_PROFILE_RE.captures(text) {
        return Some(caps[1].to_string());
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("id{}", text));
    }
    None
}
