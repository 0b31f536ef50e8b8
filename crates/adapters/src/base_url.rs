use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

static VERSION_SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/v\d+(?:alpha|beta)?\d*(?:/|$)").expect("valid regex for version segment")
});

/// Normalizes a configured Gemini endpoint.
///
/// Empty input yields the public endpoint. A trailing `#` means "use as
/// written". Otherwise `/v1beta` is appended when no version segment exists.
pub fn resolve_gemini_base_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return DEFAULT_GEMINI_BASE_URL.to_string();
    }

    if let Some(literal) = trimmed.strip_suffix('#') {
        return literal.trim_end_matches('/').to_string();
    }

    let without_slash = trimmed.trim_end_matches('/');
    if VERSION_SEGMENT_RE.is_match(without_slash) {
        without_slash.to_string()
    } else {
        format!("{without_slash}/v1beta")
    }
}
