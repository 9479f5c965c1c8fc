//! Helpers for sanitizing data before it enters logs, spans or error text.

/// Strips userinfo and token query parameters from a repository URL.
///
/// - `https://ghp_token@github.com/acme/widget` → `https://****@github.com/acme/widget`
/// - `https://github.com/acme/widget?access_token=x` → `https://github.com/acme/widget?****`
/// - `git@github.com:acme/widget.git` is left unchanged
pub fn redact_repo_url(url: &str) -> String {
    if url.starts_with("git@") {
        return url.to_string();
    }

    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    };

    let mut redacted = match base.find("://") {
        Some(scheme_end) => {
            let after_scheme = &base[scheme_end + 3..];
            let authority_end = after_scheme.find('/').unwrap_or(after_scheme.len());
            match after_scheme[..authority_end].rfind('@') {
                Some(at_pos) => format!(
                    "{}****@{}",
                    &base[..scheme_end + 3],
                    &after_scheme[at_pos + 1..]
                ),
                None => base.to_string(),
            }
        }
        None => base.to_string(),
    };

    if let Some(query) = query {
        let lowered = query.to_ascii_lowercase();
        if lowered.contains("token") || lowered.contains("key") || lowered.contains("secret") {
            redacted.push_str("?****");
        } else {
            redacted.push('?');
            redacted.push_str(query);
        }
    }

    redacted
}

/// Returns at most `max_chars` characters of `text`, marking the cut with `…`.
pub fn preview(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let mut chars = trimmed.char_indices();
    match chars.nth(max_chars) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
