/// Canonicalize a raw placeholder label into a field key.
///
/// Lowercase, whitespace runs become one underscore, everything outside
/// `[a-z0-9_]` is dropped, underscore runs collapse, and the result is trimmed
/// of underscores. Total and idempotent.
pub fn normalize(label: &str) -> String {
    let mut s = String::with_capacity(label.len());
    let mut in_ws = false;
    for ch in label.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            if !in_ws {
                s.push('_');
                in_ws = true;
            }
            continue;
        }
        in_ws = false;
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            s.push(ch);
        }
    }

    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }
    out.trim_matches('_').to_string()
}

/// `company_name` -> `Company Name`.
pub fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
