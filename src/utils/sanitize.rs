//! Best-effort XSS scrubbing for user-supplied free text (questions, option
//! texts, profile names). Poll text is only ever bound as BSON string values,
//! so operator injection is not a concern here; this strips the common script
//! vectors before validation runs.

/// Removes `<script>...</script>` blocks, inline event handlers and the usual
/// dangerous tag openings, all case-insensitively.
pub fn strip_xss(input: &str) -> String {
    let mut out = strip_script_blocks(input);
    out = strip_event_handlers(&out);
    for needle in ["javascript:", "<iframe", "<object", "<embed"] {
        out = remove_ci(&out, needle);
    }
    out
}

/// Removes every case-insensitive occurrence of an ASCII needle.
fn remove_ci(input: &str, needle: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if lower[i..].starts_with(needle) {
            i += needle.len();
            continue;
        }
        let step = char_len(&input[i..]);
        out.push_str(&input[i..i + step]);
        i += step;
    }
    out
}

/// Drops complete `<script ...>...</script>` blocks. An unterminated opening
/// discards the remainder of the string.
fn strip_script_blocks(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if lower[i..].starts_with("<script") {
            match lower[i..].find("</script>") {
                Some(end) => {
                    i += end + "</script>".len();
                    continue;
                }
                None => break,
            }
        }
        let step = char_len(&input[i..]);
        out.push_str(&input[i..i + step]);
        i += step;
    }
    out
}

/// Drops `on<word>=` attribute patterns (onclick=, onerror= , ...), keeping
/// whatever value follows so surrounding text is preserved.
fn strip_event_handlers(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if lower[i..].starts_with("on") {
            let rest = &lower[i + 2..];
            let word = rest
                .bytes()
                .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
                .count();
            if word > 0 {
                let after = &rest[word..];
                let ws = after.bytes().take_while(|b| b.is_ascii_whitespace()).count();
                if after[ws..].starts_with('=') {
                    i += 2 + word + ws + 1;
                    continue;
                }
            }
        }
        let step = char_len(&input[i..]);
        out.push_str(&input[i..i + step]);
        i += step;
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().next().map(|c| c.len_utf8()).unwrap_or(1)
}
