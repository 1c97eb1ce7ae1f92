/// Strip everything but the number from `raw`.
///
/// Keeps ASCII digits, a `-` seen before the first digit and the first `.`.
/// Returns `None` when `raw` holds no digit.
pub fn extract_numeric(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut negative = false;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for ch in raw.chars() {
        match ch {
            '0'..='9' => {
                seen_digit = true;
                out.push(ch);
            }
            '.' if !seen_dot => {
                seen_dot = true;
                out.push(ch);
            }
            '-' if !seen_digit && !seen_dot => negative = true,
            _ => {}
        }
    }

    if !seen_digit {
        return None;
    }
    if out.ends_with('.') {
        out.pop();
    }
    if out.starts_with('.') {
        out.insert(0, '0');
    }
    if negative {
        out.insert(0, '-');
    }
    Some(out)
}
