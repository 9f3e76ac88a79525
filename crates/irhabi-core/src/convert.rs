use serde::Serialize;

/// `MyFunc` → `my_func`. Every non-lowercase char starts a new segment.
pub fn to_underscore(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut segment = String::new();

    for c in s.chars() {
        if !c.is_lowercase() {
            push_segment(&mut out, &segment);
            segment.clear();
        }
        segment.extend(c.to_lowercase());
    }
    push_segment(&mut out, &segment);
    out
}

fn push_segment(out: &mut String, segment: &str) {
    if segment.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push('_');
    }
    out.push_str(segment);
}

/// `my_func` → `MyFunc`.
pub fn to_camel_case(s: &str) -> String {
    s.to_lowercase()
        .split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// `my_func` → `myFunc`.
pub fn to_lower_camel_case(s: &str) -> String {
    let camel = to_camel_case(s);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Strip `chars` (or whitespace when `None`) from the left.
pub fn left_trim<'a>(s: &'a str, chars: Option<&str>) -> &'a str {
    match chars {
        Some(set) if !set.is_empty() => s.trim_start_matches(|c| set.contains(c)),
        _ => s.trim_start(),
    }
}

/// Strip `chars` (or whitespace when `None`) from the right.
pub fn right_trim<'a>(s: &'a str, chars: Option<&str>) -> &'a str {
    match chars {
        Some(set) if !set.is_empty() => s.trim_end_matches(|c| set.contains(c)),
        _ => s.trim_end(),
    }
}

/// Strip `chars` (or whitespace when `None`) from both sides.
pub fn trim<'a>(s: &'a str, chars: Option<&str>) -> &'a str {
    left_trim(right_trim(s, chars), chars)
}

/// Parse as integer, 0 on failure.
pub fn to_int(s: &str) -> i64 {
    s.trim().parse().unwrap_or(0)
}

/// Parse as float, 0.0 on failure.
pub fn to_float(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

/// Parse as bool, accepting the same spellings as `1/t/T/TRUE/true/True`
/// and their false counterparts. Anything else is false.
pub fn to_bool(s: &str) -> bool {
    matches!(s, "1" | "t" | "T" | "TRUE" | "true" | "True")
}

/// Serialize to a JSON string, empty on failure.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
