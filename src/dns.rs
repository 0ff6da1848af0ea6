//! DNS label handling for peer names.
//!
//! A peer is reachable as `<label>.<account domain>`.  The label has to be a
//! single valid DNS label, so machine names such as `Bob's MacBook Pro` are
//! folded into `bob-s-macbook-pro`.

/// Maximum length of a single DNS label.
const MAX_LABEL_LEN: usize = 63;

/// Label used when nothing usable is left of the name.
const FALLBACK_LABEL: &str = "peer";

/// Turns an arbitrary machine name into a single DNS label.
pub fn parse_label(name: &str) -> String {
    let mut label = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            if pending_dash && !label.is_empty() {
                label.push('-');
            }
            pending_dash = false;
            label.push(c);
        } else {
            pending_dash = true;
        }
    }

    label.truncate(MAX_LABEL_LEN);
    let label = label.trim_matches('-');
    if label.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        label.to_string()
    }
}
