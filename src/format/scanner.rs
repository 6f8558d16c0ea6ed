/// Scan a run of ASCII digits starting at `start`.
///
/// Returns the index one past the last digit and the digits themselves, or
/// `None` when `start` is not a digit.
pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}

/// Recognise a `$N` placeholder whose `$` sits at `dollar`.
///
/// Returns the index one past the numeral and the zero-based parameter slot,
/// but only for `N` in `1..=param_count`.
pub(super) fn placeholder(bytes: &[u8], dollar: usize, param_count: usize) -> Option<(usize, usize)> {
    if bytes.get(dollar) != Some(&b'$') {
        return None;
    }
    let (end, digits) = scan_digits(bytes, dollar + 1)?;
    let n: usize = digits.parse().ok()?;
    (1..=param_count).contains(&n).then(|| (end, n - 1))
}
