use std::cmp::Ordering;

/// Pre-release labels in ascending order, matched by prefix. `#` stands for
/// any numeric part.
const SPECIAL_FORMS: &[(&str, i32)] = &[
    ("dev", 0),
    ("alpha", 1),
    ("a", 1),
    ("beta", 2),
    ("b", 2),
    ("RC", 3),
    ("rc", 3),
    ("#", 4),
    ("pl", 5),
    ("p", 5),
];

/// Compare two version strings such as `1.2.0`, `1.2.0-beta1` or `2.0rc`.
///
/// Parts are split on `.`, `-`, `_`, `+` and on digit/letter boundaries.
/// Numeric parts compare numerically and rank above any pre-release label
/// except `pl`/`p`. When one version has extra parts, a numeric remainder makes
/// it greater (`1.0 < 1.0.0`) while a label remainder is ranked against a
/// plain number (`1.0.0beta < 1.0.0`).
pub fn version_compare(a: &str, b: &str) -> Ordering {
    let pa = canonical_parts(a);
    let pb = canonical_parts(b);
    for (x, y) in pa.iter().zip(pb.iter()) {
        let ord = compare_part(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    match pa.len().cmp(&pb.len()) {
        Ordering::Equal => Ordering::Equal,
        Ordering::Greater => remainder_order(&pa[pb.len()]),
        Ordering::Less => remainder_order(&pb[pa.len()]).reverse(),
    }
}

/// True when `stored` is older than `target`. A missing stored version is
/// always older.
pub fn needs_update(stored: Option<&str>, target: &str) -> bool {
    match stored {
        Some(v) => version_compare(v, target) == Ordering::Less,
        None => !target.is_empty(),
    }
}

fn remainder_order(part: &str) -> Ordering {
    if is_numeric(part) {
        Ordering::Greater
    } else {
        compare_part(part, "#")
    }
}

fn canonical_parts(v: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut cur = String::new();
    let mut prev_digit: Option<bool> = None;
    for c in v.trim().chars() {
        if matches!(c, '.' | '-' | '_' | '+') {
            if !cur.is_empty() {
                parts.push(std::mem::take(&mut cur));
            }
            prev_digit = None;
            continue;
        }
        let digit = c.is_ascii_digit();
        if prev_digit.is_some_and(|p| p != digit) && !cur.is_empty() {
            parts.push(std::mem::take(&mut cur));
        }
        cur.push(c);
        prev_digit = Some(digit);
    }
    if !cur.is_empty() {
        parts.push(cur);
    }
    parts
}

fn is_numeric(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

fn compare_part(a: &str, b: &str) -> Ordering {
    match (is_numeric(a), is_numeric(b)) {
        (true, true) => compare_numeric(a, b),
        (true, false) => special_rank("#").cmp(&special_rank(b)),
        (false, true) => special_rank(a).cmp(&special_rank("#")),
        (false, false) => special_rank(a).cmp(&special_rank(b)),
    }
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Unknown labels rank below `dev`.
fn special_rank(part: &str) -> i32 {
    SPECIAL_FORMS
        .iter()
        .find(|(form, _)| part.starts_with(form))
        .map(|(_, rank)| *rank)
        .unwrap_or(-6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering::*;

    #[test]
    fn numeric_ordering() {
        assert_eq!(version_compare("1.0.0", "1.2.0"), Less);
        assert_eq!(version_compare("1.10.0", "1.9.9"), Greater);
        assert_eq!(version_compare("1.2.0", "1.2.0"), Equal);
        assert_eq!(version_compare("01.2", "1.2"), Equal);
    }

    #[test]
    fn extra_numeric_part_is_greater() {
        assert_eq!(version_compare("1.0", "1.0.0"), Less);
        assert_eq!(version_compare("1.0.0", "1.0"), Greater);
    }

    #[test]
    fn prerelease_labels() {
        assert_eq!(version_compare("1.0.0-beta", "1.0.0"), Less);
        assert_eq!(version_compare("1.0.0alpha", "1.0.0beta"), Less);
        assert_eq!(version_compare("1.0.0RC1", "1.0.0b2"), Greater);
        assert_eq!(version_compare("1.0.0-dev", "1.0.0-alpha"), Less);
        assert_eq!(version_compare("1.0.0pl1", "1.0.0"), Greater);
        assert_eq!(version_compare("1.0.0-foo", "1.0.0-dev"), Less);
    }

    #[test]
    fn separators_are_equivalent() {
        assert_eq!(version_compare("1-2_3+4", "1.2.3.4"), Equal);
        assert_eq!(version_compare("2.0rc1", "2.0.rc.1"), Equal);
    }

    #[test]
    fn needs_update_handles_missing_version() {
        assert!(needs_update(None, "1.2.0"));
        assert!(needs_update(Some("1.0.0"), "1.2.0"));
        assert!(!needs_update(Some("1.2.0"), "1.2.0"));
        assert!(!needs_update(Some("1.3.0"), "1.2.0"));
    }
}
