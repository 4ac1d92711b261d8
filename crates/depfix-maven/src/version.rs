//! Maven version ordering.
//!
//! Follows the rules of Maven's `ComparableVersion`: versions are split into
//! numeric and qualifier items at `.`, `-` and digit/letter transitions,
//! trailing missing items compare as zero or as a release, and well-known
//! qualifiers are ranked `alpha < beta < milestone < rc < snapshot < release
//! < sp`. Unknown qualifiers sort after `sp`, lexically among themselves.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Number(u64),
    Qualifier(String),
}

const RELEASE_RANK: usize = 5;

fn qualifier_rank(qualifier: &str) -> usize {
    match qualifier {
        "alpha" | "a" => 0,
        "beta" | "b" => 1,
        "milestone" | "m" => 2,
        "rc" | "cr" => 3,
        "snapshot" => 4,
        "" | "ga" | "final" | "release" => RELEASE_RANK,
        "sp" => 6,
        _ => 7,
    }
}

fn tokenize(version: &str) -> Vec<Item> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    let flush = |current: &mut String, in_digits: bool, items: &mut Vec<Item>| {
        if current.is_empty() {
            return;
        }
        let item = if in_digits {
            current
                .parse()
                .map_or_else(|_| Item::Qualifier(current.clone()), Item::Number)
        } else {
            Item::Qualifier(current.to_ascii_lowercase())
        };
        items.push(item);
        current.clear();
    };

    for c in version.trim().chars() {
        if c == '.' || c == '-' {
            flush(&mut current, in_digits, &mut items);
            continue;
        }
        let digit = c.is_ascii_digit();
        if !current.is_empty() && digit != in_digits {
            flush(&mut current, in_digits, &mut items);
        }
        in_digits = digit;
        current.push(c);
    }
    flush(&mut current, in_digits, &mut items);

    while matches!(items.last(), Some(Item::Number(0)))
        || matches!(items.last(), Some(Item::Qualifier(q)) if qualifier_rank(q) == RELEASE_RANK)
    {
        items.pop();
    }
    items
}

fn compare_items(a: Option<&Item>, b: Option<&Item>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(Item::Number(x)), Some(Item::Number(y))) => x.cmp(y),
        (Some(Item::Number(_)), Some(Item::Qualifier(_))) => Ordering::Greater,
        (Some(Item::Qualifier(_)), Some(Item::Number(_))) => Ordering::Less,
        (Some(Item::Qualifier(x)), Some(Item::Qualifier(y))) => compare_qualifiers(x, y),
        (Some(Item::Number(x)), None) => x.cmp(&0),
        (None, Some(Item::Number(y))) => 0.cmp(y),
        (Some(Item::Qualifier(x)), None) => compare_qualifiers(x, ""),
        (None, Some(Item::Qualifier(y))) => compare_qualifiers("", y),
    }
}

fn compare_qualifiers(a: &str, b: &str) -> Ordering {
    let (rank_a, rank_b) = (qualifier_rank(a), qualifier_rank(b));
    rank_a.cmp(&rank_b).then_with(|| {
        if rank_a == 7 {
            a.cmp(b)
        } else {
            Ordering::Equal
        }
    })
}

/// Compares two Maven versions.
///
/// # Examples
///
/// ```
/// use depfix_maven::version::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("2.13.4", "2.13.4.2"), Ordering::Less);
/// assert_eq!(compare_versions("1.0-rc1", "1.0"), Ordering::Less);
/// assert_eq!(compare_versions("1.13.0.Final", "1.13.0"), Ordering::Equal);
/// ```
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (items_a, items_b) = (tokenize(a), tokenize(b));
    let len = items_a.len().max(items_b.len());

    (0..len)
        .map(|i| compare_items(items_a.get(i), items_b.get(i)))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
