use std::collections::HashSet;
use std::hash::Hash;

/// Stateful filter that lets the first item for each key through.
///
/// Meant for a single forward pass, e.g. `iter.filter(distinct_by_key(|e| e.id.clone()))`.
pub fn distinct_by_key<T, K, F>(mut key_fn: F) -> impl FnMut(&T) -> bool
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    move |item| seen.insert(key_fn(item))
}

/// Drops later duplicates, keeping first occurrences in their original order.
pub fn dedup_by_key<T, K, F>(items: impl IntoIterator<Item = T>, key_fn: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut keep = distinct_by_key(key_fn);
    items.into_iter().filter(|item| keep(item)).collect()
}
