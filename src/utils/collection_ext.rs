//! Collection helpers

use std::collections::HashSet;
use std::hash::Hash;

/// Drop repeated items, keeping the first occurrence and the original order.
///
/// # Example
/// ```ignore
/// let shapes = unique_ordered(vec!["b", "a", "b"]); // ["b", "a"]
/// ```
#[inline]
pub fn unique_ordered<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
