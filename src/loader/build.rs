//! Helpers for batch functions: align fetched rows with the keys that were asked for.

use std::collections::HashMap;
use std::hash::Hash;

/// Groups `rows` by key, returning one (possibly empty) list per requested key.
pub fn build_list<T, K, F>(rows: impl IntoIterator<Item = T>, keys: &[K], key_fn: F) -> Vec<Vec<T>>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut groups: HashMap<K, Vec<T>> = HashMap::new();
    for row in rows {
        groups.entry(key_fn(&row)).or_default().push(row);
    }
    keys.iter()
        .map(|key| groups.get(key).cloned().unwrap_or_default())
        .collect()
}

/// Indexes `rows` by key, returning the matching row (or `None`) per requested key.
///
/// When several rows share a key the last one wins.
pub fn build_object<T, K, F>(
    rows: impl IntoIterator<Item = T>,
    keys: &[K],
    key_fn: F,
) -> Vec<Option<T>>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let index: HashMap<K, T> = rows.into_iter().map(|row| (key_fn(&row), row)).collect();
    keys.iter().map(|key| index.get(key).cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Comment {
        task_id: u32,
        content: &'static str,
    }

    fn comments() -> Vec<Comment> {
        vec![
            Comment { task_id: 1, content: "first" },
            Comment { task_id: 2, content: "second" },
            Comment { task_id: 1, content: "third" },
        ]
    }

    #[test]
    fn test_build_list_follows_key_order() {
        let grouped = build_list(comments(), &[2, 3, 1], |c| c.task_id);

        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[0], vec![comments()[1].clone()]);
        assert!(grouped[1].is_empty());
        assert_eq!(grouped[2], vec![comments()[0].clone(), comments()[2].clone()]);
    }

    #[test]
    fn test_build_object_keeps_the_last_row() {
        let indexed = build_object(comments(), &[1, 4], |c| c.task_id);

        assert_eq!(indexed[0].as_ref().map(|c| c.content), Some("third"));
        assert_eq!(indexed[1], None);
    }
}
