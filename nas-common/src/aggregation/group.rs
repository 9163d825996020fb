use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Result of recursive grouping
///
/// The nesting depth equals the number of keys used; every leaf holds the
/// summary of the items that ended up in that partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Grouped<S> {
    Leaf(S),
    Groups(BTreeMap<String, Grouped<S>>),
}

impl<S> Grouped<S> {
    pub fn leaf(&self) -> Option<&S> {
        match self {
            Grouped::Leaf(s) => Some(s),
            Grouped::Groups(_) => None,
        }
    }

    pub fn groups(&self) -> Option<&BTreeMap<String, Grouped<S>>> {
        match self {
            Grouped::Groups(g) => Some(g),
            Grouped::Leaf(_) => None,
        }
    }

    /// Follow `path` down the nesting
    pub fn get<'a, I>(&self, path: I) -> Option<&Grouped<S>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        path.into_iter()
            .try_fold(self, |node, key| node.groups()?.get(key))
    }
}

/// Extracts the partition key of an item
///
/// `None` means the item has no value for this key; such items are dropped
/// from the grouping level.
pub trait GroupKey<T> {
    fn key(&self, item: &T) -> Option<String>;
}

impl<T, F> GroupKey<T> for F
where
    F: Fn(&T) -> Option<String>,
{
    fn key(&self, item: &T) -> Option<String> {
        self(item)
    }
}

/// Partition `items` by each key in turn and summarise the leaves
///
/// With no keys the summary of all items is returned directly.
pub fn group<T, K, S, F>(items: Vec<T>, keys: &[K], summarize: &F) -> Grouped<S>
where
    K: GroupKey<T>,
    F: Fn(Vec<T>) -> S,
{
    let Some((first, rest)) = keys.split_first() else {
        return Grouped::Leaf(summarize(items));
    };

    let mut partitions: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in items {
        if let Some(key) = first.key(&item) {
            partitions.entry(key).or_default().push(item);
        }
    }

    Grouped::Groups(
        partitions
            .into_iter()
            .map(|(key, members)| (key, group(members, rest, summarize)))
            .collect(),
    )
}

/// Group without summarising; leaves hold the items themselves
pub fn group_items<T, K>(items: Vec<T>, keys: &[K]) -> Grouped<Vec<T>>
where
    K: GroupKey<T>,
{
    group(items, keys, &|members: Vec<T>| members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn field(name: &'static str) -> impl Fn(&Value) -> Option<String> {
        move |item: &Value| item.get(name).and_then(Value::as_str).map(str::to_string)
    }

    #[test]
    fn test_items_without_key_are_dropped() {
        let items = vec![json!({ "tag": "a" }), json!({ "tag": "b" }), json!({})];
        let grouped = group_items(items, &[field("tag")]);

        let groups = grouped.groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["a"], Grouped::Leaf(vec![json!({ "tag": "a" })]));
        assert_eq!(groups["b"], Grouped::Leaf(vec![json!({ "tag": "b" })]));
    }

    #[test]
    fn test_no_keys_summarizes_everything() {
        let items = vec![1, 2, 3];
        let keys: Vec<fn(&i32) -> Option<String>> = vec![];
        let grouped = group(items, &keys, &|members: Vec<i32>| members.iter().sum::<i32>());
        assert_eq!(grouped, Grouped::Leaf(6));
    }

    #[test]
    fn test_nested_grouping_depth_matches_keys() {
        let items = vec![
            json!({ "region": "lesvos", "quarter": "q1", "n": 1 }),
            json!({ "region": "lesvos", "quarter": "q2", "n": 2 }),
            json!({ "region": "calais", "quarter": "q1", "n": 4 }),
            json!({ "region": "lesvos", "quarter": "q1", "n": 8 }),
            json!({ "region": "calais", "n": 16 }),
        ];
        let count = |members: Vec<Value>| members.iter().filter_map(|m| m["n"].as_i64()).sum::<i64>();
        let grouped = group(items, &[field("region"), field("quarter")], &count);

        assert_eq!(grouped.get(["lesvos", "q1"]), Some(&Grouped::Leaf(9)));
        assert_eq!(grouped.get(["lesvos", "q2"]), Some(&Grouped::Leaf(2)));
        assert_eq!(grouped.get(["calais", "q1"]), Some(&Grouped::Leaf(4)));
        assert_eq!(grouped.get(["calais"]).and_then(Grouped::groups).map(|g| g.len()), Some(1));
        assert!(grouped.get(["paris"]).is_none());
    }

    #[test]
    fn test_empty_partitions_never_created() {
        let grouped = group_items(Vec::<Value>::new(), &[field("tag")]);
        assert_eq!(grouped.groups().map(|g| g.len()), Some(0));
    }

    #[test]
    fn test_serializes_as_nested_map() {
        let items = vec![json!({ "tag": "a" })];
        let grouped = group(items, &[field("tag")], &|members: Vec<Value>| members.len());
        assert_eq!(serde_json::to_value(&grouped).unwrap(), json!({ "a": 1 }));
    }
}
