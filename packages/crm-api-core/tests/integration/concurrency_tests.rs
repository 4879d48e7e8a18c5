//! Concurrent access to one entity.

use std::sync::Arc;
use std::thread;

use ntest::timeout;
use serde_json::json;

use super::helpers::{api, full_registry};

#[test]
#[timeout(10000)]
fn test_parallel_creates_get_unique_ids() {
    let registry = Arc::new(full_registry());
    let mut handles = Vec::new();
    for worker in 0..4 {
        let registry = registry.clone();
        handles.push(thread::spawn(move || {
            let tag = api(&registry, "Tag");
            (0..50)
                .map(|i| {
                    let result = tag
                        .create(false)
                        .add_value("name", format!("tag-{}-{}", worker, i))
                        .execute()
                        .unwrap();
                    result.first().unwrap()["id"].as_i64().unwrap()
                })
                .collect::<Vec<_>>()
        }));
    }

    let mut ids: Vec<i64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 200);
    assert_eq!(ids.first(), Some(&1));
    assert_eq!(ids.last(), Some(&200));

    let count = api(&registry, "Tag")
        .get(false)
        .add_where("name", "LIKE", "tag-%")
        .select_row_count()
        .execute()
        .unwrap();
    assert_eq!(count.count(), 200);
}

#[test]
#[timeout(10000)]
fn test_readers_see_consistent_snapshots() {
    let registry = Arc::new(full_registry());
    let group = api(&registry, "Group");

    let writer = {
        let registry = registry.clone();
        thread::spawn(move || {
            let group = api(&registry, "Group");
            for i in 0..100 {
                group
                    .create(false)
                    .add_value("title", format!("Group {}", i))
                    .execute()
                    .unwrap();
            }
        })
    };

    let mut last = 0;
    while !writer.is_finished() {
        let rows = group.get(false).select(&["title"]).execute().unwrap();
        assert!(rows.len() >= last);
        assert!(rows.iter().all(|r| r["title"] != json!(null)));
        last = rows.len();
    }
    writer.join().unwrap();
    assert_eq!(group.get(false).execute().unwrap().len(), 100);
}
