//! Output state cache tests

use lwrp_core::{parse_unit, OutputStateCache, ResponseRecord};

fn destinations(text: &[&str]) -> Vec<lwrp_core::Destination> {
    let lines: Vec<String> = text.iter().map(|s| s.to_string()).collect();
    parse_unit(&lines)
        .into_iter()
        .filter_map(ResponseRecord::into_destination)
        .collect()
}

#[test]
fn test_latest_record_wins_without_merge() {
    let mut cache = OutputStateCache::new();
    cache.apply(destinations(&[r#"DST 1 NAME:"Out 1" ADDR:239.192.0.5 RTPE:1"#]));
    cache.apply(destinations(&["DST 1 ADDR:239.192.0.6"]));

    assert_eq!(cache.lookup(1).as_deref(), Some("239.192.0.6"));
    let stored = cache.get(1).unwrap();
    assert_eq!(stored.attributes.len(), 1);
    assert!(!stored.attributes.contains_key("name"));
    assert!(!stored.attributes.contains_key("rtp"));
}

#[test]
fn test_absent_outputs_keep_previous_value() {
    let mut cache = OutputStateCache::new();
    cache.apply(destinations(&["DST 1 ADDR:239.192.0.1", "DST 2 ADDR:239.192.0.2"]));
    cache.apply(destinations(&["DST 2 ADDR:239.192.0.9"]));

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.lookup(1).as_deref(), Some("239.192.0.1"));
    assert_eq!(cache.lookup(2).as_deref(), Some("239.192.0.9"));
}

#[test]
fn test_stream_number_address_expands() {
    let mut cache = OutputStateCache::new();
    cache.apply(destinations(&["DST 3 ADDR:1234"]));
    assert_eq!(cache.lookup(3).as_deref(), Some("239.192.4.210"));
}

#[test]
fn test_unset_address_has_no_source() {
    let mut cache = OutputStateCache::new();
    cache.apply(destinations(&["DST 3 ADDR:0.0.0.0", "DST 4 NAME:Spare"]));
    assert_eq!(cache.lookup(3), None);
    assert_eq!(cache.lookup(4), None);
}

#[test]
fn test_iter_sorted_by_output() {
    let mut cache = OutputStateCache::new();
    cache.apply(destinations(&["DST 9 ADDR:1", "DST 2 ADDR:2", "DST 5 ADDR:3"]));
    let nums: Vec<u32> = cache.iter().map(|d| d.num).collect();
    assert_eq!(nums, vec![2, 5, 9]);
}
