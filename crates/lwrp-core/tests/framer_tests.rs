//! Block framer tests

use lwrp_core::BlockFramer;

const ROUTING_DUMP: &[u8] = b"BEGIN\r\n\
DST 1 NAME:\"Out 1\" ADDR:239.192.0.1\r\n\
DST 2 NAME:\"Out 2\" ADDR:239.192.0.2\r\n\
END\r\n\
VER LWRP:1.0 DEVN:Node NSRC:8/1 NDST:8\r\n\
BEGIN\r\n\
MIX 3 1:10 -:- 2:5\r\n\
END\r\n";

fn units_of(chunks: &[&[u8]]) -> Vec<Vec<String>> {
    let mut framer = BlockFramer::new();
    chunks.iter().flat_map(|chunk| framer.push(chunk)).collect()
}

#[test]
fn test_split_markers() {
    let chunks: [&[u8]; 3] = [b"BEG", b"IN\r\nDST 1 ADDR:239.192.0.1\r\nEN", b"D\r\n"];
    let split = units_of(&chunks);
    let whole = units_of(&[b"BEGIN\r\nDST 1 ADDR:239.192.0.1\r\nEND\r\n"]);

    assert_eq!(split, vec![vec!["DST 1 ADDR:239.192.0.1".to_string()]]);
    assert_eq!(split, whole);
}

#[test]
fn test_every_two_way_split_matches_whole() {
    let whole = units_of(&[ROUTING_DUMP]);
    assert_eq!(whole.len(), 3);

    for at in 0..=ROUTING_DUMP.len() {
        let (a, b) = ROUTING_DUMP.split_at(at);
        assert_eq!(units_of(&[a, b]), whole, "split at byte {}", at);
    }
}

#[test]
fn test_byte_at_a_time_matches_whole() {
    let whole = units_of(&[ROUTING_DUMP]);
    let chunks: Vec<&[u8]> = ROUTING_DUMP.chunks(1).collect();
    assert_eq!(units_of(&chunks), whole);
}

#[test]
fn test_units_emitted_in_wire_order() {
    let units = units_of(&[ROUTING_DUMP]);
    assert_eq!(units[0].len(), 2);
    assert!(units[0][0].starts_with("DST 1"));
    assert!(units[1][0].starts_with("VER"));
    assert_eq!(units[2], vec!["MIX 3 1:10 -:- 2:5".to_string()]);
}

#[test]
fn test_bare_line_does_not_wait() {
    let mut framer = BlockFramer::new();
    let units = framer.push(b"DST 4 ADDR:239.192.0.9\r\n");
    assert_eq!(units, vec![vec!["DST 4 ADDR:239.192.0.9".to_string()]]);
}

#[test]
fn test_lone_begin_is_kept_until_end() {
    let mut framer = BlockFramer::new();
    assert!(framer.push(b"BEGIN\r\n").is_empty());
    assert!(framer.push(b"DST 1 ADDR:1\r\n").is_empty());
    assert!(framer.push(b"DST 2 ADDR:2\r\n").is_empty());
    assert_eq!(framer.pending_lines(), 3);

    let units = framer.push(b"END\r\nVER LWRP:1.0\r\n");
    assert_eq!(units.len(), 2);
    assert_eq!(units[0], vec!["DST 1 ADDR:1".to_string(), "DST 2 ADDR:2".to_string()]);

    // Nothing is emitted twice
    assert!(framer.push(b"").is_empty());
    assert_eq!(framer.pending_lines(), 0);
}

#[test]
fn test_lf_only_terminators() {
    let units = units_of(&[b"BEGIN\nDST 1 ADDR:1\nEND\n"]);
    assert_eq!(units, vec![vec!["DST 1 ADDR:1".to_string()]]);
}

#[test]
fn test_oversized_block_is_dropped() {
    let mut framer = BlockFramer::with_limit(32);
    assert!(framer.push(b"BEGIN\r\n").is_empty());
    for _ in 0..10 {
        assert!(framer.push(b"DST 1 ADDR:239.192.0.1\r\n").is_empty());
    }
    assert_eq!(framer.pending_lines(), 0);

    // Lines up to the closing marker belong to the dropped block
    assert!(framer.push(b"DST 2 ADDR:2\r\nEND\r\n").is_empty());

    let units = framer.push(b"BEGIN\r\nDST 3 ADDR:3\r\nEND\r\n");
    assert_eq!(units, vec![vec!["DST 3 ADDR:3".to_string()]]);
}

#[test]
fn test_unterminated_line_is_bounded() {
    let mut framer = BlockFramer::with_limit(16);
    for _ in 0..100 {
        assert!(framer.push(b"xxxxxxxx").is_empty());
    }

    // The tail of the oversized line is dropped with it
    let units = framer.push(b"xxxx\r\nVER LWRP:1.0\r\n");
    assert_eq!(units, vec![vec!["VER LWRP:1.0".to_string()]]);
}

#[test]
fn test_block_under_limit_is_kept() {
    let mut framer = BlockFramer::with_limit(64);
    let units = framer.push(b"BEGIN\r\nDST 1 ADDR:1\r\nDST 2 ADDR:2\r\nEND\r\n");
    assert_eq!(units[0].len(), 2);
}
