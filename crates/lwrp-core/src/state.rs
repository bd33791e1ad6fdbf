//! Output routing state
//!
//! Keeps the latest [`Destination`] record per output number. Updates replace
//! the stored record wholesale; attributes are never merged across updates.

use std::collections::BTreeMap;

use crate::address::{stream_num_to_multicast, SIP_PREFIX};
use crate::types::Destination;

/// Snapshot of device outputs keyed by output number
#[derive(Debug, Clone, Default)]
pub struct OutputStateCache {
    outputs: BTreeMap<u32, Destination>,
    populated: bool,
}

impl OutputStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry of every destination in the batch
    ///
    /// Outputs not present in the batch keep their previous record.
    pub fn apply<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = Destination>,
    {
        for record in records {
            self.outputs.insert(record.num, record);
        }
        self.populated = true;
    }

    /// Stored record for an output
    pub fn get(&self, output: u32) -> Option<&Destination> {
        self.outputs.get(&output)
    }

    /// Source currently routed to an output
    ///
    /// SIP descriptors and dotted addresses are returned as stored, a bare
    /// stream number is expanded to its multicast address.
    pub fn lookup(&self, output: u32) -> Option<String> {
        let address = self.outputs.get(&output)?.address()?;

        if address.starts_with(SIP_PREFIX) {
            return Some(address.to_string());
        }

        if !address.contains('.') {
            return address
                .parse()
                .ok()
                .and_then(|n| stream_num_to_multicast(n).ok());
        }

        Some(address.to_string())
    }

    /// Whether any destination batch has been applied since the last clear
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Outputs in ascending number order
    pub fn iter(&self) -> impl Iterator<Item = &Destination> {
        self.outputs.values()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn clear(&mut self) {
        self.outputs.clear();
        self.populated = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attributes;

    fn dst(num: u32, pairs: &[(&str, &str)]) -> Destination {
        let attributes: Attributes = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Destination { num, attributes }
    }

    #[test]
    fn test_lookup_forms() {
        let mut cache = OutputStateCache::new();
        cache.apply(vec![
            dst(1, &[("address", "239.192.0.10")]),
            dst(2, &[("address", "10")]),
            dst(3, &[("address", "sip:studio@10.0.0.1")]),
            dst(4, &[("name", "No address")]),
            dst(5, &[("address", "")]),
        ]);

        assert_eq!(cache.lookup(1).as_deref(), Some("239.192.0.10"));
        assert_eq!(cache.lookup(2).as_deref(), Some("239.192.0.10"));
        assert_eq!(cache.lookup(3).as_deref(), Some("sip:studio@10.0.0.1"));
        assert_eq!(cache.lookup(4), None);
        assert_eq!(cache.lookup(5), None);
        assert_eq!(cache.lookup(99), None);
    }

    #[test]
    fn test_clear() {
        let mut cache = OutputStateCache::new();
        assert!(!cache.is_populated());
        cache.apply(vec![dst(1, &[("address", "1")])]);
        assert!(cache.is_populated());
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.is_populated());
    }
}
