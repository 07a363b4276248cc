//! One associative set of a cache level

use std::collections::BTreeMap;
use std::collections::HashSet;

use log::debug;

/// Result of looking a tag up in a set
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SetAccess {
    pub hit: bool,
    /// Tag evicted to make room, if any
    pub victim: Option<u64>,
    /// The victim was tracked dirty and has to be written back
    pub write_back: bool,
}

/// A set of `capacity` block slots.
/// Every resident tag carries the number of times it was referenced;
/// the least referenced tag is the eviction victim.
#[derive(Debug)]
pub struct AssociativeSet {
    capacity: usize,
    debug: bool,
    // Ordered so that victim selection does not depend on hashing
    resident: BTreeMap<u64, u64>,
}

impl AssociativeSet {
    pub fn make(capacity: usize, debug: bool) -> Self {
        assert!(capacity > 0);
        Self {
            capacity,
            debug,
            resident: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.resident.len()
    }

    pub fn contains(&self, tag: u64) -> bool {
        self.resident.contains_key(&tag)
    }

    /// Reference count of a resident tag
    pub fn references(&self, tag: u64) -> Option<u64> {
        self.resident.get(&tag).copied()
    }

    /// Look up `tag`, bringing it in on a miss.
    /// When the set is full the least referenced tag is evicted first;
    /// if it is a member of `dirty_tags` the access is flagged as a write-back.
    /// Dirty membership itself is never changed here.
    pub fn access(
        &mut self,
        tag: u64,
        dirty_tags: Option<&HashSet<u64>>,
    ) -> SetAccess {
        if let Some(count) = self.resident.get_mut(&tag) {
            *count += 1;
            return SetAccess {
                hit: true,
                ..Default::default()
            };
        }

        let mut result = SetAccess::default();
        if self.size() >= self.capacity {
            if let Some(victim) = self.select_victim() {
                if dirty_tags.is_some_and(|dirty| dirty.contains(&victim)) {
                    if self.debug {
                        debug!("     miss -- victim was dirty -- writing back to memory");
                    }
                    result.write_back = true;
                }
                self.resident.remove(&victim);
                result.victim = Some(victim);
            }
        }
        self.resident.insert(tag, 1);
        result
    }

    /// Count another reference to a resident tag; absent tags are ignored
    pub fn mark_present(&mut self, tag: u64) {
        if let Some(count) = self.resident.get_mut(&tag) {
            *count += 1;
        }
    }

    /// The first tag, in ascending tag order, with the fewest references.
    /// This is a frequency policy: recency plays no part.
    fn select_victim(&self) -> Option<u64> {
        let mut victim: Option<(u64, u64)> = None;
        for (&tag, &count) in &self.resident {
            match victim {
                Some((_, min)) if count >= min => {}
                _ => victim = Some((tag, count)),
            }
        }
        if self.debug {
            if let Some((tag, count)) = victim {
                debug!(
                    "cache full -- victim selected by reference count: {}  #ref: {}",
                    tag, count
                );
            }
        }
        victim.map(|(tag, _)| tag)
    }
}
