//! Cache level implementation

use std::collections::HashSet;
use std::io::Write;

use log::debug;

use super::set::AssociativeSet;
use super::set::SetAccess;
use super::translator::AddressTranslator;
use super::translator::CacheGeometry;
use super::AccessResult;
use super::AccessType;
use super::WritePolicy;
use crate::error::AddressError;
use crate::error::GeometryError;

/// Coherence state of a level
#[derive(Debug)]
enum Coherence {
    WriteThrough,
    /// Dirty tags are tracked for the whole level, not per set
    WriteBack { dirty: HashSet<u64> },
}

/// One cache level: a translator and one associative set per index
#[derive(Debug)]
pub struct CacheLevel {
    pub hit_time: u32,
    pub miss_penalty: u32,

    pub history: CacheHistory,

    coherence: Coherence,
    translator: AddressTranslator,
    sets: Vec<AssociativeSet>,
    debug: bool,
}

impl CacheLevel {
    pub fn make(
        write_policy: WritePolicy,
        geometry: CacheGeometry,
        hit_time: u32,
        miss_penalty: u32,
        debug: bool,
    ) -> Result<Self, GeometryError> {
        if debug {
            debug!(
                "initializing cache: total size = {}B, block size = {}B, set size = {}B, {} sets of {} blocks",
                geometry.total_size,
                geometry.block_size,
                geometry.blocks_per_set * geometry.block_size,
                geometry.num_sets,
                geometry.blocks_per_set
            );
        }

        let translator = AddressTranslator::make(geometry, debug)?;
        let sets = (0..geometry.num_sets)
            .map(|_| AssociativeSet::make(geometry.blocks_per_set, debug))
            .collect();
        let coherence = match write_policy {
            WritePolicy::WriteThrough => Coherence::WriteThrough,
            WritePolicy::WriteBack => Coherence::WriteBack {
                dirty: HashSet::new(),
            },
        };

        if debug {
            debug!("[SUCCESS] {} cache initialized", write_policy);
        }

        Ok(Self {
            hit_time,
            miss_penalty,
            history: CacheHistory::default(),
            coherence,
            translator,
            sets,
            debug,
        })
    }

    pub fn write_policy(&self) -> WritePolicy {
        match self.coherence {
            Coherence::WriteThrough => WritePolicy::WriteThrough,
            Coherence::WriteBack { .. } => WritePolicy::WriteBack,
        }
    }

    pub fn geometry(&self) -> &CacheGeometry {
        self.translator.geometry()
    }

    /// Tags currently tracked dirty; always empty for write-through
    pub fn dirty_tags(&self) -> Option<&HashSet<u64>> {
        match &self.coherence {
            Coherence::WriteThrough => None,
            Coherence::WriteBack { dirty } => Some(dirty),
        }
    }

    pub fn access(
        &mut self,
        access_type: AccessType,
        address: &str,
    ) -> Result<AccessResult, AddressError> {
        match access_type {
            AccessType::Read => self.read(address),
            AccessType::Write => self.write(address),
        }
    }

    pub fn read(&mut self, address: &str) -> Result<AccessResult, AddressError> {
        let decoded = self.translator.translate(address)?;
        let (set_index, tag) = (decoded.set_index as usize, decoded.tag);

        let outcome = self.fetch(set_index, tag);
        if outcome.hit {
            if self.debug {
                debug!("     read hit");
            }
            self.history.record_hit();
            Ok(AccessResult::Hit)
        } else {
            if self.debug {
                debug!("     read miss");
            }
            self.sets[set_index].mark_present(tag);
            self.history.record_miss();
            Ok(AccessResult::Miss)
        }
    }

    pub fn write(&mut self, address: &str) -> Result<AccessResult, AddressError> {
        let decoded = self.translator.translate(address)?;
        let (set_index, tag) = (decoded.set_index as usize, decoded.tag);

        let outcome = self.fetch(set_index, tag);
        match self.write_policy() {
            WritePolicy::WriteThrough => {
                if outcome.hit {
                    if self.debug {
                        debug!("     write hit");
                    }
                    self.history.record_hit();
                }
                // The write always goes through to memory as well
                if self.debug {
                    debug!("     write miss -- writing through");
                }
                self.history.record_miss();
                Ok(AccessResult::Miss)
            }
            WritePolicy::WriteBack => {
                if outcome.hit {
                    if self.debug {
                        debug!("     write hit -- write back -- {} set dirty", tag);
                    }
                    self.history.record_hit();
                    self.remark_dirty(tag);
                    Ok(AccessResult::Hit)
                } else {
                    // No write allocate: memory is written directly,
                    // the tag stays resident for later references
                    if self.debug {
                        debug!("     write miss -- no write allocate");
                    }
                    self.history.record_miss();
                    self.remark_dirty(tag);
                    self.sets[set_index].mark_present(tag);
                    Ok(AccessResult::Miss)
                }
            }
        }
    }

    /// Look the tag up in its set; a dirty victim costs an extra miss
    fn fetch(&mut self, set_index: usize, tag: u64) -> SetAccess {
        let dirty = match &self.coherence {
            Coherence::WriteThrough => None,
            Coherence::WriteBack { dirty } => Some(dirty),
        };
        let outcome = self.sets[set_index].access(tag, dirty);
        if outcome.write_back {
            self.history.record_miss();
        }
        outcome
    }

    /// Re-mark a tag that is already tracked dirty.
    /// Tags not yet in the dirty set are left out of it.
    fn remark_dirty(&mut self, tag: u64) {
        if let Coherence::WriteBack { dirty } = &mut self.coherence {
            if dirty.contains(&tag) {
                dirty.insert(tag);
            }
        }
    }

    pub fn get_hits(&self) -> u64 {
        self.history.num_hit
    }

    pub fn get_misses(&self) -> u64 {
        self.history.num_miss
    }

    pub fn get_hit_rate(&self) -> f64 {
        self.history.hit_rate()
    }

    pub fn get_miss_rate(&self) -> f64 {
        self.history.miss_rate()
    }

    pub fn average_memory_access_time(&self) -> f64 {
        self.hit_time as f64 + self.get_miss_rate() * self.miss_penalty as f64
    }

    pub fn summary(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "summary of {} cache:", self.write_policy())?;
        writeln!(out, "  number of memory accesses: {}", self.history.accesses())?;
        writeln!(out, "  number of hits: {}", self.history.num_hit)?;
        writeln!(out, "  number of misses: {}", self.history.num_miss)?;
        writeln!(out, "  hit rate: {:.4}", self.get_hit_rate())?;
        writeln!(out, "  miss rate: {:.4}", self.get_miss_rate())?;
        writeln!(out)
    }
}

/// Hit and miss counters
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct CacheHistory {
    pub num_hit: u64,
    pub num_miss: u64,
}

impl CacheHistory {
    pub fn record_hit(&mut self) {
        self.num_hit += 1;
    }

    pub fn record_miss(&mut self) {
        self.num_miss += 1;
    }

    pub fn accesses(&self) -> u64 {
        self.num_hit + self.num_miss
    }

    pub fn hit_rate(&self) -> f64 {
        if self.accesses() == 0 {
            return 0.0;
        }
        self.num_hit as f64 / self.accesses() as f64
    }

    pub fn miss_rate(&self) -> f64 {
        if self.accesses() == 0 {
            return 0.0;
        }
        self.num_miss as f64 / self.accesses() as f64
    }

    /// Merge two histories, used for split levels
    pub fn combined(&self, other: &CacheHistory) -> CacheHistory {
        CacheHistory {
            num_hit: self.num_hit + other.num_hit,
            num_miss: self.num_miss + other.num_miss,
        }
    }
}
