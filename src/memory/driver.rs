//! Multi-level cache driver.
//! Level 1 is split into instruction and data caches;
//! an optional level 2 is a single unified cache.

use std::io::Write;

use log::debug;
use log::trace;

use super::cache::CacheHistory;
use super::cache::CacheLevel;
use super::AccessResult;
use super::Operation;
use crate::config::LevelConfig;
use crate::error::HierarchyError;
use crate::error::SimulatorResult;

const MAX_LEVELS: usize = 2;

/// One level of the hierarchy
#[derive(Debug)]
pub enum Level {
    Split {
        instruction: CacheLevel,
        data: CacheLevel,
        hit_time: u32,
        miss_penalty: u32,
    },
    Unified(CacheLevel),
}

impl Level {
    /// Build the split first level
    fn split(config: &LevelConfig) -> SimulatorResult<Self> {
        let (Some(instruction), Some(data)) = (config.instruction, config.data) else {
            return Err(HierarchyError::MissingSplitPolicy.into());
        };
        let make = |policy| {
            CacheLevel::make(
                policy,
                config.geometry(),
                config.hit_time,
                config.miss_penalty,
                config.debug,
            )
        };
        Ok(Level::Split {
            data: make(data)?,
            instruction: make(instruction)?,
            hit_time: config.hit_time,
            miss_penalty: config.miss_penalty,
        })
    }

    /// Build the unified second level
    fn unified(config: &LevelConfig) -> SimulatorResult<Self> {
        if config.instruction.is_some() && config.data.is_some() {
            return Err(HierarchyError::SplitLevelTwo.into());
        }
        let policy = config.data.ok_or(HierarchyError::MissingUnifiedPolicy)?;
        Ok(Level::Unified(CacheLevel::make(
            policy,
            config.geometry(),
            config.hit_time,
            config.miss_penalty,
            config.debug,
        )?))
    }

    pub fn exec(
        &mut self,
        operation: Operation,
        address: &str,
    ) -> SimulatorResult<AccessResult> {
        let cache = match self {
            Level::Split { instruction, data, .. } => {
                if operation.is_instruction() {
                    instruction
                } else {
                    data
                }
            }
            Level::Unified(cache) => cache,
        };
        Ok(cache.access(operation.access_type(), address)?)
    }

    pub fn hit_time(&self) -> u32 {
        match self {
            Level::Split { hit_time, .. } => *hit_time,
            Level::Unified(cache) => cache.hit_time,
        }
    }

    pub fn miss_penalty(&self) -> u32 {
        match self {
            Level::Split { miss_penalty, .. } => *miss_penalty,
            Level::Unified(cache) => cache.miss_penalty,
        }
    }

    /// Counters over every cache of the level
    pub fn history(&self) -> CacheHistory {
        match self {
            Level::Split { instruction, data, .. } => {
                instruction.history.combined(&data.history)
            }
            Level::Unified(cache) => cache.history,
        }
    }

    pub fn miss_rate(&self) -> f64 {
        self.history().miss_rate()
    }

    /// AMAT of this level alone, with its own miss penalty
    pub fn average_memory_access_time(&self) -> f64 {
        self.hit_time() as f64 + self.miss_rate() * self.miss_penalty() as f64
    }

    /// Caches of the level with a label for each
    pub fn caches(&self) -> Vec<(&'static str, &CacheLevel)> {
        match self {
            Level::Split { instruction, data, .. } => {
                vec![("instruction", instruction), ("data", data)]
            }
            Level::Unified(cache) => vec![("unified", cache)],
        }
    }

    pub fn summary(&self, out: &mut impl Write) -> std::io::Result<()> {
        match self {
            Level::Split { instruction, data, .. } => {
                writeln!(out, "instruction cache summary:")?;
                instruction.summary(out)?;
                writeln!(out, "data cache summary:")?;
                data.summary(out)?;
                writeln!(out)
            }
            Level::Unified(cache) => cache.summary(out),
        }
    }
}

/// A one or two level cache hierarchy
#[derive(Debug)]
pub struct CacheHierarchy {
    levels: Vec<Level>,
}

impl CacheHierarchy {
    /// Create a hierarchy from a configuration per level,
    /// with `configs[0]` being level 1
    pub fn make(configs: &[LevelConfig]) -> SimulatorResult<Self> {
        if configs.is_empty() {
            return Err(HierarchyError::Empty.into());
        }
        if configs.len() > MAX_LEVELS {
            return Err(HierarchyError::TooManyLevels(configs.len()).into());
        }

        let mut levels = Vec::with_capacity(configs.len());
        for (k, config) in configs.iter().enumerate() {
            let level = if k == 0 {
                Level::split(config)?
            } else {
                Level::unified(config)?
            };
            levels.push(level);
        }

        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Run one reference down the hierarchy, stopping at the first hit.
    /// A miss at the last level is a miss of the whole hierarchy.
    pub fn exec(
        &mut self,
        operation: Operation,
        address: &str,
    ) -> SimulatorResult<AccessResult> {
        let mut result = AccessResult::Miss;
        for (k, level) in self.levels.iter_mut().enumerate() {
            result = level.exec(operation, address)?;
            if result.is_hit() {
                break;
            }
            trace!("level {} missed on {} {}", k + 1, operation, address);
        }
        Ok(result)
    }

    /// Like [`CacheHierarchy::exec`], taking a raw trace code
    pub fn exec_code(
        &mut self,
        code: u8,
        address: &str,
    ) -> SimulatorResult<AccessResult> {
        self.exec(Operation::try_from(code)?, address)
    }

    /// Overall average memory access time.
    /// Every level's miss is served by the level below it,
    /// and the last level's miss by its own miss penalty
    pub fn get_amat(&self) -> f64 {
        let mut result = match self.levels.last() {
            Some(level) => level.miss_penalty() as f64,
            None => return 0.0,
        };
        for (k, level) in self.levels.iter().enumerate().rev() {
            debug!("level {}: {:?}", k + 1, level.history());
            result = level.hit_time() as f64 + level.miss_rate() * result;
        }
        result
    }

    pub fn summary(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "Summary of every level:")?;
        writeln!(out)?;
        for (k, level) in self.levels.iter().enumerate() {
            writeln!(out, "level {}", k + 1)?;
            level.summary(out)?;
        }
        writeln!(out, "overall average memory access time: {}", self.get_amat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use crate::error::SimulatorError;
    use crate::memory::WritePolicy;

    fn l1(policy: WritePolicy) -> LevelConfig {
        LevelConfig::make(Some(policy), Some(policy), 1024, 32, 32, 1, 100, 2)
    }

    fn l2() -> LevelConfig {
        LevelConfig::make(None, Some(WritePolicy::WriteBack), 16384, 128, 32, 10, 200, 4)
    }

    fn unified_history(hierarchy: &CacheHierarchy) -> CacheHistory {
        hierarchy.levels()[1].history()
    }

    #[test]
    fn test_bad_hierarchies() {
        assert!(matches!(
            CacheHierarchy::make(&[]),
            Err(SimulatorError::Hierarchy(HierarchyError::Empty))
        ));
        assert!(matches!(
            CacheHierarchy::make(&[l1(WritePolicy::WriteBack), l2(), l2()]),
            Err(SimulatorError::Hierarchy(HierarchyError::TooManyLevels(3)))
        ));
        let half = LevelConfig { instruction: None, ..l1(WritePolicy::WriteBack) };
        assert!(matches!(
            CacheHierarchy::make(&[half]),
            Err(SimulatorError::Hierarchy(HierarchyError::MissingSplitPolicy))
        ));
        assert!(matches!(
            CacheHierarchy::make(&[l1(WritePolicy::WriteBack), l1(WritePolicy::WriteBack)]),
            Err(SimulatorError::Hierarchy(HierarchyError::SplitLevelTwo))
        ));
        let no_data = LevelConfig { data: None, ..l2() };
        assert!(matches!(
            CacheHierarchy::make(&[l1(WritePolicy::WriteBack), no_data]),
            Err(SimulatorError::Hierarchy(HierarchyError::MissingUnifiedPolicy))
        ));
        let bad_geometry = LevelConfig { block_size: 48, ..l1(WritePolicy::WriteBack) };
        assert!(matches!(
            CacheHierarchy::make(&[bad_geometry]),
            Err(SimulatorError::Geometry(_))
        ));
    }

    #[test]
    fn test_routing() {
        let mut hierarchy = CacheHierarchy::make(&[l1(WritePolicy::WriteBack)]).unwrap();
        hierarchy.exec(Operation::InstructionRead, "0x400").unwrap();
        hierarchy.exec(Operation::DataRead, "0x800").unwrap();
        hierarchy.exec(Operation::DataWrite, "0x800").unwrap();

        let Level::Split { instruction, data, .. } = &hierarchy.levels()[0] else {
            panic!("level 1 must be split");
        };
        assert_eq!(instruction.history, CacheHistory { num_hit: 0, num_miss: 1 });
        assert_eq!(data.history, CacheHistory { num_hit: 1, num_miss: 1 });
    }

    #[test]
    fn test_both_levels_miss_once() {
        let mut hierarchy =
            CacheHierarchy::make(&[l1(WritePolicy::WriteBack), l2()]).unwrap();
        assert_eq!(
            hierarchy.exec(Operation::DataRead, "0x12345678").unwrap(),
            AccessResult::Miss
        );
        assert_eq!(hierarchy.levels()[0].history(), CacheHistory { num_hit: 0, num_miss: 1 });
        assert_eq!(unified_history(&hierarchy), CacheHistory { num_hit: 0, num_miss: 1 });

        // L1 hit stops before L2
        assert_eq!(
            hierarchy.exec(Operation::DataRead, "0x12345678").unwrap(),
            AccessResult::Hit
        );
        assert_eq!(unified_history(&hierarchy).accesses(), 1);
    }

    #[test]
    fn test_level_two_catches_l1_eviction() {
        let mut hierarchy =
            CacheHierarchy::make(&[l1(WritePolicy::WriteBack), l2()]).unwrap();
        // L1: 16 sets of 2, all three addresses land in set 0 with different tags
        for address in ["0x0000", "0x0200", "0x0400"] {
            hierarchy.exec(Operation::DataRead, address).unwrap();
        }
        // 0x0000 was evicted from L1 but is still in L2
        assert_eq!(
            hierarchy.exec(Operation::DataRead, "0x0000").unwrap(),
            AccessResult::Hit
        );
        assert_eq!(unified_history(&hierarchy), CacheHistory { num_hit: 1, num_miss: 3 });
    }

    #[test]
    fn test_write_through_writes_reach_level_two() {
        let mut hierarchy =
            CacheHierarchy::make(&[l1(WritePolicy::WriteThrough), l2()]).unwrap();
        // L1 never reports a write hit, so every write is retried in L2
        let results: Vec<_> = (0..3)
            .map(|_| hierarchy.exec(Operation::DataWrite, "0x40").unwrap())
            .collect();
        assert_eq!(results, [AccessResult::Miss, AccessResult::Hit, AccessResult::Hit]);
        assert_eq!(unified_history(&hierarchy), CacheHistory { num_hit: 2, num_miss: 1 });
    }

    #[test]
    fn test_unknown_code() {
        let mut hierarchy = CacheHierarchy::make(&[l1(WritePolicy::WriteBack)]).unwrap();
        assert!(matches!(
            hierarchy.exec_code(7, "0x0"),
            Err(SimulatorError::UnknownOperation(7))
        ));
        assert_eq!(hierarchy.exec_code(2, "0x0").unwrap(), AccessResult::Miss);
    }

    #[test]
    fn test_single_level_amat() {
        let mut hierarchy =
            CacheHierarchy::make(&[l1(WritePolicy::WriteThrough)]).unwrap();
        assert_eq!(hierarchy.get_amat(), 1.0);

        // Each cache misses once and hits once
        hierarchy.exec(Operation::DataRead, "0x0").unwrap();
        hierarchy.exec(Operation::DataRead, "0x0").unwrap();
        hierarchy.exec(Operation::InstructionRead, "0x0").unwrap();
        hierarchy.exec(Operation::InstructionRead, "0x0").unwrap();
        assert!((hierarchy.get_amat() - 51.0).abs() < 1e-9);
        assert!(
            (hierarchy.get_amat() - hierarchy.levels()[0].average_memory_access_time()).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_two_level_amat() {
        let mut hierarchy =
            CacheHierarchy::make(&[l1(WritePolicy::WriteBack), l2()]).unwrap();
        for address in ["0x0000", "0x0200", "0x0400", "0x0000"] {
            hierarchy.exec(Operation::DataRead, address).unwrap();
        }
        // L1: 4 misses of 4; L2: 1 hit, 3 misses
        let expected = 1.0 + 1.0 * (10.0 + 0.75 * 200.0);
        assert!((hierarchy.get_amat() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_summary_layout() {
        let mut hierarchy = CacheHierarchy::make(&Preset::TwoLevel.levels(2, false)).unwrap();
        hierarchy.exec(Operation::InstructionRead, "0x10").unwrap();
        let mut out = Vec::new();
        hierarchy.summary(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let order = [
            "Summary of every level:",
            "level 1",
            "instruction cache summary:",
            "summary of WriteBack cache:",
            "data cache summary:",
            "level 2",
            "overall average memory access time: ",
        ];
        let mut from = 0;
        for needle in order {
            let at = text[from..].find(needle).unwrap();
            from += at + needle.len();
        }
    }
}
