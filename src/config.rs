//! Per-level configuration records and the stock configurations

use std::str::FromStr;

use crate::error::SimulatorError;
use crate::memory::translator::CacheGeometry;
use crate::memory::WritePolicy;

/// Configuration of a single level.
/// A split level needs both policies; a unified level only reads `data`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelConfig {
    pub instruction: Option<WritePolicy>,
    pub data: Option<WritePolicy>,
    pub total_size: usize,
    pub block_size: usize,
    pub address_bits: usize,
    pub hit_time: u32,
    pub miss_penalty: u32,
    pub blocks_per_set: usize,
    pub debug: bool,
}

impl LevelConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn make(
        instruction: Option<WritePolicy>,
        data: Option<WritePolicy>,
        total_size: usize,
        block_size: usize,
        address_bits: usize,
        hit_time: u32,
        miss_penalty: u32,
        blocks_per_set: usize,
    ) -> Self {
        Self {
            instruction,
            data,
            total_size,
            block_size,
            address_bits,
            hit_time,
            miss_penalty,
            blocks_per_set,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Replace the write policies that are given; `None` keeps the current one
    pub fn with_policies(
        mut self,
        instruction: Option<WritePolicy>,
        data: Option<WritePolicy>,
    ) -> Self {
        self.instruction = instruction.or(self.instruction);
        self.data = data.or(self.data);
        self
    }

    /// Number of sets implied by the sizes; 0 if they do not divide
    pub fn num_sets(&self) -> usize {
        match self.block_size.checked_mul(self.blocks_per_set) {
            Some(set_size) if set_size > 0 => self.total_size / set_size,
            _ => 0,
        }
    }

    pub fn geometry(&self) -> CacheGeometry {
        CacheGeometry::make(
            self.total_size,
            self.block_size,
            self.address_bits,
            self.num_sets(),
            self.blocks_per_set,
        )
    }
}

/// Stock hierarchies of the command-line tool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    /// One split level, write-through
    WriteThrough,
    /// One split level, write-back
    WriteBack,
    /// Split write-back L1 over a unified write-back L2
    TwoLevel,
}

impl Preset {
    pub const ALL: [Preset; 3] =
        [Preset::WriteThrough, Preset::WriteBack, Preset::TwoLevel];

    pub fn name(self) -> &'static str {
        match self {
            Preset::WriteThrough => "1: L1 write-through",
            Preset::WriteBack => "2: L1 write-back",
            Preset::TwoLevel => "3: L1 + L2 write-back",
        }
    }

    /// Level configurations for the preset.
    /// `associativity` is the blocks per set of the last level.
    pub fn levels(self, associativity: usize, debug: bool) -> Vec<LevelConfig> {
        match self {
            Preset::WriteThrough => vec![LevelConfig::make(
                Some(WritePolicy::WriteThrough),
                Some(WritePolicy::WriteThrough),
                1024,
                32,
                32,
                1,
                100,
                associativity,
            )
            .with_debug(debug)],
            Preset::WriteBack => vec![LevelConfig::make(
                Some(WritePolicy::WriteBack),
                Some(WritePolicy::WriteBack),
                1024,
                32,
                32,
                1,
                100,
                associativity,
            )
            .with_debug(debug)],
            Preset::TwoLevel => vec![
                LevelConfig::make(
                    Some(WritePolicy::WriteBack),
                    Some(WritePolicy::WriteBack),
                    1024,
                    32,
                    32,
                    1,
                    100,
                    2,
                )
                .with_debug(debug),
                LevelConfig::make(
                    None,
                    Some(WritePolicy::WriteBack),
                    16384,
                    128,
                    32,
                    1,
                    100,
                    associativity,
                )
                .with_debug(debug),
            ],
        }
    }
}

impl FromStr for Preset {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Preset::WriteThrough),
            "2" => Ok(Preset::WriteBack),
            "3" => Ok(Preset::TwoLevel),
            _ => Err(SimulatorError::ConfigError(format!(
                "invalid configuration '{}': expected 1, 2 or 3",
                s
            ))),
        }
    }
}
