use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Invalid cache geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Address translation error: {0}")]
    Address(#[from] AddressError),

    #[error("Unsupported cache hierarchy: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("Unknown memory reference: {0}")]
    UnknownOperation(u8),

    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Errors raised while validating a cache geometry
#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("{0} must be non-zero")]
    ZeroField(&'static str),

    #[error("block size {block_size}B exceeds cache size {total_size}B")]
    BlockLargerThanCache { block_size: usize, total_size: usize },

    #[error("cache size {total_size}B is not a multiple of block size {block_size}B")]
    SizeNotMultipleOfBlock { block_size: usize, total_size: usize },

    #[error(
        "blocks_per_set * block_size * num_sets = {blocks_per_set} * {block_size} * {num_sets} != {total_size}"
    )]
    Inconsistent {
        blocks_per_set: usize,
        block_size: usize,
        num_sets: usize,
        total_size: usize,
    },

    #[error("{name} = {value} is not a power of two")]
    NotPowerOfTwo { name: &'static str, value: usize },

    #[error("address width of {0} bits is not supported (1..=64)")]
    AddressWidth(usize),

    #[error("no tag bits left: {address_bits}-bit address, {offset_bits} offset bits, {index_bits} index bits")]
    NoTagBits {
        address_bits: usize,
        offset_bits: usize,
        index_bits: usize,
    },
}

/// Errors raised while translating an address string
#[derive(Error, Debug, PartialEq)]
pub enum AddressError {
    #[error("address '{address}' has {provided_bits} bits, but the address size is {address_bits} bits")]
    SizeMismatch {
        address: String,
        provided_bits: usize,
        address_bits: usize,
    },

    #[error("malformed address '{address}': {reason}")]
    Malformed { address: String, reason: String },
}

/// Errors related to how levels are composed into a hierarchy
#[derive(Error, Debug, PartialEq)]
pub enum HierarchyError {
    #[error("no cache level configured")]
    Empty,

    #[error("no support for more than 2 levels (got {0})")]
    TooManyLevels(usize),

    #[error("instruction or data cache type is not specified -- write_through or write_back")]
    MissingSplitPolicy,

    #[error("level 2 cache cannot have instruction and data sub-caches")]
    SplitLevelTwo,

    #[error("level 2 cache needs a data policy")]
    MissingUnifiedPolicy,
}

/// Errors related to reading a trace
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to parse trace '{path}' at line {line}: {reason}")]
    ParseError {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
