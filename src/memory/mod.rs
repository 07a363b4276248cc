//! Memory hierarchy structure

pub mod cache;
pub mod driver;
pub mod set;
pub mod translator;

use std::fmt;
use std::str::FromStr;

use crate::error::SimulatorError;

/// Outcome of an access at some level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Miss,
}

impl AccessResult {
    pub fn is_hit(self) -> bool {
        self == AccessResult::Hit
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    Read,
    Write,
}

/// Reference: <https://inst.eecs.berkeley.edu/~cs61c/su20/pdfs/lectures/lec15.pdf>
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WritePolicy {
    #[default]
    WriteBack,
    WriteThrough,
}

impl WritePolicy {
    /// Name used in summaries
    pub fn name(self) -> &'static str {
        match self {
            WritePolicy::WriteBack => "WriteBack",
            WritePolicy::WriteThrough => "WriteThrough",
        }
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "write_back" | "wb" => Ok(WritePolicy::WriteBack),
            "write_through" | "wt" => Ok(WritePolicy::WriteThrough),
            _ => Err(format!(
                "Invalid write policy: '{}'. Expected 'write_back' or 'write_through'.",
                s
            )),
        }
    }
}

/// Kind of memory reference found in a trace
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    DataRead = 0,
    DataWrite = 1,
    InstructionRead = 2,
}

impl Operation {
    pub fn access_type(self) -> AccessType {
        match self {
            Operation::DataWrite => AccessType::Write,
            Operation::DataRead | Operation::InstructionRead => AccessType::Read,
        }
    }

    pub fn is_instruction(self) -> bool {
        self == Operation::InstructionRead
    }
}

impl TryFrom<u8> for Operation {
    type Error = SimulatorError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Operation::DataRead),
            1 => Ok(Operation::DataWrite),
            2 => Ok(Operation::InstructionRead),
            _ => Err(SimulatorError::UnknownOperation(code)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::DataRead => "data read",
            Operation::DataWrite => "data write",
            Operation::InstructionRead => "instruction read",
        })
    }
}
