//! Trace reading and replay

use std::io::Write;
use std::path::Path;

use log::debug;

use crate::config::LevelConfig;
use crate::error::SimulatorResult;
use crate::error::TraceError;
use crate::memory::driver::CacheHierarchy;
use crate::memory::Operation;

/// One memory reference of a trace
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceOp {
    pub operation: Operation,
    pub address: String,
}

/// Fetch operations from the trace file
pub fn fetch_operations(trace_path: &Path) -> SimulatorResult<Vec<TraceOp>> {
    let content = std::fs::read_to_string(trace_path)?;
    parse_operations(&content, trace_path)
}

/// Parse trace text, one `<type> <address>` reference per line.
/// Types other than 0, 1 and 2 are skipped
pub fn parse_operations(
    content: &str,
    origin: &Path,
) -> SimulatorResult<Vec<TraceOp>> {
    let mut operations = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        let (kind, address) = line.split_once(' ').unwrap_or((line, ""));
        let address = address.trim();
        if kind.is_empty() || address.is_empty() {
            return Err(TraceError::ParseError {
                path: origin.to_path_buf(),
                line: line_num + 1,
                reason: format!("invalid line -- {}", line),
            }
            .into());
        }

        let operation = match kind {
            "0" => Operation::DataRead,
            "1" => Operation::DataWrite,
            "2" => Operation::InstructionRead,
            _ => {
                debug!("skipping reference type '{}' at line {}", kind, line_num + 1);
                continue;
            }
        };

        operations.push(TraceOp {
            operation,
            address: address.to_string(),
        });
    }

    Ok(operations)
}

/// Run the operations through the hierarchy in order
/// and return the overall AMAT
pub fn run_trace(
    hierarchy: &mut CacheHierarchy,
    operations: &[TraceOp],
) -> SimulatorResult<f64> {
    for op in operations {
        debug!("[{}] {}", op.operation, op.address);
        hierarchy.exec(op.operation, &op.address)?;
    }
    Ok(hierarchy.get_amat())
}

/// Build a hierarchy, replay a trace file and write the summary to `out`
pub fn run(
    trace_path: &Path,
    configs: &[LevelConfig],
    out: &mut impl Write,
) -> SimulatorResult<CacheHierarchy> {
    let mut hierarchy = CacheHierarchy::make(configs)?;
    let operations = fetch_operations(trace_path)?;
    run_trace(&mut hierarchy, &operations)?;
    hierarchy.summary(out)?;
    Ok(hierarchy)
}
