//! Dual-mode units: every unit can run as a batch pipeline step, and some also supply a tool
//! callable by an agent.
//!
//! - [`batch::run_batch`] processes records in order with per-record failure containment
//! - [`tool::ToolAdapter`] validates agent arguments, traces the call and returns one string
//! - [`catalog`] holds the concrete units

pub mod batch;
pub mod catalog;
pub mod error;
pub mod expression;
pub mod host;
pub mod parameters;
pub mod tool;

pub use batch::{BatchUnit, HttpStep, Step, run_batch};
pub use catalog::UnitKind;
pub use error::{Result, UnitError};
pub use host::{
    ExecutionContext, InputRecord, JsonObject, OutputRecord, ParameterSource, PerItemParameters,
    StaticParameters,
};
pub use parameters::{ItemParameters, ParameterDecl, ParameterKind, ParameterSet};
pub use tool::trace::{TraceEntry, TraceLog, TraceSink, TraceStream};
pub use tool::{ToolAdapter, ToolDescriptor, ToolInput, ToolProvider, ToolUnit};
