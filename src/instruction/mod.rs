//! Instruction compilation and the command execution protocol
//!
//! The heart of the tool: declarative instruction definitions are compiled
//! into command objects following the fixed build → simulate → confirm →
//! submit → postprocess lifecycle, with batch and inspection compilers
//! layered on top by composition.

pub mod batch;
pub mod command;
pub mod context;
pub mod definition;
pub mod flags;
pub mod inspection;
pub mod report;

pub use batch::BatchCommand;
pub use command::{confirm, Command, CommandResult, CompiledCommand};
pub use context::{CommandEnv, ExecutionContext};
pub use definition::{Input, Instruction, InstructionSpec};
pub use flags::Flags;
pub use inspection::{InspectInstruction, Inspection, InspectionCommand};
pub use report::ExecutionReport;
