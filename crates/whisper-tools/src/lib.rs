// SPDX-License-Identifier: MIT
pub mod builtin;
pub mod policy;
pub mod registry;
pub mod schema;
pub mod tool;

pub use policy::{ApprovalPolicy, ToolPolicy};
pub use registry::{ToolRegistry, ToolSchema};
pub use schema::{validate_args, SchemaViolation};
pub use tool::{DegradedMode, ErrorType, Tool, ToolCall, ToolOutput};

pub use builtin::create_file::CreateFileTool;
pub use builtin::list_files::ListFilesTool;
pub use builtin::read_file::ReadFileTool;
pub use builtin::switch_agent::SwitchAgentTool;
pub use builtin::write_file::WriteFileTool;
