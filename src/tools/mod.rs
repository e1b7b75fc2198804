//! Tool registry and dispatcher plus the HKube tool units it hosts.

pub mod algorithms;
mod client;
pub mod exec;
mod input;
pub mod instructions;
pub mod jobs;
pub mod pipelines;
mod registry;
pub mod resource_tools;
mod units;

pub use client::HkubeClient;
pub use input::ToolInput;
pub use registry::{
    required_endpoints, PlainFactory, RegistryError, ResourceFactory, ToolDescriptor, ToolFuture,
    ToolHandler, ToolOutcome, ToolRegistry, ToolSpec, ToolUnit, UnitFactory, DEBUG_TOOL_NAME,
};
pub use units::{builtin_units, registry_from_config};
