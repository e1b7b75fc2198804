use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use super::client::HkubeClient;
use super::input::ToolInput;
use crate::resources::ResourceStore;

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<String, String>> + Send>>;

pub const DEBUG_TOOL_NAME: &str = "debug_list_registered_tools";

/// How a handler is called. `WithResources` handlers get the shared store
/// injected ahead of the caller's arguments.
#[derive(Clone)]
pub enum ToolHandler {
    Standalone(Arc<dyn Fn(ToolInput) -> ToolFuture + Send + Sync>),
    WithResources(Arc<dyn Fn(Arc<ResourceStore>, ToolInput) -> ToolFuture + Send + Sync>),
}

impl ToolHandler {
    pub fn standalone<F, Fut>(f: F) -> Self
    where
        F: Fn(ToolInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        ToolHandler::Standalone(Arc::new(move |input| -> ToolFuture { Box::pin(f(input)) }))
    }

    pub fn with_resources<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<ResourceStore>, ToolInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        ToolHandler::WithResources(Arc::new(move |store, input| -> ToolFuture {
            Box::pin(f(store, input))
        }))
    }

    pub fn needs_resources(&self) -> bool {
        matches!(self, ToolHandler::WithResources(_))
    }
}

impl std::fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolHandler::Standalone(_) => f.write_str("ToolHandler::Standalone"),
            ToolHandler::WithResources(_) => f.write_str("ToolHandler::WithResources"),
        }
    }
}

/// What a unit factory hands back for each tool
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub handler: ToolHandler,
}

impl ToolSpec {
    pub fn bare(name: impl Into<String>, handler: ToolHandler) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            handler,
        }
    }

    pub fn described(
        name: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        handler: ToolHandler,
    ) -> Self {
        Self {
            name: name.into(),
            title: Some(title.into()),
            description: Some(description.into()),
            handler,
        }
    }
}

pub type PlainFactory = fn(&HkubeClient) -> Result<Vec<ToolSpec>, String>;
pub type ResourceFactory = fn(&HkubeClient, &Arc<ResourceStore>) -> Result<Vec<ToolSpec>, String>;

/// Whether a unit's factory wants the resource store
#[derive(Clone, Copy)]
pub enum UnitFactory {
    Plain(PlainFactory),
    WithResources(ResourceFactory),
}

/// A group of tools registered together, plus the endpoint keys its tools call
#[derive(Clone, Copy)]
pub struct ToolUnit {
    pub name: &'static str,
    pub endpoints: &'static [&'static str],
    pub factory: UnitFactory,
}

impl ToolUnit {
    fn build(
        &self,
        client: &HkubeClient,
        resources: &Arc<ResourceStore>,
    ) -> Result<Vec<ToolSpec>, String> {
        match self.factory {
            UnitFactory::Plain(factory) => factory(client),
            UnitFactory::WithResources(factory) => factory(client, resources),
        }
    }
}

/// Every endpoint key the given units declare, deduplicated
pub fn required_endpoints(units: &[ToolUnit]) -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = units
        .iter()
        .flat_map(|unit| unit.endpoints.iter().copied())
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error(
        "Duplicate tool name '{name}': registered by unit '{existing}' and again by unit '{unit}'"
    )]
    DuplicateTool {
        name: String,
        existing: String,
        unit: String,
    },
    #[error("Unit '{0}' returned a tool with an empty name")]
    EmptyName(String),
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
}

/// Name to handler map. Filled at startup, read-only afterwards, so it can
/// be shared behind an `Arc` without locking.
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    resources: Arc<ResourceStore>,
}

impl ToolRegistry {
    pub fn new(resources: Arc<ResourceStore>) -> Self {
        Self {
            tools: HashMap::new(),
            resources,
        }
    }

    /// Build every unit and register its tools. A unit whose factory fails
    /// is logged and skipped; a name collision aborts.
    pub fn discover(
        units: &[ToolUnit],
        client: &HkubeClient,
        resources: Arc<ResourceStore>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new(resources);

        for unit in units {
            let specs = match unit.build(client, &registry.resources) {
                Ok(specs) => specs,
                Err(e) => {
                    tracing::error!(
                        unit = unit.name,
                        error = %e,
                        "failed to load tool unit; skipping"
                    );
                    continue;
                }
            };
            let count = specs.len();
            for spec in specs {
                registry.register(unit.name, spec)?;
            }
            tracing::debug!(unit = unit.name, tools = count, "loaded tool unit");
        }

        registry.register_diagnostics()?;
        tracing::info!(tools = registry.len(), "tool registry ready");
        Ok(registry)
    }

    pub fn register(&mut self, unit: &str, spec: ToolSpec) -> Result<(), RegistryError> {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName(unit.to_string()));
        }
        if let Some(existing) = self.tools.get(&name) {
            return Err(RegistryError::DuplicateTool {
                name,
                existing: existing.descriptor.unit.clone(),
                unit: unit.to_string(),
            });
        }

        let descriptor = ToolDescriptor {
            title: spec.title.unwrap_or_else(|| name.clone()),
            description: spec.description.unwrap_or_default(),
            unit: unit.to_string(),
            name: name.clone(),
        };
        self.tools.insert(
            name,
            RegisteredTool {
                descriptor,
                handler: spec.handler,
            },
        );
        Ok(())
    }

    /// Adds the diagnostic tool listing everything registered so far
    fn register_diagnostics(&mut self) -> Result<(), RegistryError> {
        let names: Vec<String> = self.names().into_iter().map(String::from).collect();
        let handler = ToolHandler::standalone(move |input: ToolInput| {
            let names = names.clone();
            async move { list_registered(&names, &input) }
        });
        self.register(
            "diagnostics",
            ToolSpec::described(
                DEBUG_TOOL_NAME,
                "Debug: list registered tools",
                "Returns the names of all tools registered in this server",
                handler,
            ),
        )
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name).map(|t| &t.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Sorted by name
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        let mut descriptors: Vec<&ToolDescriptor> =
            self.tools.values().map(|t| &t.descriptor).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn resources(&self) -> &Arc<ResourceStore> {
        &self.resources
    }

    /// One `name: description` line per tool, for the decision prompt
    pub fn catalog(&self) -> String {
        self.descriptors()
            .iter()
            .map(|d| {
                if d.description.is_empty() {
                    d.name.clone()
                } else {
                    format!("{}: {}", d.name, d.description)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Call a tool with arguments in any accepted shape. Never fails: lookup
    /// misses, handler errors and panics all come back as text.
    pub async fn invoke(&self, name: &str, arguments: Option<&Value>) -> ToolOutcome {
        self.invoke_input(name, ToolInput::from_arguments(arguments))
            .await
    }

    pub async fn invoke_input(&self, name: &str, input: ToolInput) -> ToolOutcome {
        let Some(tool) = self.tools.get(name) else {
            tracing::warn!(tool = name, "tool not found");
            return ToolOutcome::error(format!("Tool '{}' not found", name));
        };

        tracing::info!(tool = name, "invoking tool");
        tracing::debug!(tool = name, args = ?input.args, kwargs = ?input.kwargs, "tool input");

        let handler = tool.handler.clone();
        let resources = Arc::clone(&self.resources);
        let started = std::panic::catch_unwind(AssertUnwindSafe(move || match handler {
            ToolHandler::Standalone(f) => f(input),
            ToolHandler::WithResources(f) => f(resources, input),
        }));

        let result = match started {
            Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
            Err(panic) => Err(panic),
        };

        match result {
            Ok(Ok(text)) => ToolOutcome::ok(text),
            Ok(Err(message)) => {
                tracing::warn!(tool = name, error = %message, "tool returned an error");
                ToolOutcome::error(message)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(tool = name, panic = %message, "tool panicked");
                ToolOutcome::error(format!("Tool '{}' failed: {}", name, message))
            }
        }
    }
}

fn list_registered(names: &[String], input: &ToolInput) -> Result<String, String> {
    input.bind(&[])?;
    if names.is_empty() {
        return Ok("No tools registered. Count=0".to_string());
    }
    Ok(format!(
        "Registered tools ({}):\n{}",
        names.len(),
        names.join("\n")
    ))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
