//! One chat turn: optionally ask the model whether a tool is needed, run it,
//! and feed its output back for the final answer.

mod backend;
pub mod decision;
pub mod rules;

pub use backend::{RemoteTools, ToolBackend, ToolCall, DEFAULT_REMOTE_CATALOG};
pub use decision::{build_decision_prompt, build_followup_prompt, parse_decision, ToolDecision};
pub use rules::{KeywordRule, RuleMatch, RuleTable};

use colored::*;
use std::io::{self, Write};
use thiserror::Error;

use crate::api::GenerateClient;
use crate::error::HkubeMcpError;
use crate::tools::ToolOutcome;
use crate::ui::{
    display_content, display_decision, display_notice, display_tool_error, display_tool_result,
};

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Request failed: {0}")]
    Generate(#[from] HkubeMcpError),
    #[error("Model requested a tool but did not provide tool_name.")]
    MissingToolName,
    #[error("No tool backend configured; use --local-tools, --launch-server or --mcp-url")]
    NoBackend,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Answered without a tool
    Direct { answer: String },
    /// A tool ran and its output informed the answer
    ToolAssisted {
        tool: String,
        output: ToolOutcome,
        answer: String,
        forced: bool,
    },
}

impl TurnOutcome {
    pub fn answer(&self) -> &str {
        match self {
            TurnOutcome::Direct { answer } | TurnOutcome::ToolAssisted { answer, .. } => answer,
        }
    }
}

pub struct ChatOrchestrator {
    generator: GenerateClient,
    backend: Option<ToolBackend>,
    rules: RuleTable,
    auto_tools: bool,
    stream: bool,
    verbose: bool,
    tool_timeout_secs: u64,
}

impl ChatOrchestrator {
    pub fn new(generator: GenerateClient, backend: Option<ToolBackend>) -> Self {
        Self {
            generator,
            backend,
            rules: RuleTable::empty(),
            auto_tools: false,
            stream: false,
            verbose: false,
            tool_timeout_secs: 30,
        }
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_auto_tools(mut self, auto_tools: bool) -> Self {
        self.auto_tools = auto_tools;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_tool_timeout(mut self, secs: u64) -> Self {
        self.tool_timeout_secs = secs;
        self
    }

    pub fn generator(&self) -> &GenerateClient {
        &self.generator
    }

    pub fn backend(&self) -> Option<&ToolBackend> {
        self.backend.as_ref()
    }

    pub async fn run_turn(&self, prompt: &str) -> Result<TurnOutcome, TurnError> {
        let backend = match (&self.backend, self.auto_tools) {
            (Some(backend), true) => backend,
            _ => return self.answer_directly(prompt).await,
        };

        let forced = self
            .rules
            .evaluate(prompt, |tool| backend.has_tool(tool))
            .map(|hit| (hit.tool.to_string(), hit.keyword.to_string()));

        let catalog = backend.catalog();
        let decision_prompt = build_decision_prompt(prompt, Some(&catalog));
        let reply = self.generator.generate_raw(&decision_prompt).await?;
        if self.verbose {
            display_decision(&reply.response_text);
        }

        let decision = parse_decision(&reply.response_text);
        let call = match decision {
            Some(decision) if decision.use_tool => {
                let name = decision.tool().ok_or(TurnError::MissingToolName)?;
                Some((
                    ToolCall {
                        name: name.to_string(),
                        arguments: decision.arguments(),
                        prompt: decision.prompt_text(),
                    },
                    false,
                ))
            }
            other => {
                if other.is_none() {
                    display_notice("Model did not return a valid tool decision JSON.");
                }
                forced.map(|(tool, keyword)| {
                    display_notice(&format!(
                        "Heuristic: prompt mentions '{}'; forcing use of '{}' tool.",
                        keyword, tool
                    ));
                    (ToolCall::bare(tool), true)
                })
            }
        };

        let Some((call, forced)) = call else {
            return self.answer_directly(prompt).await;
        };

        let output = self.call_tool(backend, &call).await;
        let followup = build_followup_prompt(&output.text, prompt);
        let answer = self.answer(&followup).await?;
        Ok(TurnOutcome::ToolAssisted {
            tool: call.name,
            output,
            answer,
            forced,
        })
    }

    /// Run one tool and show its output
    pub async fn run_tool(&self, call: &ToolCall) -> Result<ToolOutcome, TurnError> {
        let backend = self.backend.as_ref().ok_or(TurnError::NoBackend)?;
        Ok(self.call_tool(backend, call).await)
    }

    async fn call_tool(&self, backend: &ToolBackend, call: &ToolCall) -> ToolOutcome {
        tracing::info!(tool = %call.name, "calling tool");
        let output = backend.invoke(call, self.tool_timeout_secs).await;
        if output.is_error {
            display_tool_error(&call.name, &output.text);
        } else {
            display_tool_result(&call.name, &output.text);
        }
        output
    }

    async fn answer_directly(&self, prompt: &str) -> Result<TurnOutcome, TurnError> {
        let answer = self.answer(prompt).await?;
        Ok(TurnOutcome::Direct { answer })
    }

    async fn answer(&self, prompt: &str) -> Result<String, TurnError> {
        if self.stream {
            let text = self
                .generator
                .generate_streaming(prompt, |chunk| {
                    print!("{}", chunk);
                    let _ = io::stdout().flush();
                })
                .await?;
            println!();
            return Ok(text);
        }

        let text = self.generator.generate(prompt).await?;
        display_content(&text);
        Ok(text)
    }

    /// Release the tool backend, stopping a launched server
    pub async fn shutdown(self) {
        if let Some(backend) = self.backend {
            if self.verbose {
                eprintln!("{}", "[tools] shutting down tool backend".dimmed());
            }
            backend.shutdown().await;
        }
    }
}
