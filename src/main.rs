use anyhow::Result;
use clap::Parser;
use colored::*;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use hkube_mcp::api::GenerateClient;
use hkube_mcp::cli::{Args, ReplCommand};
use hkube_mcp::config::Config;
use hkube_mcp::logging::init_cli_logging;
use hkube_mcp::mcp::McpClient;
use hkube_mcp::orchestrator::{ChatOrchestrator, RemoteTools, RuleTable, ToolBackend, ToolCall};
use hkube_mcp::tools::registry_from_config;
use hkube_mcp::ui::display_error;

const DEFAULT_SERVER_PROGRAM: &str = "hkube-mcp-server";
const EXIT_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_cli_logging(args.verbose);

    if !args.chat && args.prompt.is_none() && args.tool.is_none() {
        display_error("Either --prompt or --chat is required. See --help");
        return ExitCode::from(EXIT_FAILURE);
    }

    let config = match Config::load_or_default(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            display_error(&format!("{:#}", e));
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let orchestrator = match build_orchestrator(&args, &config).await {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            display_error(&format!("{:#}", e));
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let code = if args.chat {
        run_chat(&orchestrator).await
    } else if let Some(tool) = &args.tool {
        run_single_tool(&orchestrator, tool, args.prompt.as_deref().unwrap_or("")).await
    } else {
        run_single_prompt(&orchestrator, args.prompt.as_deref().unwrap_or("")).await
    };

    orchestrator.shutdown().await;
    code
}

async fn build_orchestrator(args: &Args, config: &Config) -> Result<ChatOrchestrator> {
    let url = args.url.clone().unwrap_or_else(|| config.generate_url.clone());
    let model = args.model.clone().unwrap_or_else(|| config.model.clone());
    let generator = GenerateClient::new(&url, model.clone(), args.timeout, !args.no_verify)?;
    let backend = build_backend(args, config, &model).await?;

    Ok(ChatOrchestrator::new(generator, backend)
        .with_rules(RuleTable::from_config(&config.tool_rules))
        .with_auto_tools(args.auto_tools)
        .with_stream(args.stream)
        .with_verbose(args.verbose)
        .with_tool_timeout(args.timeout))
}

/// A launched server wins over in-process tools, which win over a remote host
async fn build_backend(args: &Args, config: &Config, model: &str) -> Result<Option<ToolBackend>> {
    if args.launch_server {
        let program = args
            .server_path
            .clone()
            .or_else(|| config.server_path.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_PROGRAM.to_string());

        let mut server_args = args.server_args.clone();
        if let Some(path) = &args.config {
            if !server_args.iter().any(|a| a == "--config") {
                server_args.push("--config".to_string());
                server_args.push(path.display().to_string());
            }
        }

        let client =
            McpClient::launch(&program, &server_args, args.timeout, args.verbose).await?;
        println!(
            "{} {} ({} tools)",
            "Launched tool server:".green(),
            program,
            client.tools().len()
        );
        return Ok(Some(ToolBackend::Launched(client)));
    }

    if args.local_tools {
        let registry = registry_from_config(config)?;
        return Ok(Some(ToolBackend::Local(Arc::new(registry))));
    }

    if let Some(mcp_url) = &args.mcp_url {
        let remote = RemoteTools::new(mcp_url, model, args.timeout, !args.no_verify)?;
        return Ok(Some(ToolBackend::Remote(remote)));
    }

    Ok(None)
}

async fn run_single_prompt(orchestrator: &ChatOrchestrator, prompt: &str) -> ExitCode {
    match orchestrator.run_turn(prompt).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            display_error(&e.to_string());
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run_single_tool(orchestrator: &ChatOrchestrator, tool: &str, arguments: &str) -> ExitCode {
    match orchestrator.run_tool(&ToolCall::from_text(tool, arguments)).await {
        Ok(outcome) if !outcome.is_error => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(EXIT_FAILURE),
        Err(e) => {
            display_error(&e.to_string());
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run_chat(orchestrator: &ChatOrchestrator) -> ExitCode {
    println!(
        "Starting interactive chat against: {}",
        orchestrator.generator().endpoint()
    );
    println!("Type /quit or Ctrl-C to exit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", "You: ".green().bold());
        let _ = io::stdout().flush();

        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                println!("\nBye");
                break;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                display_error(&format!("Failed to read input: {}", e));
                break;
            }
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::ToolUsage => println!("Usage: /tool <tool_name> [json arguments]"),
            ReplCommand::ListTools => match orchestrator.backend() {
                Some(backend) => {
                    for name in backend.tool_names() {
                        println!("  {}", name.cyan());
                    }
                }
                None => display_error(
                    "No tool backend configured; use --local-tools, --launch-server or --mcp-url",
                ),
            },
            ReplCommand::Tool { name, arguments } => {
                let call = ToolCall::from_text(name, &arguments);
                if let Err(e) = orchestrator.run_tool(&call).await {
                    display_error(&e.to_string());
                }
            }
            ReplCommand::Prompt(prompt) => {
                tokio::select! {
                    result = orchestrator.run_turn(&prompt) => {
                        if let Err(e) = result {
                            display_error(&e.to_string());
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        println!("\nBye");
                        break;
                    }
                }
            }
        }
    }

    ExitCode::SUCCESS
}
