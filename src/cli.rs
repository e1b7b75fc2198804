use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mcp-cli", version)]
#[command(
    about = "Chat client for an /api/generate endpoint with HKube MCP tools",
    long_about = None
)]
pub struct Args {
    #[arg(
        long = "url",
        help = "Base URL of the generation endpoint (default: generate_url from config)"
    )]
    pub url: Option<String>,

    #[arg(
        long = "mcp-url",
        help = "Base URL of a remote MCP host exposing /api/tool/<name>"
    )]
    pub mcp_url: Option<String>,

    #[arg(long = "model", help = "Model name to request (default: model from config)")]
    pub model: Option<String>,

    #[arg(long = "prompt", help = "Single-shot prompt (omit to use --chat)")]
    pub prompt: Option<String>,

    #[arg(long = "tool", help = "Invoke a tool by name (single-shot)")]
    pub tool: Option<String>,

    #[arg(
        long = "auto-tools",
        help = "Ask the model whether a tool should be used and orchestrate the call"
    )]
    pub auto_tools: bool,

    #[arg(
        long = "local-tools",
        help = "Host the HKube tools in this process instead of calling a server"
    )]
    pub local_tools: bool,

    #[arg(
        long = "server-path",
        help = "Tool server program started by --launch-server (default: server_path from config)"
    )]
    pub server_path: Option<String>,

    #[arg(
        long = "launch-server",
        help = "Launch the tool server as a child process and use its tools"
    )]
    pub launch_server: bool,

    #[arg(
        long = "server-args",
        num_args = 0..,
        allow_hyphen_values = true,
        help = "Extra arguments for the launched server"
    )]
    pub server_args: Vec<String>,

    #[arg(long = "chat", help = "Interactive chat REPL")]
    pub chat: bool,

    #[arg(long = "stream", help = "Stream responses as they are generated")]
    pub stream: bool,

    #[arg(
        long = "timeout",
        default_value_t = 60,
        help = "Request timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(long = "no-verify", help = "Do not verify TLS certificates")]
    pub no_verify: bool,

    #[arg(long = "config", help = "Path to the YAML config file")]
    pub config: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", help = "Show decisions, tool calls and debug logs")]
    pub verbose: bool,
}

impl Args {
    /// Whether any tool backend was requested
    pub fn wants_tools(&self) -> bool {
        self.launch_server || self.local_tools || self.mcp_url.is_some()
    }
}

/// One line typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    ListTools,
    /// `/tool <name> [arguments]`
    Tool { name: String, arguments: String },
    /// `/tool` without a name
    ToolUsage,
    Prompt(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "" => return ReplCommand::Empty,
            "/quit" | "/exit" => return ReplCommand::Quit,
            "/tools" => return ReplCommand::ListTools,
            "/tool" => return ReplCommand::ToolUsage,
            _ => {}
        }

        match line.strip_prefix("/tool ") {
            Some(rest) => {
                let rest = rest.trim();
                if rest.is_empty() {
                    return ReplCommand::ToolUsage;
                }
                let (name, arguments) = rest
                    .split_once(char::is_whitespace)
                    .unwrap_or((rest, ""));
                ReplCommand::Tool {
                    name: name.to_string(),
                    arguments: arguments.trim().to_string(),
                }
            }
            None => ReplCommand::Prompt(line.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repl_commands() {
        assert_eq!(ReplCommand::parse("  "), ReplCommand::Empty);
        assert_eq!(ReplCommand::parse("/exit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse(" /quit "), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("/tools"), ReplCommand::ListTools);
        assert_eq!(ReplCommand::parse("/tool   "), ReplCommand::ToolUsage);
        assert_eq!(
            ReplCommand::parse("/tool list_algorithms"),
            ReplCommand::Tool {
                name: "list_algorithms".to_string(),
                arguments: String::new()
            }
        );
        assert_eq!(
            ReplCommand::parse(r#"/tool read_resource {"query": "guide"}"#),
            ReplCommand::Tool {
                name: "read_resource".to_string(),
                arguments: r#"{"query": "guide"}"#.to_string()
            }
        );
        assert_eq!(
            ReplCommand::parse("/toolbox please"),
            ReplCommand::Prompt("/toolbox please".to_string())
        );
    }

    #[test]
    fn defaults() {
        let args = Args::parse_from(["mcp-cli", "--prompt", "hi"]);
        assert_eq!(args.prompt.as_deref(), Some("hi"));
        assert_eq!(args.timeout, 60);
        assert!(!args.chat);
        assert!(!args.wants_tools());
    }

    #[test]
    fn server_args_collect_values() {
        let args = Args::parse_from([
            "mcp-cli",
            "--launch-server",
            "--chat",
            "--server-args",
            "alt.yaml",
            "extra",
        ]);
        assert!(args.launch_server);
        assert!(args.wants_tools());
        assert_eq!(args.server_args, vec!["alt.yaml", "extra"]);
    }
}
