use colored::*;

/// Print a fenced block with a colored header line
fn print_block(header: ColoredString, body: &str) {
    // Avoid double newline if body already ends with one
    let body = body.trim_end_matches('\n');
    println!("{}", format!("```{}", header).dimmed());
    println!("{}", body);
    println!("{}", "```".dimmed());
}

/// Display a tool result in a boxed format
pub fn display_tool_result(name: &str, result: &str) {
    print_block(format!("TOOL: {}", name).cyan().bold(), result);
}

/// Display a tool error in a boxed format
pub fn display_tool_error(name: &str, error: &str) {
    print_block(format!("TOOL ERROR: {}", name).red().bold(), error);
}

/// Raw decision text from the model, shown in verbose mode
pub fn display_decision(raw: &str) {
    print_block("DECISION".yellow().bold(), raw.trim());
}

/// Display model output
pub fn display_content(content: &str) {
    println!("{}", content.trim_end());
}

pub fn display_notice(message: &str) {
    eprintln!("{}", message.yellow());
}

pub fn display_error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}
