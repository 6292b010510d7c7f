use std::io::{self, Write};

use anyhow::Result;
use cliclack::spinner;
use console::style;
use dao_agent::models::message::{Message, MessageContent, ToolRequest, ToolResult};
use dao_agent::models::role::Role;
use rustyline::DefaultEditor;
use serde_json::Value;

use super::{read_input, Input, Prompt};

const PROMPT: &str = "\x1b[1m\x1b[38;5;30mYou> \x1b[0m";
const CONTINUATION: &str = "\x1b[38;5;30m...  \x1b[0m";
const MAX_STRING_LENGTH: usize = 60;
const MAX_RESULT_LENGTH: usize = 400;
const INDENT: &str = "    ";

pub struct RustylinePrompt {
    editor: DefaultEditor,
    spinner: cliclack::ProgressBar,
}

impl RustylinePrompt {
    pub fn new() -> Result<Self> {
        Ok(RustylinePrompt {
            editor: DefaultEditor::new()?,
            spinner: spinner(),
        })
    }
}

fn print_request(tool_request: &ToolRequest) {
    match &tool_request.tool_call {
        Ok(call) => {
            print_newline();
            println!(
                "─── {} ──────────────────────────",
                style(&call.name).magenta()
            );
            print_params(&call.arguments, 0);
        }
        Err(e) => println!("{}", style(e).red()),
    }
}

fn print_result(tool_result: &ToolResult, truncate: bool) {
    let output = tool_result.output.trim();
    let shown = if truncate && output.chars().count() > MAX_RESULT_LENGTH {
        let head: String = output.chars().take(MAX_RESULT_LENGTH).collect();
        format!("{}{}", head, style("...").dim())
    } else {
        output.to_string()
    };

    if tool_result.is_error {
        println!("{}", style(shown).red());
    } else {
        println!("{}", style(shown).dim());
    }
}

/// Format and print parameters recursively with proper indentation and colors
fn print_params(value: &Value, depth: usize) {
    let indent = INDENT.repeat(depth);

    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        println!("{}{}:", indent, style(key).dim());
                        print_params(val, depth + 1);
                    }
                    Value::String(s) if s.len() > MAX_STRING_LENGTH => {
                        println!("{}{}: {}", indent, style(key).dim(), style("...").dim());
                    }
                    Value::String(s) => {
                        println!("{}{}: {}", indent, style(key).dim(), style(s).green());
                    }
                    other => {
                        println!("{}{}: {}", indent, style(key).dim(), style(other).blue());
                    }
                }
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("{}{}.", indent, i + 1);
                print_params(item, depth + 1);
            }
        }
        Value::String(s) => println!("{}{}", indent, style(s).green()),
        other => println!("{}{}", indent, style(other).yellow()),
    }
}

fn print_newline() {
    println!();
}

fn role_label(role: Role) -> String {
    match role {
        Role::System => style("System").dim().to_string(),
        Role::User => style("You").cyan().bold().to_string(),
        Role::Assistant => style("Agent").green().bold().to_string(),
        Role::Tool => style("Tool").magenta().to_string(),
    }
}

impl Prompt for RustylinePrompt {
    fn render(&mut self, message: &Message) {
        for content in &message.content {
            match content {
                MessageContent::Text { text } => println!("{}", text),
                MessageContent::ToolRequest(request) => print_request(request),
                MessageContent::ToolResult(result) => print_result(result, true),
            }
        }

        print_newline();
        let _ = io::stdout().flush();
    }

    fn render_history(&mut self, history: &[Message]) {
        println!("{}", style("--- Agent History ---").bold());
        if history.is_empty() {
            println!("{}", style("(empty)").dim());
        }
        for message in history {
            println!("{}:", role_label(message.role));
            for content in &message.content {
                match content {
                    MessageContent::Text { text } => println!("{}{}", INDENT, text),
                    MessageContent::ToolRequest(request) => print_request(request),
                    MessageContent::ToolResult(result) => print_result(result, false),
                }
            }
        }
        print_newline();
    }

    fn show_busy(&mut self) {
        self.spinner = spinner();
        self.spinner.start("awaiting reply...");
    }

    fn hide_busy(&self) {
        self.spinner.stop("");
    }

    fn get_input(&mut self) -> Result<Input> {
        let editor = &mut self.editor;
        let input = read_input(|marker| editor.readline(marker), PROMPT, CONTINUATION)?;
        if let Some(content) = &input.content {
            let _ = editor.add_history_entry(content.as_str());
        }
        Ok(input)
    }

    fn close(&self) {
        // No cleanup required
    }
}
