use anyhow::Result;
use dao_agent::models::message::Message;
use ::rustyline::error::ReadlineError;

pub mod rustyline;

pub trait Prompt {
    fn render(&mut self, message: &Message);
    fn render_history(&mut self, history: &[Message]);
    fn get_input(&mut self) -> Result<Input>;
    fn show_busy(&mut self);
    fn hide_busy(&self);
    fn close(&self);
    fn agent_ready(&self) {
        println!("\n");
        println!("The DAO agent is running! Type your request and finish it with an empty line.");
        println!("Type /help for the list of commands.");
        println!("\n");
    }
}

#[derive(Debug, PartialEq)]
pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // Optional content as sometimes the user may be issuing a command eg. (Exit)
}

#[derive(Debug, PartialEq)]
pub enum InputType {
    AskAgain, // Ask the user for input again. Control flow command.
    Message,  // User sent a message
    History,  // Print the conversation so far
    Exit,     // User wants to exit the session
}

impl Input {
    fn new(input_type: InputType) -> Self {
        Self {
            input_type,
            content: None,
        }
    }

    fn message(content: String) -> Self {
        Self {
            input_type: InputType::Message,
            content: Some(content),
        }
    }
}

const HELP: &str = "Commands:
/history - Show the conversation so far
/help - Display this help message
exit | /exit | /quit - Exit the session
Ctrl+C - Interrupt the agent while it is working";

/// Recognise single-line commands
fn command(line: &str) -> Option<InputType> {
    match line.trim().to_lowercase().as_str() {
        "exit" | "/exit" | "/quit" => Some(InputType::Exit),
        "/history" => Some(InputType::History),
        "/help" | "/?" => {
            println!("{}", HELP);
            Some(InputType::AskAgain)
        }
        _ => None,
    }
}

/// Read one request: lines are collected until an empty line. A command on the first line
/// is acted on immediately.
pub fn read_input<F>(mut read_line: F, prompt: &str, continuation: &str) -> Result<Input>
where
    F: FnMut(&str) -> Result<String, ReadlineError>,
{
    let mut lines: Vec<String> = Vec::new();
    loop {
        let marker = if lines.is_empty() { prompt } else { continuation };
        let line = match read_line(marker) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                return Ok(Input::new(InputType::Exit))
            }
            Err(e) => return Err(e.into()),
        };

        if lines.is_empty() {
            if line.trim().is_empty() {
                return Ok(Input::new(InputType::AskAgain));
            }
            if let Some(input_type) = command(&line) {
                return Ok(Input::new(input_type));
            }
        } else if line.trim().is_empty() {
            return Ok(Input::message(lines.join("\n")));
        }
        lines.push(line);
    }
}
