use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

use crate::models::tool::Tool;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

#[derive(Serialize)]
struct SystemContext<'a> {
    tools: &'a [Tool],
    account_id: Option<&'a str>,
}

/// Render the preamble that opens every conversation
pub fn system_preamble(tools: &[Tool], account_id: Option<&str>) -> Result<String, TeraError> {
    let rendered = load_prompt(SYSTEM_TEMPLATE, &SystemContext { tools, account_id })?;
    Ok(rendered.trim().to_string())
}
