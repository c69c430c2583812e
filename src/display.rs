use crate::agents::{ChatMessage, ChatRole};
use crate::core::error::AgentError;
use crate::store::{ColumnDescriptor, Row};
use console::style;
use serde_json::Value;
use termimad::MadSkin;

/// Print a handler's answer, one block per message
pub fn display_messages(messages: &[ChatMessage]) {
    if messages.is_empty() {
        println!("{}", style("No answer was produced.").dim());
        return;
    }

    let skin = MadSkin::default();
    for message in messages {
        match message.role {
            ChatRole::User => {
                println!(
                    "\n{} {}",
                    style(format!("{}:", message.user_name)).bold().cyan(),
                    message.content
                );
            }
            ChatRole::Assistant => {
                println!("\n{}", style("🤖 AI RESPONSE").bold().blue());
                skin.print_text(&message.content);
            }
            ChatRole::Image => {
                println!(
                    "\n{} {}",
                    style("🖼  IMAGE").bold().magenta(),
                    style(&message.content).underlined().green()
                );
            }
        }

        if !message.columns.is_empty() {
            println!("{}", render_table(&message.columns, &message.rows));
        }
    }
}

/// Serialise the answer for scripting
pub fn display_json(messages: &[ChatMessage]) -> Result<(), AgentError> {
    println!("{}", serde_json::to_string_pretty(messages)?);
    Ok(())
}

pub fn display_info(message: &str) {
    println!("{} {}", style("ℹ").bold().blue(), message);
}

pub fn display_error(error: &AgentError) {
    eprintln!("{} {}", style("❌").bold().red(), style(error).red());
}

/// Fixed-width text table of a query result
pub fn render_table(columns: &[ColumnDescriptor], rows: &[Row]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(column.name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{:<width$}", value, width = width))
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(columns.iter().map(|c| c.name.as_str()).collect()));
    out.push(
        widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    );
    for row in &cells {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
