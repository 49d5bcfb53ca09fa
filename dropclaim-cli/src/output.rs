//! Terminal output formatting.

use colored::Colorize;
use serde::Serialize;

use dropclaim_core::operation::ERROR_ID_KEY;
use dropclaim_core::{ClassifiedError, ErrorKind, OperationResult, UserAllocation};

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg.green());
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg.red());
}

/// Print an info message.
pub fn info(msg: &str) {
    println!("{} {}", "→".cyan(), msg);
}

/// Print a warning message.
pub fn warn(msg: &str) {
    println!("{} {}", "!".yellow().bold(), msg.yellow());
}

/// Print a header.
pub fn header(msg: &str) {
    println!("\n{}", msg.white().bold());
    println!("{}", "─".repeat(msg.chars().count()).dimmed());
}

/// Print a key-value pair.
pub fn kv(key: &str, value: &str) {
    println!("  {} {}", format!("{}:", key).dimmed(), value);
}

/// Print a helpful hint.
pub fn hint(msg: &str) {
    println!("{} {}", "💡".dimmed(), msg.dimmed());
}

/// Print a classified failure: the user message, then its kind and id.
pub fn failure(err: &ClassifiedError) {
    error(err.user_message());
    eprintln!("  {} {}", "kind:".dimmed(), err.kind());
    // these kinds have a generic user message, the detail is what helps
    if matches!(err.kind(), ErrorKind::Unknown | ErrorKind::Configuration | ErrorKind::ValidationError) {
        eprintln!("  {} {}", "detail:".dimmed(), err.message());
    }
    if let Some(id) = err.context().get(ERROR_ID_KEY) {
        eprintln!("  {} {}", "error id:".dimmed(), id.as_str().unwrap_or_default());
    }
    if err.is_retryable() {
        hint("This looks transient. Running the command again may succeed.");
    }
}

/// JSON envelope shared by every `--json` command.
#[derive(Serialize)]
struct JsonOutput<'a, T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ClassifiedError>,
}

/// Print an operation result as JSON. Returns the exit code.
pub fn json<T: Serialize>(result: &OperationResult<T>) -> i32 {
    let envelope = JsonOutput {
        success: result.is_success(),
        data: result.data(),
        error: result.error(),
    };
    match serde_json::to_string_pretty(&envelope) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error(&format!("Failed to encode output: {}", e));
            return 1;
        }
    }
    if result.is_success() {
        0
    } else {
        1
    }
}

/// Print one allocation's fields.
pub fn allocation(allocation: &UserAllocation) {
    kv("Total", &allocation.total_allocation.to_string());
    kv("Claimed", &allocation.claimed_amount.to_string());
    kv("Remaining", &allocation.remaining().to_string());
    let status = if allocation.is_claimed {
        "claimed".green().to_string()
    } else {
        "unclaimed".yellow().to_string()
    };
    kv("Status", &status);
}
