//! Output formatting for human-readable and JSON modes.
//!
//! Human mode uses colored terminal output.
//! JSON mode outputs pure JSON with no ANSI escapes.

use colored::Colorize;

/// Prints a success message.
pub fn print_success(msg: &str, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({ "status": "ok", "message": msg });
        println!("{obj}");
    } else {
        println!("{} {}", "✓".green().bold(), msg);
    }
}

/// Prints a single key-value pair.
pub fn print_kv(key: &str, value: &str, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({ key: value });
        println!("{obj}");
    } else {
        println!("{}: {}", key.bold(), value);
    }
}

/// Prints a warning to stderr. Silent in JSON mode, where callers put
/// the condition into the document instead.
pub fn print_warning(msg: &str, json_mode: bool) {
    if !json_mode {
        eprintln!("{} {}", "warning:".yellow().bold(), msg);
    }
}

/// Prints an error message.
pub fn print_error(msg: &str, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({ "error": msg });
        eprintln!("{obj}");
    } else {
        eprintln!("{} {}", "error:".red().bold(), msg);
    }
}
