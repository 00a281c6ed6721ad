//! Output formatting for the CLI.

use clap::ValueEnum;

/// Output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a success message.
pub fn print_success(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => println!("{}", status_payload("success", message)),
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => eprintln!("{}", status_payload("error", message)),
    }
}

/// Print a table row.
pub fn print_row(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", label), value);
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "-".repeat(50));
}

/// Print a heading.
pub fn print_heading(text: &str) {
    println!("\n{}", text);
    print_divider();
}

// Server messages can contain quotes and backslashes; let serde_json
// do the escaping instead of splicing into a template.
fn status_payload(status: &str, message: &str) -> String {
    serde_json::json!({
        "status": status,
        "message": message,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_payload_is_valid_json() {
        let payload = status_payload("success", "Logged in as a@b.com");
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["message"], "Logged in as a@b.com");
    }

    #[test]
    fn test_status_payload_escapes_quotes_in_message() {
        let payload = status_payload("error", r#"Login failed: user "a@b.com" not found"#);
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(
            value["message"],
            r#"Login failed: user "a@b.com" not found"#
        );
    }
}
