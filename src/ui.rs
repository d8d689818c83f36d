use colored::{ColoredString, Colorize};
use declarative::Action;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Colored plan symbol for an action
pub fn action_symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => action.symbol().green().bold(),
        Action::Update => action.symbol().yellow().bold(),
        Action::Delete => action.symbol().red().bold(),
        Action::NoOp => action.symbol().normal(),
    }
}

/// "1 resource", "3 resources"
pub fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Shorten a long identifier for display, keeping the start
pub fn truncate_id(id: &str, max_len: usize) -> String {
    if id.chars().count() <= max_len {
        id.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let head: String = id.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count() {
        assert_eq!(count(0, "resource"), "0 resources");
        assert_eq!(count(1, "resource"), "1 resource");
        assert_eq!(count(7, "change"), "7 changes");
    }

    #[test]
    fn test_truncate_id_short() {
        assert_eq!(truncate_id("wf_123", 10), "wf_123");
        assert_eq!(truncate_id("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_id_long() {
        assert_eq!(
            truncate_id("01HZX9Q4C7W2M8R5T0V3", 10),
            "01HZX9Q..."
        );
    }

    #[test]
    fn test_truncate_id_edge_cases() {
        assert_eq!(truncate_id("abcdef", 3), "...");
        assert_eq!(truncate_id("", 10), "");
    }

    #[test]
    fn test_action_symbol_text() {
        assert!(action_symbol(Action::Create).to_string().contains('+'));
        assert!(action_symbol(Action::Delete).to_string().contains('-'));
    }
}
