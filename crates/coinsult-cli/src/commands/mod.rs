//! Slash commands for interactive mode

/// Result of executing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Start a new conversation thread
    NewThread,
    /// Show the current thread id
    ShowThread,
    /// Show a message to the user (not sent to the agent)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let command = rest.split_whitespace().next().unwrap_or("").to_lowercase();

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "new" | "n" | "clear" => CommandResult::NewThread,

        "thread" | "t" => CommandResult::ShowThread,

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /new, /n             Start a new conversation (new thread id)
  /thread, /t          Show the current thread id
  /quit, /exit, /q     Exit coinsult

Ask anything about crypto, for example:
  How much is Bitcoin?
  Any news about Ethereum?
  Should I buy SOL right now?"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(execute_command("what is the price of btc?"), None);
        assert_eq!(execute_command("  "), None);
    }

    #[test]
    fn test_commands_and_aliases() {
        assert_eq!(execute_command("/new"), Some(CommandResult::NewThread));
        assert_eq!(execute_command("  /N  "), Some(CommandResult::NewThread));
        assert_eq!(execute_command("/thread"), Some(CommandResult::ShowThread));
        assert_eq!(execute_command("/q"), Some(CommandResult::Exit));
        assert_eq!(execute_command("/exit now"), Some(CommandResult::Exit));
        assert!(matches!(execute_command("/?"), Some(CommandResult::Message(m)) if m.contains("/thread")));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            execute_command("/model gpt"),
            Some(CommandResult::Unknown("model".into()))
        );
        assert_eq!(execute_command("/"), Some(CommandResult::Unknown(String::new())));
    }
}
