/// One line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Invite,
    Code(String),
    Kick(String),
    Peers,
    Quit,
    Chat(String),
    Empty,
    Unknown(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Chat(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match (name, arg) {
        ("invite", _) => Input::Invite,
        ("peers", _) => Input::Peers,
        ("quit" | "exit", _) => Input::Quit,
        // codes wrap when pasted, whitespace is stripped by the codec
        ("code", code) if !code.is_empty() => Input::Code(code.to_string()),
        ("kick", peer) if !peer.is_empty() => Input::Kick(peer.to_string()),
        _ => Input::Unknown(line.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(parse_input("  hi there "), Input::Chat("hi there".into()));
        assert_eq!(parse_input("   "), Input::Empty);
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(parse_input("/code abc def"), Input::Code("abc def".into()));
        assert_eq!(parse_input("/kick 0a1b2c"), Input::Kick("0a1b2c".into()));
        assert_eq!(parse_input("/invite"), Input::Invite);
        assert_eq!(parse_input("/quit"), Input::Quit);
    }

    #[test]
    fn missing_arguments_are_unknown() {
        assert_eq!(parse_input("/code"), Input::Unknown("/code".into()));
        assert_eq!(parse_input("/dance"), Input::Unknown("/dance".into()));
    }
}
