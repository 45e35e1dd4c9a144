//! Turns a line of terminal input into a [`Command`].

use mahjong_core::{Command, InputError};

/// Parse one line. Keywords are case-insensitive; a bare number is a
/// discard.
pub fn parse_command(line: &str) -> Result<Command, InputError> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Err(InputError::Parse(String::new()));
    };
    let keyword = first.to_ascii_lowercase();
    let args: Vec<&str> = words.collect();
    let bad = || InputError::Parse(line.trim().to_string());

    let command = match keyword.as_str() {
        "discard" | "d" => match args.as_slice() {
            [position] => Command::Discard(position_arg(position).ok_or_else(bad)?),
            _ => return Err(bad()),
        },
        "chow" => match args.as_slice() {
            [first, second] => Command::Chow(
                position_arg(first).ok_or_else(bad)?,
                position_arg(second).ok_or_else(bad)?,
            ),
            _ => return Err(bad()),
        },
        _ if !args.is_empty() => return Err(bad()),
        "continue" | "pass" | "c" => Command::Continue,
        "pung" => Command::Pung,
        "kong" => Command::Kong,
        "mahjong" | "win" => Command::Mahjong,
        "quit" | "exit" => Command::Quit,
        "restart" => Command::Restart,
        "help" | "?" => Command::Help,
        "played" | "table" => Command::Played,
        number => Command::Discard(position_arg(number).ok_or_else(bad)?),
    };
    Ok(command)
}

fn position_arg(text: &str) -> Option<usize> {
    text.parse().ok()
}
