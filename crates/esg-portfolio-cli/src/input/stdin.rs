use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Whatever was piped on stdin, or `None` for a terminal or empty input.
pub fn read_piped() -> Result<Option<String>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    if buffer.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(buffer))
}

/// Typed JSON document piped on stdin.
pub fn read_stdin_json<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    match read_piped()? {
        Some(text) => {
            let value: T = serde_json::from_str(text.trim())
                .map_err(|e| format!("Failed to parse stdin: {}", e))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
