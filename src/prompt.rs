//! Interactive confirmation, behind a trait so destructive operations
//! are testable without a terminal.

use std::io::{BufRead, Write};

/// A yes/no question put to the user before a destructive action.
pub trait Confirm {
    fn ask_yes_no(&self, message: &str) -> bool;
}

/// Asks on stdout, reads the answer from stdin. Defaults to no: an empty
/// line or EOF declines.
pub struct TerminalPrompt;

impl Confirm for TerminalPrompt {
    fn ask_yes_no(&self, message: &str) -> bool {
        let stdin = std::io::stdin();
        loop {
            print!("{} [y/N] ", message);
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return false,
                Ok(_) => {}
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return true,
                "" | "n" | "no" => return false,
                _ => println!("Please answer y or n."),
            }
        }
    }
}
