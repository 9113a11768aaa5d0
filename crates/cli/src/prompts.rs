use anyhow::{Result, bail};
use std::io::{self, IsTerminal, Write};

/// Ask a yes/no question on stderr; `force` answers yes without asking.
///
/// Refuses to guess in CI or when piped, where nobody can answer.
pub fn confirm(question: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Refusing to prompt without a terminal. Pass --force to confirm.");
  }

  let mut stderr = io::stderr().lock();
  write!(stderr, "{} [y/N] ", question)?;
  stderr.flush()?;
  drop(stderr);

  let mut answer = String::new();
  io::stdin().read_line(&mut answer)?;

  Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
