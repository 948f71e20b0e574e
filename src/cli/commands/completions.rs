//! `kmsvault completions <shell>`: print a completion script.
//!
//! ```text
//! kmsvault completions bash > ~/.local/share/bash-completion/completions/kmsvault
//! kmsvault completions zsh > "${fpath[1]}/_kmsvault"
//! ```

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::Result;

/// Execute the `completions` command.
pub fn execute(shell: Shell) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_completions(shell, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Render the completion script for `shell` into `out`.
pub fn write_completions(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    let mut script = Vec::new();
    generate(shell, &mut cmd, bin, &mut script);
    out.write_all(&script)?;
    Ok(())
}
