//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.  Status lines go to stderr
//! so command output (tokens, exports) stays pipeable.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::Vault;

/// Ciphertext characters shown in `secrets list`.
const PREVIEW_LEN: usize = 24;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    eprintln!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    eprintln!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    eprintln!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of secret names with a short ciphertext preview.
pub fn print_secrets_table(vault: &Vault) {
    if vault.secret_count() == 0 {
        info("No secrets in this vault yet.");
        tip("Run `kmsvault secrets add KEY=VALUE` to add your first secret.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Ciphertext"]);

    for name in vault.secret_names() {
        let ciphertext = &vault.secrets()[name];
        table.add_row(vec![name.to_string(), preview(ciphertext)]);
    }

    println!("{table}");
}

fn preview(ciphertext: &str) -> String {
    match ciphertext.char_indices().nth(PREVIEW_LEN) {
        Some((cut, _)) => format!("{}...", &ciphertext[..cut]),
        None => ciphertext.to_string(),
    }
}
