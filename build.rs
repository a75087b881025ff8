use clap::CommandFactory;
use clap_complete::{Generator, Shell};
use clap_mangen::Man;
use std::path::{Path, PathBuf};

// CLI definition shared with the library crate
include!("src/cli/app.rs");

const BIN_NAME: &str = "djitxt";

fn render_man(cmd: clap::Command, path: &Path) -> std::io::Result<()> {
    let mut buf = Vec::new();
    Man::new(cmd).render(&mut buf)?;
    std::fs::write(path, buf)
}

fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=src/cli/app.rs");

    let out_dir =
        PathBuf::from(std::env::var("OUT_DIR").unwrap_or_else(|_| "target/man".to_string()));

    // djitxt.1 plus djitxt-<subcommand>.1
    let man_dir = out_dir.join("man");
    std::fs::create_dir_all(&man_dir)?;
    let cmd = Cli::command();
    render_man(cmd.clone(), &man_dir.join(format!("{}.1", BIN_NAME)))?;
    for sub in cmd.get_subcommands() {
        let page = man_dir.join(format!("{}-{}.1", BIN_NAME, sub.get_name()));
        render_man(sub.clone(), &page)?;
    }

    let completions_dir = out_dir.join("completions");
    std::fs::create_dir_all(&completions_dir)?;
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell] {
        let mut cmd = Cli::command();
        let mut buf = Vec::new();
        clap_complete::generate(shell, &mut cmd, BIN_NAME, &mut buf);
        std::fs::write(completions_dir.join(shell.file_name(BIN_NAME)), buf)?;
    }

    Ok(())
}
