//! `depot shell`: interactive session over one long-lived client.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use console::{Term, style};
use tokio::io::{AsyncBufReadExt, BufReader};

use depot_core::storage::StorageClient;

use super::Context;
use super::single::{delete_with, upload_with, url_with};
use crate::discovery::{list_dir, wildcard_to_regex};
use crate::format::format_size;

const PROMPT: &str = "depot> ";

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Upload(String),
    Delete(String),
    Url(String),
    List(Option<String>),
    Cd(Option<String>),
    Pwd,
    History,
    Clear,
    Quit,
    /// Known command missing its argument.
    Usage(&'static str),
    Unknown(String),
}

impl ShellCommand {
    /// Parse a line; `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let cmd = words.next()?;
        let arg = words.next().map(ToString::to_string);

        Some(match cmd {
            "help" | "h" => Self::Help,
            "upload" | "up" => arg.map_or(Self::Usage("upload <file>"), Self::Upload),
            "delete" | "del" | "rm" => arg.map_or(Self::Usage("delete <key>"), Self::Delete),
            "url" | "geturl" => arg.map_or(Self::Usage("url <key>"), Self::Url),
            "ls" | "list" => Self::List(arg),
            "cd" => Self::Cd(arg),
            "pwd" => Self::Pwd,
            "history" => Self::History,
            "clear" => Self::Clear,
            "quit" | "exit" | "q" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        })
    }
}

/// Run the shell until `quit` or end of input.
pub async fn shell(ctx: &Context) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot read current directory")?;
    let mut session = Session::new(ctx.client()?, cwd);
    session.banner();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{PROMPT}");
        std::io::stdout().flush().context("failed to write prompt")?;

        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            println!();
            return Ok(());
        };
        if session.run_line(&line).await {
            println!("Bye!");
            return Ok(());
        }
    }
}

/// Shell state: the client, a working directory and the command history.
struct Session {
    client: StorageClient,
    cwd: PathBuf,
    history: Vec<String>,
}

impl Session {
    fn new(client: StorageClient, cwd: PathBuf) -> Self {
        Self {
            client,
            cwd,
            history: Vec::new(),
        }
    }

    fn banner(&self) {
        println!(
            "{} {} ({} backend)",
            style("depot shell").cyan().bold(),
            env!("CARGO_PKG_VERSION"),
            self.client.backend().name()
        );
        println!("Type 'help' for commands, 'quit' to exit");
        println!("Working directory: {}", self.cwd.display());
        println!();
    }

    /// Record and run one line. Returns true when the session should end.
    async fn run_line(&mut self, line: &str) -> bool {
        let Some(command) = ShellCommand::parse(line) else {
            return false;
        };
        self.history.push(line.trim().to_string());

        if command == ShellCommand::Quit {
            return true;
        }
        if let Err(e) = self.execute(command).await {
            println!("{} {e:#}", style("error:").red().bold());
        }
        false
    }

    async fn execute(&mut self, command: ShellCommand) -> Result<()> {
        match command {
            ShellCommand::Help => print_help(),
            ShellCommand::Upload(file) => {
                upload_with(&self.client, &self.cwd.join(file), true).await?;
            }
            ShellCommand::Delete(key) => delete_with(&self.client, &key).await?,
            ShellCommand::Url(key) => url_with(&self.client, &key, false)?,
            ShellCommand::List(pattern) => self.list(pattern.as_deref().unwrap_or("*"))?,
            ShellCommand::Cd(dir) => {
                self.cwd = resolve_dir(&self.cwd, dir.as_deref())?;
                println!("{}", self.cwd.display());
            }
            ShellCommand::Pwd => println!("{}", self.cwd.display()),
            ShellCommand::History => {
                for (i, line) in self.history.iter().enumerate() {
                    println!("  {:>3}  {line}", i + 1);
                }
            }
            ShellCommand::Clear => {
                Term::stdout().clear_screen()?;
                self.banner();
            }
            ShellCommand::Usage(usage) => println!("usage: {usage}"),
            ShellCommand::Unknown(cmd) => {
                println!("unknown command '{cmd}', type 'help' for a list");
            }
            ShellCommand::Quit => {}
        }
        Ok(())
    }

    fn list(&self, pattern: &str) -> Result<()> {
        let entries = list_dir(&self.cwd, &wildcard_to_regex(pattern)?)?;
        if entries.is_empty() {
            println!("No entries matching '{pattern}'");
            return Ok(());
        }
        for entry in entries {
            match entry.size {
                None => println!("  {}/", style(&entry.name).blue()),
                Some(size) => println!("  {:<30} {:>12}", entry.name, format_size(size)),
            }
        }
        Ok(())
    }
}

fn print_help() {
    println!("Files:");
    println!("  upload|up <file>       upload a file");
    println!("  delete|del|rm <key>    delete an object");
    println!("  url|geturl <key>       print the public URL of a key");
    println!("Directories:");
    println!("  ls|list [pattern]      list the working directory");
    println!("  cd [dir]               change directory (home when omitted)");
    println!("  pwd                    print the working directory");
    println!("Other:");
    println!("  history                show command history");
    println!("  clear                  clear the screen");
    println!("  help|h                 show this help");
    println!("  quit|exit|q            leave the shell");
}

/// Target of `cd` relative to `cwd`; home for `None` or `~`.
fn resolve_dir(cwd: &Path, target: Option<&str>) -> Result<PathBuf> {
    let path = match target {
        None | Some("~") => dirs::home_dir().context("cannot resolve home directory")?,
        Some(dir) => match dir.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .context("cannot resolve home directory")?
                .join(rest),
            None => cwd.join(dir),
        },
    };

    let path = path
        .canonicalize()
        .with_context(|| format!("no such directory: {}", path.display()))?;
    if !path.is_dir() {
        bail!("not a directory: {}", path.display());
    }
    Ok(path)
}
