//! Interactive command loop

use crate::config::GalleryConfig;
use crate::{execute, Commands};
use anyhow::Result;
use clap::Parser;
use gallery_core::GalleryError;
use gallery_ingest::Gallery;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const PROMPT: &str = "gallery> ";

#[derive(Parser)]
#[command(name = "gallery", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

/// Read commands from stdin until EOF, `exit` or `quit`.
///
/// Errors are printed and the loop continues, except for fatal ones.
pub async fn run(gallery: &Gallery, config: &GalleryConfig) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!(
        "{} asset(s) loaded. Type 'help' for commands, 'exit' to quit.",
        gallery.len()
    );

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "exit" | "quit" => break,
            _ => run_line(gallery, config, line).await?,
        }
        prompt()?;
    }

    Ok(())
}

async fn run_line(gallery: &Gallery, config: &GalleryConfig, line: &str) -> Result<()> {
    let args = match split_args(line) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(());
        }
    };

    let parsed = match ShellLine::try_parse_from(args) {
        Ok(parsed) => parsed,
        Err(e) => {
            e.print()?;
            return Ok(());
        }
    };

    if let Err(e) = execute(gallery, config, parsed.command).await {
        let fatal = e
            .downcast_ref::<GalleryError>()
            .is_some_and(GalleryError::is_fatal);
        if fatal {
            return Err(e);
        }
        eprintln!("Error: {:#}", e);
    }
    Ok(())
}

fn prompt() -> Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(PROMPT.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Split a command line into arguments, honoring single and double quotes
fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_arg = true;
            }
            None if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            None => {
                current.push(c);
                in_arg = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("unterminated {} quote", q));
    }
    if in_arg {
        args.push(current);
    }
    Ok(args)
}
