//! `srb2kfile`: list, read and render the contents of SRB2Kart packages.

mod cli;
mod config;

use cli::*;
use log::{info, warn};
use regex::Regex;
use simplelog::TermLogger;
use srb2kfile::{Container, ResourceContainer, open_file};
use std::error::Error;
use std::io::{self, Write};
use std::path::Path;

use crate::config::UserConfig;

const BASE_DIR: &str = "srb2kfile/";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut options: CLIOptions = argh::from_env();

    let mut user_config = match UserConfig::load() {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Couldn't load the user config: {}", e);
            None
        }
    };
    if let Some(config) = user_config.as_mut() {
        config.sync_cli(&mut options);
    }

    TermLogger::init(
        options.verbose.unwrap_or(log::LevelFilter::Warn),
        simplelog::ConfigBuilder::default()
            .set_time_level(log::LevelFilter::Trace)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    if let Some(config) = user_config {
        if let Err(e) = config.write() {
            warn!("Could not write config: {}", e);
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &options.command {
        Command::Ls(cmd) => {
            let container = open_file(&cmd.file).await?;
            list_files(&container, cmd.pattern.as_deref(), &mut out)?;
        }
        Command::Text(cmd) => {
            let container = open_file(&cmd.file).await?;
            let text = container.text(&cmd.entry).await?;
            out.write_all(text.as_bytes())?;
        }
        Command::Socs(cmd) => {
            let container = open_file(&cmd.file).await?;
            let soc = container.all_socs().await?;
            print_socs(&soc, cmd.kind.as_deref(), cmd.name.as_deref(), &mut out)?;
        }
        Command::Image(cmd) => {
            let mut container = open_file(&cmd.file).await?;
            if !options.base.is_empty() {
                container.set_base_file(Path::new(&options.base)).await?;
            }
            write_png(&container, &cmd.entry, Path::new(&cmd.out)).await?;
            info!("Wrote {} to {}", cmd.entry, cmd.out);
        }
    }
    Ok(())
}

fn list_files(
    container: &Container,
    pattern: Option<&str>,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let root = container.directory().root();
    match pattern {
        Some(pattern) => {
            let re = Regex::new(pattern)?;
            for node in root.search(&re).filter(|n| n.is_file()) {
                writeln!(out, "{}", node.full_path())?;
            }
        }
        None => {
            for node in root.all_files() {
                writeln!(out, "{}", node.full_path())?;
            }
        }
    }
    Ok(())
}

fn print_socs(
    soc: &soc::Soc,
    kind: Option<&str>,
    name: Option<&str>,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    match (kind, name) {
        (None, None) => write!(out, "{}", soc)?,
        (Some(kind), None) => {
            let mut blocks = soc.blocks(kind).peekable();
            if blocks.peek().is_none() {
                let kinds: Vec<&str> = soc.kinds().collect();
                return Err(format!("no {} blocks, found: {}", kind, kinds.join(", ")).into());
            }
            for (name, props) in blocks {
                write_block(out, kind, name, props)?;
            }
        }
        (Some(kind), Some(name)) => {
            let props = if kind.eq_ignore_ascii_case("level") {
                soc.level(name)
            } else {
                soc.block(kind, name)
            };
            let props = props.ok_or_else(|| format!("no {} block named {}", kind, name))?;
            write_block(out, kind, name, props)?;
        }
        (None, Some(_)) => return Err("--name needs --kind".into()),
    }
    Ok(())
}

fn write_block(
    out: &mut impl Write,
    kind: &str,
    name: &str,
    props: &soc::Properties,
) -> io::Result<()> {
    writeln!(
        out,
        "{} {}",
        kind.to_ascii_uppercase(),
        name.to_ascii_uppercase()
    )?;
    for (key, value) in props {
        writeln!(out, "{} = {}", key, value)?;
    }
    writeln!(out)
}

async fn write_png(container: &Container, entry: &str, out: &Path) -> Result<(), Box<dyn Error>> {
    let picture = container.image(entry).await?;
    let buffer = image::RgbaImage::from_raw(
        picture.width as u32,
        picture.height as u32,
        picture.pixels,
    )
    .ok_or("picture buffer doesn't match its size")?;
    buffer.save_with_format(out, image::ImageFormat::Png)?;
    Ok(())
}
