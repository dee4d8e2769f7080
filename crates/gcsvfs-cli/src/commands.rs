//! Subcommand handlers

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gcsvfs::{parse_size, Config, FileOpener, FileSystem, GcsFileSystem, OpenFlags, VfsError};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Options for [`cat`]
#[derive(Debug)]
pub struct CatOptions {
    pub offset: u64,
    pub length: Option<u64>,
    pub direct_io: bool,
    pub output: Option<PathBuf>,
    pub chunk: usize,
}

#[derive(Debug, Serialize)]
struct ObjectStat<'a> {
    path: &'a str,
    bucket: &'a str,
    key: &'a str,
    size: u64,
    last_modified: DateTime<Utc>,
}

/// Effective configuration: the explicit file, else the default file if it
/// exists, else defaults. `--buffer-size` is applied last.
pub fn load_config(path: Option<&Path>, buffer_size: Option<&str>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => match Config::config_path() {
            Ok(default_path) if default_path.exists() => Config::load_from(&default_path)?,
            _ => Config::default(),
        },
    };

    if let Some(size) = buffer_size {
        config.read.buffer_size = parse_size(size)? as usize;
        config.read.validate()?;
    }

    debug!("Effective read options: {:?}", config.read);
    Ok(config)
}

pub fn cat(config: &Config, url: &str, options: CatOptions) -> Result<()> {
    let opener: &dyn FileOpener = config;
    let mut flags = OpenFlags::READ;
    if options.direct_io {
        flags |= OpenFlags::DIRECT_IO;
    }

    let mut handle = GcsFileSystem::default().open(url, flags, Some(opener))?;
    let size = handle.length();

    let end = match options.length {
        Some(length) => options.offset.checked_add(length),
        None => Some(size),
    }
    .filter(|end| options.offset <= size && *end <= size)
    .ok_or_else(|| {
        VfsError::PreconditionViolation(format!(
            "offset {} length {:?} is outside object of {} bytes",
            options.offset, options.length, size
        ))
    })?;

    let mut out: Box<dyn Write> = match &options.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let mut buf = vec![0u8; options.chunk.max(1)];
    let mut position = options.offset;
    while position < end {
        let n = (end - position).min(buf.len() as u64) as usize;
        handle.read_at(&mut buf[..n], position)?;
        out.write_all(&buf[..n])?;
        position += n as u64;
    }
    out.flush()?;
    handle.close();

    info!("Read {} bytes from {}", end - options.offset, url);
    Ok(())
}

pub fn stat(config: &Config, url: &str, json: bool) -> Result<()> {
    let opener: &dyn FileOpener = config;
    let handle = GcsFileSystem::default().open(url, OpenFlags::READ, Some(opener))?;

    let stat = ObjectStat {
        path: handle.path(),
        bucket: handle.bucket(),
        key: handle.key(),
        size: handle.length(),
        last_modified: handle.last_modified(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stat)?);
    } else {
        println!("Path:          {}", stat.path);
        println!("Bucket:        {}", stat.bucket);
        println!("Key:           {}", stat.key);
        println!("Size:          {} bytes", stat.size);
        println!("Last modified: {}", stat.last_modified.to_rfc3339());
    }
    Ok(())
}

pub fn exists(config: &Config, url: &str) -> Result<()> {
    let opener: &dyn FileOpener = config;
    let exists = GcsFileSystem::default().file_exists(url, Some(opener));
    println!("{}", exists);
    Ok(())
}

pub fn config(
    path: Option<&Path>,
    buffer_size: Option<&str>,
    show: bool,
    show_path: bool,
    init: bool,
) -> Result<()> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };

    if show {
        let config = load_config(path, buffer_size)?;
        println!("{}", toml::to_string_pretty(&config)?);
    } else if show_path {
        println!("{}", config_path.display());
    } else if init {
        if config_path.exists() {
            info!("Configuration already exists at {}", config_path.display());
            return Ok(());
        }
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, Config::default_config_content())?;
        info!("Wrote {}", config_path.display());
    } else {
        eprintln!("Please specify --show, --path, or --init");
    }
    Ok(())
}
