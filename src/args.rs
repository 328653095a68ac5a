use std::{net::IpAddr, path::PathBuf};

use clap::Parser;

/// Default ceiling for in-memory upload buffering (100 MiB)
pub const DEFAULT_MAX_MEMORY_SIZE: usize = 100 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "rootserve", author, about, version)]
pub struct CliArgs {
    /// Be verbose, includes emitting debug logs
    #[arg(short = 'v', long = "verbose", env = "ROOTSERVE_VERBOSE")]
    pub verbose: bool,

    /// Directory to serve; all operations stay inside it
    ///
    /// Defaults to the current working directory.
    #[arg(short = 'd', long = "dir", value_hint = clap::ValueHint::DirPath, env = "ROOTSERVE_DIR")]
    pub dir: Option<PathBuf>,

    /// Address to listen on
    #[arg(long = "host", default_value = "0.0.0.0", env = "ROOTSERVE_HOST")]
    pub host: IpAddr,

    /// Port to listen on, 0 picks a free port
    #[arg(
        short = 'p',
        long = "port",
        default_value = "9527",
        value_parser = parse_port,
        env = "ROOTSERVE_PORT"
    )]
    pub port: u16,

    /// Upload bytes held in memory before spooling to disk (e.g. 100M, 512K)
    ///
    /// Also caps the size of JSON and form request bodies.
    #[arg(
        long = "max-memory-size",
        default_value = "100M",
        value_parser = parse_size,
        env = "ROOTSERVE_MAX_MEMORY_SIZE"
    )]
    pub max_memory_size: usize,
}

/// Accepts `9527` as well as `:9527`.
fn parse_port(src: &str) -> Result<u16, String> {
    src.trim()
        .trim_start_matches(':')
        .parse()
        .map_err(|e| format!("Invalid port '{src}': {e}"))
}

/// Parses sizes like `100`, `10K`, `5MB` or `1g` into bytes, using powers of 1024.
pub fn parse_size(src: &str) -> Result<usize, String> {
    let src = src.trim();
    let upper = src.to_ascii_uppercase();
    let digits_end = upper
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(upper.len());
    let (number, unit) = upper.split_at(digits_end);

    if number.is_empty() {
        return Err(format!("Invalid size '{src}': missing number"));
    }
    let number: usize = number
        .parse()
        .map_err(|e| format!("Invalid size '{src}': {e}"))?;

    let multiplier: usize = match unit.trim() {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        other => return Err(format!("Invalid size '{src}': unknown unit '{other}'")),
    };

    number
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Invalid size '{src}': too large"))
}
