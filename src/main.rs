//! gdbmi-dump
//!
//! Reads GDB/MI output lines from stdin and prints each parsed record as
//! JSON on stdout, one document per input line. Useful for inspecting what
//! a debugger front-end would see:
//!
//! ```text
//! gdb --interpreter=mi2 ./target 2>/dev/null | gdbmi-dump
//! ```

use anyhow::Result;
use gdbmi::MiParser;
use std::io::{BufRead, Write};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Diagnostics go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let parser = MiParser::new();

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line?;
        debug!("line: {}", line);
        let record = parser.parse_line(&line);
        serde_json::to_writer_pretty(&mut stdout, &record)?;
        writeln!(stdout)?;
    }

    Ok(())
}
