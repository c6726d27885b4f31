//! CLI utilities for the interactive client.
use std::io::{self, BufRead, Write};

/// Prompt the user for one line of input.
///
/// Returns `None` once the reader is exhausted. The trailing line break is
/// stripped; everything else is passed through untouched.
pub fn prompt<R, W>(mut reader: R, mut writer: W, message: &str) -> io::Result<Option<String>>
where
    R: BufRead,
    W: Write,
{
    write!(&mut writer, "{message}")?;
    writer.flush()?;

    let mut s = String::default();
    if reader.read_line(&mut s)? == 0 {
        return Ok(None);
    }

    Ok(Some(s.trim_end_matches(['\r', '\n']).to_string()))
}
