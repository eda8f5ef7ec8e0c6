use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Error};
use tempfile::NamedTempFile;

pub const STDIN_STDOUT: &str = "-";

/// Where rendered text goes.
///
/// Files are written to a temporary sibling and only replace the target on
/// [`commit`](Output::commit), so a failed run never leaves a partial file.
pub struct Output {
    temp: Option<(PathBuf, NamedTempFile)>,
}

impl Output {
    pub fn new(filename: &Path) -> Result<Output, Error> {
        if filename == Path::new(STDIN_STDOUT) {
            return Ok(Output { temp: None });
        }
        let filename = std::env::current_dir()?.join(filename);
        let dir = filename
            .parent()
            .ok_or_else(|| anyhow!("cannot write to root"))?;
        let temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("unable to create output in '{}'", dir.display()))?;
        tracing::debug!(path = %filename.display(), "writing output through temporary file");
        Ok(Output {
            temp: Some((filename, temp)),
        })
    }

    /// Writes a piece of text, optionally followed by a newline.
    pub fn write_text(&mut self, text: &str, newline: bool) -> Result<(), Error> {
        self.write_all(text.as_bytes())?;
        if newline {
            self.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn commit(&mut self) -> Result<(), Error> {
        self.flush()?;
        if let Some((filename, temp)) = self.temp.take() {
            temp.persist(&filename)
                .with_context(|| format!("unable to write '{}'", filename.display()))?;
        }
        Ok(())
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.temp {
            Some((_, ref mut out)) => out.write(buf),
            None => io::stdout().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.temp {
            Some((_, ref mut out)) => out.flush(),
            None => io::stdout().flush(),
        }
    }
}
