use std::io::{self, Write};

/// Writes `text` to stdout. A reader that closed the pipe early (`adpulse ... | head`)
/// is not an error.
pub fn write_stdout_text(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    ignore_broken_pipe(stdout.write_all(text.as_bytes()))?;
    ignore_broken_pipe(stdout.flush())
}

pub fn write_stdout_line(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    ignore_broken_pipe(stdout.write_all(text.as_bytes()))?;
    ignore_broken_pipe(stdout.write_all(b"\n"))?;
    ignore_broken_pipe(stdout.flush())
}

fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
