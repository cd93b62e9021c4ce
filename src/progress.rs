use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// Console log writer that shares the terminal with the stage spinner.
///
/// While a spinner is active every log line is written with the spinner
/// suspended, so the spinner is redrawn below the line instead of through it.
#[derive(Clone, Default)]
pub struct ConsoleWriter {
    active: Arc<Mutex<Option<ProgressBar>>>,
}

impl ConsoleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the stage spinner and route console logging around it
    pub fn start_spinner(&self) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(120));

        self.attach(spinner.clone());
        spinner
    }

    /// Clear the spinner from the terminal and write logs directly again
    pub fn finish_spinner(&self) {
        if let Some(spinner) = self.slot().take() {
            spinner.finish_and_clear();
        }
    }

    pub fn has_spinner(&self) -> bool {
        self.slot().is_some()
    }

    fn attach(&self, spinner: ProgressBar) {
        if let Some(previous) = self.slot().replace(spinner) {
            previous.finish_and_clear();
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        // A panic while logging must not silence the console
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let spinner = self.slot().clone();
        match spinner {
            Some(spinner) => spinner.suspend(|| io::stderr().write_all(buf))?,
            None => io::stderr().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_lifecycle() {
        let writer = ConsoleWriter::new();
        assert!(!writer.has_spinner());

        writer.attach(ProgressBar::hidden());
        assert!(writer.has_spinner());

        writer.finish_spinner();
        assert!(!writer.has_spinner());

        // Finishing twice is harmless
        writer.finish_spinner();
        assert!(!writer.has_spinner());
    }

    #[test]
    fn test_clones_share_the_spinner() {
        let writer = ConsoleWriter::new();
        let handle = writer.make_writer();

        writer.attach(ProgressBar::hidden());
        assert!(handle.has_spinner());

        handle.finish_spinner();
        assert!(!writer.has_spinner());
    }

    #[test]
    fn test_writes_whole_lines_with_and_without_spinner() {
        let writer = ConsoleWriter::new();
        let line = b"INFO Extracting audio\n";

        assert_eq!(writer.make_writer().write(line).unwrap(), line.len());

        let spinner = ProgressBar::hidden();
        writer.attach(spinner.clone());
        spinner.set_message("transcribing");
        assert_eq!(writer.make_writer().write(line).unwrap(), line.len());
        assert_eq!(spinner.message(), "transcribing");
        writer.finish_spinner();
    }

    #[test]
    fn test_recovers_from_poisoned_lock() {
        let writer = ConsoleWriter::new();
        let poisoner = writer.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.active.lock().unwrap();
            panic!("poison");
        })
        .join();

        writer.attach(ProgressBar::hidden());
        assert!(writer.has_spinner());
        assert_eq!(writer.make_writer().write(b"x\n").unwrap(), 2);
    }
}
