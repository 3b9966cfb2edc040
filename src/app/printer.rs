use chrono::Local;
use std::io::Write;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// Local output for records that meet the print threshold.
#[cfg_attr(test, automock)]
pub trait LinePrinter: Send + Sync + 'static {
    fn print_line(&self, line: &str);
}

impl<T: LinePrinter + ?Sized> LinePrinter for Arc<T> {
    fn print_line(&self, line: &str) {
        (**self).print_line(line);
    }
}

/// Writes `YYYY/MM/DD HH:MM:SS <line>` to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrPrinter;

impl LinePrinter for StderrPrinter {
    fn print_line(&self, line: &str) {
        let stamp = Local::now().format("%Y/%m/%d %H:%M:%S");
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{stamp} {line}");
    }
}
