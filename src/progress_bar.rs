use std::fmt::Write;
use std::io::{self, stdout};
use std::time::Instant;
use crossterm::cursor::{MoveToColumn, MoveToPreviousLine};
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};

/// Two-line terminal progress display: speed and sizes, then a bar.
pub struct ProgressBar {
    bar_buf: String,
    buf: String,
    start_instant: Instant,
    bar_width: usize,
    started: bool,
}

impl ProgressBar {
    pub fn new(max_width: usize) -> Self {
        Self {
            buf: String::new(),
            bar_buf: String::new(),
            start_instant: Instant::now(),
            bar_width: crossterm::terminal::size().ok()
                .map(|(cols, _rows)| usize::from(cols))
                .unwrap_or(max_width)
                .min(max_width),
            started: false,
        }
    }

    fn update(&mut self, downloaded_len: u64, total_len: u64) -> Result<&str, std::fmt::Error> {
        let progress = if total_len == 0 { 100 } else { (downloaded_len * 100 / total_len) as usize };
        let duration = self.start_instant.elapsed();
        let speed = match duration.as_secs_f64() {
            secs if secs > 0.0 => (downloaded_len as f64 / secs) as u64,
            _ => 0,
        };

        let (downloaded_len_size, downloaded_len_unit) = byte_unit(downloaded_len);
        let (total_len_size, total_len_unit) = byte_unit(total_len);
        let (speed_size, speed_unit) = byte_unit(speed);

        self.bar_buf.clear();
        self.buf.clear();
        write!(self.bar_buf, "{speed_size:.2} {speed_unit}/s - {progress} % - elapsed: {duration:.2?} ")?;
        write!(self.buf, "{downloaded_len_size:.2} {downloaded_len_unit} / {total_len_size:.2} {total_len_unit}")?;
        let padding = self.bar_width.saturating_sub(self.bar_buf.len() + self.buf.len());
        self.bar_buf.extend(std::iter::repeat(' ').take(padding));
        writeln!(self.bar_buf, "{}", self.buf)?;

        let bar_p_width = self.bar_width.saturating_sub(2);
        let progress_width = progress.min(100) * bar_p_width / 100;
        self.bar_buf.push('[');
        self.bar_buf.extend(std::iter::repeat('█').take(progress_width));
        self.bar_buf.extend(std::iter::repeat(' ').take(bar_p_width - progress_width));
        self.bar_buf.push(']');

        Ok(&self.bar_buf)
    }

    pub fn print(&mut self, downloaded_len: u64, total_len: u64) -> io::Result<()> {
        // the first frame has no previous lines to overwrite
        if !self.started {
            self.started = true;
            println!();
        }

        let frame = self.update(downloaded_len, total_len)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
            .to_owned();
        execute!(
            stdout(),
            Clear(ClearType::CurrentLine),
            MoveToPreviousLine(1),
            Clear(ClearType::CurrentLine),
            MoveToColumn(0),
            crossterm::style::Print(frame),
        )
    }
}

fn byte_unit(bytes_count: u64) -> (f32, &'static str) {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    let mut i = 0;
    let mut bytes_count = bytes_count as f32;
    while bytes_count >= 1024.0 && i < UNITS.len() - 1 {
        i += 1;
        bytes_count /= 1024.0;
    }
    (bytes_count, UNITS[i])
}
