use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use nu_ansi_term::{Color, Style};
use std::fmt::Display;
use std::io::IsTerminal;
use std::time::{Duration, Instant};

/// When to color text output.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Theme {
    /// Color when stdout is a terminal.
    Auto,
    /// Always color.
    Color,
    /// Never color.
    Plain,
}

#[derive(Clone, Copy)]
enum Level {
    Info,
    Success,
    Warn,
    Error,
}

impl Level {
    fn icon(self) -> &'static str {
        match self {
            Level::Info => "ℹ",
            Level::Success => "✔",
            Level::Warn => "⚠",
            Level::Error => "✖",
        }
    }

    fn style(self) -> Style {
        match self {
            Level::Info => Style::new().fg(Color::LightCyan),
            Level::Success => Style::new().fg(Color::LightGreen).bold(),
            Level::Warn => Style::new().fg(Color::Yellow).bold(),
            Level::Error => Style::new().fg(Color::LightRed).bold(),
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Level::Warn | Level::Error)
    }
}

/// Human-facing output for the text format. Status lines for warnings and
/// errors go to stderr; everything else goes to stdout.
pub struct Ui {
    color: bool,
    quiet: bool,
}

impl Ui {
    pub fn new(theme: Theme, quiet: bool) -> Self {
        let color = !quiet
            && match theme {
                Theme::Plain => false,
                Theme::Color => true,
                Theme::Auto => std::io::stdout().is_terminal(),
            };

        #[cfg(windows)]
        if color {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        Self { color, quiet }
    }

    /// Prints a titled block of aligned `key: value` rows.
    pub fn section<'a, I, V>(&self, title: &str, rows: I)
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Display,
    {
        let rows: Vec<(&str, String)> = rows
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        if rows.is_empty() {
            return;
        }
        self.heading(title);
        let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        let key_style = Style::new().fg(Color::LightBlue).bold();
        for (key, value) in rows {
            let key = format!("{key:>width$}:");
            println!("  {} {value}", self.paint(key_style, &key));
        }
    }

    pub fn list<I>(&self, title: &str, entries: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut entries = entries.into_iter().peekable();
        if entries.peek().is_none() {
            return;
        }
        self.heading(title);
        for entry in entries {
            println!("  - {entry}");
        }
    }

    pub fn info(&self, message: &str) {
        self.status(Level::Info, message);
    }

    pub fn success(&self, message: &str) {
        self.status(Level::Success, message);
    }

    pub fn warn(&self, message: &str) {
        self.status(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.status(Level::Error, message);
    }

    /// Starts a timed task. A spinner is drawn on interactive stderr only.
    pub fn task(&self, label: impl Into<String>) -> TaskGuard<'_> {
        let label = label.into();
        let spinner = (!self.quiet && std::io::stderr().is_terminal()).then(|| {
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            let pb = ProgressBar::new_spinner().with_style(style);
            pb.set_message(label.clone());
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });
        TaskGuard {
            ui: self,
            label,
            start: Instant::now(),
            spinner,
            finished: false,
        }
    }

    fn status(&self, level: Level, message: &str) {
        let line = if self.quiet {
            message.to_string()
        } else {
            format!("{} {message}", self.paint(level.style(), level.icon()))
        };
        if level.to_stderr() {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    fn heading(&self, title: &str) {
        if self.quiet {
            println!("{title}");
        } else {
            let style = Style::new().fg(Color::Purple).bold();
            println!("{}", self.paint(style, &format!("▸ {title}")));
        }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.color {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    }
}

/// Running task; reports an interruption if dropped without [`finish`].
///
/// [`finish`]: TaskGuard::finish
pub struct TaskGuard<'a> {
    ui: &'a Ui,
    label: String,
    start: Instant,
    spinner: Option<ProgressBar>,
    finished: bool,
}

impl TaskGuard<'_> {
    pub fn finish(mut self) -> Duration {
        self.finished = true;
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
        self.start.elapsed()
    }
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let message = format!(
            "{} interrupted after {}",
            self.label,
            format_duration(self.start.elapsed())
        );
        match self.spinner.take() {
            Some(pb) => pb.abandon_with_message(message),
            None => self.ui.warn(&message),
        }
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 1.0 {
        format!("{secs:.2}s")
    } else {
        format!("{:.0}ms", secs * 1_000.0)
    }
}
