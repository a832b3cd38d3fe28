use std::env;
use std::io::{self, IsTerminal, Write};

use anstyle::{AnsiColor, Effects, Style};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    let no_color = env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    resolve_output_style(io::stdout().is_terminal(), no_color)
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool, no_color: bool) -> OutputStyle {
    if stdout_is_tty && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Status {
    Ok,
    Skipped,
    Warn,
    Error,
}

impl Status {
    fn badge(self) -> &'static str {
        match self {
            Status::Ok => "[OK]",
            Status::Skipped => "[..]",
            Status::Warn => "[WARN]",
            Status::Error => "[ERR]",
        }
    }

    fn style(self) -> Style {
        let color = match self {
            Status::Ok => AnsiColor::BrightGreen,
            Status::Skipped => AnsiColor::BrightBlue,
            Status::Warn => AnsiColor::BrightYellow,
            Status::Error => AnsiColor::BrightRed,
        };
        Style::new()
            .fg_color(Some(color.into()))
            .effects(Effects::BOLD)
    }
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

pub(crate) fn render_status_line(style: OutputStyle, status: Status, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", colorize(status.style(), status.badge())),
    }
}

pub(crate) fn render_error_line(style: OutputStyle, err: &anyhow::Error) -> String {
    let message = format!("Error: {err:#}");
    match style {
        OutputStyle::Plain => message,
        OutputStyle::Rich => format!(
            "{} {message}",
            colorize(Status::Error.style(), Status::Error.badge())
        ),
    }
}

pub(crate) struct Console<O: Write, E: Write> {
    style: OutputStyle,
    out: O,
    err: E,
}

impl Console<io::Stdout, io::Stderr> {
    pub(crate) fn terminal() -> Self {
        Self::new(current_output_style(), io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Console<O, E> {
    pub(crate) fn new(style: OutputStyle, out: O, err: E) -> Self {
        Self { style, out, err }
    }

    pub(crate) fn status(&mut self, status: Status, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", render_status_line(self.style, status, message))
    }

    pub(crate) fn line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{line}")
    }

    pub(crate) fn error(&mut self, err: &anyhow::Error) -> io::Result<()> {
        writeln!(self.err, "{}", render_error_line(self.style, err))
    }

    #[cfg(test)]
    pub(crate) fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}
