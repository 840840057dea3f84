//! Terminal helpers: tracing setup, TTY detection and interactive prompts.

use std::io::{self, BufRead, Write};

use canvas_dl_core::Course;

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_show_progress(
    stderr_is_terminal: bool,
    quiet: bool,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

/// Default log level from the CLI flags and config.
///
/// `-q` wins, then `-v` count; `verbose = true` in config counts as one `-v`.
pub(crate) fn default_log_level(quiet: bool, verbose: u8, config_verbose: bool) -> &'static str {
    if quiet {
        return "error";
    }
    let verbose = if config_verbose { verbose.max(1) } else { verbose };
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `default_level`.
pub(crate) fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .try_init();
}

/// Reads a secret line. Piped input is read whole; on a TTY `prompt` is shown first.
pub(crate) fn read_secret(
    prompt: &str,
    interactive: bool,
    mut input: impl BufRead,
    mut output: impl Write,
) -> io::Result<Option<String>> {
    let mut buffer = String::new();
    if interactive {
        write!(output, "{prompt}")?;
        output.flush()?;
        input.read_line(&mut buffer)?;
    } else {
        input.read_to_string(&mut buffer)?;
    }
    let value = buffer.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// Prints a numbered course list and reads the user's pick.
///
/// Returns `None` on empty input, a non-number or an out-of-range choice.
pub(crate) fn pick_course<'a>(
    courses: &'a [Course],
    mut input: impl BufRead,
    mut output: impl Write,
) -> io::Result<Option<&'a Course>> {
    writeln!(output, "Pick a course:")?;
    for (index, course) in courses.iter().enumerate() {
        writeln!(output, "  {:>2}) {} ({})", index + 1, course.display_name(), course.id)?;
    }
    write!(output, "Number [1-{}]: ", courses.len())?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let choice = line
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| courses.get(index));
    Ok(choice)
}

/// Renders courses as a plain aligned table.
pub(crate) fn render_course_table(courses: &[Course]) -> String {
    let headers = ["ID", "Name", "Term", "Published"];
    let rows: Vec<[String; 4]> = courses
        .iter()
        .map(|course| {
            [
                course.id.to_string(),
                course.name.clone().unwrap_or_default(),
                course.term_name().to_string(),
                course.is_published().to_string(),
            ]
        })
        .collect();

    let mut widths = headers.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: &[&str]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::from("Courses\n");
    out.push_str(&format_row(&headers[..]));
    out.push('\n');
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&format_row(&cells));
        out.push('\n');
    }
    out
}
