use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use arbor_core::model::{Category, Status};
use arbor_core::ArborError;
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

static JSON_MODE: AtomicBool = AtomicBool::new(false);

pub fn init(json: bool) {
    JSON_MODE.store(json, Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON_MODE.load(Ordering::Relaxed)
}

/// Print `value` as JSON in `--json` mode, otherwise run the human renderer.
pub fn emit<T, F>(value: &T, human: F) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&mut StandardStream) -> io::Result<()>,
{
    if is_json() {
        let s = serde_json::to_string_pretty(value)?;
        println!("{s}");
        return Ok(());
    }
    let mut out = stdout();
    human(&mut out)?;
    out.reset()?;
    Ok(())
}

pub fn eprintln_line(msg: &str) {
    let _ = writeln!(io::stderr(), "{msg}");
}

pub fn stdout() -> StandardStream {
    StandardStream::stdout(ColorChoice::Auto)
}

/// One-line summary: `CAT1.2  Phones  [active, high]`.
pub fn category_line(out: &mut StandardStream, indent: usize, c: &Category) -> io::Result<()> {
    write!(out, "{:width$}", "", width = indent * 2)?;
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "{}", c.category_id)?;
    out.reset()?;
    write!(out, "  {}  ", c.name)?;
    out.set_color(ColorSpec::new().set_fg(Some(status_color(c.status))))?;
    write!(out, "[{}, {}]", c.status.as_str(), c.priority.as_str())?;
    out.reset()?;
    if !c.tags.is_empty() {
        let tags: Vec<&str> = c.tags.iter().map(String::as_str).collect();
        write!(out, " #{}", tags.join(" #"))?;
    }
    writeln!(out)
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Active => Color::Green,
        Status::Inactive => Color::Yellow,
        Status::Archived => Color::Blue,
        Status::Deleted => Color::Red,
    }
}

/// Render a failed command on stderr, in `--json` mode as `{error, code}`.
pub fn print_error(err: &anyhow::Error) {
    let arbor = err.downcast_ref::<ArborError>();
    if is_json() {
        let body = serde_json::json!({
            "error": format!("{err:#}"),
            "code": arbor.map(ArborError::code).unwrap_or("error"),
            "retryable": arbor.is_some_and(ArborError::is_retryable),
        });
        eprintln_line(&body.to_string());
        return;
    }

    let mut err_out = StandardStream::stderr(ColorChoice::Auto);
    let _ = err_out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = write!(err_out, "error");
    let _ = err_out.reset();
    let _ = writeln!(err_out, ": {err:#}");
    let hint = match arbor {
        Some(ArborError::Validation(_)) | Some(ArborError::InvalidArgument(_)) => {
            Some("fix the input and run the command again")
        }
        Some(ArborError::Storage(_)) => Some("changes were not saved; retry the command"),
        _ => None,
    };
    if let Some(hint) = hint {
        let _ = writeln!(err_out, "  hint: {hint}");
    }
}
