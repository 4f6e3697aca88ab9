//! Console status output.
//!
//! Every status line goes to stderr with a bold, colored label when stderr is
//! a terminal and plain text otherwise. `detail` lines are only shown when
//! verbose mode is on (`--verbose`).

use console::{Color, Term, style};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

fn stderr_is_tty() -> bool {
    Term::stderr().is_term()
}

fn format_label(label: &str, color: Color, is_tty: bool) -> String {
    if is_tty {
        style(label).bold().fg(color).to_string()
    } else {
        label.to_string()
    }
}

fn write_labeled(
    w: &mut dyn Write,
    label: &str,
    color: Color,
    msg: &str,
    is_tty: bool,
) -> io::Result<()> {
    let label = format_label(label, color, is_tty);
    if msg.is_empty() {
        writeln!(w, "{label}")
    } else {
        writeln!(w, "{label} {msg}")
    }
}

pub fn action_to(w: &mut dyn Write, label: &str, msg: &str, is_tty: bool) {
    let _ = write_labeled(w, label, Color::Cyan, msg, is_tty);
}

pub fn success_to(w: &mut dyn Write, label: &str, msg: &str, is_tty: bool) {
    let _ = write_labeled(w, label, Color::Green, msg, is_tty);
}

pub fn note_to(w: &mut dyn Write, msg: &str, is_tty: bool) {
    let _ = write_labeled(w, "Note", Color::Yellow, msg, is_tty);
}

pub fn fail_to(w: &mut dyn Write, msg: &str, is_tty: bool) {
    let _ = write_labeled(w, "Error", Color::Red, msg, is_tty);
}

/// Write an indented, dimmed line. Suppressed unless `verbose` is set.
pub fn detail_to(w: &mut dyn Write, msg: &str, is_tty: bool, verbose: bool) {
    if !verbose {
        return;
    }
    let line = if is_tty {
        style(format!("  {msg}")).dim().to_string()
    } else {
        format!("  {msg}")
    };
    let _ = writeln!(w, "{line}");
}

pub fn action(label: &str, msg: &str) {
    action_to(&mut io::stderr(), label, msg, stderr_is_tty());
}

pub fn success(label: &str, msg: &str) {
    success_to(&mut io::stderr(), label, msg, stderr_is_tty());
}

pub fn note(msg: &str) {
    note_to(&mut io::stderr(), msg, stderr_is_tty());
}

pub fn fail(msg: &str) {
    fail_to(&mut io::stderr(), msg, stderr_is_tty());
}

pub fn detail(msg: &str) {
    detail_to(&mut io::stderr(), msg, stderr_is_tty(), is_verbose());
}

pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}
