//! Coloured status lines for the terminal

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn write_colored(mut stream: StandardStream, color: Option<Color>, bold: bool, text: &str) {
    let _ = stream.set_color(ColorSpec::new().set_fg(color).set_bold(bold));
    let _ = writeln!(stream, "{text}");
    let _ = stream.reset();
}

pub fn error(message: &str) {
    write_colored(
        StandardStream::stderr(ColorChoice::Auto),
        Some(Color::Red),
        false,
        &format!("Error: {message}"),
    );
}

pub fn warning(message: &str) {
    write_colored(
        StandardStream::stderr(ColorChoice::Auto),
        Some(Color::Yellow),
        false,
        &format!("Warning: {message}"),
    );
}

pub fn success(message: &str) {
    write_colored(
        StandardStream::stdout(ColorChoice::Auto),
        Some(Color::Green),
        false,
        message,
    );
}

pub fn info(message: &str) {
    write_colored(StandardStream::stdout(ColorChoice::Auto), None, false, message);
}

pub fn heading(message: &str) {
    write_colored(
        StandardStream::stdout(ColorChoice::Auto),
        Some(Color::Cyan),
        true,
        message,
    );
}

pub fn separator() {
    write_colored(
        StandardStream::stdout(ColorChoice::Auto),
        Some(Color::Magenta),
        false,
        &"-".repeat(40),
    );
}
