use std::fmt::Display;
use std::time::Instant;

use console::Style;

const ANSI_BLUE: Style = Style::new().blue();

/// Time since `s`, formatted for log lines.
pub(crate) fn as_overhead(s: Instant) -> impl Display {
    let f = format!("(+{}ms)", s.elapsed().as_millis());
    ANSI_BLUE.apply_to(f)
}
