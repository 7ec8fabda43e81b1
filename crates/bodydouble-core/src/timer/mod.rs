mod countdown;
mod display;

pub use countdown::{minutes_to_secs, CountdownEngine, CountdownOutcome, Segment};
pub use display::{DisplaySink, NullDisplay, TerminalDisplay};
