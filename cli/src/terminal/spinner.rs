use std::sync::{Arc, Mutex, PoisonError};

use blecount_common::config::Config;
use blecount_common::progress::ProgressSink;
use console::Term;
use tracing::{Span, debug};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::print;

/// Progress line drawn as the span's indicatif bar.
///
/// The bar disappears with its span, so the last line is re-printed on
/// [`ProgressSink::newline`] to keep it in the scrollback.
pub struct SpanProgress {
    span: Span,
    last_line: Mutex<String>,
}

impl SpanProgress {
    pub fn new(span: Span) -> Self {
        Self {
            span,
            last_line: Mutex::new(String::new()),
        }
    }
}

impl ProgressSink for SpanProgress {
    fn render(&self, line: &str) {
        self.span.pb_set_message(line);
        let mut last = self.last_line.lock().unwrap_or_else(PoisonError::into_inner);
        last.clear();
        last.push_str(line);
    }

    fn newline(&self) {
        let last = self.last_line.lock().unwrap_or_else(PoisonError::into_inner);
        print::print(&last);
    }
}

/// Plain carriage-return progress for quiet runs and pipes.
pub struct TermProgress {
    term: Term,
}

impl TermProgress {
    pub fn new() -> Self {
        Self { term: Term::stdout() }
    }
}

impl ProgressSink for TermProgress {
    fn render(&self, line: &str) {
        if !self.term.is_term() {
            return;
        }
        if let Err(e) = self.term.clear_line().and_then(|()| self.term.write_str(line)) {
            debug!("progress line write failed: {e}");
        }
    }

    fn newline(&self) {
        if !self.term.is_term() {
            return;
        }
        if let Err(e) = self.term.write_line("") {
            debug!("progress line break failed: {e}");
        }
    }
}

/// Picks the bar for interactive runs, the plain line otherwise.
pub fn progress_sink(span: &Span, cfg: &Config) -> Arc<dyn ProgressSink> {
    if cfg.quiet == 0 && Term::stdout().is_term() {
        Arc::new(SpanProgress::new(span.clone()))
    } else {
        Arc::new(TermProgress::new())
    }
}
