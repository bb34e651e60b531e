/// Where live progress goes. Implemented by the terminal layer.
pub trait ProgressSink: Send + Sync {
    /// Replaces the current progress line with `line`.
    fn render(&self, line: &str);

    /// Ends the progress line.
    fn newline(&self);
}
