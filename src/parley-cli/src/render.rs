//! Terminal renderer that prints revealed text as it appears.

use std::io::Write;

use parley_stream::{StreamStatus, StreamingState};
use tracing::warn;

/// Writes the newly revealed suffix of each snapshot to `out`.
pub struct TerminalRenderer<W: Write> {
    out: W,
    printed: usize,
    line_closed: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: 0,
            line_closed: false,
        }
    }

    /// Renders one snapshot.
    ///
    /// A new session (`waiting`, or content shorter than what was printed)
    /// restarts printing on a fresh line.
    pub fn render(&mut self, state: &StreamingState) -> std::io::Result<()> {
        let content = state.content.as_str();
        let restarted = state.status == StreamStatus::Waiting
            || content.len() < self.printed
            || !content.is_char_boundary(self.printed);
        if restarted {
            if self.printed > 0 && !self.line_closed {
                writeln!(self.out)?;
            }
            self.printed = 0;
            self.line_closed = false;
        }

        let fresh = &content[self.printed..];
        if !fresh.is_empty() {
            self.out.write_all(fresh.as_bytes())?;
            self.out.flush()?;
            self.printed = content.len();
            self.line_closed = false;
        }

        if state.status.is_terminal() && self.printed > 0 && !self.line_closed {
            writeln!(self.out)?;
            self.out.flush()?;
            self.line_closed = true;
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> TerminalRenderer<W> {
    /// Adapts the renderer into an engine listener.
    pub fn into_listener(mut self) -> impl FnMut(&StreamingState) + Send + 'static {
        move |state: &StreamingState| {
            if let Err(e) = self.render(state) {
                warn!("Failed to write output: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: StreamStatus, content: &str) -> StreamingState {
        StreamingState {
            status,
            content: content.to_string(),
            ..StreamingState::default()
        }
    }

    fn output(renderer: TerminalRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).expect("utf8")
    }

    #[test]
    fn test_prints_only_new_text() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        renderer.render(&state(StreamStatus::Waiting, "")).unwrap();
        renderer.render(&state(StreamStatus::Streaming, "Hel")).unwrap();
        renderer.render(&state(StreamStatus::Streaming, "Hello")).unwrap();
        renderer.render(&state(StreamStatus::Streaming, "Hello")).unwrap();
        assert_eq!(output(renderer), "Hello");
    }

    #[test]
    fn test_terminal_status_ends_line() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        renderer.render(&state(StreamStatus::Streaming, "Hi")).unwrap();
        renderer.render(&state(StreamStatus::Complete, "Hi there")).unwrap();
        renderer.render(&state(StreamStatus::Waiting, "")).unwrap();
        renderer.render(&state(StreamStatus::Streaming, "Next")).unwrap();
        assert_eq!(output(renderer), "Hi there\nNext");
    }

    #[test]
    fn test_shrinking_content_restarts_line() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        renderer.render(&state(StreamStatus::Streaming, "partial")).unwrap();
        renderer.render(&state(StreamStatus::Waiting, "")).unwrap();
        renderer.render(&state(StreamStatus::Streaming, "new")).unwrap();
        assert_eq!(output(renderer), "partial\nnew");
    }

    #[test]
    fn test_notifications_after_terminal_do_not_reprint() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        renderer.render(&state(StreamStatus::Streaming, "Hi")).unwrap();
        renderer.render(&state(StreamStatus::Error, "Hi")).unwrap();
        renderer.render(&state(StreamStatus::Idle, "Hi")).unwrap();
        renderer.render(&state(StreamStatus::Complete, "Hi")).unwrap();
        assert_eq!(output(renderer), "Hi\n");
    }
}
