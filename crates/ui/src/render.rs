use std::io::{self, Write};

use chatdock_core::{Message, Role};

use crate::settings::WidgetSettings;

const USER_PREFIX: &str = "you> ";
const ASSISTANT_PREFIX: &str = "bot> ";

/// Prints transcript snapshots as a line-oriented chat log.
///
/// Only messages that are new or changed since the previous snapshot are
/// written. A snapshot that no longer starts with the rendered prefix means a
/// new conversation began, so the header is printed again.
pub struct TranscriptRenderer {
    title: String,
    pending_text: String,
    rendered: Vec<Message>,
}

impl TranscriptRenderer {
    pub fn new(title: impl Into<String>, pending_text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pending_text: pending_text.into(),
            rendered: Vec::new(),
        }
    }

    pub fn from_settings(settings: &WidgetSettings) -> Self {
        Self::new(&settings.title, &settings.pending_text)
    }

    pub fn header(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "== {} ==", self.title)
    }

    /// Writes what changed and returns the number of message lines emitted.
    pub fn render(&mut self, snapshot: &[Message], out: &mut impl Write) -> io::Result<usize> {
        if !self.continues(snapshot) {
            writeln!(out)?;
            self.header(out)?;
            self.rendered.clear();
        }

        let mut written = 0;
        for (index, message) in snapshot.iter().enumerate() {
            if self.rendered.get(index) == Some(message) {
                continue;
            }
            self.write_message(message, out)?;
            written += 1;
        }

        out.flush()?;
        self.rendered = snapshot.to_vec();
        Ok(written)
    }

    fn continues(&self, snapshot: &[Message]) -> bool {
        let rendered_ids = self.rendered.iter().map(|message| message.id);
        let snapshot_ids = snapshot.iter().map(|message| message.id);
        self.rendered.len() <= snapshot.len()
            && rendered_ids.eq(snapshot_ids.take(self.rendered.len()))
    }

    fn write_message(&self, message: &Message, out: &mut impl Write) -> io::Result<()> {
        let prefix = match message.role {
            Role::User => USER_PREFIX,
            Role::Assistant => ASSISTANT_PREFIX,
        };
        let text = if message.is_pending() {
            self.pending_text.as_str()
        } else {
            message.text.as_str()
        };
        writeln!(out, "{prefix}{text}")
    }
}

#[cfg(test)]
mod tests {
    use chatdock_core::{MessageId, PlaceholderId};

    use super::*;

    fn output(buffer: &[u8]) -> String {
        String::from_utf8(buffer.to_vec()).unwrap()
    }

    #[test]
    fn renders_only_new_and_changed_messages() {
        let mut renderer = TranscriptRenderer::new("Agent Chatbot", "Thinking...");
        let mut buffer = Vec::new();

        let mut transcript = vec![
            Message::greeting(MessageId::new(1), "Hello!"),
            Message::user(MessageId::new(2), "hello"),
            Message::assistant_pending(MessageId::new(3), PlaceholderId::new(1)),
        ];
        assert_eq!(renderer.render(&transcript, &mut buffer).unwrap(), 3);

        transcript[2] = Message::assistant(MessageId::new(3), "hi there");
        assert_eq!(renderer.render(&transcript, &mut buffer).unwrap(), 1);
        assert_eq!(renderer.render(&transcript, &mut buffer).unwrap(), 0);

        assert_eq!(
            output(&buffer),
            "bot> Hello!\nyou> hello\nbot> Thinking...\nbot> hi there\n"
        );
    }

    #[test]
    fn restarted_transcript_reprints_header() {
        let mut renderer = TranscriptRenderer::new("Agent Chatbot", "Thinking...");
        let mut buffer = Vec::new();

        renderer
            .render(
                &[
                    Message::greeting(MessageId::new(1), "Hello!"),
                    Message::user(MessageId::new(2), "hello"),
                ],
                &mut buffer,
            )
            .unwrap();
        renderer
            .render(&[Message::greeting(MessageId::new(3), "Hello!")], &mut buffer)
            .unwrap();

        assert_eq!(
            output(&buffer),
            "bot> Hello!\nyou> hello\n\n== Agent Chatbot ==\nbot> Hello!\n"
        );
    }

    #[test]
    fn empty_transcript_after_content_counts_as_restart() {
        let mut renderer = TranscriptRenderer::new("Desk", "...");
        let mut buffer = Vec::new();

        renderer
            .render(&[Message::user(MessageId::new(1), "a")], &mut buffer)
            .unwrap();
        let written = renderer.render(&[], &mut buffer).unwrap();

        assert_eq!(written, 0);
        assert!(output(&buffer).ends_with("== Desk ==\n"));

        let written = renderer
            .render(&[Message::user(MessageId::new(2), "b")], &mut buffer)
            .unwrap();
        assert_eq!(written, 1);
        assert!(output(&buffer).ends_with("== Desk ==\nyou> b\n"));
    }
}
