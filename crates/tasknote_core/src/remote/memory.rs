use super::{DocumentStore, RemoteResult};

/// In-process document, used for tests and embedding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDocumentStore {
    text: String,
    writes: usize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            writes: 0,
        }
    }

    /// Current document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the text out of band, the way a person editing the note would.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Number of `write` calls received.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn read(&self) -> RemoteResult<String> {
        Ok(self.text.clone())
    }

    fn write(&mut self, text: &str) -> RemoteResult<()> {
        self.text = text.to_string();
        self.writes += 1;
        Ok(())
    }
}
