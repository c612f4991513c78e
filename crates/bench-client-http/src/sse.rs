//! Incremental server-sent event parsing.

use bench_runner::ClientError;

const DATA_PREFIX: &str = "data: ";

/// Longest partial line held while waiting for its terminator.
pub const MAX_PENDING_LINE: usize = 1024 * 1024;

/// Splits a byte stream into lines and yields the `data: ` payloads that
/// parse as JSON. Everything else is ignored.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the number of complete events it finished.
    ///
    /// Fails once an unterminated line grows past [`MAX_PENDING_LINE`].
    pub fn push(&mut self, chunk: &[u8]) -> Result<usize, ClientError> {
        self.pending.extend_from_slice(chunk);

        let mut events = 0;
        let mut consumed = 0;
        while let Some(offset) = self.pending[consumed..].iter().position(|&b| b == b'\n') {
            let line = &self.pending[consumed..consumed + offset];
            if is_event(line) {
                events += 1;
            }
            consumed += offset + 1;
        }
        self.pending.drain(..consumed);

        if self.pending.len() > MAX_PENDING_LINE {
            let held = self.pending.len();
            self.pending.clear();
            return Err(ClientError::Decode(format!(
                "event line exceeds {MAX_PENDING_LINE} bytes ({held} buffered)"
            )));
        }
        Ok(events)
    }

    /// Bytes held back waiting for a line terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn is_event(line: &[u8]) -> bool {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let Ok(line) = std::str::from_utf8(line) else {
        return false;
    };
    line.strip_prefix(DATA_PREFIX)
        .is_some_and(|data| serde_json::from_str::<serde_json::Value>(data).is_ok())
}
