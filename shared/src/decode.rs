/// Incremental UTF-8 decoding for streamed response bodies.
///
/// Network chunks are not aligned to character boundaries, so a multi-byte
/// character may arrive split across two reads. The decoder holds back an
/// incomplete trailing sequence until the rest of it arrives.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes as much of `bytes` (plus any held-back tail) as forms complete
    /// characters. Invalid sequences become U+FFFD.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));

                    match err.error_len() {
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }

        out
    }

    /// Flushes whatever is still held back once the stream has ended.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_character_split_across_chunks() {
        let bytes = "こんにちは".as_bytes();
        let mut decoder = Utf8Decoder::new();

        let first = decoder.push(&bytes[..4]);
        let second = decoder.push(&bytes[4..]);

        assert_eq!(first, "こ");
        assert_eq!(second, "んにちは");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn replaces_invalid_bytes_and_keeps_going() {
        let mut decoder = Utf8Decoder::new();

        assert_eq!(decoder.push(b"ok\xffok"), "ok\u{FFFD}ok");
    }

    #[test]
    fn truncated_tail_is_flushed_lossily() {
        let mut decoder = Utf8Decoder::new();

        assert_eq!(decoder.push(&"é".as_bytes()[..1]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }
}
