//! Line buffering between raw output chunks and a converter

use super::OutputConverter;

/// Splits incoming chunks into lines and converts each complete line.
///
/// Bytes after the last `\n` are held back until the line completes or
/// [`LineBuffer::finish`] is called.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the converted output of every line it completes
    pub fn push<C>(&mut self, converter: &C, chunk: &[u8]) -> Vec<u8>
    where
        C: OutputConverter + ?Sized,
    {
        let mut out = Vec::with_capacity(chunk.len());
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (line, tail) = rest.split_at(pos + 1);
            if self.pending.is_empty() {
                out.extend_from_slice(&converter.convert(line));
            } else {
                self.pending.extend_from_slice(line);
                let line = std::mem::take(&mut self.pending);
                out.extend_from_slice(&converter.convert(&line));
            }
            rest = tail;
        }

        self.pending.extend_from_slice(rest);
        out
    }

    /// Convert and return whatever is still buffered
    pub fn finish<C>(&mut self, converter: &C) -> Vec<u8>
    where
        C: OutputConverter + ?Sized,
    {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let line = std::mem::take(&mut self.pending);
        converter.convert(&line).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::sync::Mutex;

    /// Records every line it is given and brackets it
    #[derive(Default)]
    struct Recorder(Mutex<Vec<Vec<u8>>>);

    impl OutputConverter for Recorder {
        fn convert<'a>(&self, line: &'a [u8]) -> Cow<'a, [u8]> {
            self.0.lock().unwrap().push(line.to_vec());
            let mut out = b"[".to_vec();
            out.extend_from_slice(line);
            out.push(b']');
            Cow::Owned(out)
        }
    }

    #[test]
    fn test_whole_lines_convert_immediately() {
        let recorder = Recorder::default();
        let mut buffer = LineBuffer::new();

        assert_eq!(buffer.push(&recorder, b"a\nb\n"), b"[a\n][b\n]");
        assert!(buffer.pending.is_empty());
    }

    #[test]
    fn test_split_line_converts_once() {
        let recorder = Recorder::default();
        let mut buffer = LineBuffer::new();

        assert_eq!(buffer.push(&recorder, b"{\"Action\":"), b"");
        assert_eq!(buffer.pending, b"{\"Action\":");
        assert_eq!(buffer.push(&recorder, b"\"pass\"}\nnext"), b"[{\"Action\":\"pass\"}\n]");

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(seen, vec![b"{\"Action\":\"pass\"}\n".to_vec()]);
    }

    #[test]
    fn test_finish_flushes_tail() {
        let recorder = Recorder::default();
        let mut buffer = LineBuffer::new();

        buffer.push(&recorder, b"done\npartial");
        assert_eq!(buffer.finish(&recorder), b"[partial]");
        assert_eq!(buffer.finish(&recorder), b"");
    }
}
