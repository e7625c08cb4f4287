//! Byte-level AT response framing.
//!
//! `ResponseParser` has no knowledge of AT semantics: it turns a byte stream
//! into discrete frames (a line, an interactive prompt, or a raw HTTP body
//! chunk) and nothing else. Ground: the teacher's `frame/codec.rs`
//! deserialize-dispatch shape ("parser is a pure state to frame function")
//! and, for the exact transition table, `_uart_reader` in the original
//! MicroPython core.

use heapless::Vec;

use crate::config::LINE_BUFFER_CAPACITY;
use crate::error::WalterError;

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const GT: u8 = b'>';
const LT: u8 = b'<';
const SPACE: u8 = b' ';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    StartCr,
    StartLf,
    Data,
    DataPrompt,
    DataPromptHttp,
    DataHttpStart1,
    DataHttpStart2,
    EndLf,
    Raw,
}

/// A single framed logical response: a line, a prompt, or a raw chunk.
pub type Frame = Vec<u8, LINE_BUFFER_CAPACITY>;

/// Byte-by-byte AT response framer.
///
/// Call [`feed`](Self::feed) once per received byte. When it returns
/// `Some(frame)` the frame has been handed off to the caller and the parser
/// has already reset its internal buffer to an empty one (spec: "transfer of
/// ownership; parser resets to a fresh empty buffer").
pub struct ResponseParser {
    state: ParserState,
    line: Frame,
    raw_chunk_size: usize,
}

/// Tells the parser how many bytes the next raw chunk should consume, once
/// the `<<<` HTTP body marker is recognised. Supplied by the caller from
/// mirror state (the parser itself never reads mirror state).
pub struct RawChunkArming {
    pub content_length: usize,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::StartCr,
            line: Vec::new(),
            raw_chunk_size: 0,
        }
    }

    fn push(&mut self, byte: u8) -> Result<(), WalterError> {
        self.line.push(byte).map_err(|_| WalterError::BufferFull)
    }

    fn take_frame(&mut self) -> Frame {
        core::mem::replace(&mut self.line, Vec::new())
    }

    /// Force the parser into `Raw` with an explicit chunk size, bypassing
    /// the `<<<` arming arithmetic. Exists only so the `raw_chunk_size == 0`
    /// boundary case (spec B3) can be exercised directly, since the real
    /// arming path always adds the `"\r\nOK\r\n"` trailer length and can
    /// never observe a zero chunk size itself.
    #[cfg(test)]
    pub(crate) fn arm_raw_directly(&mut self, raw_chunk_size: usize) {
        self.state = ParserState::Raw;
        self.raw_chunk_size = raw_chunk_size;
    }

    /// Feed a single received byte through the state machine.
    ///
    /// `arm_http_raw` is consulted only on the third `<` of a `<<<` marker;
    /// it should inspect the "current HTTP profile" mirror register and
    /// return `Some(RawChunkArming)` iff that profile is in `GotRing` with a
    /// known content length (spec §4.2, DataHttpStart2 transition).
    pub fn feed(
        &mut self,
        byte: u8,
        arm_http_raw: impl FnOnce() -> Option<RawChunkArming>,
    ) -> Result<Option<Frame>, WalterError> {
        match self.state {
            ParserState::StartCr => {
                if byte == CR {
                    self.state = ParserState::StartLf;
                } else if byte == b'+' {
                    self.state = ParserState::Data;
                    self.push(byte)?;
                }
                Ok(None)
            }

            ParserState::StartLf => {
                if byte == LF {
                    self.state = ParserState::Data;
                }
                Ok(None)
            }

            ParserState::Data => {
                if byte == CR {
                    self.state = ParserState::EndLf;
                    return Ok(None);
                }
                if byte == GT {
                    self.state = ParserState::DataPrompt;
                } else if byte == LT {
                    self.state = ParserState::DataHttpStart1;
                }
                self.push(byte)?;
                Ok(None)
            }

            ParserState::DataPrompt => {
                if byte == CR {
                    self.state = ParserState::EndLf;
                    return Ok(None);
                }
                self.push(byte)?;
                if byte == SPACE {
                    self.state = ParserState::StartCr;
                    Ok(Some(self.take_frame()))
                } else if byte == GT {
                    self.state = ParserState::DataPromptHttp;
                    Ok(None)
                } else {
                    self.state = ParserState::Data;
                    Ok(None)
                }
            }

            ParserState::DataPromptHttp => {
                if byte == CR {
                    self.state = ParserState::EndLf;
                    return Ok(None);
                }
                self.push(byte)?;
                if byte == GT {
                    self.state = ParserState::StartCr;
                    Ok(Some(self.take_frame()))
                } else {
                    self.state = ParserState::Data;
                    Ok(None)
                }
            }

            ParserState::DataHttpStart1 => {
                if byte == CR {
                    self.state = ParserState::EndLf;
                    return Ok(None);
                }
                self.state = if byte == LT {
                    ParserState::DataHttpStart2
                } else {
                    ParserState::Data
                };
                self.push(byte)?;
                Ok(None)
            }

            ParserState::DataHttpStart2 => {
                if byte == CR {
                    self.state = ParserState::EndLf;
                    return Ok(None);
                }
                self.push(byte)?;
                if byte == LT {
                    if let Some(arming) = arm_http_raw() {
                        self.raw_chunk_size =
                            arming.content_length + b"\r\nOK\r\n".len();
                        self.state = ParserState::Raw;
                        return Ok(None);
                    }
                    self.state = ParserState::Data;
                } else {
                    self.state = ParserState::Data;
                }
                Ok(None)
            }

            ParserState::EndLf => {
                if byte == LF {
                    self.state = ParserState::StartCr;
                    Ok(Some(self.take_frame()))
                } else {
                    self.push(CR)?;
                    if byte != CR {
                        self.state = ParserState::Data;
                        self.push(byte)?;
                    }
                    Ok(None)
                }
            }

            ParserState::Raw => {
                if self.raw_chunk_size == 0 {
                    self.state = ParserState::StartCr;
                    return Ok(Some(self.take_frame()));
                }
                self.push(byte)?;
                self.raw_chunk_size -= 1;
                if self.raw_chunk_size == 0 {
                    self.state = ParserState::StartCr;
                    Ok(Some(self.take_frame()))
                } else {
                    Ok(None)
                }
            }
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(parser: &mut ResponseParser, bytes: &[u8]) -> heapless::Vec<Frame, 16> {
        let mut frames: heapless::Vec<Frame, 16> = heapless::Vec::new();
        for &b in bytes {
            if let Some(frame) = parser.feed(b, || None).unwrap() {
                frames.push(frame).unwrap();
            }
        }
        frames
    }

    #[test]
    fn ok_round_trip() {
        let mut parser = ResponseParser::new();
        let frames = feed_all(&mut parser, b"\r\nOK\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"OK");
    }

    #[test]
    fn multiline_urc_starting_with_plus_without_leading_crlf() {
        let mut parser = ResponseParser::new();
        let frames = feed_all(&mut parser, b"\r\n+CEREG: 5\r\n\r\n+CSQ: 15,99\r\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], b"+CEREG: 5");
        assert_eq!(&frames[1][..], b"+CSQ: 15,99");
    }

    #[test]
    fn cr_inside_raw_body_does_not_terminate_frame() {
        // B1: a bare CR while in Raw mode must not be treated as EndLf.
        let mut parser = ResponseParser::new();
        // Arm raw mode directly via a <<< sequence with content_length = 5,
        // where the body itself happens to contain a CR byte.
        let mut frames: heapless::Vec<Frame, 4> = heapless::Vec::new();
        for &b in b"\r\n<<<".iter() {
            if let Some(f) = parser
                .feed(b, || Some(RawChunkArming { content_length: 5 }))
                .unwrap()
            {
                frames.push(f).unwrap();
            }
        }
        // body: "he\rlo" (5 bytes) + trailing "\r\nOK\r\n"
        for &b in b"he\rlo\r\nOK\r\n".iter() {
            if let Some(f) = parser.feed(b, || None).unwrap() {
                frames.push(f).unwrap();
            }
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"<<<he\rlo\r\nOK\r\n");
    }

    #[test]
    fn greater_than_inside_cme_error_line_does_not_enter_prompt_mode() {
        // B2: only Data may transition into DataPrompt, not Raw/other states
        // and a `>` appearing mid-line outside of position 0 must still just
        // be accumulated once DataPrompt falls back to Data.
        let mut parser = ResponseParser::new();
        let frames = feed_all(&mut parser, b"\r\n+CME ERROR: 50\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"+CME ERROR: 50");
    }

    #[test]
    fn empty_raw_chunk_emits_empty_frame_without_consuming_bytes() {
        // B3: raw_chunk_size == 0 immediately completes the frame, the
        // triggering byte is not folded into the raw chunk. Not reachable
        // through the real <<< arming path (the trailer alone is 6 bytes),
        // so exercised directly against the guard.
        let mut parser = ResponseParser::new();
        parser.arm_raw_directly(0);
        let frame = parser.feed(b'x', || None).unwrap();
        assert_eq!(frame.as_ref().map(|f| f.len()), Some(0));

        // Parser is back at StartCr and ready for the next frame.
        let next = feed_all(&mut parser, b"\r\nOK\r\n");
        assert_eq!(next.len(), 1);
        assert_eq!(&next[0][..], b"OK");
    }

    #[test]
    fn interactive_prompt_is_emitted_immediately() {
        let mut parser = ResponseParser::new();
        let frames = feed_all(&mut parser, b"\r\n> ");
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"> ");
    }

    #[test]
    fn http_data_prompt_is_emitted_immediately() {
        let mut parser = ResponseParser::new();
        let frames = feed_all(&mut parser, b"\r\n>>> ");
        // The third '>' completes the frame (DataPromptHttp -> StartCr); the
        // trailing space is fed afterwards and simply discarded in StartCr.
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b">>>");
    }

    #[test]
    fn cr_in_prompt_state_ends_frame_instead_of_being_swallowed() {
        // A line ending in '>' immediately before the terminating CRLF must
        // still frame correctly: the CR drives DataPrompt -> EndLf without
        // being pushed, exactly like the Data arm, rather than being folded
        // into the line and merging it with the next frame.
        let mut parser = ResponseParser::new();
        let frames = feed_all(&mut parser, b"\r\nfoo>\r\n+CSQ: 15,99\r\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], b"foo>");
        assert_eq!(&frames[1][..], b"+CSQ: 15,99");
    }

    #[test]
    fn cr_in_http_start_states_ends_frame_instead_of_being_swallowed() {
        // Same guard, but for a line ending in '<' or '<<' that never
        // completes the '<<<' marker before CRLF arrives.
        let mut parser = ResponseParser::new();
        let frames = feed_all(&mut parser, b"\r\nfoo<<\r\n+CSQ: 15,99\r\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], b"foo<<");
        assert_eq!(&frames[1][..], b"+CSQ: 15,99");
    }

    #[test]
    fn chunking_invariant_produces_same_frames_regardless_of_boundaries() {
        let input: &[u8] = b"\r\n+CEREG: 5\r\n\r\n+CSQ: 15,99\r\n\r\nOK\r\n";

        let mut whole = ResponseParser::new();
        let frames_whole = feed_all(&mut whole, input);

        // split into arbitrary chunks and feed byte-by-byte regardless
        // (feed is always byte-by-byte, so this simply re-confirms two
        // independent parser instances agree on the same input).
        let mut chunked = ResponseParser::new();
        let frames_chunked = feed_all(&mut chunked, input);

        assert_eq!(frames_whole.len(), frames_chunked.len());
        for (a, b) in frames_whole.iter().zip(frames_chunked.iter()) {
            assert_eq!(&a[..], &b[..]);
        }
    }
}
