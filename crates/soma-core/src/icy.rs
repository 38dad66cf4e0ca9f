//! ICY (Shoutcast/Icecast) in-band metadata.
//!
//! A server that honours `Icy-MetaData: 1` answers with `icy-metaint: N` and
//! then interleaves a metadata block after every N audio bytes:
//!
//! ```text
//!   [N audio bytes][L][L*16 bytes of text, NUL padded][N audio bytes][L]...
//! ```
//!
//! The text is a run of `key='value';` pairs, of which only `StreamTitle` is
//! interesting to us.

use regex::Regex;

use crate::types::{TrackMetadata, UNKNOWN_ARTIST};

/// Separator between artist and title inside `StreamTitle`.
pub const TITLE_SEPARATOR: &str = " - ";

/// Upper bound for a sane `icy-metaint`; anything larger is treated as absent.
pub const MAX_METAINT: usize = 256_000;

/// Result of looking for the first metadata block in a buffered stream prefix.
#[derive(Debug, PartialEq, Eq)]
pub enum IcyBlock<'a> {
    /// Not enough bytes buffered yet.
    NeedMore,
    /// The length byte was zero: the server has nothing to say this interval.
    Empty,
    /// The raw metadata bytes (length byte excluded, padding included).
    Block(&'a [u8]),
}

/// Locate the first metadata block in `buf`, which starts at the beginning of
/// the response body.
pub fn locate_block(buf: &[u8], metaint: usize) -> IcyBlock<'_> {
    let Some(&len_byte) = buf.get(metaint) else {
        return IcyBlock::NeedMore;
    };
    let meta_len = len_byte as usize * 16;
    if meta_len == 0 {
        return IcyBlock::Empty;
    }
    let start = metaint + 1;
    match buf.get(start..start + meta_len) {
        Some(block) => IcyBlock::Block(block),
        None => IcyBlock::NeedMore,
    }
}

/// Decode a metadata block into a track.
///
/// Returns `None` when there is no non-empty `StreamTitle='...'` token.
pub fn parse_metadata(block: &[u8]) -> Option<TrackMetadata> {
    let text = String::from_utf8_lossy(block);
    let value = stream_title(&text)?;
    Some(split_stream_title(&value))
}

fn stream_title(text: &str) -> Option<String> {
    let re = Regex::new(r"StreamTitle='([^']+)'").ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Split "Artist - Title" on the first separator.  Further separators stay in
/// the title, so "A - B - C" is artist "A", title "B - C".
pub fn split_stream_title(value: &str) -> TrackMetadata {
    match value.split_once(TITLE_SEPARATOR) {
        Some((artist, title)) => TrackMetadata::new(artist.trim(), title.trim()),
        None => TrackMetadata::new(UNKNOWN_ARTIST, value.trim()),
    }
}
