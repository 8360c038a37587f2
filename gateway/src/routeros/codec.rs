//! RouterOS API word and sentence encoding.
//!
//! A word is a length prefix followed by that many bytes. A sentence is a
//! run of words closed by a zero-length word. Length prefixes take one to
//! five bytes depending on magnitude. Word text is Windows-1252 on the wire.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::executor::Record;
use crate::routeros::charset;

/// Largest word accepted from a device
pub const MAX_WORD_LEN: usize = 16 * 1024 * 1024;

/// Append the length prefix for a word of `len` bytes
pub fn encode_length(len: usize, out: &mut Vec<u8>) -> io::Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "word too long"))?;
    match len {
        0..=0x7F => out.push(len as u8),
        0x80..=0x3FFF => out.extend_from_slice(&((len | 0x8000) as u16).to_be_bytes()),
        0x4000..=0x1F_FFFF => out.extend_from_slice(&(len | 0xC0_0000).to_be_bytes()[1..]),
        0x20_0000..=0x0FFF_FFFF => out.extend_from_slice(&(len | 0xE000_0000).to_be_bytes()),
        _ => {
            out.push(0xF0);
            out.extend_from_slice(&len.to_be_bytes());
        }
    }
    Ok(())
}

/// Encode a full sentence, including the terminating empty word
pub fn encode_sentence<S: AsRef<str>>(words: &[S]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    for word in words {
        let bytes = charset::encode(word.as_ref());
        encode_length(bytes.len(), &mut out)?;
        out.extend_from_slice(&bytes);
    }
    out.push(0);
    Ok(out)
}

/// Read one length prefix
pub async fn read_length<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<usize> {
    let first = reader.read_u8().await?;
    let (extra, initial) = match first {
        b if b & 0x80 == 0x00 => (0, u32::from(b)),
        b if b & 0xC0 == 0x80 => (1, u32::from(b & 0x3F)),
        b if b & 0xE0 == 0xC0 => (2, u32::from(b & 0x1F)),
        b if b & 0xF0 == 0xE0 => (3, u32::from(b & 0x0F)),
        0xF0 => (4, 0),
        b => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected control byte 0x{b:02x}"),
            ))
        }
    };

    let mut len = initial;
    for _ in 0..extra {
        len = (len << 8) | u32::from(reader.read_u8().await?);
    }
    Ok(len as usize)
}

/// Read one word; an empty word marks the end of a sentence
pub async fn read_word<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<String> {
    let len = read_length(reader).await?;
    if len > MAX_WORD_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("word of {len} bytes exceeds limit"),
        ));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(charset::decode(&buf))
}

/// Read words up to and excluding the terminating empty word
pub async fn read_sentence<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Vec<String>> {
    let mut words = Vec::new();
    loop {
        let word = read_word(reader).await?;
        if word.is_empty() {
            return Ok(words);
        }
        words.push(word);
    }
}

/// Write one sentence and flush
pub async fn write_sentence<W, S>(writer: &mut W, words: &[S]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    let bytes = encode_sentence(words)?;
    writer.write_all(&bytes).await?;
    writer.flush().await
}

/// One decoded reply sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `!re`: one data record
    Record(Record),
    /// `!done`: command complete, with any attributes it carried
    Done(Record),
    /// `!trap`: device-side error
    Trap(Record),
    /// `!fatal`: the device is closing the connection
    Fatal(String),
    /// `!empty`: command produced no records
    Empty,
}

impl Reply {
    pub fn parse(words: &[String]) -> io::Result<Self> {
        let Some((reply, rest)) = words.split_first() else {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "empty sentence"));
        };
        match reply.as_str() {
            "!re" => Ok(Reply::Record(attributes(rest))),
            "!done" => Ok(Reply::Done(attributes(rest))),
            "!trap" => Ok(Reply::Trap(attributes(rest))),
            "!empty" => Ok(Reply::Empty),
            "!fatal" => Ok(Reply::Fatal(rest.join(" "))),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected reply word {other:?}"),
            )),
        }
    }
}

/// Collect `=key=value` words into a record; API words like `.tag=` are skipped
fn attributes(words: &[String]) -> Record {
    words
        .iter()
        .filter_map(|w| w.strip_prefix('='))
        .filter_map(|w| w.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
