use mailparse::{dateparse, parse_headers};
use std::io::Read;

use crate::errors::*;

/// One header field, value unfolded and with encoded words decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// A parsed mail message: header fields in message order and the raw body.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    headers: Vec<Header>,
    body: Vec<u8>,
}

impl Message {
    /// Parses RFC 5322 message text.
    ///
    /// Fails on empty text, on a header line without a colon, on a field
    /// name that is not a run of printable, non-space ASCII, and on a
    /// continuation line with no field to continue. A message may have no
    /// header fields at all as long as it opens with the blank separator
    /// line.
    pub fn parse(raw: &[u8]) -> Result<Message> {
        if raw.is_empty() {
            bail!(ErrorKind::MalformedMessage("empty message".to_string()));
        }
        check_header_block(raw)?;
        let (fields, body_offset) = parse_headers(raw)?;

        let headers = fields
            .iter()
            .map(|field| Header {
                name: field.get_key(),
                value: field.get_value(),
            })
            .collect();
        let body = raw.get(body_offset..).unwrap_or_default().to_vec();
        Ok(Message { headers, body })
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// First value of the named field, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn header_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    /// `Date` field as seconds since the Unix epoch.
    pub fn date(&self) -> Option<i64> {
        self.header("Date").and_then(|d| dateparse(d).ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_reader(&self) -> impl Read + '_ {
        &self.body[..]
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Walks the raw header lines up to the blank separator (or the end of
/// the text).
fn check_header_block(block: &[u8]) -> Result<()> {
    for (n, line) in block.split(|&b| b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            break;
        }
        if line[0] == b' ' || line[0] == b'\t' {
            if n == 0 {
                bail!(ErrorKind::MalformedMessage(
                    "continuation line before any header field".to_string()
                ));
            }
            continue;
        }
        let colon = match line.iter().position(|&b| b == b':') {
            Some(colon) => colon,
            None => bail!(ErrorKind::MalformedMessage(format!(
                "header line without colon {:?}",
                String::from_utf8_lossy(line)
            ))),
        };
        if !is_field_name(&line[..colon]) {
            bail!(ErrorKind::MalformedMessage(format!(
                "bad header field name {:?}",
                String::from_utf8_lossy(&line[..colon])
            )));
        }
    }
    Ok(())
}

fn is_field_name(name: &[u8]) -> bool {
    !name.is_empty() && name.iter().all(|&b| b > 0x20 && b < 0x7f && b != b':')
}
