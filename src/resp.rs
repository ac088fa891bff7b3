//! RESP2 wire codec
//!
//! Just enough of the Redis serialization protocol to issue single-key
//! commands and decode every reply type a server may answer with.

use crate::error::{ProxyError, Result};

const CRLF: &[u8] = b"\r\n";

/// A decoded server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    /// `None` is the null bulk string (`$-1`), e.g. GET on a missing key
    BulkString(Option<Vec<u8>>),
    Array(Option<Vec<RespValue>>),
}

/// Encode a command as an array of bulk strings.
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let payload: usize = args.iter().map(|a| a.len() + 16).sum();
    let mut out = Vec::with_capacity(16 + payload);
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(CRLF);
    }
    out
}

impl RespValue {
    /// Decode one reply from the front of `buf`.
    ///
    /// Returns `Ok(None)` when `buf` holds an incomplete reply, otherwise the
    /// value and the number of bytes it occupied.
    pub fn parse(buf: &[u8]) -> Result<Option<(RespValue, usize)>> {
        let Some(line_end) = find_crlf(buf) else {
            return Ok(None);
        };
        if line_end == 0 {
            return Err(ProxyError::Protocol("empty reply line".to_string()));
        }
        let line = &buf[1..line_end];
        let after = line_end + CRLF.len();

        match buf[0] {
            b'+' => Ok(Some((RespValue::SimpleString(utf8(line)?), after))),
            b'-' => Ok(Some((RespValue::Error(utf8(line)?), after))),
            b':' => Ok(Some((RespValue::Integer(parse_int(line)?), after))),
            b'$' => {
                let len = parse_int(line)?;
                if len < 0 {
                    return Ok(Some((RespValue::BulkString(None), after)));
                }
                let end = usize::try_from(len)
                    .ok()
                    .and_then(|len| after.checked_add(len))
                    .filter(|end| *end <= isize::MAX as usize - CRLF.len())
                    .ok_or_else(|| ProxyError::Protocol(format!("bulk length {len} too large")))?;
                if buf.len() < end + CRLF.len() {
                    return Ok(None);
                }
                if &buf[end..end + CRLF.len()] != CRLF {
                    return Err(ProxyError::Protocol(
                        "bulk string not terminated by CRLF".to_string(),
                    ));
                }
                let data = buf[after..end].to_vec();
                Ok(Some((RespValue::BulkString(Some(data)), end + CRLF.len())))
            }
            b'*' => {
                let count = parse_int(line)?;
                if count < 0 {
                    return Ok(Some((RespValue::Array(None), after)));
                }
                // each element takes at least one byte of `buf`
                let room = buf.len() - after;
                let mut items =
                    Vec::with_capacity(usize::try_from(count).map_or(room, |n| n.min(room)));
                let mut pos = after;
                for _ in 0..count {
                    match RespValue::parse(&buf[pos..])? {
                        Some((item, used)) => {
                            items.push(item);
                            pos += used;
                        }
                        None => return Ok(None),
                    }
                }
                Ok(Some((RespValue::Array(Some(items)), pos)))
            }
            other => Err(ProxyError::Protocol(format!(
                "unexpected reply prefix {:?}",
                other as char
            ))),
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

fn utf8(line: &[u8]) -> Result<String> {
    String::from_utf8(line.to_vec())
        .map_err(|e| ProxyError::Protocol(format!("reply line is not UTF-8: {e}")))
}

fn parse_int(line: &[u8]) -> Result<i64> {
    utf8(line)?
        .parse()
        .map_err(|e| ProxyError::Protocol(format!("invalid integer in reply: {e}")))
}
