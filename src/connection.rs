//! Module that deals with the NETCONF session layer: the hello exchange,
//! message framing and rpc sequencing.
//!
//! Refer to documentation of [NetconfConnection] for more details.

use std::io::{ErrorKind, Read, Write};

use serde::Deserialize;

use crate::{
    parse_edit_config_reply, reply::scan_document, reply_message_id, Datastore, Error, Result,
    Session,
};

/// Capability of NETCONF 1.0, end-of-message framing
pub const BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";
/// Capability of NETCONF 1.1, chunked framing
pub const BASE_1_1: &str = "urn:ietf:params:netconf:base:1.1";

/// How messages are delimited on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// NETCONF 1.0: every message is terminated by `]]>]]>`
    EndOfMessage,
    /// NETCONF 1.1: messages are sent as a series of `\n#<size>\n` chunks,
    /// terminated by `\n##\n`
    Chunked,
}

/// An active NETCONF session over a blocking byte stream, e.g. the channel
/// of an SSH `netconf` subsystem.
///
/// The request/response mechanism is serial: [NetconfConnection::send_rpc]
/// writes one rpc and blocks until its reply has been fully read.
pub struct NetconfConnection<S> {
    stream: S,
    unparsed_bytes: Vec<u8>,
    framing: Framing,
    session_id: Option<u32>,
    capabilities: Vec<String>,
    next_message_id: u64,
    closed: bool,
}

impl<S: Read + Write> NetconfConnection<S> {
    /// Performs the hello exchange on `stream` and returns the [NetconfConnection].
    ///
    /// We advertise both base 1.0 and 1.1; chunked framing is used from here
    /// on if the server advertises 1.1 as well.
    pub fn new(stream: S) -> Result<Self> {
        let mut connection = NetconfConnection {
            stream,
            unparsed_bytes: Vec::with_capacity(2 * READ_FRAME_SIZE),
            // hellos are always delimited the 1.0 way
            framing: Framing::EndOfMessage,
            session_id: None,
            capabilities: vec![],
            next_message_id: FIRST_MESSAGE_ID,
            closed: false,
        };

        connection.write_message(&client_hello())?;
        let hello = connection.next_message()?;
        log::trace!("conn: received hello {}", hello);
        let hello = ServerHello::parse(&hello)?;

        let capabilities: Vec<String> = hello
            .capabilities
            .capability
            .iter()
            .map(|c| c.trim().to_owned())
            .collect();
        connection.framing = if capabilities.iter().any(|c| c == BASE_1_1) {
            Framing::Chunked
        } else if capabilities.iter().any(|c| c == BASE_1_0) {
            Framing::EndOfMessage
        } else {
            return Err(Error::InvalidToken(
                "server supports neither base:1.0 nor base:1.1".into(),
            ));
        };
        connection.session_id = hello.session_id;
        connection.capabilities = capabilities;
        log::debug!(
            "conn: hello completed, session {:?} using {:?} framing",
            connection.session_id,
            connection.framing
        );
        Ok(connection)
    }

    /// Session id assigned by the server in its hello
    pub fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    /// Capabilities advertised by the server in its hello
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Wraps `operation` in an `<rpc>` element, sends it, and returns the
    /// raw `rpc-reply`.
    pub fn send_rpc(&mut self, operation: &str) -> Result<String> {
        if self.closed {
            return Err(Error::TransportError("session already closed".into()));
        }
        self.exchange(operation)
    }

    fn exchange(&mut self, operation: &str) -> Result<String> {
        let message_id = self.next_message_id;
        self.next_message_id += 1;

        let rpc = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rpc message-id=\"{}\" xmlns=\"{}\">\n{}\n</rpc>",
            message_id, NETCONF_NS, operation
        );
        log::debug!("conn: sending rpc {}", message_id);
        log::trace!("conn: rpc {}", rpc);
        self.write_message(&rpc)?;

        let reply = self.next_message()?;
        log::trace!("conn: reply {}", reply);
        if let Some(reply_id) = reply_message_id(&reply) {
            if reply_id != message_id.to_string() {
                log::warn!(
                    "conn: sent rpc {} but reply carries message-id {}",
                    message_id,
                    reply_id
                );
            }
        }
        Ok(reply)
    }

    /// Writes `message` to the server using the current framing, returning
    /// only after it has been written fully.
    fn write_message(&mut self, message: &str) -> Result<()> {
        match self.framing {
            Framing::EndOfMessage => {
                self.stream.write_all(message.as_bytes())?;
                self.stream.write_all(END_OF_MESSAGE)?;
            }
            Framing::Chunked => {
                if !message.is_empty() {
                    write!(self.stream, "\n#{}\n", message.len())?;
                    self.stream.write_all(message.as_bytes())?;
                }
                self.stream.write_all(END_OF_CHUNKS)?;
            }
        }
        self.stream.flush()?;
        Ok(())
    }

    /// Reads a full message from the server, and returns it
    fn next_message(&mut self) -> Result<String> {
        loop {
            if let Some(message) = self.take_message()? {
                return Ok(message);
            }
            // we are here because we don't have sufficient data in
            // unparsed_bytes to complete a message, so we have to fetch more
            self.fetch_new_bytes()?;
        }
    }

    /// Removes the first complete message from `unparsed_bytes`, if there
    /// is one
    fn take_message(&mut self) -> Result<Option<String>> {
        let decoded = match self.framing {
            Framing::EndOfMessage => decode_end_of_message(&self.unparsed_bytes),
            Framing::Chunked => decode_chunked(&self.unparsed_bytes)?,
        };
        match decoded {
            Some((body, consumed)) => {
                self.unparsed_bytes.drain(..consumed);
                log::trace!(
                    "conn: framed a message of {} bytes, {} bytes pending",
                    body.len(),
                    self.unparsed_bytes.len()
                );
                Ok(Some(std::str::from_utf8(&body)?.trim().to_owned()))
            }
            None => Ok(None),
        }
    }

    fn fetch_new_bytes(&mut self) -> Result<()> {
        let mut frame = [0_u8; READ_FRAME_SIZE];
        loop {
            match self.stream.read(&mut frame) {
                Ok(0) => return Err(Error::eof("premature EOF")),
                Ok(count) => {
                    self.unparsed_bytes.extend_from_slice(&frame[..count]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::IoError(err)),
            }
        }
    }
}

impl<S: Read + Write> Session for NetconfConnection<S> {
    fn get(&mut self, filter: &str) -> Result<String> {
        self.send_rpc(&format!(
            "<get>\n<filter type=\"subtree\">\n{}\n</filter>\n</get>",
            filter
        ))
    }

    fn edit_config(&mut self, target: Datastore, config: &str) -> Result<String> {
        self.send_rpc(&format!(
            "<edit-config>\n<target><{}/></target>\n{}\n</edit-config>",
            target.as_str(),
            config
        ))
    }

    /// Sends `close-session`. A second call is a no-op, and so is a call
    /// after a failed first attempt.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let reply = self.exchange("<close-session/>")?;
        parse_edit_config_reply(&reply)?;
        log::debug!("conn: session {:?} closed", self.session_id);
        Ok(())
    }
}

/// Looks for a complete `]]>]]>` delimited message at the start of `buffer`.
/// Returns the message body and the number of bytes it occupied, delimiter
/// included.
fn decode_end_of_message(buffer: &[u8]) -> Option<(Vec<u8>, usize)> {
    buffer
        .windows(END_OF_MESSAGE.len())
        .position(|w| w == END_OF_MESSAGE)
        .map(|pos| (buffer[..pos].to_vec(), pos + END_OF_MESSAGE.len()))
}

/// Looks for a complete chunked message at the start of `buffer`. Returns
/// `Ok(None)` if more data is needed.
///
/// The layout is a series of chunks, each `\n#<size>\n` followed by `size`
/// bytes of data, and finally `\n##\n`. Sizes are decimal without leading
/// zeros, in 1..=4294967295.
fn decode_chunked(buffer: &[u8]) -> Result<Option<(Vec<u8>, usize)>> {
    let bsize = buffer.len();
    let mut body = Vec::new();
    let mut pos = 0;
    loop {
        // every chunk header, and the end marker, starts with "\n#"
        if pos + 2 > bsize {
            return Ok(None);
        }
        if &buffer[pos..pos + 2] != b"\n#" {
            return Err(Error::InvalidToken(format!(
                "expected chunk header at offset {}",
                pos
            )));
        }
        pos += 2;
        if pos >= bsize {
            return Ok(None);
        }

        if buffer[pos] == b'#' {
            if pos + 1 >= bsize {
                return Ok(None);
            }
            if buffer[pos + 1] != b'\n' {
                return Err(Error::InvalidToken("malformed end of chunks marker".into()));
            }
            return Ok(Some((body, pos + 2)));
        }

        let digits_start = pos;
        while pos < bsize && buffer[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos >= bsize {
            return Ok(None);
        }
        let digits = &buffer[digits_start..pos];
        if buffer[pos] != b'\n'
            || digits.is_empty()
            || digits.len() > MAX_CHUNK_SIZE_DIGITS
            || digits[0] == b'0'
        {
            return Err(Error::InvalidToken(format!(
                "invalid chunk size {:?}",
                String::from_utf8_lossy(digits)
            )));
        }
        let size: u64 = std::str::from_utf8(digits)?.parse()?;
        if size > MAX_CHUNK_SIZE {
            return Err(Error::InvalidToken(format!("chunk size {} too large", size)));
        }
        pos += 1;

        let size = size as usize;
        if pos + size > bsize {
            return Ok(None);
        }
        body.extend_from_slice(&buffer[pos..pos + size]);
        pos += size;
    }
}

fn client_hello() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<hello xmlns=\"{}\">\n  <capabilities>\n    <capability>{}</capability>\n    <capability>{}</capability>\n  </capabilities>\n</hello>",
        NETCONF_NS, BASE_1_0, BASE_1_1
    )
}

#[derive(Debug, Deserialize)]
struct ServerHello {
    #[serde(default)]
    capabilities: Capabilities,
    #[serde(rename = "session-id", default)]
    session_id: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct Capabilities {
    #[serde(default)]
    capability: Vec<String>,
}

impl ServerHello {
    fn parse(xml: &str) -> Result<Self> {
        scan_document(xml, "hello")
            .map_err(|e| Error::InvalidToken(format!("did not find hello: {}", e)))?;
        quick_xml::de::from_str(xml)
            .map_err(|e| Error::InvalidToken(format!("failed to decode hello: {}", e)))
    }
}

/// Namespace of the NETCONF base protocol
const NETCONF_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Message-id of the first rpc on every session
const FIRST_MESSAGE_ID: u64 = 101;

const END_OF_MESSAGE: &[u8] = b"]]>]]>";
const END_OF_CHUNKS: &[u8] = b"\n##\n";

const MAX_CHUNK_SIZE: u64 = 4_294_967_295;
const MAX_CHUNK_SIZE_DIGITS: usize = 10;

/// Reads are done in sizes of this
const READ_FRAME_SIZE: usize = 2048;
