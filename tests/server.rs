//! Module for the mock NETCONF device we use for testing.
//!
//! Start a mock device using [MockDevice::start], and hand the returned
//! stream to a [nxvlan::NetconfConnection]. [MockFactory] does both for
//! every session an [nxvlan::InterfaceService] opens.

#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{Read, Result, Write},
    os::unix::net::UnixStream,
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

use nxvlan::{Device, NetconfConnection, SessionFactory};

const END_OF_MESSAGE: &[u8] = b"]]>]]>";
const NETCONF_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// What a mock device answers, one body per rpc, in order. `close-session`
/// is always answered with `<ok/>` without consuming a body.
#[derive(Clone, Debug)]
pub struct Script {
    pub replies: Vec<String>,
    pub chunked: bool,
    pub split_writes: bool,
}

impl Script {
    /// Replies with `replies` over base 1.0 framing
    pub fn new<S: AsRef<str>>(replies: &[S]) -> Self {
        Script {
            replies: replies.iter().map(|r| r.as_ref().to_owned()).collect(),
            chunked: false,
            split_writes: false,
        }
    }

    /// Advertise base 1.1, so that chunked framing is used after the hello
    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    /// Write replies in randomly sized pieces, to test client buffering
    pub fn split_writes(mut self) -> Self {
        self.split_writes = true;
        self
    }
}

/// A mock NX-OS device that we use to test
pub struct MockDevice {
    requests: Arc<Mutex<Vec<String>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockDevice {
    /// Starts a device on one end of a socket pair, and returns the other
    /// end for the client along with the device.
    pub fn start(script: Script) -> Result<(UnixStream, MockDevice)> {
        let (client, server) = UnixStream::pair()?;
        server.set_read_timeout(Some(Duration::from_secs(5)))?;
        let requests = Arc::new(Mutex::new(vec![]));
        let recorder = requests.clone();
        let handle = thread::spawn(move || {
            if let Err(err) = Self::process_client(server, script, recorder) {
                log::debug!("mock: client went away: {}", err);
            }
        });
        Ok((
            client,
            MockDevice {
                requests,
                handle: Some(handle),
            },
        ))
    }

    /// Waits for the device to finish its conversation, and returns every
    /// rpc it received, the client hello excluded.
    pub fn wait(mut self) -> Vec<String> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("mock device panicked");
        }
        self.requests.lock().expect("poisoned").clone()
    }

    fn process_client(
        mut stream: UnixStream,
        script: Script,
        requests: Arc<Mutex<Vec<String>>>,
    ) -> Result<()> {
        let mut capabilities = String::from(
            "<capability>urn:ietf:params:netconf:base:1.0</capability>",
        );
        if script.chunked {
            capabilities.push_str("<capability>urn:ietf:params:netconf:base:1.1</capability>");
        }
        let hello = format!(
            "<hello xmlns=\"{}\"><capabilities>{}</capabilities><session-id>77</session-id></hello>",
            NETCONF_NS, capabilities
        );
        write_end_of_message(&mut stream, &hello, script.split_writes)?;

        let mut reader = FrameReader::default();
        let client_hello = reader.next_end_of_message(&mut stream)?;
        assert!(client_hello.contains("<hello"), "expected client hello");

        let mut replies: VecDeque<String> = script.replies.into();
        loop {
            let request = if script.chunked {
                reader.next_chunked(&mut stream)?
            } else {
                reader.next_end_of_message(&mut stream)?
            };
            requests.lock().expect("poisoned").push(request.clone());

            let closing = request.contains("<close-session/>");
            let body = if closing {
                "<ok/>".to_owned()
            } else {
                replies.pop_front().unwrap_or_else(|| {
                    "<rpc-error><error-type>rpc</error-type><error-tag>operation-failed</error-tag><error-severity>error</error-severity><error-message>no scripted reply</error-message></rpc-error>".to_owned()
                })
            };
            let reply = format!(
                "<rpc-reply message-id=\"{}\" xmlns=\"{}\">{}</rpc-reply>",
                message_id(&request),
                NETCONF_NS,
                body
            );
            if script.chunked {
                write_chunked(&mut stream, &reply, script.split_writes)?;
            } else {
                write_end_of_message(&mut stream, &reply, script.split_writes)?;
            }
            if closing {
                return Ok(());
            }
        }
    }
}

/// Opens a [MockDevice] session for each [Script], in order
pub struct MockFactory {
    scripts: RefCell<VecDeque<Script>>,
    devices: RefCell<Vec<MockDevice>>,
}

impl MockFactory {
    pub fn new(scripts: Vec<Script>) -> Self {
        MockFactory {
            scripts: RefCell::new(scripts.into()),
            devices: RefCell::new(vec![]),
        }
    }

    /// Number of sessions opened so far
    pub fn sessions(&self) -> usize {
        self.devices.borrow().len()
    }

    /// Requests received by every session opened so far, per session
    pub fn wait(self) -> Vec<Vec<String>> {
        self.devices
            .into_inner()
            .into_iter()
            .map(MockDevice::wait)
            .collect()
    }
}

impl SessionFactory for MockFactory {
    type Session = NetconfConnection<UnixStream>;

    fn open(&self, _device: &Device) -> nxvlan::Result<Self::Session> {
        let script = self
            .scripts
            .borrow_mut()
            .pop_front()
            .expect("no script left for another session");
        let (stream, device) = MockDevice::start(script)?;
        self.devices.borrow_mut().push(device);
        NetconfConnection::new(stream)
    }
}

#[derive(Default)]
struct FrameReader {
    buffer: Vec<u8>,
}

impl FrameReader {
    fn fill(&mut self, stream: &mut UnixStream) -> Result<()> {
        let mut frame = [0_u8; 512];
        let count = stream.read(&mut frame)?;
        if count == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        self.buffer.extend_from_slice(&frame[..count]);
        Ok(())
    }

    fn next_end_of_message(&mut self, stream: &mut UnixStream) -> Result<String> {
        loop {
            if let Some(pos) = self
                .buffer
                .windows(END_OF_MESSAGE.len())
                .position(|w| w == END_OF_MESSAGE)
            {
                let message = String::from_utf8_lossy(&self.buffer[..pos]).into_owned();
                self.buffer.drain(..pos + END_OF_MESSAGE.len());
                return Ok(message);
            }
            self.fill(stream)?;
        }
    }

    fn next_chunked(&mut self, stream: &mut UnixStream) -> Result<String> {
        let mut message = Vec::new();
        loop {
            while self.buffer.len() < 4 || !self.has_header() {
                self.fill(stream)?;
            }
            // buffer starts with "\n#"
            if self.buffer[2] == b'#' {
                while self.buffer.len() < 4 {
                    self.fill(stream)?;
                }
                self.buffer.drain(..4);
                return Ok(String::from_utf8_lossy(&message).into_owned());
            }
            let end = self.buffer[2..]
                .iter()
                .position(|&c| c == b'\n')
                .map(|p| p + 2)
                .expect("header is complete");
            let size: usize = std::str::from_utf8(&self.buffer[2..end])
                .expect("chunk size is ascii")
                .parse()
                .expect("chunk size is a number");
            while self.buffer.len() < end + 1 + size {
                self.fill(stream)?;
            }
            message.extend_from_slice(&self.buffer[end + 1..end + 1 + size]);
            self.buffer.drain(..end + 1 + size);
        }
    }

    /// Whether the buffer holds either an end-of-chunks marker or a complete
    /// chunk header
    fn has_header(&self) -> bool {
        assert!(self.buffer.starts_with(b"\n#"), "bad chunk framing");
        self.buffer[2] == b'#' || self.buffer[2..].contains(&b'\n')
    }
}

fn message_id(request: &str) -> String {
    request
        .split("message-id=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap_or("")
        .to_owned()
}

fn write_end_of_message(stream: &mut UnixStream, message: &str, split: bool) -> Result<()> {
    let mut bytes = message.as_bytes().to_vec();
    bytes.extend_from_slice(END_OF_MESSAGE);
    write_bytes(stream, &bytes, split)
}

fn write_chunked(stream: &mut UnixStream, message: &str, split: bool) -> Result<()> {
    // two chunks, so that reassembly gets exercised as well
    let bytes = message.as_bytes();
    let (first, second) = bytes.split_at(bytes.len() / 2);
    let mut framed = Vec::new();
    for chunk in [first, second] {
        framed.extend_from_slice(format!("\n#{}\n", chunk.len()).as_bytes());
        framed.extend_from_slice(chunk);
    }
    framed.extend_from_slice(b"\n##\n");
    write_bytes(stream, &framed, split)
}

fn write_bytes(stream: &mut UnixStream, bytes: &[u8], split: bool) -> Result<()> {
    if !split {
        stream.write_all(bytes)?;
        return stream.flush();
    }
    let mut rest = bytes;
    while !rest.is_empty() {
        let size = rand::random::<usize>() % 16 + 1;
        let (piece, tail) = rest.split_at(size.min(rest.len()));
        stream.write_all(piece)?;
        stream.flush()?;
        thread::sleep(Duration::from_millis(rand::random::<u64>() % 2));
        rest = tail;
    }
    Ok(())
}
