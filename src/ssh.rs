//! NETCONF over SSH (RFC 6242), using the `netconf` subsystem.

use std::{
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use crate::{Device, Error, NetconfConnection, Result, SessionFactory};

/// Opens a [NetconfConnection] over SSH for each session.
///
/// Authentication is by password. The server's host key is not verified.
#[derive(Debug, Clone, Default)]
pub struct SshSessionFactory {
    timeout: Option<Duration>,
}

impl SshSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the TCP connect, and every blocking SSH operation afterwards,
    /// to `timeout`. Without it, operations block until the device answers
    /// or the connection drops.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn connect_tcp(&self, device: &Device) -> Result<TcpStream> {
        let target = (device.address(), device.port());
        let Some(timeout) = self.timeout else {
            return Ok(TcpStream::connect(target)?);
        };

        let mut last_err = None;
        for addr in target.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    log::debug!("ssh: failed to connect to {}: {}", addr, err);
                    last_err = Some(err);
                }
            }
        }
        match last_err {
            Some(err) => Err(Error::IoError(err)),
            None => Err(Error::TransportError(format!(
                "{} did not resolve to any address",
                device.address()
            ))),
        }
    }
}

impl SessionFactory for SshSessionFactory {
    type Session = NetconfConnection<ssh2::Channel>;

    fn open(&self, device: &Device) -> Result<Self::Session> {
        log::debug!(
            "ssh: connecting to {}@{}:{}",
            device.username(),
            device.address(),
            device.port()
        );
        let tcp = self.connect_tcp(device)?;

        let mut session = ssh2::Session::new()?;
        if let Some(timeout) = self.timeout {
            session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        }
        session.set_tcp_stream(tcp);
        session.handshake()?;
        session.userauth_password(device.username(), device.password())?;
        if !session.authenticated() {
            return Err(Error::TransportError(format!(
                "authentication failed for {}",
                device.username()
            )));
        }

        let mut channel = session.channel_session()?;
        channel.subsystem("netconf")?;
        log::trace!("ssh: netconf subsystem started");
        NetconfConnection::new(channel)
    }
}
