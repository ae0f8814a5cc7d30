//! The seam between the interface logic and whatever carries NETCONF to the
//! device.
//!
//! A [SessionFactory] opens one [Session] per operation; [SessionGuard]
//! makes sure that session gets closed again no matter how the operation
//! ends.

use crate::{Device, Result};

/// Datastores an `edit-config` can target. Only `running` is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Datastore {
    #[default]
    Running,
}

impl Datastore {
    /// Element name of the datastore inside `<target>`
    pub fn as_str(&self) -> &'static str {
        match self {
            Datastore::Running => "running",
        }
    }
}

/// An open NETCONF session with a device. Both operations return the raw
/// `rpc-reply` document; interpreting it is left to [crate::reply].
pub trait Session {
    /// Issues a `get` with `filter` as the subtree filter
    fn get(&mut self, filter: &str) -> Result<String>;

    /// Issues an `edit-config` writing `config` (a `<config>` element) into
    /// `target`
    fn edit_config(&mut self, target: Datastore, config: &str) -> Result<String>;

    /// Ends the session. Must be safe to call more than once.
    fn close(&mut self) -> Result<()>;
}

/// Opens sessions to a [Device]
pub trait SessionFactory {
    type Session: Session;

    /// Opens a new session, including any authentication and the NETCONF
    /// hello exchange
    fn open(&self, device: &Device) -> Result<Self::Session>;
}

impl<F: SessionFactory + ?Sized> SessionFactory for &F {
    type Session = F::Session;

    fn open(&self, device: &Device) -> Result<Self::Session> {
        (**self).open(device)
    }
}

/// Owns a [Session] for the duration of one operation and closes it when
/// dropped, unless it was closed explicitly via [SessionGuard::close].
pub struct SessionGuard<S: Session> {
    session: S,
    closed: bool,
}

impl<S: Session> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    /// Access to the guarded session
    pub fn session(&mut self) -> &mut S {
        &mut self.session
    }

    /// Closes the session now, returning the outcome of the close
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.session.close()
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(err) = self.session.close() {
                log::warn!("session: failed to close session: {}", err);
            }
        }
    }
}
