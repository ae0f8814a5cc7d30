use secrecy::{ExposeSecret, SecretString};

/// Default port of the NETCONF SSH subsystem
pub const NETCONF_PORT: u16 = 830;

/// A device to manage, along with the credentials used to log into it.
///
/// The password is never printed by the `Debug` impl.
#[derive(Debug)]
pub struct Device {
    address: String,
    port: u16,
    username: String,
    password: SecretString,
}

impl Device {
    /// Creates a [Device] reachable at `address` on [NETCONF_PORT]. This does
    /// not connect to anything.
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Device {
            address: address.into(),
            port: NETCONF_PORT,
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Use `port` instead of [NETCONF_PORT]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Host name or IP address
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device() {
        let device = Device::new("10.0.0.1", "admin", "hunter2").with_port(2830);
        assert_eq!(device.address(), "10.0.0.1");
        assert_eq!(device.port(), 2830);
        assert_eq!(device.username(), "admin");
        assert_eq!(device.password(), "hunter2");
        assert!(!format!("{:?}", device).contains("hunter2"));
    }

    #[test]
    fn test_default_port() {
        assert_eq!(Device::new("sw1", "admin", "x").port(), 830);
    }
}
