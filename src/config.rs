use std::fmt;
use std::time::Duration;

/// Host of Gmail's POP3 service.
pub const GMAIL_HOST: &str = "pop.gmail.com";
/// Well-known port for POP3 over implicit TLS.
pub const POP3S_PORT: u16 = 995;

/// Credentials and endpoint of one mailbox.
///
/// Fields are fixed once the value is built; use the accessors to read them.
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountConfig {
    host: String,
    port: u16,
    username: String,
    password: String,
    #[cfg_attr(feature = "serde", serde(default))]
    timeout: Option<Duration>,
}

impl AccountConfig {
    pub fn new<U, P, H>(username: U, password: P, host: H, port: u16) -> AccountConfig
    where
        U: Into<String>,
        P: Into<String>,
        H: Into<String>,
    {
        AccountConfig {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            timeout: None,
        }
    }

    /// Account on `pop.gmail.com:995`.
    pub fn gmail<U: Into<String>, P: Into<String>>(username: U, password: P) -> AccountConfig {
        AccountConfig::new(username, password, GMAIL_HOST, POP3S_PORT)
    }

    /// Bound the dial, and every read and write, of each connection made
    /// with this account. A zero duration means no timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> AccountConfig {
        self.timeout = Some(timeout).filter(|t| *t != Duration::from_secs(0));
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// `host:port`, as used when dialing and in error messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
