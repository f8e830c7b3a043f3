//! Seams between the fetch logic and the POP3 protocol client.
//!
//! The harvester only needs [`Retrieve`]; the session needs the rest of
//! [`Pop3Client`]. Tests substitute both with in-memory fakes.

use std::io::{BufRead, Write};

use crate::connection::POP3Connection;
use crate::errors::*;
use crate::pop3result::EmailMetadata;
use crate::tcpstream::TlsStream;
use std::time::Duration;

/// Capability to fetch the raw text of one message by its identifier.
pub trait Retrieve {
    fn retrieve(&mut self, id: u32) -> Result<Vec<u8>>;
}

impl<'a, R: Retrieve + ?Sized> Retrieve for &'a mut R {
    fn retrieve(&mut self, id: u32) -> Result<Vec<u8>> {
        (**self).retrieve(id)
    }
}

/// A connected POP3 client, still in the AUTHORIZATION state.
pub trait Pop3Client: Retrieve {
    fn authenticate(&mut self, username: &str, password: &str) -> Result<()>;

    /// Identifier and size of every message, in server order.
    fn list_all(&mut self) -> Result<Vec<EmailMetadata>>;

    fn quit(&mut self) -> Result<()>;
}

/// Opens connections to a POP3 server.
pub trait Connect {
    type Client: Pop3Client;

    fn connect(&self, host: &str, port: u16) -> Result<Self::Client>;
}

/// Production connector: POP3 over implicit TLS using OpenSSL.
#[derive(Debug, Clone, Default)]
pub struct TlsConnector {
    timeout: Option<Duration>,
}

impl TlsConnector {
    pub fn new(timeout: Option<Duration>) -> TlsConnector {
        TlsConnector { timeout }
    }
}

impl Connect for TlsConnector {
    type Client = POP3Connection<TlsStream>;

    fn connect(&self, host: &str, port: u16) -> Result<Self::Client> {
        POP3Connection::connect(host, port, self.timeout)
    }
}

impl<S: BufRead + Write> Retrieve for POP3Connection<S> {
    fn retrieve(&mut self, id: u32) -> Result<Vec<u8>> {
        self.retr(id)
    }
}

impl<S: BufRead + Write> Pop3Client for POP3Connection<S> {
    fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        self.login(username, password)
    }

    fn list_all(&mut self) -> Result<Vec<EmailMetadata>> {
        Ok(self.list()?.mailbox)
    }

    fn quit(&mut self) -> Result<()> {
        POP3Connection::quit(self)
    }
}
