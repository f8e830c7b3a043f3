use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use crate::config::AccountConfig;
use crate::errors::*;
use crate::harvest::{Batch, Deliver};
use crate::message::Message;
use crate::session::MailboxSession;
use crate::transport::{Connect, Pop3Client, TlsConnector};

/// Fetches every message of one mailbox.
///
/// Each call runs a complete fetch on a fresh connection: connect,
/// authenticate, list, then retrieve and parse message by message. The
/// first failure ends the fetch, and the connection is released on the way
/// out whatever happened.
#[derive(Debug, Clone)]
pub struct Fetcher<C = TlsConnector> {
    config: AccountConfig,
    connector: C,
}

impl Fetcher<TlsConnector> {
    pub fn new(config: AccountConfig) -> Fetcher {
        let connector = TlsConnector::new(config.timeout());
        Fetcher { config, connector }
    }

    /// Gmail account (`pop.gmail.com:995`).
    pub fn gmail<U: Into<String>, P: Into<String>>(username: U, password: P) -> Fetcher {
        Fetcher::new(AccountConfig::gmail(username, password))
    }

    /// Any POP3-over-TLS endpoint.
    pub fn tls<U, P, H>(username: U, password: P, host: H, port: u16) -> Fetcher
    where
        U: Into<String>,
        P: Into<String>,
        H: Into<String>,
    {
        Fetcher::new(AccountConfig::new(username, password, host, port))
    }
}

impl<C: Connect> Fetcher<C> {
    /// Uses `connector` instead of the TLS transport.
    pub fn with_connector(config: AccountConfig, connector: C) -> Fetcher<C> {
        Fetcher { config, connector }
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// Runs a fetch and collects the results.
    ///
    /// The batch has one slot per listed message. After a failure it holds
    /// the messages parsed before it, and the error.
    pub fn fetch_batch(&self) -> Batch {
        let (mut session, ids) = match MailboxSession::open(&self.connector, &self.config) {
            Ok(opened) => opened,
            Err(e) => return Batch::failed(e),
        };
        let batch = session.harvest_batch(&ids);
        release(&mut session);
        batch
    }

    /// Every message in the mailbox, or the first error.
    pub fn fetch_messages(&self) -> Result<Vec<Message>> {
        self.fetch_batch().into_result()
    }

    /// Runs a fetch, delivering each message to `sink` as soon as it is
    /// parsed. Returns how many messages were delivered.
    pub fn fetch_stream<D>(&self, sink: &D) -> Result<usize>
    where
        D: Deliver<Message> + ?Sized,
    {
        let (mut session, ids) = MailboxSession::open(&self.connector, &self.config)?;
        let delivered = session.harvest_stream(&ids, sink)?;
        release(&mut session);
        Ok(delivered)
    }
}

impl<C: Connect + Send + 'static> Fetcher<C> {
    /// Runs [`fetch_stream`] on its own thread, feeding an unbounded
    /// channel. Dropping the receiver stops the fetch at the next message.
    ///
    /// [`fetch_stream`]: Fetcher::fetch_stream
    pub fn spawn_stream(self) -> (Receiver<Message>, JoinHandle<Result<usize>>) {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || self.fetch_stream(&tx));
        (rx, handle)
    }
}

fn release<C: Pop3Client>(session: &mut MailboxSession<C>) {
    if let Err(e) = session.close() {
        warn!("Could not release mailbox connection: {}", e);
    }
}
