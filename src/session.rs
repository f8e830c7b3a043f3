use crate::config::AccountConfig;
use crate::errors::*;
use crate::harvest::{self, Batch, Deliver};
use crate::message::Message;
use crate::transport::{Connect, Pop3Client, Retrieve};

/// Where a fetch stands. Stages are never skipped; any failure jumps to
/// `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Connected,
    Authenticated,
    Listed,
    Harvesting,
    Completed,
    Failed,
}

/// An authenticated, listed mailbox connection owned by one fetch.
///
/// The connection is released with QUIT exactly once: by [`close`], or
/// when the session is dropped without having been closed.
///
/// [`close`]: MailboxSession::close
pub struct MailboxSession<C: Pop3Client> {
    client: C,
    state: FetchState,
    released: bool,
}

impl<C: Pop3Client> MailboxSession<C> {
    /// Dials the account's server, authenticates and lists the mailbox.
    ///
    /// Returns the session with the message identifiers in server order.
    pub fn open<K>(connector: &K, config: &AccountConfig) -> Result<(MailboxSession<C>, Vec<u32>)>
    where
        K: Connect<Client = C> + ?Sized,
    {
        debug!("FetchState::{:?}", FetchState::Idle);
        let client = connector
            .connect(config.host(), config.port())
            .chain_err(|| ErrorKind::Connection(config.address()))?;
        let mut session = MailboxSession {
            client,
            state: FetchState::Idle,
            released: false,
        };
        session.advance(FetchState::Connected);

        let authenticated = session
            .client
            .authenticate(config.username(), config.password())
            .chain_err(|| ErrorKind::Authentication(config.username().to_string()));
        session.settle(authenticated, FetchState::Authenticated)?;

        let listing = session.client.list_all().chain_err(|| ErrorKind::Listing);
        let listing = session.settle(listing, FetchState::Listed)?;
        let ids: Vec<u32> = listing.iter().map(|entry| entry.msg_id).collect();
        info!("{} message(s) waiting on {}", ids.len(), config.address());
        Ok((session, ids))
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Harvests `ids` into a batch; see [`harvest::harvest_batch`].
    pub fn harvest_batch(&mut self, ids: &[u32]) -> Batch {
        self.advance(FetchState::Harvesting);
        let batch = harvest::harvest_batch(&mut self.client, ids);
        self.finish(batch.is_complete());
        batch
    }

    /// Harvests `ids` into `sink`; see [`harvest::harvest_stream`].
    pub fn harvest_stream<D>(&mut self, ids: &[u32], sink: &D) -> Result<usize>
    where
        D: Deliver<Message> + ?Sized,
    {
        self.advance(FetchState::Harvesting);
        let delivered = harvest::harvest_stream(&mut self.client, ids, sink);
        self.finish(delivered.is_ok());
        delivered
    }

    /// Sends QUIT. Calling it again, or dropping the session afterwards,
    /// does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        trace!("Releasing mailbox connection");
        self.client.quit()
    }

    fn advance(&mut self, next: FetchState) {
        self.state = next;
        debug!("FetchState::{:?}", self.state);
    }

    fn finish(&mut self, ok: bool) {
        self.advance(if ok {
            FetchState::Completed
        } else {
            FetchState::Failed
        });
    }

    fn settle<T>(&mut self, step: Result<T>, next: FetchState) -> Result<T> {
        self.advance(if step.is_ok() { next } else { FetchState::Failed });
        step
    }
}

impl<C: Pop3Client> Retrieve for MailboxSession<C> {
    fn retrieve(&mut self, id: u32) -> Result<Vec<u8>> {
        self.client.retrieve(id)
    }
}

impl<C: Pop3Client> Drop for MailboxSession<C> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Could not release mailbox connection: {}", e);
        }
    }
}
