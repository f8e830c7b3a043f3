//! Turning message identifiers into parsed messages.
//!
//! Everything goes through [`Harvest`], a lazy sequence that retrieves and
//! parses one message per step. [`harvest_batch`] drains it into a
//! [`Batch`]; [`harvest_stream`] forwards each item to a channel as soon as
//! it is produced.

use std::iter::FusedIterator;
use std::slice;
use std::sync::mpsc::{Sender, SyncSender};

use crate::errors::*;
use crate::message::Message;
use crate::transport::Retrieve;

/// Retrieves message `id` and parses it.
pub fn retrieve_one<R: Retrieve + ?Sized>(retriever: &mut R, id: u32) -> Result<Message> {
    trace!("Harvesting message {}", id);
    let raw = retriever
        .retrieve(id)
        .chain_err(|| ErrorKind::Retrieval(id))?;
    Message::parse(&raw).chain_err(|| ErrorKind::Parse(id))
}

/// Parsed messages for a list of identifiers, produced one at a time in
/// list order. Yields at most one error, after which it is exhausted.
pub struct Harvest<'a, R: ?Sized> {
    retriever: &'a mut R,
    ids: slice::Iter<'a, u32>,
    failed: bool,
}

impl<'a, R: Retrieve + ?Sized> Harvest<'a, R> {
    pub fn new(retriever: &'a mut R, ids: &'a [u32]) -> Harvest<'a, R> {
        Harvest {
            retriever,
            ids: ids.iter(),
            failed: false,
        }
    }
}

impl<'a, R: Retrieve + ?Sized> Iterator for Harvest<'a, R> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Result<Message>> {
        if self.failed {
            return None;
        }
        let id = *self.ids.next()?;
        let item = retrieve_one(&mut *self.retriever, id);
        self.failed = item.is_err();
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.ids.len()))
        }
    }
}

impl<'a, R: Retrieve + ?Sized> FusedIterator for Harvest<'a, R> {}

/// Outcome of a batch fetch: one slot per listed identifier, filled in
/// order, plus the error that stopped the fetch early, if any.
#[derive(Debug)]
pub struct Batch {
    slots: Vec<Option<Message>>,
    error: Option<Error>,
}

impl Batch {
    /// A fetch that failed before any identifier was known.
    pub fn failed(error: Error) -> Batch {
        Batch {
            slots: Vec::new(),
            error: Some(error),
        }
    }

    pub fn slots(&self) -> &[Option<Message>] {
        &self.slots
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Messages harvested before the fetch stopped.
    pub fn harvested(&self) -> impl Iterator<Item = &Message> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn into_parts(self) -> (Vec<Option<Message>>, Option<Error>) {
        (self.slots, self.error)
    }

    /// Every message, or the error that stopped the fetch.
    pub fn into_result(self) -> Result<Vec<Message>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.slots.into_iter().flatten().collect()),
        }
    }
}

/// Retrieves and parses every identifier in order, stopping at the first
/// failure. Slots after the failing identifier stay `None`.
pub fn harvest_batch<R: Retrieve + ?Sized>(retriever: &mut R, ids: &[u32]) -> Batch {
    let mut slots = Vec::with_capacity(ids.len());
    slots.resize_with(ids.len(), || None);
    let mut error = None;

    for (slot, item) in slots.iter_mut().zip(Harvest::new(retriever, ids)) {
        match item {
            Ok(message) => *slot = Some(message),
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }
    Batch { slots, error }
}

/// Receiving side of a message queue.
///
/// A failed delivery hands the item back; it means nobody is listening any
/// more.
pub trait Deliver<T> {
    fn deliver(&self, item: T) -> ::std::result::Result<(), T>;
}

impl<T> Deliver<T> for Sender<T> {
    fn deliver(&self, item: T) -> ::std::result::Result<(), T> {
        self.send(item).map_err(|e| e.0)
    }
}

/// Blocks while the channel is full.
impl<T> Deliver<T> for SyncSender<T> {
    fn deliver(&self, item: T) -> ::std::result::Result<(), T> {
        self.send(item).map_err(|e| e.0)
    }
}

impl<'a, T, D: Deliver<T> + ?Sized> Deliver<T> for &'a D {
    fn deliver(&self, item: T) -> ::std::result::Result<(), T> {
        (**self).deliver(item)
    }
}

/// Retrieves and parses every identifier in order, delivering each message
/// before moving on to the next. Returns how many were delivered.
///
/// On failure nothing is delivered for the failing identifier; messages
/// already delivered stay delivered.
pub fn harvest_stream<R, D>(retriever: &mut R, ids: &[u32], sink: &D) -> Result<usize>
where
    R: Retrieve + ?Sized,
    D: Deliver<Message> + ?Sized,
{
    let mut delivered = 0;
    for (&id, item) in ids.iter().zip(Harvest::new(retriever, ids)) {
        let message = item?;
        if sink.deliver(message).is_err() {
            debug!("Receiver gone, stopping before message {}", id);
            bail!(ErrorKind::QueueClosed(id));
        }
        delivered += 1;
    }
    Ok(delivered)
}
