//! Fetch every message waiting in a POP3-over-TLS mailbox and parse it.
//!
//! A [`Fetcher`] connects, authenticates, lists the mailbox and then
//! retrieves and parses each message in listed order. Results come back
//! either as a [`Batch`] or one at a time through a channel:
//!
//! ```no_run
//! use pop3_harvest::Fetcher;
//!
//! let fetcher = Fetcher::gmail("someone@gmail.com", "app-password");
//! for message in fetcher.fetch_messages()? {
//!     println!("{:?}", message.subject());
//! }
//! # Ok::<(), pop3_harvest::errors::Error>(())
//! ```
//!
//! The first retrieval or parse failure ends the fetch. The connection is
//! released exactly once whichever stage failed.

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;
extern crate mailparse;
extern crate md5;
extern crate openssl;
extern crate regex;

pub mod errors {
    error_chain! {
        foreign_links {
            Io(::std::io::Error);
            SslStack(::openssl::error::ErrorStack);
            UTF8Error(::std::string::FromUtf8Error);
            RegexError(::regex::Error);
            MailParse(::mailparse::MailParseError);
        }

        errors {
            Connection(address: String) {
                description("could not dial server")
                display("could not dial server {}", address)
            }
            Authentication(username: String) {
                description("could not authenticate")
                display("could not authenticate as {}", username)
            }
            Listing {
                description("could not list messages")
                display("could not list messages")
            }
            Retrieval(id: u32) {
                description("could not retrieve message")
                display("could not retrieve message (id={})", id)
            }
            Parse(id: u32) {
                description("could not read message")
                display("could not read message (id={})", id)
            }
            QueueClosed(id: u32) {
                description("message receiver hung up")
                display("receiver hung up before message (id={}) was delivered", id)
            }
            Tls(reason: String) {
                description("TLS handshake failed")
                display("TLS handshake failed: {}", reason)
            }
            Server(text: String) {
                description("server replied -ERR")
                display("server replied -ERR {}", text)
            }
            MalformedResponse(line: String) {
                description("un-parseable response")
                display("un-parseable response: {:?}", line)
            }
            ConnectionClosed {
                description("connection closed by server")
                display("connection closed by server")
            }
            OutOfSequence(command: &'static str) {
                description("command issued in the wrong session state")
                display("{} issued in the wrong session state", command)
            }
            MalformedMessage(reason: String) {
                description("malformed message")
                display("malformed message: {}", reason)
            }
        }
    }
}

pub mod config;
pub mod connection;
pub mod fetcher;
pub mod harvest;
pub mod message;
pub mod pop3result;
pub mod session;
mod tcpstream;
pub mod transport;
mod utils;

pub use config::AccountConfig;
pub use fetcher::Fetcher;
pub use harvest::{harvest_batch, harvest_stream, retrieve_one, Batch, Deliver, Harvest};
pub use message::{Header, Message};
pub use session::{FetchState, MailboxSession};
pub use tcpstream::TlsStream;
pub use transport::{Connect, Pop3Client, Retrieve, TlsConnector};
