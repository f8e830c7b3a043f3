use openssl::ssl::{SslConnector, SslMethod, SslStream};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::errors::*;

/// Buffered TLS socket. Reads go through the buffer, writes straight to the
/// TLS session underneath it.
#[derive(Debug)]
pub struct TlsStream(BufReader<SslStream<TcpStream>>);

impl TlsStream {
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<TlsStream> {
        let tcp_stream = dial(host, port, timeout)?;
        tcp_stream.set_read_timeout(timeout)?;
        tcp_stream.set_write_timeout(timeout)?;
        let connector = SslConnector::builder(SslMethod::tls())?.build();
        let stream = connector
            .connect(host, tcp_stream)
            .map_err(|e| Error::from(ErrorKind::Tls(e.to_string())))?;
        Ok(TlsStream(BufReader::new(stream)))
    }
}

/// Opens the TCP connection, trying each resolved address in turn. With a
/// timeout, every attempt is bounded by it.
pub fn dial(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpStream> {
    let timeout = match timeout {
        Some(timeout) => timeout,
        None => return Ok(TcpStream::connect((host, port))?),
    };
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        trace!("Dialing {} (timeout {:?})", addr, timeout);
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error
        .unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} resolved to no addresses", host),
            )
        })
        .into())
}

impl Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.get_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.get_mut().flush()
    }
}

impl Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl BufRead for TlsStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.0.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.0.consume(amt)
    }
}

impl Drop for TlsStream {
    fn drop(&mut self) {
        let _ = self.0.get_mut().shutdown();
    }
}
