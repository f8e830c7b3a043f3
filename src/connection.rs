//! Blocking POP3 client, limited to the commands a fetch needs.

use regex::Regex;
use std::io::{BufRead, Write};
use std::time::Duration;

use crate::errors::*;
use crate::pop3result::POP3List;
use crate::tcpstream::TlsStream;
use crate::utils;

const LF: u8 = 0x0a;

#[derive(PartialEq, Debug, Clone, Copy)]
enum POP3State {
    Begin,
    Authorization,
    Transaction,
    // Update, // State unused in a Client
    End,
}

/// A positive server reply: the text after `+OK` and, for multi-line
/// replies, the dot-unstuffed body lines with their line endings.
#[derive(Debug)]
struct Response {
    status_text: String,
    lines: Vec<Vec<u8>>,
}

pub struct POP3Connection<S = TlsStream> {
    stream: S,
    state: POP3State,
    timestamp: Option<String>,
}

impl POP3Connection<TlsStream> {
    /// Dials `host:port`, negotiates TLS and reads the server greeting.
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<POP3Connection> {
        trace!("Initiate POP3 Connection to {}:{}", host, port);
        let stream = TlsStream::connect(host, port, timeout)?;
        trace!("Connection Established");
        POP3Connection::from_stream(stream)
    }
}

impl<S: BufRead + Write> POP3Connection<S> {
    /// Wraps an already connected stream and reads the greeting from it.
    pub fn from_stream(stream: S) -> Result<POP3Connection<S>> {
        let mut ctx = POP3Connection {
            stream,
            state: POP3State::Begin,
            timestamp: None,
        };
        debug!("POP3State::{:?}", ctx.state);
        ctx.read_greeting()?;
        ctx.state = POP3State::Authorization;
        debug!("POP3State::{:?}", ctx.state);
        Ok(ctx)
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        ensure!(
            self.state == POP3State::Authorization,
            ErrorKind::OutOfSequence("USER")
        );
        trace!("Attempting to Login");
        let auth_response = match self.send_command("USER", Some(username)) {
            Ok(_) => {
                debug!("Plain USER/PASS authentication");
                self.send_command("PASS", Some(password))
            }
            Err(e) => {
                let refused = matches!(e.kind(), ErrorKind::Server(_));
                match self.timestamp.clone() {
                    Some(ref timestamp) if refused => {
                        debug!("Authenticating using APOP");
                        let digest = utils::get_apop_digest(timestamp, password);
                        let apop_param = format!("{} {}", username, digest);
                        self.send_command("APOP", Some(&apop_param))
                    }
                    _ => Err(e),
                }
            }
        };

        // Switch the current state to TRANSACTION on a successful authentication
        auth_response?;
        self.state = POP3State::Transaction;
        debug!("POP3State::{:?}", self.state);
        Ok(())
    }

    pub fn list(&mut self) -> Result<POP3List> {
        ensure!(
            self.state == POP3State::Transaction,
            ErrorKind::OutOfSequence("LIST")
        );
        trace!("Cmd: LIST");
        let response = self.send_command("LIST", None)?;
        POP3List::parse(&response.lines)
    }

    /// Full text of message `msgnum`, CRLF line endings preserved.
    pub fn retr(&mut self, msgnum: u32) -> Result<Vec<u8>> {
        ensure!(
            self.state == POP3State::Transaction,
            ErrorKind::OutOfSequence("RETR")
        );
        trace!("Cmd: RETR");
        let response = self.send_command("RETR", Some(&msgnum.to_string()))?;
        Ok(response.lines.concat())
    }

    pub fn quit(&mut self) -> Result<()> {
        ensure!(
            self.state == POP3State::Authorization || self.state == POP3State::Transaction,
            ErrorKind::OutOfSequence("QUIT")
        );
        trace!("Cmd: QUIT");
        self.state = POP3State::End;
        debug!("POP3State::{:?}", self.state);
        self.send_command("QUIT", None)?;
        Ok(())
    }

    fn read_greeting(&mut self) -> Result<()> {
        lazy_static! {
            static ref TIMESTAMP: Regex = Regex::new(r"<[^<>]*>").unwrap();
        }
        trace!("Reading Greeting from Server");
        let greeting = self.read_response(false)?;
        self.timestamp = TIMESTAMP
            .find(&greeting.status_text)
            .map(|m| m.as_str().to_string());
        Ok(())
    }

    fn send_command(&mut self, command: &str, param: Option<&str>) -> Result<Response> {
        // Identify if the command is a multiline command
        let is_multiline = match command {
            "LIST" => param.is_none(),
            "RETR" => true,
            _ => false,
        };

        info!("C: {}", utils::loggable_command(command, param));
        let line = match param {
            Some(x) => format!("{} {}\r\n", command, x),
            None => format!("{}\r\n", command),
        };
        self.stream.write_all(line.as_bytes())?;
        self.stream.flush()?;

        self.read_response(is_multiline)
    }

    fn read_line(&mut self, buff: &mut Vec<u8>) -> Result<()> {
        buff.clear();
        if self.stream.read_until(LF, buff)? == 0 {
            bail!(ErrorKind::ConnectionClosed);
        }
        Ok(())
    }

    fn read_response(&mut self, is_multiline: bool) -> Result<Response> {
        lazy_static! {
            static ref RESPONSE: Regex =
                Regex::new(r"^(?P<status>\+OK|-ERR)(?: (?P<statustext>.*))?$").unwrap();
        }
        let mut buff = Vec::new();

        // First read the status line
        self.read_line(&mut buff)?;
        let status_line = String::from_utf8(buff.clone())?;
        info!("S: {}", status_line.trim_end());

        // Test if the response is positive. Else exit early.
        let response_groups = RESPONSE
            .captures(status_line.trim_end())
            .ok_or_else(|| ErrorKind::MalformedResponse(status_line.clone()))?;
        let status_text = response_groups
            .name("statustext")
            .map_or("", |m| m.as_str())
            .to_string();
        if &response_groups["status"] == "-ERR" {
            bail!(ErrorKind::Server(status_text));
        }

        let mut lines = Vec::new();
        if is_multiline {
            loop {
                self.read_line(&mut buff)?;
                if buff == b".\r\n" || buff == b".\n" {
                    break;
                }
                if buff.starts_with(b"..") {
                    buff.remove(0);
                }
                lines.push(buff.clone());
            }
        }
        Ok(Response { status_text, lines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    /// Replays canned server bytes and records what the client wrote.
    struct Scripted {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Scripted {
        fn new(server: &str) -> Scripted {
            Scripted {
                input: Cursor::new(server.as_bytes().to_vec()),
                output: Vec::new(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl BufRead for Scripted {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            self.input.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            self.input.consume(amt)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sent(conn: &POP3Connection<Scripted>) -> String {
        String::from_utf8(conn.stream.output.clone()).unwrap()
    }

    #[test]
    fn user_pass_login() {
        let server = "+OK POP3 ready\r\n+OK\r\n+OK logged in\r\n";
        let mut conn = POP3Connection::from_stream(Scripted::new(server)).unwrap();
        conn.login("me", "secret").unwrap();
        assert_eq!(conn.state, POP3State::Transaction);
        assert_eq!(sent(&conn), "USER me\r\nPASS secret\r\n");
    }

    #[test]
    fn apop_when_user_is_refused() {
        let server = "+OK POP3 server ready <1896.697170952@dbc.mtview.ca.us>\r\n\
                      -ERR USER not supported\r\n\
                      +OK maildrop has 1 message\r\n";
        let mut conn = POP3Connection::from_stream(Scripted::new(server)).unwrap();
        conn.login("mrose", "tanstaaf").unwrap();
        assert_eq!(
            sent(&conn),
            "USER mrose\r\nAPOP mrose c4c9334bac560ecc979e58001b3e22fb\r\n"
        );
    }

    #[test]
    fn rejected_password() {
        let server = "+OK ready\r\n+OK\r\n-ERR invalid password\r\n";
        let mut conn = POP3Connection::from_stream(Scripted::new(server)).unwrap();
        let err = conn.login("me", "wrong").unwrap_err();
        match *err.kind() {
            ErrorKind::Server(ref text) => assert_eq!(text, "invalid password"),
            ref other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(conn.state, POP3State::Authorization);
    }

    #[test]
    fn list_then_retr_unstuffs_dots() {
        let server = "+OK ready\r\n+OK\r\n+OK\r\n\
                      +OK 2 messages\r\n1 30\r\n2 45\r\n.\r\n\
                      +OK 30 octets\r\nSubject: hi\r\n\r\n..dotted\r\nplain\r\n.\r\n\
                      +OK bye\r\n";
        let mut conn = POP3Connection::from_stream(Scripted::new(server)).unwrap();
        conn.login("me", "pw").unwrap();
        assert_eq!(conn.list().unwrap().ids(), vec![1, 2]);
        let raw = conn.retr(1).unwrap();
        assert_eq!(raw, b"Subject: hi\r\n\r\n.dotted\r\nplain\r\n".to_vec());
        conn.quit().unwrap();
        assert_eq!(conn.state, POP3State::End);
        assert!(sent(&conn).ends_with("LIST\r\nRETR 1\r\nQUIT\r\n"));
    }

    #[test]
    fn retr_err_reply() {
        let server = "+OK ready\r\n+OK\r\n+OK\r\n-ERR no such message\r\n";
        let mut conn = POP3Connection::from_stream(Scripted::new(server)).unwrap();
        conn.login("me", "pw").unwrap();
        let err = conn.retr(9).unwrap_err();
        match *err.kind() {
            ErrorKind::Server(ref text) => assert_eq!(text, "no such message"),
            ref other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn eof_inside_multiline_reply() {
        let server = "+OK ready\r\n+OK\r\n+OK\r\n+OK\r\nSubject: cut\r\n";
        let mut conn = POP3Connection::from_stream(Scripted::new(server)).unwrap();
        conn.login("me", "pw").unwrap();
        let err = conn.retr(1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ConnectionClosed));
    }

    #[test]
    fn commands_out_of_sequence() {
        let mut conn = POP3Connection::from_stream(Scripted::new("+OK ready\r\n")).unwrap();
        let err = conn.retr(1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OutOfSequence("RETR")));
        assert!(sent(&conn).is_empty());
    }

    #[test]
    fn garbage_greeting() {
        let err = POP3Connection::from_stream(Scripted::new("HELLO\r\n")).err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::MalformedResponse(_)));
    }
}
