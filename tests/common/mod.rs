#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use pop3_harvest::errors::*;
use pop3_harvest::pop3result::EmailMetadata;
use pop3_harvest::{AccountConfig, Connect, Fetcher, Pop3Client, Retrieve};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn mail(subject: &str) -> String {
    format!(
        "From: sender@example.org\r\nSubject: {}\r\nDate: Mon, 2 Mar 2020 09:00:00 +0000\r\n\r\nbody of {}\r\n",
        subject, subject
    )
}

/// What the fake server holds and which of its replies are refusals.
#[derive(Clone, Debug, Default)]
pub struct Script {
    pub refuse_dial: bool,
    pub refuse_login: bool,
    pub refuse_list: bool,
    pub refuse_quit: bool,
    /// `None` makes RETR of that id fail.
    pub messages: Vec<(u32, Option<String>)>,
}

impl Script {
    pub fn with_subjects(subjects: &[&str]) -> Script {
        Script {
            messages: subjects
                .iter()
                .enumerate()
                .map(|(i, s)| (i as u32 + 1, Some(mail(s))))
                .collect(),
            ..Script::default()
        }
    }
}

/// Everything the fetch asked of the fake server.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    pub commands: Vec<String>,
    pub quits: usize,
}

impl Journal {
    pub fn saw(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c == command)
    }
}

#[derive(Clone, Debug)]
pub struct FakeConnector {
    script: Script,
    journal: Arc<Mutex<Journal>>,
}

impl FakeConnector {
    pub fn new(script: Script) -> FakeConnector {
        FakeConnector {
            script,
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    pub fn journal(&self) -> Journal {
        self.journal.lock().unwrap().clone()
    }
}

pub fn config() -> AccountConfig {
    AccountConfig::new("me@example.org", "secret", "mail.example.org", 995)
}

pub fn fetcher(script: Script) -> (Fetcher<FakeConnector>, FakeConnector) {
    let connector = FakeConnector::new(script);
    (Fetcher::with_connector(config(), connector.clone()), connector)
}

pub struct FakeClient {
    script: Script,
    journal: Arc<Mutex<Journal>>,
}

impl FakeClient {
    fn record(&self, command: String) {
        self.journal.lock().unwrap().commands.push(command);
    }
}

impl Connect for FakeConnector {
    type Client = FakeClient;

    fn connect(&self, host: &str, port: u16) -> Result<FakeClient> {
        self.journal
            .lock()
            .unwrap()
            .commands
            .push(format!("CONNECT {}:{}", host, port));
        if self.script.refuse_dial {
            let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
            return Err(refused.into());
        }
        Ok(FakeClient {
            script: self.script.clone(),
            journal: self.journal.clone(),
        })
    }
}

impl Retrieve for FakeClient {
    fn retrieve(&mut self, id: u32) -> Result<Vec<u8>> {
        self.record(format!("RETR {}", id));
        let text = self
            .script
            .messages
            .iter()
            .find(|&&(msg_id, _)| msg_id == id)
            .and_then(|(_, text)| text.clone());
        match text {
            Some(text) => Ok(text.into_bytes()),
            None => Err(ErrorKind::Server("no such message".to_string()).into()),
        }
    }
}

impl Pop3Client for FakeClient {
    fn authenticate(&mut self, username: &str, _password: &str) -> Result<()> {
        self.record(format!("USER {}", username));
        if self.script.refuse_login {
            return Err(ErrorKind::Server("invalid password".to_string()).into());
        }
        Ok(())
    }

    fn list_all(&mut self) -> Result<Vec<EmailMetadata>> {
        self.record("LIST".to_string());
        if self.script.refuse_list {
            return Err(ErrorKind::Server("mailbox locked".to_string()).into());
        }
        Ok(self
            .script
            .messages
            .iter()
            .map(|&(msg_id, ref text)| EmailMetadata {
                msg_id,
                msg_size: text.as_ref().map_or(0, |t| t.len() as u32),
            })
            .collect())
    }

    fn quit(&mut self) -> Result<()> {
        self.record("QUIT".to_string());
        self.journal.lock().unwrap().quits += 1;
        if self.script.refuse_quit {
            return Err(ErrorKind::ConnectionClosed.into());
        }
        Ok(())
    }
}
