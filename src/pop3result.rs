use regex::Regex;

use crate::errors::*;

lazy_static! {
    static ref LIST_REGEX: Regex = Regex::new(r"^(?P<nmsg>\d+) (?P<size>\d+)").unwrap();
}

/// One line of a LIST reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailMetadata {
    pub msg_id: u32,
    pub msg_size: u32,
}

impl EmailMetadata {
    pub fn parse(line: &str) -> Result<EmailMetadata> {
        let cap = LIST_REGEX
            .captures(line.trim_end())
            .ok_or_else(|| ErrorKind::MalformedResponse(line.to_string()))?;
        let number = |name: &str| {
            cap[name]
                .parse::<u32>()
                .map_err(|_| Error::from(ErrorKind::MalformedResponse(line.to_string())))
        };
        Ok(EmailMetadata {
            msg_id: number("nmsg")?,
            msg_size: number("size")?,
        })
    }
}

/// Scan listing of the whole mailbox, in the order the server sent it.
#[derive(Debug, Default)]
pub struct POP3List {
    pub mailbox: Vec<EmailMetadata>,
}

impl POP3List {
    /// Parses the body lines of a multi-line LIST reply (status line and
    /// terminating dot already stripped).
    pub fn parse<L: AsRef<[u8]>>(list_data: &[L]) -> Result<POP3List> {
        let mut mailbox = Vec::with_capacity(list_data.len());
        for line in list_data {
            let line = String::from_utf8(line.as_ref().to_vec())?;
            mailbox.push(EmailMetadata::parse(&line)?);
        }
        Ok(POP3List { mailbox })
    }

    pub fn ids(&self) -> Vec<u32> {
        self.mailbox.iter().map(|entry| entry.msg_id).collect()
    }
}
