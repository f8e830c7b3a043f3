use md5::{Digest, Md5};

/// APOP digest (RFC 1939 section 7): hex MD5 of the greeting timestamp
/// followed by the shared secret.
pub fn get_apop_digest(timestamp: &str, password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Printable form of a command line for the wire log.
pub fn loggable_command(command: &str, param: Option<&str>) -> String {
    match (command, param) {
        ("PASS", Some(_)) => "PASS ****".to_string(),
        ("APOP", Some(param)) => {
            let user = param.split(' ').next().unwrap_or_default();
            format!("APOP {} ****", user)
        }
        (command, Some(param)) => format!("{} {}", command, param),
        (command, None) => command.to_string(),
    }
}
