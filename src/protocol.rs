//! Wire protocol: one newline-terminated command line, optionally followed by
//! a raw byte payload delimited by the sender half-closing its write side.

/// Port the server listens on and the client targets.
pub const DEFAULT_PORT: u16 = 7979;

/// Status line sent before a download payload.
pub const OK_LINE: &str = "OK";

/// Prefix on every server error line.
pub const ERROR_PREFIX: &str = "ERRO";

/// Sent instead of filenames when the server directory is empty.
pub const NO_FILES_LINE: &str = "No files found on the server.";

/// Prefix for locally saved downloads.
pub const DOWNLOAD_PREFIX: &str = "downloaded_";

/// Chunk size for file/socket copy loops.
pub const CHUNK_SIZE: usize = 4096;

/// A parsed command line. The verb is case-normalized at parse time; whether
/// it names a real operation is decided at dispatch, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: String,
    pub argument: Option<String>,
}

impl Command {
    pub fn new(verb: &str, argument: Option<&str>) -> Self {
        Self {
            verb: verb.to_uppercase(),
            argument: argument.map(|a| a.to_string()),
        }
    }

    /// Parse the first line of a connection. Splits on the first space only,
    /// so filenames may contain spaces. Returns `None` for a blank line,
    /// which callers treat as the client disconnecting.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']).trim();
        if line.is_empty() {
            return None;
        }
        let (verb, argument) = match line.split_once(' ') {
            Some((verb, rest)) => {
                let rest = rest.trim();
                (verb, (!rest.is_empty()).then(|| rest.to_string()))
            }
            None => (line, None),
        };
        Some(Self {
            verb: verb.to_uppercase(),
            argument,
        })
    }

    /// The one-line wire form, newline-terminated.
    pub fn serialize(&self) -> String {
        match &self.argument {
            Some(arg) => format!("{} {}\n", self.verb, arg),
            None => format!("{}\n", self.verb),
        }
    }
}
