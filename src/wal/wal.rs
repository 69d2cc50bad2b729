use anyhow::{anyhow, bail, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One committed mutation. Every request that changes state writes exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum WalOperation {
    AddUser {
        username: String,
        password_hash: String,
        email: String,
        first_name: String,
        last_name: String,
    },
    /// Also removes every feedback row owned by the user
    RemoveUser {
        username: String,
    },
    AddFeedback {
        id: u64,
        username: String,
        title: String,
        content: String,
    },
    UpdateFeedback {
        id: u64,
        title: String,
        content: String,
    },
    RemoveFeedback {
        id: u64,
    },
}

// Text fields are hex-encoded so '|' and newlines inside user input cannot
// break the line format.
fn encode_text(value: &str) -> String {
    hex::encode(value.as_bytes())
}

fn decode_text(value: &str, field: &str) -> Result<String> {
    let bytes = hex::decode(value).context(format!("Invalid {} hex", field))?;
    String::from_utf8(bytes).context(format!("{} is not valid UTF-8", field))
}

impl WalOperation {
    fn to_line(&self) -> String {
        match self {
            WalOperation::AddUser {
                username,
                password_hash,
                email,
                first_name,
                last_name,
            } => format!(
                "ADD_USER|{}|{}|{}|{}|{}",
                encode_text(username),
                encode_text(password_hash),
                encode_text(email),
                encode_text(first_name),
                encode_text(last_name)
            ),
            WalOperation::RemoveUser { username } => {
                format!("REMOVE_USER|{}", encode_text(username))
            }
            WalOperation::AddFeedback {
                id,
                username,
                title,
                content,
            } => format!(
                "ADD_FEEDBACK|{}|{}|{}|{}",
                id,
                encode_text(username),
                encode_text(title),
                encode_text(content)
            ),
            WalOperation::UpdateFeedback { id, title, content } => format!(
                "UPDATE_FEEDBACK|{}|{}|{}",
                id,
                encode_text(title),
                encode_text(content)
            ),
            WalOperation::RemoveFeedback { id } => format!("REMOVE_FEEDBACK|{}", id),
        }
    }

    fn from_line(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split('|').collect();

        match parts.as_slice() {
            ["ADD_USER", username, password_hash, email, first_name, last_name] => {
                Ok(WalOperation::AddUser {
                    username: decode_text(username, "username")?,
                    password_hash: decode_text(password_hash, "password_hash")?,
                    email: decode_text(email, "email")?,
                    first_name: decode_text(first_name, "first_name")?,
                    last_name: decode_text(last_name, "last_name")?,
                })
            }
            ["REMOVE_USER", username] => Ok(WalOperation::RemoveUser {
                username: decode_text(username, "username")?,
            }),
            ["ADD_FEEDBACK", id, username, title, content] => Ok(WalOperation::AddFeedback {
                id: id.parse::<u64>().context("Invalid feedback ID")?,
                username: decode_text(username, "username")?,
                title: decode_text(title, "title")?,
                content: decode_text(content, "content")?,
            }),
            ["UPDATE_FEEDBACK", id, title, content] => Ok(WalOperation::UpdateFeedback {
                id: id.parse::<u64>().context("Invalid feedback ID")?,
                title: decode_text(title, "title")?,
                content: decode_text(content, "content")?,
            }),
            ["REMOVE_FEEDBACK", id] => Ok(WalOperation::RemoveFeedback {
                id: id.parse::<u64>().context("Invalid feedback ID")?,
            }),
            [op, ..] if op.starts_with("ADD_") || op.starts_with("REMOVE_") || op.starts_with("UPDATE_") => {
                bail!("Invalid {} format", op)
            }
            _ => bail!("Unknown operation type"),
        }
    }
}

/// Append-only log of committed operations, replayed at boot
pub struct Wal {
    file: Mutex<File>,
    path: PathBuf,
}

impl Wal {
    pub fn new(path: PathBuf) -> Result<Self> {
        let file = open_append(&path)?;

        Ok(Wal {
            file: Mutex::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append and sync one operation. The caller must not apply the
    /// operation in memory unless this returns `Ok`.
    pub fn log_operation(&self, op: &WalOperation) -> Result<()> {
        let line = op.to_line();
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("WAL lock poisoned"))?;
        writeln!(file, "{}", line).context("Failed to write to WAL")?;
        file.flush().context("Failed to flush WAL")?;
        file.sync_data().context("Failed to sync WAL")?;
        Ok(())
    }

    pub fn replay(&self) -> Result<Vec<WalOperation>> {
        let file = File::open(&self.path).context("Failed to open WAL for replay")?;
        let reader = BufReader::new(file);
        let mut operations = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.context("Failed to read line from WAL")?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            match WalOperation::from_line(line) {
                Ok(op) => operations.push(op),
                Err(e) => {
                    tracing::warn!(
                        line_num = line_num + 1,
                        error = %e,
                        "Failed to parse WAL line, skipping"
                    );
                }
            }
        }

        Ok(operations)
    }

    /// Replace the log with `operations`. Written to a sibling file first and
    /// renamed over the old log, so a crash leaves one complete version.
    pub fn rewrite(&self, operations: &[WalOperation]) -> Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("WAL lock poisoned"))?;

        let tmp_path = self.path.with_extension("wal.tmp");
        {
            let mut tmp = File::create(&tmp_path).context("Failed to create WAL rewrite file")?;
            for op in operations {
                writeln!(tmp, "{}", op.to_line()).context("Failed to write WAL rewrite file")?;
            }
            tmp.sync_all().context("Failed to sync WAL rewrite file")?;
        }

        fs::rename(&tmp_path, &self.path).context("Failed to replace WAL")?;
        *file = open_append(&self.path)?;

        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context(format!("Failed to open WAL file: {}", path.display()))
}
