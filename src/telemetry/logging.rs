use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::entities::player::PlayerId;
use crate::entities::skills::SkillName;
use crate::error::RotResult;

const HEADER_LINE: &str = "-------------------------------------------------------------------------------";
const HEADER_TITLE: &str = "RoT skill gain ledger";
const ROT_LOG_NAME: &str = "rot.log";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum RotLogCategory {
    CycleReset,
    CreditsIssued,
    CreditsApplied,
    SkillGain,
    InsufficientWait,
    MaxSkillGain,
    StatGain,
    Error,
}

impl RotLogCategory {
    pub fn name(self) -> &'static str {
        match self {
            RotLogCategory::CycleReset => "CycleReset",
            RotLogCategory::CreditsIssued => "CreditsIssued",
            RotLogCategory::CreditsApplied => "CreditsApplied",
            RotLogCategory::SkillGain => "SkillGain",
            RotLogCategory::InsufficientWait => "InsufficientWait",
            RotLogCategory::MaxSkillGain => "MaxSkillGain",
            RotLogCategory::StatGain => "StatGain",
            RotLogCategory::Error => "Error",
        }
    }
}

impl fmt::Display for RotLogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotLogEntry {
    pub at: DateTime<Utc>,
    pub category: RotLogCategory,
    pub player: PlayerId,
    pub skill: Option<SkillName>,
    pub message: String,
}

impl RotLogEntry {
    pub fn new(
        at: DateTime<Utc>,
        category: RotLogCategory,
        player: PlayerId,
        skill: Option<SkillName>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            at,
            category,
            player,
            skill,
            message: message.into(),
        }
    }

    fn line(&self) -> String {
        let timestamp = self.at.format("%d.%m.%Y %H:%M:%S");
        match self.skill {
            Some(skill) => format!(
                "{timestamp} ({}): [{}] {}: {}\n",
                self.player.0, self.category, skill, self.message
            ),
            None => format!(
                "{timestamp} ({}): [{}] {}\n",
                self.player.0, self.category, self.message
            ),
        }
    }
}

/// Observational sink for ledger events. Implementations swallow their own
/// failures; a lost line never affects a gain decision.
pub trait RotLog: Send + Sync {
    fn record(&self, entry: &RotLogEntry);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl RotLog for NullLog {
    fn record(&self, _entry: &RotLogEntry) {}
}

#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<RotLogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<RotLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, category: RotLogCategory) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.iter().filter(|entry| entry.category == category).count())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl RotLog for MemoryLog {
    fn record(&self, entry: &RotLogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
    }
}

/// Appends to `<root>/log/rot.log` and mirrors each line to the `log` facade.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileLog {
    pub fn open(root: &Path) -> RotResult<Self> {
        let log_dir = root.join("log");
        std::fs::create_dir_all(&log_dir)?;
        let path = log_dir.join(ROT_LOG_NAME);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
            write_header(&mut file)?;
        }
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "rot log lock poisoned"))?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

impl RotLog for FileLog {
    fn record(&self, entry: &RotLogEntry) {
        let line = entry.line();
        log::debug!(target: "rot", "{}", line.trim_end());
        if let Err(err) = self.write_line(&line) {
            log::warn!("rot log write failed for {}: {}", self.path.display(), err);
        }
    }
}

fn write_header(file: &mut File) -> std::io::Result<()> {
    let timestamp = Utc::now().format("%a %b %e %H:%M:%S %Y");
    writeln!(file, "{HEADER_LINE}")?;
    writeln!(file, "{HEADER_TITLE}")?;
    writeln!(file, "{ROT_LOG_NAME} - started {timestamp}")?;
    Ok(())
}

/// Process-wide logging through `env_logger`; `RUST_LOG` overrides the default.
pub fn init_process_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
