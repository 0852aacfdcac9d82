use crate::entities::player::{PlayerId, PlayerState};
use crate::entities::skills::{SkillLock, SkillName, SkillSet, SkillValue, SKILL_COUNT};
use crate::entities::stats::{StatKind, StatLock, Stats};
use crate::error::{RotError, RotResult};
use crate::persistence::binary::{BinaryReader, BinaryWriter};
use crate::persistence::rot_block::{encoded_len, read_rot_block, write_rot_block};
use crate::rot::ledger::RotLedger;
use std::fs;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"RTSV";
const FORMAT_VERSION: u16 = 1;
const FLAG_ROT_BLOCK: u32 = 0x0000_0001;
const KNOWN_FLAGS: u32 = FLAG_ROT_BLOCK;
const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct SaveStore {
    root: PathBuf,
}

impl SaveStore {
    pub fn from_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Loads a player record, falling back to the backup when the primary
    /// file is missing or fails to decode. `None` means neither exists.
    pub fn load_player(&self, id: PlayerId) -> RotResult<Option<PlayerState>> {
        let path = self.player_path(id);
        let backup_path = self.player_backup_path(id);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return self.load_player_from_backup(id, &backup_path);
            }
            Err(err) => {
                log::warn!("player save read failed for {}: {}", path.display(), err);
                return match self.load_player_from_backup(id, &backup_path)? {
                    Some(state) => Ok(Some(state)),
                    None => Err(err.into()),
                };
            }
        };
        match decode_player(&data, id) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                if let Some(fallback) = self.load_player_from_backup(id, &backup_path)? {
                    log::warn!(
                        "save decode failed for {}, using backup: {}",
                        path.display(),
                        err
                    );
                    return Ok(Some(fallback));
                }
                Err(err)
            }
        }
    }

    pub fn save_player(&self, player: &PlayerState) -> RotResult<()> {
        fs::create_dir_all(self.player_dir())?;
        let path = self.player_path(player.id);
        let backup_path = self.player_backup_path(player.id);
        let data = encode_player(player);
        if path.exists() {
            fs::copy(&path, &backup_path)?;
        }
        fs::write(&path, data)?;
        log::debug!("saved player {} to {}", player.id.0, path.display());
        Ok(())
    }

    pub fn player_path(&self, id: PlayerId) -> PathBuf {
        self.player_dir().join(format!("{}.sav", id.0))
    }

    fn player_dir(&self) -> PathBuf {
        self.root.join("players")
    }

    fn player_backup_path(&self, id: PlayerId) -> PathBuf {
        self.player_dir().join(format!("{}.sav.bak", id.0))
    }

    fn load_player_from_backup(
        &self,
        id: PlayerId,
        backup_path: &Path,
    ) -> RotResult<Option<PlayerState>> {
        let data = match fs::read(backup_path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        decode_player(&data, id).map(Some)
    }
}

pub fn encode_player(player: &PlayerState) -> Vec<u8> {
    let skill_count = SKILL_COUNT;
    let rot_present = player.rot.is_engaged();
    let mut writer = BinaryWriter::with_capacity(
        64 + skill_count * 3 + if rot_present { encoded_len(skill_count) } else { 0 },
    );
    writer.write_bytes(MAGIC);
    writer.write_u16_le(FORMAT_VERSION);
    writer.write_u32_le(if rot_present { FLAG_ROT_BLOCK } else { 0 });
    writer.write_u32_le(player.id.0);
    writer.write_string_str(&player.name);
    writer.write_u16_le(skill_count as u16);
    for skill in SkillName::ALL {
        writer.write_u16_le(player.skills.value(skill).tenths());
        writer.write_u8(player.skills.lock(skill).to_byte());
    }
    for stat in StatKind::ALL {
        writer.write_u16_le(player.stats.get(stat));
    }
    for stat in StatKind::ALL {
        writer.write_u8(player.stats.lock(stat).to_byte());
    }
    if rot_present {
        let mut ledger = player.rot.clone();
        ledger.resize(skill_count);
        write_rot_block(&mut writer, &ledger);
    }
    writer.into_vec()
}

/// Decodes a player record and checks it belongs to `expected`.
pub fn decode_player(data: &[u8], expected: PlayerId) -> RotResult<PlayerState> {
    let short = |what: &str| RotError::Decode(format!("player record truncated at {}", what));
    let mut reader = BinaryReader::new(data);
    let magic = reader.read_bytes(MAGIC.len()).ok_or_else(|| short("magic"))?;
    if magic != MAGIC {
        return Err(RotError::Decode("player record magic mismatch".to_string()));
    }
    let version = reader.read_u16_le().ok_or_else(|| short("version"))?;
    if version == 0 || version > FORMAT_VERSION {
        return Err(RotError::Decode(format!(
            "unsupported player record version {}",
            version
        )));
    }
    let flags = reader.read_u32_le().ok_or_else(|| short("flags"))?;
    if flags & !KNOWN_FLAGS != 0 {
        return Err(RotError::Decode(format!(
            "unknown player record flags {:#010x}",
            flags
        )));
    }
    let id = PlayerId(reader.read_u32_le().ok_or_else(|| short("id"))?);
    if id != expected {
        return Err(RotError::PlayerMismatch {
            expected,
            found: id,
        });
    }
    let name = reader
        .read_string_lossy(MAX_NAME_LEN)
        .ok_or_else(|| short("name"))?;

    let stored_count = usize::from(reader.read_u16_le().ok_or_else(|| short("skill count"))?);
    let mut skills = SkillSet::default();
    for index in 0..stored_count {
        let value = reader.read_u16_le().ok_or_else(|| short("skills"))?;
        let lock = reader.read_u8().ok_or_else(|| short("skills"))?;
        let Some(skill) = SkillName::from_index(index) else {
            continue;
        };
        skills.set_value(skill, SkillValue(value));
        skills.set_lock(skill, SkillLock::from_byte(lock));
    }

    let mut stats = Stats::default();
    for stat in StatKind::ALL {
        stats.set(stat, reader.read_u16_le().ok_or_else(|| short("stats"))?);
    }
    for stat in StatKind::ALL {
        let lock = reader.read_u8().ok_or_else(|| short("stat locks"))?;
        stats.set_lock(stat, StatLock::from_byte(lock));
    }

    let rot = if flags & FLAG_ROT_BLOCK != 0 {
        read_rot_block(&mut reader, stored_count, SKILL_COUNT)?
    } else {
        RotLedger::new()
    };
    if reader.remaining() > 0 {
        log::debug!(
            "player {} record has {} trailing bytes",
            id.0,
            reader.remaining()
        );
    }

    let mut player = PlayerState::new(id, name);
    player.skills = skills;
    player.stats = stats;
    player.rot = rot;
    Ok(player)
}
