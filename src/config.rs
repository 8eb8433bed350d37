use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::casing::NameStyle;
use crate::core::errors::ConfigError;
use crate::core::identity::{DEFAULT_ID_LENGTH, MAX_ID_LENGTH, MIN_ID_LENGTH};
use crate::core::model::EntityType;
use crate::ingestion::ExtractionVocabulary;

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "compendium.toml";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub output: OutputConfig,
    pub extraction: ExtractionVocabulary,
    pub naming: NameStyle,
    /// Canonical skill table.
    pub skills: Vec<SkillDefinition>,
    /// Content files, in build order.
    pub content: Vec<ContentFile>,
}

/// Directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Canonical input files, the ground truth for `build`.
    pub content_dir: PathBuf,
    /// Root of the raw / normalized / reviewed tiers.
    pub stage_dir: PathBuf,
    pub packs_dir: PathBuf,
    /// JSON log output; no file logging when unset.
    pub log_dir: Option<PathBuf>,
}

/// Pack output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Flag namespace holding derived category, tags and search keywords.
    pub flag_namespace: String,
    /// File name of the merged item pack.
    pub merged_pack: String,
    /// Generated id length in hex characters.
    pub id_length: usize,
    /// Directory of per-type placeholder images.
    pub image_root: String,
}

/// One row of the canonical skill table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub name: String,
    /// `body`, `mind` or `spirit`.
    pub attribute: String,
}

/// A content file the pipeline stages and builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFile {
    pub file: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// A missing mandatory file fails the build.
    #[serde(default)]
    pub mandatory: bool,
    /// Whether `stage` processes this file.
    #[serde(default = "default_true")]
    pub staged: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            output: OutputConfig::default(),
            extraction: ExtractionVocabulary::default(),
            naming: NameStyle::default(),
            skills: default_skills(),
            content: default_content(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("."),
            stage_dir: PathBuf::from("sources/extraction"),
            packs_dir: PathBuf::from("packs"),
            log_dir: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            flag_namespace: "compendium".to_string(),
            merged_pack: "all-items.db".to_string(),
            id_length: DEFAULT_ID_LENGTH,
            image_root: "icons/generated/_defaults".to_string(),
        }
    }
}

impl ContentFile {
    pub fn new(file: &str, entity_type: EntityType, mandatory: bool) -> Self {
        Self {
            file: file.to_string(),
            entity_type,
            mandatory,
            staged: true,
        }
    }

    /// Pack file name: the content file stem plus `.db`.
    pub fn pack_name(&self) -> String {
        let stem = Path::new(&self.file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file);
        format!("{stem}.db")
    }
}

/// The 24 core skills and the attribute each is tested against.
pub fn default_skills() -> Vec<SkillDefinition> {
    [
        ("Academics", "mind"),
        ("Athletics", "body"),
        ("Awareness", "mind"),
        ("Bureaucracy", "mind"),
        ("Close Combat", "body"),
        ("Computers", "mind"),
        ("Dexterity", "body"),
        ("Engineering", "mind"),
        ("Fast Talk", "spirit"),
        ("Fortitude", "body"),
        ("Intuition", "mind"),
        ("Magic", "mind"),
        ("Medicine", "mind"),
        ("Might", "body"),
        ("Occult", "mind"),
        ("Presence", "spirit"),
        ("Ranged", "body"),
        ("Reflexes", "body"),
        ("Resolve", "spirit"),
        ("Science", "mind"),
        ("Stealth", "body"),
        ("Survival", "mind"),
        ("Technology", "mind"),
        ("Zeal", "spirit"),
    ]
    .into_iter()
    .map(|(name, attribute)| SkillDefinition {
        name: name.to_string(),
        attribute: attribute.to_string(),
    })
    .collect()
}

pub fn default_content() -> Vec<ContentFile> {
    vec![
        ContentFile::new("skills.json", EntityType::Skill, false),
        ContentFile::new("talents.json", EntityType::Talent, true),
        ContentFile::new("assignments.json", EntityType::Assignment, true),
        ContentFile::new("weapons.json", EntityType::Weapon, false),
        ContentFile::new("armour.json", EntityType::Armour, false),
        ContentFile::new("spells.json", EntityType::Spell, false),
        ContentFile::new("gear.json", EntityType::Gear, false),
        ContentFile::new("enemies.json", EntityType::Npc, false),
        ContentFile::new("rules.json", EntityType::JournalEntry, false),
        ContentFile::new("tables.json", EntityType::RollTable, false),
        ContentFile::new("macros.json", EntityType::Macro, false),
    ]
}

impl PipelineConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist and parse. Without one, `./compendium.toml`
    /// and then the user config directory are tried; when neither exists the
    /// defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            return Self::load_from(path);
        }

        for candidate in Self::search_paths() {
            if candidate.is_file() {
                return Self::load_from(&candidate);
            }
            log::debug!("No config file at {}", candidate.display());
        }
        log::debug!("Using default configuration");
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.check()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("compendium-forge").join("config.toml"));
        }
        paths
    }

    fn check(&self) -> Result<(), ConfigError> {
        for skill in &self.skills {
            if !crate::core::normalize::ATTRIBUTE_KEYS.contains(&skill.attribute.as_str()) {
                return Err(ConfigError::Invalid {
                    key: format!("skills.{}", skill.name),
                    reason: format!("attribute '{}' is not body, mind or spirit", skill.attribute),
                });
            }
        }
        let mut seen = std::collections::HashSet::new();
        for entry in &self.content {
            if !seen.insert(entry.file.as_str()) {
                return Err(ConfigError::Invalid {
                    key: format!("content.{}", entry.file),
                    reason: "listed more than once".to_string(),
                });
            }
        }
        if self.output.flag_namespace.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "output.flag_namespace".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !(MIN_ID_LENGTH..=MAX_ID_LENGTH).contains(&self.output.id_length) {
            log::warn!(
                "output.id_length {} outside {MIN_ID_LENGTH}..={MAX_ID_LENGTH}, clamping",
                self.output.id_length
            );
        }
        Ok(())
    }

    /// Content entry for a file name.
    pub fn content_file(&self, file: &str) -> Option<&ContentFile> {
        self.content.iter().find(|c| c.file == file)
    }

    /// Content entry holding the given entity type.
    pub fn content_for(&self, entity_type: EntityType) -> Option<&ContentFile> {
        self.content.iter().find(|c| c.entity_type == entity_type)
    }

    pub fn stage_dir(&self) -> PathBuf {
        self.paths.stage_dir.clone()
    }

    pub fn canonical_path(&self, file: &str) -> PathBuf {
        self.paths.content_dir.join(file)
    }

    pub fn pack_path(&self, pack_name: &str) -> PathBuf {
        self.paths.packs_dir.join(pack_name)
    }

    /// Re-root every relative path under `root`.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        let reroot = |p: &PathBuf| if p.is_absolute() { p.clone() } else { root.join(p) };
        self.paths.content_dir = reroot(&self.paths.content_dir);
        self.paths.stage_dir = reroot(&self.paths.stage_dir);
        self.paths.packs_dir = reroot(&self.paths.packs_dir);
        self.paths.log_dir = self.paths.log_dir.as_ref().map(reroot);
        self
    }
}
