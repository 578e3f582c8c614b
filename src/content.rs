//! Authored content: skill definitions and combatant templates, loaded from RON.

use schema::{SkillDefinition, StatBlock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::combatant::Combatant;
use crate::errors::{ContentError, ContentResult};

/// A combatant as authored: base stats, worn equipment and skill names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantTemplate {
    pub name: String,
    pub base_stats: StatBlock,
    #[serde(default)]
    pub equipment: Vec<StatBlock>,
    #[serde(default = "default_grid_index")]
    pub grid_index: u8,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Per-combatant `(steepness, factor)` override of the cost curve.
    #[serde(default)]
    pub cost_curve: Option<(f32, f32)>,
}

fn default_grid_index() -> u8 {
    1
}

/// Every known skill by name. Definitions are shared, never copied per combatant.
#[derive(Debug, Default, Clone)]
pub struct SkillLibrary {
    skills: HashMap<String, Arc<SkillDefinition>>,
}

impl SkillLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a RON list of skill definitions.
    pub fn from_ron_str(text: &str, origin: &str) -> ContentResult<Self> {
        let mut library = Self::new();
        library.extend_from_ron_str(text, origin)?;
        Ok(library)
    }

    /// Loads every `.ron` file in `dir`, each holding a list of skills.
    pub fn load_dir(dir: &Path) -> ContentResult<Self> {
        if !dir.is_dir() {
            return Err(ContentError::MissingDirectory(dir.to_path_buf()));
        }

        let entries = fs::read_dir(dir).map_err(|source| ContentError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ContentError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                paths.push(path);
            }
        }
        // Directory order is platform-dependent.
        paths.sort();

        let mut library = Self::new();
        for path in paths {
            let text = fs::read_to_string(&path).map_err(|source| ContentError::Io {
                path: path.clone(),
                source,
            })?;
            library.extend_from_ron_str(&text, &path.display().to_string())?;
        }

        tracing::info!("Loaded {} skills from {}", library.len(), dir.display());
        Ok(library)
    }

    fn extend_from_ron_str(&mut self, text: &str, origin: &str) -> ContentResult<()> {
        let skills: Vec<SkillDefinition> = ron::from_str(text).map_err(|source| ContentError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        for skill in skills {
            self.insert(skill)?;
        }
        Ok(())
    }

    pub fn insert(&mut self, skill: SkillDefinition) -> ContentResult<Arc<SkillDefinition>> {
        if self.skills.contains_key(&skill.name) {
            return Err(ContentError::DuplicateSkill(skill.name));
        }
        if skill.effects.iter().any(Option::is_none) {
            tracing::warn!("Skill '{}' has empty effect slots", skill.name);
        }

        let skill = Arc::new(skill);
        self.skills.insert(skill.name.clone(), Arc::clone(&skill));
        Ok(skill)
    }

    pub fn get(&self, name: &str) -> Option<Arc<SkillDefinition>> {
        self.skills.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Instantiates a template, resolving its skill names against this library.
    pub fn build_combatant(&self, template: &CombatantTemplate) -> ContentResult<Combatant> {
        let mut combatant = Combatant::new(&template.name, template.base_stats)
            .with_grid_index(template.grid_index);
        for bonus in &template.equipment {
            combatant = combatant.with_equipment(*bonus);
        }
        if let Some((steepness, factor)) = template.cost_curve {
            combatant = combatant.with_cost_curve(steepness, factor);
        }

        for name in &template.skills {
            let skill = self.get(name).ok_or_else(|| ContentError::UnknownSkill {
                owner: template.name.clone(),
                skill: name.clone(),
            })?;
            combatant = combatant.with_skill(skill);
        }
        Ok(combatant)
    }
}

/// Both sides of a battle as authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub allies: Vec<CombatantTemplate>,
    #[serde(default)]
    pub enemies: Vec<CombatantTemplate>,
}

impl Roster {
    pub fn from_ron_str(text: &str, origin: &str) -> ContentResult<Self> {
        ron::from_str(text).map_err(|source| ContentError::Parse {
            origin: origin.to_string(),
            source,
        })
    }
}

/// Parses a RON list of combatant templates.
pub fn templates_from_ron_str(text: &str, origin: &str) -> ContentResult<Vec<CombatantTemplate>> {
    ron::from_str(text).map_err(|source| ContentError::Parse {
        origin: origin.to_string(),
        source,
    })
}
