//! Built-in breathing techniques and session modes.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Smallest set count a session may run.
pub const MIN_SETS: u32 = 1;
/// Largest set count accepted for a custom session.
pub const MAX_SETS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Standard,
    Intermediate,
    Advanced,
}

/// A named inhale/exhale duration pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
    pub name: String,
    /// Inhale duration in seconds.
    pub inhale_secs: f64,
    /// Exhale duration in seconds.
    pub exhale_secs: f64,
    #[serde(default)]
    pub description: String,
    pub level: Level,
}

impl Technique {
    pub fn new(id: &str, name: &str, inhale_secs: f64, exhale_secs: f64, level: Level) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            inhale_secs,
            exhale_secs,
            description: String::new(),
            level,
        }
    }

    /// Rejects durations that are zero, negative, NaN or infinite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (phase, value) in [("inhale", self.inhale_secs), ("exhale", self.exhale_secs)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::InvalidDuration {
                    technique: self.id.clone(),
                    phase,
                    value,
                });
            }
        }
        Ok(())
    }

    /// One inhale plus one exhale, in seconds.
    pub fn cycle_secs(&self) -> f64 {
        self.inhale_secs + self.exhale_secs
    }
}

/// A named session length. `sets == None` is the user-chosen custom mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMode {
    pub id: String,
    pub name: String,
    pub sets: Option<u32>,
    #[serde(default)]
    pub description: String,
}

impl SessionMode {
    pub fn is_custom(&self) -> bool {
        self.sets.is_none()
    }

    /// Set count for this mode. Custom modes take `custom_sets`, which must
    /// fall within `MIN_SETS..=MAX_SETS`; fixed modes ignore it unless given,
    /// in which case the override is validated the same way.
    pub fn resolve_sets(&self, custom_sets: Option<u32>) -> Result<u32, ValidationError> {
        let sets = match (custom_sets, self.sets) {
            (Some(n), _) => n,
            (None, Some(n)) => n,
            (None, None) => {
                return Err(ValidationError::MissingSets {
                    mode: self.id.clone(),
                })
            }
        };
        validate_sets(sets)?;
        Ok(sets)
    }
}

pub fn validate_sets(sets: u32) -> Result<(), ValidationError> {
    if !(MIN_SETS..=MAX_SETS).contains(&sets) {
        return Err(ValidationError::InvalidSets {
            sets,
            min: MIN_SETS,
            max: MAX_SETS,
        });
    }
    Ok(())
}

/// Lookup table over techniques and modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub techniques: Vec<Technique>,
    pub modes: Vec<SessionMode>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            techniques: vec![
                Technique {
                    description: "Beginner-friendly technique".into(),
                    ..Technique::new("technique-4-8", "4-8 Breathing", 4.0, 8.0, Level::Beginner)
                },
                Technique {
                    description: "Standard relaxation technique".into(),
                    ..Technique::new("technique-7-11", "7-11 Breathing", 7.0, 11.0, Level::Standard)
                },
                Technique {
                    description: "Intermediate breathing pattern".into(),
                    ..Technique::new(
                        "technique-6-10",
                        "6-10 Breathing",
                        6.0,
                        10.0,
                        Level::Intermediate,
                    )
                },
                Technique {
                    description: "Advanced deep breathing".into(),
                    ..Technique::new("technique-8-12", "8-12 Breathing", 8.0, 12.0, Level::Advanced)
                },
            ],
            modes: vec![
                mode("quick-break", "Quick Break", Some(5), "2-3 minutes"),
                mode("slow-down", "Slow Down", Some(15), "6-8 minutes"),
                mode("meditate", "Meditate", Some(25), "10-15 minutes"),
                mode("custom", "Custom", None, "Your choice"),
            ],
        }
    }

    /// Built-in catalog extended with user techniques.
    ///
    /// Invalid user techniques are dropped; a user technique whose id matches
    /// a built-in replaces it.
    pub fn with_custom(custom: &[Technique]) -> Self {
        let mut catalog = Self::builtin();
        for technique in custom {
            if let Err(e) = technique.validate() {
                tracing::warn!("Ignoring custom technique: {}", e);
                continue;
            }
            match catalog.techniques.iter_mut().find(|t| t.id == technique.id) {
                Some(existing) => *existing = technique.clone(),
                None => catalog.techniques.push(technique.clone()),
            }
        }
        catalog
    }

    pub fn technique(&self, id: &str) -> Result<&Technique, ValidationError> {
        self.techniques
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| ValidationError::UnknownId {
                kind: "technique",
                id: id.into(),
            })
    }

    pub fn mode(&self, id: &str) -> Result<&SessionMode, ValidationError> {
        self.modes
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ValidationError::UnknownId {
                kind: "mode",
                id: id.into(),
            })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn mode(id: &str, name: &str, sets: Option<u32>, description: &str) -> SessionMode {
    SessionMode {
        id: id.into(),
        name: name.into(),
        sets,
        description: description.into(),
    }
}

/// Planned session length in seconds.
pub fn session_duration_secs(technique: &Technique, sets: u32) -> f64 {
    technique.cycle_secs() * f64::from(sets)
}

/// Formats whole seconds as `M:SS`.
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_contents() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.techniques.len(), 4);
        assert_eq!(catalog.modes.len(), 4);
        let t = catalog.technique("technique-7-11").unwrap();
        assert_eq!(t.inhale_secs, 7.0);
        assert_eq!(t.exhale_secs, 11.0);
        assert_eq!(catalog.mode("meditate").unwrap().sets, Some(25));
    }

    #[test]
    fn builtin_techniques_are_valid() {
        for t in Catalog::builtin().techniques {
            assert!(t.validate().is_ok(), "{} should be valid", t.id);
        }
    }

    #[test]
    fn validate_rejects_non_positive_and_nan() {
        let mut t = Technique::new("t", "T", 0.0, 4.0, Level::Beginner);
        assert!(matches!(
            t.validate(),
            Err(ValidationError::InvalidDuration { phase: "inhale", .. })
        ));
        t.inhale_secs = 4.0;
        t.exhale_secs = -1.0;
        assert!(matches!(
            t.validate(),
            Err(ValidationError::InvalidDuration { phase: "exhale", .. })
        ));
        t.exhale_secs = f64::NAN;
        assert!(t.validate().is_err());
    }

    #[test]
    fn unknown_ids_are_errors() {
        let catalog = Catalog::builtin();
        assert!(catalog.technique("box").is_err());
        assert!(catalog.mode("forever").is_err());
    }

    #[test]
    fn resolve_sets_for_fixed_and_custom_modes() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.mode("quick-break").unwrap().resolve_sets(None), Ok(5));
        assert_eq!(catalog.mode("quick-break").unwrap().resolve_sets(Some(3)), Ok(3));

        let custom = catalog.mode("custom").unwrap();
        assert!(custom.is_custom());
        assert_eq!(custom.resolve_sets(Some(12)), Ok(12));
        assert!(matches!(
            custom.resolve_sets(None),
            Err(ValidationError::MissingSets { .. })
        ));
        assert!(custom.resolve_sets(Some(0)).is_err());
        assert!(custom.resolve_sets(Some(51)).is_err());
        assert_eq!(custom.resolve_sets(Some(50)), Ok(50));
    }

    #[test]
    fn custom_techniques_extend_and_override() {
        let custom = vec![
            Technique::new("box-4", "Box", 4.0, 4.0, Level::Standard),
            Technique::new("technique-4-8", "Slower 4-8", 5.0, 9.0, Level::Beginner),
            Technique::new("broken", "Broken", 0.0, 4.0, Level::Beginner),
        ];
        let catalog = Catalog::with_custom(&custom);
        assert_eq!(catalog.techniques.len(), 5);
        assert_eq!(catalog.technique("technique-4-8").unwrap().inhale_secs, 5.0);
        assert!(catalog.technique("broken").is_err());
    }

    #[test]
    fn duration_helpers() {
        let t = Technique::new("t", "T", 4.0, 8.0, Level::Beginner);
        assert_eq!(session_duration_secs(&t, 5), 60.0);
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65), "1:05");
        assert_eq!(format_duration(600), "10:00");
    }
}
