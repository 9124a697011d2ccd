//! Types d'erreurs pour le crate survey-codec

use thiserror::Error;

/// Erreurs pouvant survenir lors du décodage ou de la fusion de projets
#[derive(Debug, Error)]
pub enum CodecError {
    /// Buffer CRD trop court pour l'en-tête ou pour un enregistrement complet
    #[error("Truncated CRD record at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedRecord {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Le système de coordonnées du projet destination ne correspond pas
    #[error("CRS mismatch: project expects {expected}, destination log uses {found}")]
    CrsMismatch { expected: String, found: String },

    /// Identifiant de point non numérique (renumérotation impossible)
    #[error("Invalid point id: {id:?}")]
    InvalidPointId { id: String },

    /// JSON structurellement invalide
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodecError {
    /// Crée une erreur de troncature avec contexte
    pub fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        Self::TruncatedRecord {
            offset,
            needed,
            available,
        }
    }

    /// Crée une erreur de CRS incompatible
    pub fn crs_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::CrsMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Résultat des opérations du crate
pub type Result<T> = std::result::Result<T, CodecError>;
