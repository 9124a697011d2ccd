//! # survey-codec
//!
//! Codecs pour les fichiers de projets de levé SurvCE: coordonnées binaires CRD et
//! journaux d'instrument RW5, avec une représentation JSON intermédiaire.
//!
//! ## Features
//!
//! - Décodage/encodage CRD des deux variantes (numérique et alphanumérique)
//! - Lecture et réécriture RW5 par motifs (en-tête, blocs de points, renumérotation)
//! - Détection du système de coordonnées (grilles SWEREF 99)
//! - Ajout de points entre projets sans collision d'identifiants
//!
//! Toutes les fonctions sont pures: aucune I/O, aucun état partagé, aucun log.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use survey_codec::{crd, merge, rw5};
//!
//! let project = crd::decode(&crd_bytes)?;
//! println!("{} points, CRS {}", project.len(), rw5::extract_crs(&log));
//!
//! let output = merge::append_points(&selection, &source_log, "EPSG:3006", &crd_bytes, &log)?;
//! std::fs::write("projet.crd", &output.crd)?;
//! ```

pub mod crd;
pub mod error;
pub mod merge;
pub mod rw5;
pub mod types;

pub use error::{CodecError, Result};
pub use types::{
    CoordinateProject, CreatedProject, Crs, Header, Layout, LogDocument, LogInfo, MergeOutput,
    Point,
};
