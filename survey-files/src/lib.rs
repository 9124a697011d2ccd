//! # survey-files
//!
//! Gestion des fichiers de projets de levé (CRD + RW5) stockés dans un dépôt Git.
//!
//! ## Features
//!
//! - Décodage des projets pour l'UI (CRD en JSON + résumé RW5)
//! - Création de projets et ajout de points avec renumérotation
//! - Préparation des opérations de commit (base64, précondition SHA)
//! - CRS de projet via `settings.ini` et export dans un autre CRS
//! - CLI pour travailler sur des fichiers locaux
//!
//! ## Usage CLI
//!
//! ```bash
//! # CRD vers JSON (fichier ou dossier)
//! survey-files to-json --path ./projets/ --output ./json/
//!
//! # Ajouter des points à un projet existant
//! survey-files append --selection sel.json --source-log source.rw5 --dest projet.crd --crs EPSG:3006
//! ```

pub mod config;
pub mod report;
pub mod service;

pub use config::Config;
pub use report::{Report, ReportStatus};
pub use service::{
    CommitOperation, EditAction, EditRequest, ExportRequest, FileView, Operation,
    ProjectFileService, ProjectSettings, RepoFile, ServiceError,
};
