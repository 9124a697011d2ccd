//! Orchestration des fichiers de projet: lecture pour l'UI, édition, commits
//!
//! Le service ne fait aucune I/O réseau: l'appelant récupère les fichiers du
//! dépôt (`RepoFile`) et envoie lui-même les `CommitOperation` produites.
//! Deux fusions vers une même destination doivent être sérialisées par l'appelant;
//! les opérations `update` portent le SHA lu pour que le dépôt refuse la seconde.

pub mod commit;
pub mod settings;

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use survey_codec::crd::field::decode_lossy;
use survey_codec::{crd, merge, rw5, CodecError, CoordinateProject, LogInfo};

use crate::config::Config;

pub use commit::{is_crd, prepare_content, sibling_log_path, CommitOperation, Operation};
pub use settings::{find_project_settings, ProjectSettings};

/// Erreurs du service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Unknown edit action: {0}. Use: create, append")]
    UnknownAction(String),

    #[error("Export CRS is required")]
    MissingExportCrs,

    #[error("Invalid base64 content for {path}: {source}")]
    InvalidContent {
        path: String,
        #[source]
        source: base64::DecodeError,
    },
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Fichier récupéré depuis le dépôt
#[derive(Debug, Clone)]
pub struct RepoFile {
    pub path: String,

    pub content: Vec<u8>,

    /// SHA du blob, si le fichier existe dans le dépôt
    pub sha: Option<String>,
}

impl RepoFile {
    pub fn new(path: impl Into<String>, content: Vec<u8>, sha: Option<String>) -> Self {
        Self {
            path: path.into(),
            content,
            sha,
        }
    }

    /// Construit un fichier depuis une réponse `contents` de l'API (contenu base64)
    pub fn from_base64(path: impl Into<String>, content: &str, sha: Option<String>) -> Result<Self> {
        let path = path.into();
        let content = commit::decode_base64(&path, content)?;
        Ok(Self { path, content, sha })
    }

    /// Contenu texte (octets UTF-8 invalides ignorés)
    pub fn text(&self) -> String {
        decode_lossy(&self.content)
    }
}

/// Contenu renvoyé à l'UI
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FileView {
    /// Projet CRD décodé et résumé de son RW5
    Project {
        content: CoordinateProject,
        info: LogInfo,
    },
    /// Tout autre fichier, en texte
    Text { content: String },
}

/// Action d'édition choisie dans l'UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Nouveau projet depuis une sélection de points
    Create,
    /// Ajout de points à un projet existant
    Append,
}

impl FromStr for EditAction {
    type Err = ServiceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" | "new" => Ok(EditAction::Create),
            "append" | "add" => Ok(EditAction::Append),
            other => Err(ServiceError::UnknownAction(other.to_string())),
        }
    }
}

/// Demande d'édition, selon l'action
#[derive(Debug)]
pub enum EditRequest<'a> {
    Create {
        new_path: &'a str,
        content: &'a str,
        source_log: &'a str,
    },
    Append {
        content: &'a str,
        source_log: &'a str,
        project_crs: Option<&'a str>,
        destination_crd: &'a RepoFile,
        destination_log: &'a RepoFile,
    },
}

impl EditRequest<'_> {
    pub fn action(&self) -> EditAction {
        match self {
            EditRequest::Create { .. } => EditAction::Create,
            EditRequest::Append { .. } => EditAction::Append,
        }
    }
}

/// Demande d'export d'un projet dans un autre CRS
#[derive(Debug)]
pub struct ExportRequest<'a> {
    /// Journal RW5 du projet, avec son SHA courant
    pub log: &'a RepoFile,

    /// CRS actuel du projet (`settings.ini` ou défaut)
    pub default_crs: &'a str,

    pub export_crs: &'a str,

    /// `settings.ini` du dossier du projet, s'il existe
    pub settings: Option<&'a RepoFile>,
}

/// Service de fichiers de projet
#[derive(Debug, Clone, Default)]
pub struct ProjectFileService {
    config: Config,
}

impl ProjectFileService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Décode un fichier pour l'UI
    ///
    /// Un `.crd` (ou tout fichier en mode édition de projet) est décodé et accompagné
    /// du résumé de son RW5 jumeau; un RW5 absent donne un résumé par défaut.
    pub fn open(
        &self,
        file: &RepoFile,
        log: Option<&RepoFile>,
        edit_project: bool,
    ) -> Result<FileView> {
        if !(edit_project || is_crd(&file.path)) {
            return Ok(FileView::Text {
                content: file.text(),
            });
        }

        let content = crd::decode(&file.content)?;
        let log_text = log.map(RepoFile::text).unwrap_or_default();
        let info = rw5::read_info(&log_text);

        debug!(
            path = %file.path,
            points = content.len(),
            crs = %info.crs,
            "Opened project"
        );

        Ok(FileView::Project { content, info })
    }

    /// Dispatch d'une demande d'édition
    pub fn edit(&self, request: EditRequest<'_>) -> Result<Vec<CommitOperation>> {
        match request {
            EditRequest::Create {
                new_path,
                content,
                source_log,
            } => self.create_file(new_path, content, source_log),
            EditRequest::Append {
                content,
                source_log,
                project_crs,
                destination_crd,
                destination_log,
            } => self.append_file(
                content,
                source_log,
                project_crs,
                destination_crd,
                destination_log,
            ),
        }
    }

    /// Crée un nouveau projet (`.crd` + `.rw5`) depuis une sélection de points
    ///
    /// Une sélection vide ne produit aucune opération.
    pub fn create_file(
        &self,
        new_path: &str,
        content: &str,
        source_log: &str,
    ) -> Result<Vec<CommitOperation>> {
        let project: CoordinateProject = serde_json::from_str(content).map_err(CodecError::from)?;
        if project.is_empty() {
            warn!(path = new_path, "No points selected, nothing to create");
            return Ok(Vec::new());
        }

        let created = merge::create_project(new_path, project, source_log)?;
        let log_path = sibling_log_path(new_path);

        info!(
            path = new_path,
            log = %log_path,
            points = created.project.len(),
            "Prepared new project"
        );

        Ok(vec![
            CommitOperation::create(new_path, &crd::encode(&created.project)),
            CommitOperation::create(log_path, created.log.as_bytes()),
        ])
    }

    /// Ajoute une sélection de points à un projet existant
    ///
    /// Sans `project_crs`, le CRS par défaut de la configuration est attendu.
    /// Une sélection vide ne produit aucune opération.
    pub fn append_file(
        &self,
        content: &str,
        source_log: &str,
        project_crs: Option<&str>,
        destination_crd: &RepoFile,
        destination_log: &RepoFile,
    ) -> Result<Vec<CommitOperation>> {
        let selection: CoordinateProject =
            serde_json::from_str(content).map_err(CodecError::from)?;
        let expected_crs = project_crs.unwrap_or(&self.config.default_crs);

        let output = merge::append_points(
            &selection,
            source_log,
            expected_crs,
            &destination_crd.content,
            &destination_log.text(),
        )
        .inspect_err(|e| {
            warn!(path = %destination_crd.path, error = %e, "Append rejected");
        })?;

        if output.merged == 0 {
            warn!(path = %destination_crd.path, "No points selected, nothing to append");
            return Ok(Vec::new());
        }

        info!(
            path = %destination_crd.path,
            before = output.points_before,
            merged = output.merged,
            crs = expected_crs,
            "Prepared append"
        );

        Ok(vec![
            CommitOperation::update(
                destination_crd.path.as_str(),
                &output.crd,
                destination_crd.sha.clone(),
            ),
            CommitOperation::update(
                destination_log.path.as_str(),
                output.log.as_bytes(),
                destination_log.sha.clone(),
            ),
        ])
    }

    /// CRS d'un projet: `defaultCrs` du `settings.ini` le plus proche, sinon la configuration
    ///
    /// `fetch` renvoie le fichier du dépôt à ce chemin, ou `None` s'il n'existe pas.
    pub fn project_crs<F>(&self, project_path: &str, fetch: F) -> String
    where
        F: FnMut(&str) -> Option<RepoFile>,
    {
        match find_project_settings(settings::parent_dir(project_path), fetch) {
            Some(found) => {
                debug!(path = project_path, settings = %found.file.path, crs = %found.default_crs, "Project CRS from settings");
                found.default_crs
            }
            None => {
                debug!(path = project_path, crs = %self.config.default_crs, "No settings file, using default CRS");
                self.config.default_crs.clone()
            }
        }
    }

    /// Prépare l'export d'un projet dans `export_crs`
    ///
    /// Si le CRS change, le `settings.ini` du dossier est mis à jour (ou créé); le RW5
    /// est toujours modifié pour déclencher l'action d'export.
    pub fn export_project(&self, request: ExportRequest<'_>) -> Result<Vec<CommitOperation>> {
        let export_crs = request.export_crs.trim();
        if export_crs.is_empty() {
            return Err(ServiceError::MissingExportCrs);
        }

        let mut operations = Vec::with_capacity(2);

        if !settings::same_crs(request.default_crs, export_crs) {
            operations.push(match request.settings {
                Some(file) => CommitOperation::update(
                    file.path.as_str(),
                    settings::update_default_crs(&file.text(), export_crs).as_bytes(),
                    file.sha.clone(),
                ),
                None => CommitOperation::create(
                    settings::settings_path_for(&request.log.path),
                    settings::new_settings(export_crs).as_bytes(),
                ),
            });
        }

        operations.push(CommitOperation::update(
            request.log.path.as_str(),
            settings::touch_log(&request.log.text()).as_bytes(),
            request.log.sha.clone(),
        ));

        info!(
            path = %request.log.path,
            from = request.default_crs,
            to = export_crs,
            operations = operations.len(),
            "Prepared export"
        );

        Ok(operations)
    }
}
