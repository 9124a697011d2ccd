//! Définition et implémentation des commandes CLI
//!
//! - `to-json` / `to-crd`: conversions CRD ↔ JSON
//! - `info`: résumé d'un RW5
//! - `append` / `create`: fusion et création de projets sur fichiers locaux
//! - `renumber`: décalage des numéros de points
//! - `commit-ops`: opérations de commit prêtes pour l'API du dépôt
//! - `export`: changement de CRS d'un projet (`settings.ini` + RW5)

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Subcommand;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use survey_codec::crd::field::decode_lossy;
use survey_codec::{crd, rw5};
use survey_files::service::settings::settings_path_for;
use survey_files::service::{is_crd, sibling_log_path};
use survey_files::{
    CommitOperation, Config, EditAction, EditRequest, ExportRequest, Operation,
    ProjectFileService, RepoFile, Report,
};

#[derive(Subcommand)]
pub enum Commands {
    /// Convert CRD files to JSON
    ToJson {
        /// CRD file or directory (searched recursively)
        #[arg(short, long)]
        path: PathBuf,

        /// Output directory for JSON files
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert a JSON project back to CRD
    ToCrd {
        /// JSON file ({"header": ..., "points": [...]})
        #[arg(short, long)]
        input: PathBuf,

        /// Output CRD file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print date, time, CRS and last point of an RW5 log
    Info {
        /// RW5 file
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Append selected points to an existing project (CRD + sibling RW5, in place)
    Append {
        /// JSON selection of points (with their source ids)
        #[arg(short, long)]
        selection: PathBuf,

        /// RW5 log of the source project
        #[arg(long)]
        source_log: PathBuf,

        /// Destination CRD file; its RW5 is the sibling .rw5 file
        #[arg(short, long)]
        dest: PathBuf,

        /// Expected CRS of the destination (défaut : settings.ini, puis config default_crs)
        #[arg(long)]
        crs: Option<String>,

        /// Save the report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Create a new project from selected points
    Create {
        /// New CRD path; the RW5 is written next to it
        #[arg(short, long)]
        path: PathBuf,

        /// JSON project content (header + selected points)
        #[arg(short, long)]
        selection: PathBuf,

        /// RW5 log the points come from
        #[arg(long)]
        source_log: PathBuf,
    },

    /// Shift point numbers of a CRD or RW5 file
    Renumber {
        /// CRD or RW5 file
        #[arg(short, long)]
        path: PathBuf,

        /// Offset added to point numbers
        #[arg(long)]
        offset: u64,

        /// Only renumber this point
        #[arg(long)]
        id: Option<u64>,

        /// Output file (défaut : en place)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the commit operations for an edit, without writing anything
    CommitOps {
        /// Edit action: create or append
        #[arg(short, long)]
        action: String,

        /// New CRD path (create) or destination CRD file (append)
        #[arg(short, long)]
        path: PathBuf,

        /// JSON selection of points
        #[arg(short, long)]
        selection: PathBuf,

        /// RW5 log of the source project
        #[arg(long)]
        source_log: PathBuf,

        /// Expected CRS of the destination (append)
        #[arg(long)]
        crs: Option<String>,

        /// Current blob SHA of the destination CRD (append)
        #[arg(long)]
        crd_sha: Option<String>,

        /// Current blob SHA of the destination RW5 (append)
        #[arg(long)]
        log_sha: Option<String>,
    },

    /// Export a project to another CRS (updates settings.ini and touches the RW5)
    Export {
        /// CRD or RW5 file of the project
        #[arg(short, long)]
        path: PathBuf,

        /// Target CRS, e.g. EPSG:3008
        #[arg(long)]
        export_crs: String,
    },
}

/// Exécute une commande
pub fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::ToJson { path, output } => cmd_to_json(&path, &output, config),
        Commands::ToCrd { input, output } => cmd_to_crd(&input, &output),
        Commands::Info { path } => cmd_info(&path, config),
        Commands::Append {
            selection,
            source_log,
            dest,
            crs,
            report,
        } => cmd_append(&selection, &source_log, &dest, crs.as_deref(), report.as_deref(), config),
        Commands::Create {
            path,
            selection,
            source_log,
        } => cmd_create(&path, &selection, &source_log, config),
        Commands::Renumber {
            path,
            offset,
            id,
            output,
        } => cmd_renumber(&path, offset, id, output.as_deref()),
        Commands::CommitOps {
            action,
            path,
            selection,
            source_log,
            crs,
            crd_sha,
            log_sha,
        } => cmd_commit_ops(
            &action,
            &path,
            &selection,
            &source_log,
            crs.as_deref(),
            crd_sha,
            log_sha,
            config,
        ),
        Commands::Export { path, export_crs } => cmd_export(&path, &export_crs, config),
    }
}

/// Exécute la commande to-json (dossiers traités en parallèle)
pub fn cmd_to_json(path: &Path, output: &Path, config: &Config) -> Result<()> {
    let start = Instant::now();
    let files = collect_crd_files(path)?;

    if files.is_empty() {
        anyhow::bail!("No CRD files found in {}", path.display());
    }

    std::fs::create_dir_all(output)?;

    let jobs = config.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    });
    info!(files = files.len(), jobs, output = %output.display(), "Converting CRD to JSON");

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let results: Vec<(&PathBuf, Result<(PathBuf, usize, String)>)> = pool.install(|| {
        files
            .par_iter()
            .map(|file| (file, convert_to_json(path, file, output, config)))
            .collect()
    });

    let mut report = Report::new("to-json");
    for (file, result) in results {
        match result {
            Ok((json_path, points, json)) => {
                debug!(file = %file.display(), points, "Converted");
                report.record_output(&json_path, points, json.as_bytes());
            }
            Err(e) => {
                warn!("Failed to convert {}: {:#}", file.display(), e);
                report.record_failure(file, &format!("{:#}", e));
            }
        }
    }

    report.set_duration(start.elapsed());
    report.finalize();
    println!("{}", report.summary());

    if report.files_failed > 0 {
        warn!("{} files failed", report.files_failed);
    }

    Ok(())
}

/// Convertit un fichier CRD et écrit le JSON sous `output`
fn convert_to_json(
    root: &Path,
    file: &Path,
    output: &Path,
    config: &Config,
) -> Result<(PathBuf, usize, String)> {
    let data = std::fs::read(file).with_context(|| format!("Cannot read {}", file.display()))?;
    let project =
        crd::decode(&data).with_context(|| format!("Failed to decode {}", file.display()))?;
    let json = config.to_json(&project)?;

    let json_path = json_output_path(root, file, output);
    if let Some(parent) = json_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&json_path, &json)?;

    Ok((json_path, project.len(), json))
}

/// Chemin de sortie JSON: même arborescence relative que l'entrée
fn json_output_path(root: &Path, file: &Path, output: &Path) -> PathBuf {
    let relative = file
        .strip_prefix(root)
        .ok()
        .filter(|rel| !rel.as_os_str().is_empty())
        .or_else(|| file.file_name().map(Path::new))
        .unwrap_or(file);

    output.join(relative).with_extension("json")
}

/// Exécute la commande to-crd
pub fn cmd_to_crd(input: &Path, output: &Path) -> Result<()> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("Cannot read {}", input.display()))?;
    let data = crd::from_json(&json).with_context(|| format!("Invalid project {}", input.display()))?;

    std::fs::write(output, &data)?;
    info!(output = %output.display(), bytes = data.len(), "CRD written");

    Ok(())
}

/// Exécute la commande info
pub fn cmd_info(path: &Path, config: &Config) -> Result<()> {
    let log = read_text(path)?;
    let info = rw5::read_info(&log);
    println!("{}", config.to_json(&info)?);
    Ok(())
}

/// Exécute la commande append
pub fn cmd_append(
    selection: &Path,
    source_log: &Path,
    dest: &Path,
    crs: Option<&str>,
    report_path: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let start = Instant::now();
    let selection_json = std::fs::read_to_string(selection)
        .with_context(|| format!("Cannot read {}", selection.display()))?;
    let source_log = read_text(source_log)?;

    let destination_crd = read_repo_file(dest)?;
    let log_path = PathBuf::from(sibling_log_path(&destination_crd.path));
    let destination_log = if log_path.exists() {
        read_repo_file(&log_path)?
    } else {
        warn!(path = %log_path.display(), "Destination RW5 not found, starting from an empty log");
        RepoFile::new(log_path.display().to_string(), Vec::new(), None)
    };

    let points_before = crd::decode(&destination_crd.content)
        .with_context(|| format!("Failed to decode {}", dest.display()))?
        .len();
    let service = ProjectFileService::new(config.clone());
    let expected_crs = match crs {
        Some(crs) => crs.to_string(),
        None => service.project_crs(&destination_crd.path, read_local_file),
    };

    let operations = service.append_file(
        &selection_json,
        &source_log,
        Some(&expected_crs),
        &destination_crd,
        &destination_log,
    )?;

    let mut report = Report::new("append");
    let written = write_operations(&operations, &mut report)?;
    let points_after = written.unwrap_or(points_before);

    report.record_merge(points_before, points_after - points_before, &expected_crs);
    if operations.is_empty() {
        report.record_warning("No points selected, destination unchanged");
    }
    report.set_duration(start.elapsed());
    report.finalize();
    report.display();

    if let Some(path) = report_path {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report saved");
    }

    Ok(())
}

/// Exécute la commande create
pub fn cmd_create(path: &Path, selection: &Path, source_log: &Path, config: &Config) -> Result<()> {
    let content = std::fs::read_to_string(selection)
        .with_context(|| format!("Cannot read {}", selection.display()))?;
    let source_log = read_text(source_log)?;

    let service = ProjectFileService::new(config.clone());
    let operations = service.create_file(&path.display().to_string(), &content, &source_log)?;

    let mut report = Report::new("create");
    if operations.is_empty() {
        report.record_warning("No points selected, nothing created");
    }
    write_operations(&operations, &mut report)?;
    report.finalize();
    println!("{}", report.summary());

    Ok(())
}

/// Exécute la commande renumber
pub fn cmd_renumber(path: &Path, offset: u64, id: Option<u64>, output: Option<&Path>) -> Result<()> {
    let output = output.unwrap_or(path);
    let path_str = path.display().to_string();

    let content = if is_crd(&path_str) {
        let data = std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
        let mut project = crd::decode(&data)?;
        project.renumber(offset, id)?;
        crd::encode(&project)
    } else {
        rw5::renumber_points(&read_text(path)?, offset, id).into_bytes()
    };

    std::fs::write(output, content)?;
    info!(path = %output.display(), offset, id = ?id, "Renumbered");

    Ok(())
}

/// Exécute la commande commit-ops
#[allow(clippy::too_many_arguments)]
pub fn cmd_commit_ops(
    action: &str,
    path: &Path,
    selection: &Path,
    source_log: &Path,
    crs: Option<&str>,
    crd_sha: Option<String>,
    log_sha: Option<String>,
    config: &Config,
) -> Result<()> {
    let action: EditAction = action.parse()?;
    let content = std::fs::read_to_string(selection)
        .with_context(|| format!("Cannot read {}", selection.display()))?;
    let source_log = read_text(source_log)?;
    let path_str = path.display().to_string();

    let service = ProjectFileService::new(config.clone());
    let operations = match action {
        EditAction::Create => service.edit(EditRequest::Create {
            new_path: &path_str,
            content: &content,
            source_log: &source_log,
        })?,
        EditAction::Append => {
            let mut destination_crd = read_repo_file(path)?;
            destination_crd.sha = crd_sha;
            let log_path = PathBuf::from(sibling_log_path(&path_str));
            let mut destination_log = read_repo_file(&log_path)?;
            destination_log.sha = log_sha;
            let project_crs = match crs {
                Some(crs) => crs.to_string(),
                None => service.project_crs(&path_str, read_local_file),
            };

            service.edit(EditRequest::Append {
                content: &content,
                source_log: &source_log,
                project_crs: Some(&project_crs),
                destination_crd: &destination_crd,
                destination_log: &destination_log,
            })?
        }
    };

    println!("{}", config.to_json(&operations)?);
    Ok(())
}

/// Exécute la commande export
pub fn cmd_export(path: &Path, export_crs: &str, config: &Config) -> Result<()> {
    let path_str = path.display().to_string();
    let log_path = if is_crd(&path_str) {
        PathBuf::from(sibling_log_path(&path_str))
    } else {
        path.to_path_buf()
    };
    let log = read_repo_file(&log_path)?;

    let service = ProjectFileService::new(config.clone());
    let default_crs = service.project_crs(&log.path, read_local_file);
    let settings = read_local_file(&settings_path_for(&log.path));

    let operations = service.export_project(ExportRequest {
        log: &log,
        default_crs: &default_crs,
        export_crs,
        settings: settings.as_ref(),
    })?;

    let mut report = Report::new("export");
    write_operations(&operations, &mut report)?;
    report.finalize();
    println!("{}", report.summary());

    Ok(())
}

/// Applique des opérations de commit sur le disque local
///
/// Toutes les cibles de création sont vérifiées avant la première écriture.
/// Retourne le nombre de points du CRD écrit, s'il y en a un.
fn write_operations(operations: &[CommitOperation], report: &mut Report) -> Result<Option<usize>> {
    let contents = operations
        .iter()
        .map(CommitOperation::decoded_content)
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(existing) = operations
        .iter()
        .find(|op| op.operation == Operation::Create && Path::new(&op.path).exists())
    {
        anyhow::bail!("{} already exists, nothing written", existing.path);
    }

    let mut crd_points = None;

    for (operation, content) in operations.iter().zip(contents) {
        let path = Path::new(&operation.path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let points = if is_crd(&operation.path) {
            let count = crd::decode(&content)?.len();
            crd_points = Some(count);
            count
        } else {
            rw5::extract_all_points(&decode_lossy(&content)).count()
        };

        std::fs::write(path, &content)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        info!(path = %path.display(), operation = ?operation.operation, points, "Written");
        report.record_output(path, points, &content);
    }

    Ok(crd_points)
}

fn read_text(path: &Path) -> Result<String> {
    let data = std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    Ok(decode_lossy(&data))
}

fn read_repo_file(path: &Path) -> Result<RepoFile> {
    let content = std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    Ok(RepoFile::new(path.display().to_string(), content, None))
}

/// Fichier local, `None` s'il n'existe pas ou n'est pas lisible
fn read_local_file(path: &str) -> Option<RepoFile> {
    let path = Path::new(path);
    if !path.is_file() {
        return None;
    }
    read_repo_file(path).ok()
}

/// Collecte récursivement les fichiers CRD
fn collect_crd_files(path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if path.is_file() {
        if is_crd(&path.display().to_string()) {
            files.push(path.to_path_buf());
        }
        return Ok(files);
    }

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();

        if entry_path.is_dir() {
            files.extend(collect_crd_files(&entry_path)?);
        } else if is_crd(&entry_path.display().to_string()) {
            files.push(entry_path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_output_path_single_file() {
        assert_eq!(
            json_output_path(Path::new("in/p.crd"), Path::new("in/p.crd"), Path::new("out")),
            PathBuf::from("out/p.json")
        );
    }

    #[test]
    fn test_json_output_path_keeps_tree() {
        assert_eq!(
            json_output_path(Path::new("in"), Path::new("in/2024/p.crd"), Path::new("out")),
            PathBuf::from("out/2024/p.json")
        );
    }

    #[test]
    fn test_collect_crd_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.crd"), b"").unwrap();
        std::fs::write(dir.path().join("a.rw5"), b"").unwrap();
        std::fs::write(dir.path().join("sub/b.CRD"), b"").unwrap();

        let files = collect_crd_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| is_crd(&f.display().to_string())));
    }

    #[test]
    fn test_write_operations_checks_all_targets_first() {
        let dir = tempfile::tempdir().unwrap();
        let crd_path = dir.path().join("nytt.crd");
        let log_path = dir.path().join("nytt.rw5");
        std::fs::write(&log_path, b"JB,NMgammal\n").unwrap();

        let operations = vec![
            CommitOperation::create(crd_path.display().to_string(), &[0u8; 56]),
            CommitOperation::create(log_path.display().to_string(), b"JB,NMnytt\n"),
        ];

        let mut report = Report::new("create");
        let err = write_operations(&operations, &mut report).unwrap_err();

        assert!(err.to_string().contains("nothing written"));
        assert!(!crd_path.exists());
        assert_eq!(std::fs::read(&log_path).unwrap(), b"JB,NMgammal\n");
    }

    #[test]
    fn test_export_writes_settings_next_to_log() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("p.rw5");
        std::fs::write(&log_path, b"JB,NMp\n").unwrap();

        cmd_export(&dir.path().join("p.crd"), "EPSG:3008", &Config::default()).unwrap();

        let settings = std::fs::read_to_string(dir.path().join("settings.ini")).unwrap();
        assert!(settings.contains("defaultCrs=EPSG:3008"));
        assert_eq!(std::fs::read(&log_path).unwrap(), b"JB,NMp\n ");
    }

    #[test]
    fn test_read_local_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_local_file(&dir.path().join("settings.ini").display().to_string()).is_none());
        assert!(read_local_file(&dir.path().display().to_string()).is_none());
    }
}
