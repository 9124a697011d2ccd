//! Fusion de projets: ajout de points dans un projet existant et création de projet
//!
//! Les deux opérations combinent un fichier CRD et son journal RW5 jumeau. Les
//! identifiants des points ajoutés sont décalés du nombre de points déjà présents
//! dans la destination, dans le CRD comme dans le RW5.
//!
//! Aucune de ces fonctions ne sérialise les fusions concurrentes vers une même
//! destination: c'est à l'appelant de le faire (ex: précondition sur le SHA au commit).

use crate::crd;
use crate::error::{CodecError, Result};
use crate::rw5;
use crate::types::{CoordinateProject, CreatedProject, MergeOutput, Point};

/// Nom de job dérivé d'un chemin: nom de fichier sans extension
///
/// `projets/2024/0003215.crd` → `0003215`
pub fn job_name_from_path(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name.split('.').next().unwrap_or(file_name)
}

/// Identifiants numériques des points sélectionnés, dans l'ordre
fn selected_ids(points: &[Point]) -> Result<Vec<u64>> {
    points
        .iter()
        .map(|point| {
            let raw = point.id.as_deref().unwrap_or("");
            raw.trim()
                .parse::<u64>()
                .map_err(|_| CodecError::InvalidPointId { id: raw.to_string() })
        })
        .collect()
}

/// Concatène les blocs RW5 des points `ids`, dans l'ordre donné
fn collect_blocks(log: &str, ids: &[u64]) -> String {
    ids.iter().map(|&id| rw5::get_point(log, id)).collect()
}

/// Ajoute les points sélectionnés d'un projet source à un projet destination
///
/// # Arguments
///
/// * `selection` - Points choisis dans le projet source (identifiants numériques)
/// * `source_log` - Journal RW5 du projet source
/// * `expected_crs` - CRS attendu pour la destination ("EPSG:3006", "3006", ...)
/// * `destination_crd` - Contenu CRD actuel de la destination
/// * `destination_log` - Journal RW5 actuel de la destination
///
/// # Errors
///
/// `CodecError::CrsMismatch` si le journal destination n'utilise pas le CRS attendu;
/// rien n'est alors produit. `CodecError::TruncatedRecord` si le CRD destination est
/// invalide, `CodecError::InvalidPointId` si un point sélectionné n'a pas d'identifiant
/// numérique.
///
/// Une sélection vide donne `merged == 0` et des contenus inchangés.
pub fn append_points(
    selection: &CoordinateProject,
    source_log: &str,
    expected_crs: &str,
    destination_crd: &[u8],
    destination_log: &str,
) -> Result<MergeOutput> {
    // 1. Vérifier le CRS de la destination
    let found = rw5::extract_crs(destination_log);
    if !found.matches(expected_crs) {
        return Err(CodecError::crs_mismatch(expected_crs, found.to_string()));
    }

    // 2. Récupérer les blocs RW5 des points sélectionnés
    let ids = selected_ids(&selection.points)?;
    let blocks = collect_blocks(source_log, &ids);

    // 3. Compter les points déjà présents
    let mut destination = crd::decode(destination_crd)?;
    let points_before = destination.len();

    if ids.is_empty() {
        return Ok(MergeOutput {
            crd: destination_crd.to_vec(),
            log: destination_log.to_string(),
            points_before,
            merged: 0,
        });
    }

    // 4. Décaler les identifiants, sur une copie privée de la sélection
    let offset = points_before as u64;
    let blocks = rw5::renumber_points(&blocks, offset, None);
    let mut added = selection.clone();
    added.renumber(offset, None)?;

    // 5. Ajouter les points et les blocs
    destination.points.append(&mut added.points);

    let mut log = String::with_capacity(destination_log.len() + blocks.len() + 1);
    log.push_str(destination_log);
    if !log.is_empty() && !log.ends_with('\n') {
        log.push('\n');
    }
    log.push_str(&blocks);

    // 6. Réencoder le CRD
    Ok(MergeOutput {
        crd: crd::encode(&destination),
        log,
        points_before,
        merged: ids.len(),
    })
}

/// Synthétise le journal RW5 d'un nouveau projet
///
/// L'en-tête du journal source est repris avec un nom de job dérivé de `new_path`,
/// suivi des blocs des points de `content` dans leur ordre.
pub fn create_project(
    new_path: &str,
    content: CoordinateProject,
    source_log: &str,
) -> Result<CreatedProject> {
    let ids = selected_ids(&content.points)?;

    let header = rw5::extract_header(source_log);
    let mut log = rw5::rename_job(header, job_name_from_path(new_path));
    log.push_str(&collect_blocks(source_log, &ids));

    Ok(CreatedProject {
        log,
        project: content,
    })
}
