//! Paramètres de projet (`settings.ini`) et export
//!
//! Le CRS d'un projet est la clé `defaultCrs` du premier `settings.ini` trouvé dans
//! le dossier du projet ou ses parents. Un export réécrit cette clé puis modifie le
//! RW5 pour déclencher l'action d'export du dépôt.

use std::sync::OnceLock;

use regex::Regex;

use survey_codec::types::parse_epsg;

use super::RepoFile;

/// Nom du fichier de paramètres
pub const SETTINGS_FILE_NAME: &str = "settings.ini";

/// Nombre de dossiers inspectés, celui du projet compris
pub const SEARCH_LEVELS: usize = 3;

/// Section écrite dans un nouveau fichier de paramètres
pub const SETTINGS_SECTION: &str = "[SurveyExport]";

fn default_crs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)defaultCrs[ \t]*=[ \t]*(\S+)").expect("default crs regex must compile")
    })
}

fn default_crs_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(defaultCrs[ \t]*=[ \t]*)[^\r\n]*")
            .expect("default crs line regex must compile")
    })
}

/// Réglages trouvés pour un projet
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    /// Fichier `settings.ini` qui définit le CRS
    pub file: RepoFile,

    pub default_crs: String,
}

/// Dossier parent d'un chemin du dépôt (`""` pour un chemin relatif de premier niveau)
pub fn parent_dir(path: &str) -> &str {
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((dir, _)) => dir,
        None => "",
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Chemin du `settings.ini` du dossier d'un fichier de projet
pub fn settings_path_for(project_path: &str) -> String {
    join(parent_dir(project_path), SETTINGS_FILE_NAME)
}

/// Chemins candidats, du dossier du projet vers la racine
///
/// `projets/2024/kund` → `projets/2024/kund/settings.ini`, `projets/2024/settings.ini`,
/// `projets/settings.ini`
pub fn settings_candidates(dir: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::with_capacity(SEARCH_LEVELS);
    let mut current = dir;

    for _ in 0..SEARCH_LEVELS {
        let candidate = join(current, SETTINGS_FILE_NAME);
        if candidates.contains(&candidate) {
            break;
        }
        candidates.push(candidate);
        current = parent_dir(current);
    }

    candidates
}

/// Valeur de `defaultCrs`, ou `None`
///
/// Les fichiers écrits par l'ancienne application se terminent par un `\n` littéral,
/// retiré ici.
pub fn read_default_crs(content: &str) -> Option<&str> {
    default_crs_re()
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches("\\n"))
        .filter(|value| !value.is_empty())
}

/// Cherche le `settings.ini` le plus proche qui définit `defaultCrs`
///
/// `fetch` renvoie le fichier du dépôt à ce chemin, ou `None` s'il n'existe pas.
pub fn find_project_settings<F>(project_dir: &str, mut fetch: F) -> Option<ProjectSettings>
where
    F: FnMut(&str) -> Option<RepoFile>,
{
    settings_candidates(project_dir).into_iter().find_map(|path| {
        let file = fetch(&path)?;
        let default_crs = read_default_crs(&file.text())?.to_string();
        Some(ProjectSettings { file, default_crs })
    })
}

/// Remplace la valeur de `defaultCrs`, ou ajoute la clé en fin de fichier
pub fn update_default_crs(content: &str, crs: &str) -> String {
    let line_re = default_crs_line_re();
    if line_re.is_match(content) {
        return line_re
            .replace_all(content, |caps: &regex::Captures| format!("{}{}", &caps[1], crs))
            .into_owned();
    }

    let mut updated = String::with_capacity(content.len() + crs.len() + 13);
    updated.push_str(content);
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str("defaultCrs=");
    updated.push_str(crs);
    updated.push('\n');
    updated
}

/// Contenu d'un nouveau `settings.ini`
pub fn new_settings(crs: &str) -> String {
    format!("{}\ndefaultCrs={}\n", SETTINGS_SECTION, crs)
}

/// Ajoute ou retire l'espace final du journal
///
/// Le contenu change sans toucher aux mesures, ce qui suffit à déclencher l'export.
pub fn touch_log(content: &str) -> String {
    match content.strip_suffix(' ') {
        Some(stripped) => stripped.to_string(),
        None => format!("{} ", content),
    }
}

/// Compare deux CRS saisis librement ("EPSG:3006", "epsg:3006", "3006")
pub fn same_crs(a: &str, b: &str) -> bool {
    match (parse_epsg(a), parse_epsg(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("projets/2024/p.rw5"), "projets/2024");
        assert_eq!(parent_dir("projets/2024/"), "projets");
        assert_eq!(parent_dir("p.rw5"), "");
        assert_eq!(parent_dir("/data/p.rw5"), "/data");
        assert_eq!(parent_dir("/data"), "/");
        assert_eq!(parent_dir("/"), "/");
    }

    #[test]
    fn test_settings_candidates() {
        assert_eq!(
            settings_candidates("projets/2024/kund"),
            vec![
                "projets/2024/kund/settings.ini",
                "projets/2024/settings.ini",
                "projets/settings.ini",
            ]
        );
        assert_eq!(settings_candidates("kund"), vec!["kund/settings.ini", "settings.ini"]);
        assert_eq!(settings_candidates(""), vec!["settings.ini"]);
        assert_eq!(settings_candidates("/data"), vec!["/data/settings.ini", "/settings.ini"]);
    }

    #[test]
    fn test_settings_path_for() {
        assert_eq!(settings_path_for("projets/0003215.rw5"), "projets/settings.ini");
        assert_eq!(settings_path_for("0003215.rw5"), "settings.ini");
    }

    #[test]
    fn test_read_default_crs() {
        assert_eq!(read_default_crs("[SurveyExport]\ndefaultCrs=epsg:3008\n"), Some("epsg:3008"));
        assert_eq!(read_default_crs("DefaultCrs = EPSG:3006\r\n"), Some("EPSG:3006"));
        assert_eq!(read_default_crs(r"[SurveyExport]\ndefaultCrs=epsg:3009\n"), Some("epsg:3009"));
        assert_eq!(read_default_crs("[SurveyExport]\n"), None);
        assert_eq!(read_default_crs("defaultCrs=\n"), None);
    }

    #[test]
    fn test_find_project_settings_nearest_with_key() {
        let files: HashMap<&str, RepoFile> = [
            ("p/2024/settings.ini", "[SurveyExport]\n"),
            ("p/settings.ini", "[SurveyExport]\ndefaultCrs=epsg:3008\n"),
        ]
        .into_iter()
        .map(|(path, content)| {
            (path, RepoFile::new(path, content.as_bytes().to_vec(), Some("sha".into())))
        })
        .collect();

        let mut asked = Vec::new();
        let found = find_project_settings("p/2024/kund", |path| {
            asked.push(path.to_string());
            files.get(path).cloned()
        })
        .unwrap();

        assert_eq!(found.file.path, "p/settings.ini");
        assert_eq!(found.default_crs, "epsg:3008");
        assert_eq!(
            asked,
            vec!["p/2024/kund/settings.ini", "p/2024/settings.ini", "p/settings.ini"]
        );
    }

    #[test]
    fn test_find_project_settings_none() {
        assert!(find_project_settings("a/b/c/d", |_| None).is_none());
    }

    #[test]
    fn test_update_default_crs_existing() {
        let content = "[SurveyExport]\nDefaultCrs = epsg:3006\nformat=dxf\n";
        assert_eq!(
            update_default_crs(content, "epsg:3009"),
            "[SurveyExport]\nDefaultCrs = epsg:3009\nformat=dxf\n"
        );
    }

    #[test]
    fn test_update_default_crs_missing_key() {
        assert_eq!(
            update_default_crs("[SurveyExport]", "epsg:3009"),
            "[SurveyExport]\ndefaultCrs=epsg:3009\n"
        );
        assert_eq!(update_default_crs("", "epsg:3009"), "defaultCrs=epsg:3009\n");
    }

    #[test]
    fn test_new_settings() {
        let content = new_settings("epsg:3008");
        assert_eq!(content, "[SurveyExport]\ndefaultCrs=epsg:3008\n");
        assert_eq!(read_default_crs(&content), Some("epsg:3008"));
    }

    #[test]
    fn test_touch_log_toggles_trailing_space() {
        assert_eq!(touch_log("JB,NMX\n"), "JB,NMX\n ");
        assert_eq!(touch_log("JB,NMX\n "), "JB,NMX\n");
        assert_eq!(touch_log(""), " ");
    }

    #[test]
    fn test_same_crs() {
        assert!(same_crs("EPSG:3006", " epsg:3006"));
        assert!(same_crs("3008", "epsg:3008"));
        assert!(!same_crs("epsg:3006", "epsg:3009"));
        assert!(same_crs("SWEREF 99 TM", "sweref 99 tm"));
    }
}
