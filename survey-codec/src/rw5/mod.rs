//! Lecture et réécriture des journaux RW5 (SurvCE)
//!
//! Le texte n'est jamais transformé en arbre: toutes les opérations sont des
//! recherches ou des substitutions par motif sur le texte brut. Une absence de
//! correspondance donne un résultat vide, jamais une erreur.

pub mod crs;
mod patterns;

pub use crs::extract_crs;

use crate::error::Result;
use crate::types::{LogDocument, LogInfo};

use patterns::{
    date_re, gps_point_id_re, header_re, job_name_re, numbered_block_re, point_block_re,
    point_code_re, point_number_re, time_re,
};

/// Bloc d'en-tête (ligne `JB` jusqu'à la première ligne de point), ou `""`
pub fn extract_header(text: &str) -> &str {
    header_re().find(text).map_or("", |m| m.as_str())
}

/// Tous les blocs de points, dans l'ordre du document
pub fn extract_all_points(text: &str) -> impl Iterator<Item = &str> + '_ {
    point_block_re().find_iter(text).map(|m| m.as_str())
}

/// Dernier bloc du point `id` (les remesures sont ajoutées en fin de fichier), ou `""`
pub fn get_point(text: &str, id: u64) -> &str {
    let wanted = id.to_string();
    numbered_block_re()
        .captures_iter(text)
        .filter(|caps| caps[1] == *wanted)
        .last()
        .and_then(|caps| caps.get(0))
        .map_or("", |m| m.as_str())
}

/// Numéro du dernier point `GPS,PN` du fichier (par position, pas par valeur)
pub fn extract_last_point_id(text: &str) -> Option<u64> {
    gps_point_id_re()
        .captures_iter(text)
        .last()
        .and_then(|caps| caps[1].parse().ok())
}

/// Décale de `offset` les numéros qui suivent `,PN`
///
/// Avec `target`, seul ce numéro est décalé. Les autres chiffres de la ligne
/// (coordonnées, dates, DOP) ne sont jamais touchés.
pub fn renumber_points(text: &str, offset: u64, target: Option<u64>) -> String {
    point_number_re()
        .replace_all(text, |caps: &regex::Captures| {
            let shifted = caps[1]
                .parse::<u64>()
                .ok()
                .filter(|id| target.map_or(true, |t| t == *id))
                .and_then(|id| id.checked_add(offset));

            match shifted {
                Some(id) => format!(",PN{},", id),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Remplace le nom de job (`NM...` de la ligne `JB`)
pub fn rename_job(text: &str, new_name: &str) -> String {
    job_name_re()
        .replace(text, |caps: &regex::Captures| format!("{}{}", &caps[1], new_name))
        .into_owned()
}

/// Remplace le code du point `id` sur ses lignes `GPS,PN` et `--GS,PN`
pub fn change_point_code(text: &str, id: u64, new_code: &str) -> String {
    let wanted = id.to_string();
    point_code_re()
        .replace_all(text, |caps: &regex::Captures| {
            if caps[2] == *wanted {
                format!("{}{}", &caps[1], new_code)
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Date, heure, CRS et dernier point du fichier
pub fn read_info(text: &str) -> LogInfo {
    LogInfo {
        date: date_re().captures(text).map(|c| c[1].to_string()),
        time: time_re().captures(text).map(|c| c[1].to_string()),
        crs: extract_crs(text),
        last_point: extract_last_point_id(text),
    }
}

/// Sépare le fichier en en-tête et blocs de points
pub fn to_document(text: &str) -> LogDocument {
    LogDocument {
        header: extract_header(text).to_string(),
        points: extract_all_points(text).map(str::to_string).collect(),
    }
}

/// Reconstruit un fichier depuis l'en-tête et les blocs de points
///
/// Un saut de ligne n'est inséré qu'entre deux morceaux qui n'en ont pas déjà.
pub fn from_document(document: &LogDocument) -> String {
    let mut out = String::with_capacity(
        document.header.len() + document.points.iter().map(|p| p.len() + 1).sum::<usize>(),
    );

    for chunk in std::iter::once(&document.header).chain(&document.points) {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(chunk);
    }
    out
}

/// Vue JSON `{"header": "...", "points": ["...", ...]}`
pub fn to_json(text: &str) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_document(text))?)
}

/// Inverse de [`to_json`]
pub fn from_json(json: &str) -> Result<String> {
    let document: LogDocument = serde_json::from_str(json)?;
    Ok(from_document(&document))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "JB,NMDEMO,DT01-02-2022,TM08:00:00\r\n\
MO,AD0,UN1,SF1.00000000,EC0,EO0.0,AU0\r\n\
--User Defined: SWEDEN/SWEREF 99 13 30\r\n\
LS,HR2.0000\r\n\
GPS,PN10,LA56.5,LN14.5,EL233.5,--K\r\n\
--GS,PN10,N 6305692.8417,E 498017.1303,EL199.0365,--K\r\n\
--DT01-02-2022\r\n\
--TM08:01:10\r\n\
GPS,PN11,LA56.6,LN14.6,EL233.6,--L\r\n\
--GS,PN11,N 6305693.0000,E 498018.0000,EL199.1000,--L\r\n\
--DT01-02-2022\r\n\
--TM08:02:20\r\n";

    #[test]
    fn test_crlf_header() {
        let header = extract_header(LOG);
        assert!(header.starts_with("JB,NMDEMO"));
        assert!(header.ends_with("LS,HR2.0000\r\n"));
    }

    #[test]
    fn test_crlf_points() {
        let points: Vec<_> = extract_all_points(LOG).collect();
        assert_eq!(points.len(), 2);
        assert!(points[1].starts_with("GPS,PN11"));
        assert!(points[1].ends_with("--TM08:02:20\r\n"));
    }

    #[test]
    fn test_extract_all_points_is_restartable() {
        let first: Vec<_> = extract_all_points(LOG).collect();
        let second: Vec<_> = extract_all_points(LOG).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_job_line() {
        assert_eq!(extract_header("GPS,PN1,LA1\n"), "");
        assert_eq!(extract_all_points("").count(), 0);
        assert_eq!(get_point(LOG, 99), "");
        assert_eq!(extract_last_point_id("JB,NMX\n"), None);
    }

    #[test]
    fn test_get_point_accepts_g_digit_continuation() {
        let text = "GPS,PN3,LA1,LN2,EL3,--K\nG0,PN3,raw\nG1,more\n--DT01-01-2020\nGPS,PN4,LA1\n";
        let block = get_point(text, 3);
        assert!(block.contains("G0,PN3,raw\n"));
        assert!(block.ends_with("--DT01-01-2020\n"));
        assert!(!block.contains("PN4"));

        // Le motif générique s'arrête à la première ligne G<chiffre>
        let first = extract_all_points(text).next().unwrap();
        assert_eq!(first, "GPS,PN3,LA1,LN2,EL3,--K\n");
    }

    #[test]
    fn test_get_point_exact_id() {
        let text = "GPS,PN14,LA1,LN2\n--DTx\nGPS,PN4,LA3,LN4\n--DTy\n";
        assert!(get_point(text, 4).starts_with("GPS,PN4,LA3"));
        assert!(get_point(text, 14).starts_with("GPS,PN14,LA1"));
        assert_eq!(get_point(text, 1), "");
    }

    #[test]
    fn test_renumber_leaves_other_digits() {
        let shifted = renumber_points(LOG, 100, None);
        assert!(shifted.contains("GPS,PN110,LA56.5,LN14.5,EL233.5,--K"));
        assert!(shifted.contains("--GS,PN111,N 6305693.0000,E 498018.0000,EL199.1000,--L"));
        assert!(shifted.contains("--TM08:01:10"));
        assert_eq!(shifted.len(), LOG.len() + 4);
    }

    #[test]
    fn test_renumber_target() {
        let shifted = renumber_points(LOG, 5, Some(11));
        assert!(shifted.contains("GPS,PN10,"));
        assert!(shifted.contains("GPS,PN16,"));
        assert!(shifted.contains("--GS,PN16,"));
    }

    #[test]
    fn test_rename_job_only_touches_job_line() {
        let text = "JB,NMOLD,DT01-02-2022\n--NMnot a job,x\n";
        let renamed = rename_job(text, "NEW");
        assert_eq!(renamed, "JB,NMNEW,DT01-02-2022\n--NMnot a job,x\n");
    }

    #[test]
    fn test_change_point_code() {
        let changed = change_point_code(LOG, 10, "BRUNN");
        assert!(changed.contains("GPS,PN10,LA56.5,LN14.5,EL233.5,--BRUNN\r\n"));
        assert!(changed.contains("--GS,PN10,N 6305692.8417,E 498017.1303,EL199.0365,--BRUNN\r\n"));
        assert!(changed.contains("GPS,PN11,LA56.6,LN14.6,EL233.6,--L\r\n"));
    }

    #[test]
    fn test_read_info() {
        let info = read_info(LOG);
        assert_eq!(info.date.as_deref(), Some("01-02-2022"));
        assert_eq!(info.time.as_deref(), Some("08:01:10"));
        assert_eq!(info.crs.epsg, 3008);
        assert_eq!(info.last_point, Some(11));
    }

    #[test]
    fn test_document_rebuild() {
        let text = "JB,NMDEMO\nLS,HR2.0\nGPS,PN1,LA1\n--DT01-01-2020\nGPS,PN2,LA2\n--DT01-01-2020\n";
        let rebuilt = from_json(&to_json(text).unwrap()).unwrap();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_from_document_inserts_missing_newlines() {
        let document = LogDocument {
            header: "JB,NMX".into(),
            points: vec!["GPS,PN1,LA1".into(), "GPS,PN2,LA2\n".into()],
        };
        assert_eq!(from_document(&document), "JB,NMX\nGPS,PN1,LA1\nGPS,PN2,LA2\n");
    }
}
