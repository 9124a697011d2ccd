//! Opérations de commit vers le dépôt Git (contenu base64)

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use survey_codec::crd;

use super::ServiceError;

/// Type d'opération sur un fichier du dépôt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
}

/// Une entrée de la liste `files` d'un commit multi-fichiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitOperation {
    pub operation: Operation,

    pub path: String,

    /// Contenu encodé en base64
    pub content: String,

    /// SHA attendu du fichier existant (précondition contre les écritures perdues)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl CommitOperation {
    pub fn create(path: impl Into<String>, content: &[u8]) -> Self {
        Self {
            operation: Operation::Create,
            path: path.into(),
            content: STANDARD.encode(content),
            sha: None,
        }
    }

    pub fn update(path: impl Into<String>, content: &[u8], sha: Option<String>) -> Self {
        Self {
            operation: Operation::Update,
            path: path.into(),
            content: STANDARD.encode(content),
            sha,
        }
    }

    /// Contenu brut de l'opération
    pub fn decoded_content(&self) -> Result<Vec<u8>, ServiceError> {
        decode_base64(&self.path, &self.content)
    }
}

/// Décode un contenu base64 renvoyé par l'API (les retours à la ligne sont ignorés)
pub fn decode_base64(path: &str, content: &str) -> Result<Vec<u8>, ServiceError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|source| ServiceError::InvalidContent {
            path: path.to_string(),
            source,
        })
}

/// Vrai pour un fichier de coordonnées `.crd`
pub fn is_crd(path: &str) -> bool {
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("crd"))
}

/// Chemin du journal RW5 jumeau d'un fichier CRD
pub fn sibling_log_path(path: &str) -> String {
    match path.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("crd") => format!("{}.rw5", stem),
        _ => format!("{}.rw5", path),
    }
}

/// Prépare un contenu pour le dépôt
///
/// Les fichiers `.crd` reçoivent le JSON édité et sont réencodés en binaire;
/// les autres fichiers sont du texte UTF-8.
pub fn prepare_content(path: &str, content: &str) -> Result<Vec<u8>, ServiceError> {
    if is_crd(path) {
        Ok(crd::from_json(content)?)
    } else {
        Ok(content.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_wire_shape() {
        let op = CommitOperation::create("a/b.rw5", b"JB,NMX\n");
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["operation"], "create");
        assert_eq!(json["path"], "a/b.rw5");
        assert_eq!(json["content"], "SkIsTk1YCg==");
        assert!(json.get("sha").is_none());

        let op = CommitOperation::update("a/b.crd", b"", Some("abc123".into()));
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["operation"], "update");
        assert_eq!(json["sha"], "abc123");
    }

    #[test]
    fn test_decode_base64_with_line_breaks() {
        let decoded = decode_base64("x.rw5", "SkIsTk1Y\nCg==\n").unwrap();
        assert_eq!(decoded, b"JB,NMX\n");
        assert!(matches!(
            decode_base64("x.rw5", "not base64!"),
            Err(ServiceError::InvalidContent { .. })
        ));
    }

    #[test]
    fn test_sibling_log_path() {
        assert_eq!(sibling_log_path("projets/0003215.crd"), "projets/0003215.rw5");
        assert_eq!(sibling_log_path("projets/0003215.CRD"), "projets/0003215.rw5");
        assert_eq!(sibling_log_path("README"), "README.rw5");
    }

    #[test]
    fn test_prepare_content() {
        let crd = prepare_content("p.crd", r#"{"header": {"des": "x"}, "points": []}"#).unwrap();
        assert_eq!(crd.len(), 56);

        let text = prepare_content("p.rw5", "JB,NMX\n").unwrap();
        assert_eq!(text, b"JB,NMX\n");

        assert!(prepare_content("p.crd", "{").is_err());
    }
}
