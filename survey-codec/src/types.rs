//! Types de données pour le crate survey-codec

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Taille de l'en-tête numérique (3 doubles + char[32])
pub const NUMERIC_HEADER_LEN: usize = 56;

/// Taille d'un enregistrement numérique (même forme que l'en-tête)
pub const NUMERIC_RECORD_LEN: usize = 56;

/// Taille de l'en-tête alphanumérique (double + 3 × char[32])
pub const ALPHANUMERIC_HEADER_LEN: usize = 104;

/// Taille d'un enregistrement alphanumérique (3 doubles + char[32] + char[10])
pub const ALPHANUMERIC_RECORD_LEN: usize = 66;

/// Largeur des champs texte `des`, `date` et `format`
pub const TEXT_FIELD_LEN: usize = 32;

/// Largeur du champ `id` d'un point alphanumérique
pub const ID_FIELD_LEN: usize = 10;

/// Variante de fichier CRD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Points identifiés par leur position
    Numeric,
    /// Points portant un identifiant texte
    Alphanumeric,
}

impl Layout {
    pub fn header_len(self) -> usize {
        match self {
            Layout::Numeric => NUMERIC_HEADER_LEN,
            Layout::Alphanumeric => ALPHANUMERIC_HEADER_LEN,
        }
    }

    pub fn record_len(self) -> usize {
        match self {
            Layout::Numeric => NUMERIC_RECORD_LEN,
            Layout::Alphanumeric => ALPHANUMERIC_RECORD_LEN,
        }
    }
}

/// Projet de coordonnées décodé depuis un fichier CRD
///
/// Représentation JSON: `{"header": {...}, "points": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateProject {
    #[serde(default)]
    pub header: Header,

    #[serde(default)]
    pub points: Vec<Point>,
}

impl CoordinateProject {
    /// Variante binaire impliquée par l'en-tête
    pub fn layout(&self) -> Layout {
        self.header.layout()
    }

    /// Nombre de points du projet
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// En-tête CRD
///
/// La présence du champ `format` désigne la variante alphanumérique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Header {
    Alphanumeric {
        #[serde(default)]
        id: f64,
        #[serde(default)]
        date: String,
        #[serde(default)]
        des: String,
        format: String,
    },
    Numeric {
        #[serde(default)]
        nor: f64,
        #[serde(default)]
        eas: f64,
        #[serde(default)]
        elv: f64,
        #[serde(default)]
        des: String,
    },
}

impl Header {
    pub fn layout(&self) -> Layout {
        match self {
            Header::Alphanumeric { .. } => Layout::Alphanumeric,
            Header::Numeric { .. } => Layout::Numeric,
        }
    }
}

impl Default for Header {
    fn default() -> Self {
        Header::Numeric {
            nor: 0.0,
            eas: 0.0,
            elv: 0.0,
            des: String::new(),
        }
    }
}

/// Point d'un projet CRD
///
/// `id` n'existe que dans la variante alphanumérique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub nor: f64,
    #[serde(default)]
    pub eas: f64,
    #[serde(default)]
    pub elv: f64,
    #[serde(default)]
    pub des: String,
    #[serde(
        default,
        deserialize_with = "deserialize_point_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
}

/// L'UI renvoie parfois les identifiants sous forme de nombre
fn deserialize_point_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Integer(n) => n.to_string(),
        RawId::Float(f) => f.to_string(),
    }))
}

/// Système de coordonnées identifié par son code EPSG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crs {
    /// Code EPSG
    pub epsg: u32,

    /// Nom de la grille (SurvCE)
    pub name: &'static str,
}

impl Crs {
    /// Compare avec un CRS attendu saisi librement ("EPSG:3006", "epsg:3006", "3006")
    pub fn matches(&self, expected: &str) -> bool {
        match parse_epsg(expected) {
            Some(code) => code == self.epsg,
            None => expected.trim().eq_ignore_ascii_case(&self.to_string()),
        }
    }
}

/// Extrait le code numérique d'une chaîne "EPSG:xxxx" ou "xxxx"
pub fn parse_epsg(value: &str) -> Option<u32> {
    let value = value.trim();
    let code = match value.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("epsg:") => &value[5..],
        _ => value,
    };
    code.trim().parse().ok()
}

impl Default for Crs {
    fn default() -> Self {
        Self {
            epsg: 3006, // SWEREF 99 TM par défaut
            name: "SWEREF 99 TM",
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Résumé d'un fichier RW5, tel qu'affiché dans l'UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogInfo {
    /// Premier `--DT` du fichier (mm-dd-yyyy)
    #[serde(rename = "Date")]
    pub date: Option<String>,

    /// Premier `--TM` du fichier (hh:mm:ss)
    #[serde(rename = "Time")]
    pub time: Option<String>,

    #[serde(rename = "CRS")]
    pub crs: Crs,

    /// Dernier point mesuré (-1 en JSON si aucun)
    #[serde(serialize_with = "serialize_last_point")]
    pub last_point: Option<u64>,
}

fn serialize_last_point<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(id) => serializer.serialize_u64(*id),
        None => serializer.serialize_i64(-1),
    }
}

/// Vue JSON d'un fichier RW5: en-tête et blocs de points bruts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogDocument {
    #[serde(default)]
    pub header: String,

    #[serde(default)]
    pub points: Vec<String>,
}

/// Résultat d'un ajout de points dans un projet existant
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// Contenu CRD mis à jour
    pub crd: Vec<u8>,

    /// Contenu RW5 mis à jour
    pub log: String,

    /// Nombre de points présents avant l'ajout
    pub points_before: usize,

    /// Nombre de points ajoutés
    pub merged: usize,
}

/// Résultat de la création d'un nouveau projet
#[derive(Debug, Clone)]
pub struct CreatedProject {
    /// Fichier RW5 synthétisé
    pub log: String,

    /// Contenu CRD, inchangé, à encoder par l'appelant
    pub project: CoordinateProject,
}
