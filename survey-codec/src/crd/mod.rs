//! Codec pour les fichiers CRD (coordonnées binaires à enregistrements fixes)
//!
//! | Variante      | En-tête | Enregistrement |
//! |---------------|---------|----------------|
//! | numérique     | 56 o: `f64 nor, f64 eas, f64 elv, char[32] des` | 56 o, même forme |
//! | alphanumérique| 104 o: `f64 id, char[32] date, char[32] des, char[32] format` | 66 o: `f64 nor, f64 eas, f64 elv, char[32] des, char[10] id` |

pub mod field;

use crate::error::{CodecError, Result};
use crate::types::{
    CoordinateProject, Header, Layout, Point, ALPHANUMERIC_HEADER_LEN, ALPHANUMERIC_RECORD_LEN,
    ID_FIELD_LEN, NUMERIC_HEADER_LEN, NUMERIC_RECORD_LEN, TEXT_FIELD_LEN,
};

use field::{read_f64, read_text, trim_nul, write_f64, write_text};

/// Offset du champ `date` de l'en-tête alphanumérique
const DATE_OFFSET: usize = 8;

/// Offset du champ `format` de l'en-tête alphanumérique
const FORMAT_OFFSET: usize = 72;

/// Offset du champ `id` dans un enregistrement alphanumérique
const RECORD_ID_OFFSET: usize = 56;

/// Ce que l'en-tête dit de la variante
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderHint {
    Alphanumeric,
    Numeric,
    Unknown,
}

/// Détermine la variante d'un buffer CRD
///
/// L'en-tête décide en premier: des champs `date` et `format` textuels, `format`
/// non vide, désignent la variante alphanumérique; des octets non textuels dans
/// ces champs désignent la variante numérique. La taille ne sert qu'à départager
/// un en-tête muet (champs vides); si les deux variantes tombent juste, les champs
/// `id` des enregistrements alphanumériques sont inspectés.
///
/// La taille n'est pas vérifiée ici: un buffer qui ne correspond pas à la variante
/// retenue échoue au décodage avec `TruncatedRecord`.
pub fn detect_layout(data: &[u8]) -> Result<Layout> {
    if data.len() < NUMERIC_HEADER_LEN {
        return Err(CodecError::truncated(0, NUMERIC_HEADER_LEN, data.len()));
    }

    let layout = match header_hint(data) {
        HeaderHint::Alphanumeric => Layout::Alphanumeric,
        HeaderHint::Numeric => Layout::Numeric,
        HeaderHint::Unknown => {
            let numeric_fits = data.len() % NUMERIC_RECORD_LEN == 0;
            let alphanumeric_fits = data.len() >= ALPHANUMERIC_HEADER_LEN
                && (data.len() - ALPHANUMERIC_HEADER_LEN) % ALPHANUMERIC_RECORD_LEN == 0;

            match (alphanumeric_fits, numeric_fits) {
                (true, false) => Layout::Alphanumeric,
                (true, true) if has_alphanumeric_ids(data) => Layout::Alphanumeric,
                _ => Layout::Numeric,
            }
        }
    };

    Ok(layout)
}

/// Inspecte les champs `date` et `format` de l'en-tête alphanumérique
fn header_hint(data: &[u8]) -> HeaderHint {
    let (Some(date), Some(format)) = (
        data.get(DATE_OFFSET..DATE_OFFSET + TEXT_FIELD_LEN),
        data.get(FORMAT_OFFSET..FORMAT_OFFSET + TEXT_FIELD_LEN),
    ) else {
        return HeaderHint::Unknown;
    };

    let format = trim_nul(format);
    if !is_plain_text(trim_nul(date)) || !is_plain_text(format) {
        HeaderHint::Numeric
    } else if format.is_empty() {
        HeaderHint::Unknown
    } else {
        HeaderHint::Alphanumeric
    }
}

/// Vrai si chaque enregistrement alphanumérique porte un `id` textuel, au moins un non vide
fn has_alphanumeric_ids(data: &[u8]) -> bool {
    let ids: Vec<&[u8]> = data[ALPHANUMERIC_HEADER_LEN..]
        .chunks_exact(ALPHANUMERIC_RECORD_LEN)
        .map(|record| trim_nul(&record[RECORD_ID_OFFSET..RECORD_ID_OFFSET + ID_FIELD_LEN]))
        .collect();

    ids.iter().all(|id| is_plain_text(id)) && ids.iter().any(|id| !id.is_empty())
}

fn is_plain_text(raw: &[u8]) -> bool {
    simdutf8::basic::from_utf8(raw).is_ok_and(|s| !s.chars().any(char::is_control))
}

/// Décode un buffer CRD
///
/// # Errors
///
/// `CodecError::TruncatedRecord` si le buffer est plus court que l'en-tête
/// ou se termine par un enregistrement incomplet.
pub fn decode(data: &[u8]) -> Result<CoordinateProject> {
    let layout = detect_layout(data)?;
    let header_len = layout.header_len();

    if data.len() < header_len {
        return Err(CodecError::truncated(0, header_len, data.len()));
    }

    let header = decode_header(&data[..header_len], layout);

    let record_len = layout.record_len();
    let mut records = data[header_len..].chunks_exact(record_len);
    let points: Vec<Point> = records
        .by_ref()
        .map(|record| decode_point(record, layout))
        .collect();

    let remainder = records.remainder();
    if !remainder.is_empty() {
        return Err(CodecError::truncated(
            data.len() - remainder.len(),
            record_len,
            remainder.len(),
        ));
    }

    Ok(CoordinateProject { header, points })
}

fn decode_header(data: &[u8], layout: Layout) -> Header {
    match layout {
        Layout::Numeric => Header::Numeric {
            nor: read_f64(data, 0),
            eas: read_f64(data, 8),
            elv: read_f64(data, 16),
            des: read_text(data, 24, TEXT_FIELD_LEN),
        },
        Layout::Alphanumeric => Header::Alphanumeric {
            id: read_f64(data, 0),
            date: read_text(data, DATE_OFFSET, TEXT_FIELD_LEN),
            des: read_text(data, 40, TEXT_FIELD_LEN),
            format: read_text(data, FORMAT_OFFSET, TEXT_FIELD_LEN),
        },
    }
}

fn decode_point(record: &[u8], layout: Layout) -> Point {
    let id = match layout {
        Layout::Numeric => None,
        Layout::Alphanumeric => Some(read_text(record, RECORD_ID_OFFSET, ID_FIELD_LEN)),
    };

    Point {
        nor: read_f64(record, 0),
        eas: read_f64(record, 8),
        elv: read_f64(record, 16),
        des: read_text(record, 24, TEXT_FIELD_LEN),
        id,
    }
}

/// Encode un projet en buffer CRD
///
/// La variante est celle de l'en-tête; les textes trop longs sont tronqués
/// silencieusement à la largeur du champ.
pub fn encode(project: &CoordinateProject) -> Vec<u8> {
    let layout = project.layout();
    let mut buf =
        Vec::with_capacity(layout.header_len() + project.points.len() * layout.record_len());

    match &project.header {
        Header::Numeric { nor, eas, elv, des } => {
            write_f64(&mut buf, *nor);
            write_f64(&mut buf, *eas);
            write_f64(&mut buf, *elv);
            write_text(&mut buf, des, TEXT_FIELD_LEN);
        }
        Header::Alphanumeric {
            id,
            date,
            des,
            format,
        } => {
            write_f64(&mut buf, *id);
            write_text(&mut buf, date, TEXT_FIELD_LEN);
            write_text(&mut buf, des, TEXT_FIELD_LEN);
            write_text(&mut buf, format, TEXT_FIELD_LEN);
        }
    }

    for point in &project.points {
        write_f64(&mut buf, point.nor);
        write_f64(&mut buf, point.eas);
        write_f64(&mut buf, point.elv);
        write_text(&mut buf, &point.des, TEXT_FIELD_LEN);
        if layout == Layout::Alphanumeric {
            write_text(&mut buf, point.id.as_deref().unwrap_or(""), ID_FIELD_LEN);
        }
    }

    buf
}

/// Décode un buffer CRD en JSON (indenté)
pub fn to_json(data: &[u8]) -> Result<String> {
    let project = decode(data)?;
    Ok(serde_json::to_string_pretty(&project)?)
}

/// Encode un JSON `{"header": ..., "points": [...]}` en buffer CRD
pub fn from_json(json: &str) -> Result<Vec<u8>> {
    let project: CoordinateProject = serde_json::from_str(json)?;
    Ok(encode(&project))
}

impl CoordinateProject {
    /// Décale les identifiants de points de `offset`
    ///
    /// Sans `target`, tous les points porteurs d'un identifiant sont décalés et un
    /// identifiant non numérique est une erreur (le projet reste alors inchangé).
    /// Avec `target`, seuls les points dont l'identifiant vaut `target` sont décalés.
    pub fn renumber(&mut self, offset: u64, target: Option<u64>) -> Result<()> {
        let mut updates = Vec::new();

        for (index, point) in self.points.iter().enumerate() {
            let Some(raw) = point.id.as_deref() else {
                continue;
            };

            let parsed = raw.trim().parse::<u64>();
            let current = match (parsed, target) {
                (Ok(id), Some(t)) if id != t => continue,
                (Ok(id), _) => id,
                (Err(_), Some(_)) => continue,
                (Err(_), None) => return Err(CodecError::InvalidPointId { id: raw.to_string() }),
            };

            let shifted = current
                .checked_add(offset)
                .ok_or_else(|| CodecError::InvalidPointId { id: raw.to_string() })?;
            updates.push((index, shifted.to_string()));
        }

        for (index, id) in updates {
            self.points[index].id = Some(id);
        }

        Ok(())
    }
}
