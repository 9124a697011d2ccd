//! Lecture et écriture des champs à largeur fixe
//!
//! Nombres: IEEE-754 double little-endian. Textes: UTF-8 complété par des octets nuls.

/// Lit un f64 little-endian à l'offset donné
///
/// L'appelant garantit que `data` contient au moins `offset + 8` octets.
#[inline]
pub fn read_f64(data: &[u8], offset: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    f64::from_le_bytes(bytes)
}

/// Lit un champ texte: octets nuls de fin supprimés, séquences UTF-8 invalides ignorées
pub fn read_text(data: &[u8], offset: usize, len: usize) -> String {
    let raw = data.get(offset..offset + len).unwrap_or_default();
    decode_lossy(trim_nul(raw))
}

/// Supprime les octets nuls de fin
#[inline]
pub fn trim_nul(raw: &[u8]) -> &[u8] {
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    &raw[..end]
}

/// Décode en UTF-8 en abandonnant les octets invalides
pub fn decode_lossy(raw: &[u8]) -> String {
    if let Ok(s) = simdutf8::basic::from_utf8(raw) {
        return s.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    for chunk in raw.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

#[inline]
pub fn write_f64(buf: &mut Vec<u8>, value: f64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Écrit un champ texte de `len` octets
///
/// Une valeur trop longue est tronquée à la dernière frontière de caractère
/// qui tient dans le champ; le reste est complété par des octets nuls.
pub fn write_text(buf: &mut Vec<u8>, value: &str, len: usize) {
    let fitted = truncate_to_width(value, len);
    buf.extend_from_slice(fitted.as_bytes());
    buf.resize(buf.len() + (len - fitted.len()), 0);
}

/// Préfixe le plus long de `value` tenant en `width` octets UTF-8
pub fn truncate_to_width(value: &str, width: usize) -> &str {
    if value.len() <= width {
        return value;
    }
    let mut end = width;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
