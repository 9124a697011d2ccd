//! Détection du système de coordonnées d'un fichier RW5

use crate::types::Crs;

use super::patterns::crs_line_re;

/// Mapping des grilles SurvCE vers EPSG
const GRIDS: &[(&str, Crs)] = &[
    (
        "sweref 99 tm",
        Crs {
            epsg: 3006,
            name: "SWEREF 99 TM",
        },
    ),
    (
        "sweref 99 13 30",
        Crs {
            epsg: 3008,
            name: "SWEREF 99 13 30",
        },
    ),
    (
        "sweref 99 15 00",
        Crs {
            epsg: 3009,
            name: "SWEREF 99 15 00",
        },
    ),
];

/// Déduit le CRS depuis la première ligne `--User Defined:` ou `--Projection:`
///
/// Sans annotation, si la première est vide ou si la grille est inconnue: EPSG:3006.
pub fn extract_crs(text: &str) -> Crs {
    let Some(caps) = crs_line_re().captures(text) else {
        return Crs::default();
    };

    let annotation = caps[1].to_lowercase();
    GRIDS
        .iter()
        .find(|(grid, _)| annotation.contains(grid))
        .map(|&(_, crs)| crs)
        .unwrap_or_default()
}
