//! Tests sur un vrai journal SurvCE (GPS, SWEREF 99 TM, point 4 remesuré)

use survey_codec::rw5;

const NYADAL: &str = include_str!("fixtures/nyadal.rw5");

#[test]
fn test_get_point_returns_last_remeasurement() {
    let point = rw5::get_point(NYADAL, 4);
    assert!(point.starts_with("GPS,PN4"));
    assert!(point.contains("--K el_SKP"));
    assert!(point.ends_with("--TM14:47:55\n"));
    assert!(!point.contains("--TM14:47:51"));

    let point = rw5::get_point(NYADAL, 23);
    assert!(point.starts_with("GPS,PN23"));
    assert!(point.ends_with("--TM14:48:01\n"));
}

#[test]
fn test_get_all_points() {
    let points: Vec<&str> = rw5::extract_all_points(NYADAL).collect();
    assert_eq!(points.len(), 8);
    assert!(points.iter().all(|p| p.starts_with("GPS,PN")));
    assert!(points[0].starts_with("GPS,PN1,"));
    assert!(points[7].starts_with("GPS,PN23,"));
}

#[test]
fn test_header_span() {
    let header = rw5::extract_header(NYADAL);
    assert!(header.starts_with("JB,NMNYADAL,DT03-17-2021,TM14:45:50"));
    assert!(header.ends_with("LS,HR2.0591\n"));
    assert!(!header.contains("GPS,PN1"));
}

#[test]
fn test_rename_job() {
    let renamed = rw5::rename_job(rw5::extract_header(NYADAL), "0003215");
    assert!(renamed.starts_with("JB,NM0003215,DT03-17-2021"));
}

#[test]
fn test_renumber_single_point() {
    let updated = rw5::renumber_points(NYADAL, 2, Some(5));
    let point = rw5::get_point(&updated, 7);
    assert!(point.starts_with("GPS,PN7"));
    assert!(point.contains("--GS,PN7,N 6305701.0062"));
    assert_eq!(rw5::get_point(&updated, 5), "");
    // Le point de base (BP,PN2234) et les autres points ne bougent pas
    assert!(updated.contains("BP,PN2234,"));
    assert!(updated.contains("GPS,PN22,"));
}

#[test]
fn test_renumber_only_touches_point_numbers() {
    let updated = rw5::renumber_points(NYADAL, 1000, None);

    assert_eq!(mask_point_numbers(NYADAL), mask_point_numbers(&updated));
    assert!(updated.contains("GPS,PN1001,LA56.534182082079,LN14.580282246876,EL233.590624"));
    assert!(updated.contains("--HSDV:0.011, VSDV:0.016, STATUS:FIXED, SATS:23, PDOP:1.350"));
}

/// Remplace chaque numéro suivant `,PN` par `#` pour comparer le reste du texte
fn mask_point_numbers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(",PN") {
        out.push_str(&rest[..pos + 3]);
        rest = &rest[pos + 3..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 {
            out.push('#');
        }
        rest = &rest[digits..];
    }
    out.push_str(rest);
    out
}

#[test]
fn test_read_info() {
    let info = rw5::read_info(NYADAL);
    assert_eq!(info.date.as_deref(), Some("03-17-2021"));
    assert_eq!(info.time.as_deref(), Some("14:45:53"));
    assert_eq!(info.crs.to_string(), "EPSG:3006");
    assert_eq!(info.last_point, Some(23));
}

#[test]
fn test_last_point_is_positional() {
    let text = format!("{}GPS,PN3,LA1,LN2\n", NYADAL);
    assert_eq!(rw5::extract_last_point_id(&text), Some(3));
}

#[test]
fn test_json_roundtrip_keeps_points() {
    let json = rw5::to_json(NYADAL).unwrap();
    let rebuilt = rw5::from_json(&json).unwrap();
    assert!(rebuilt.contains("JB,NMNYADAL,DT03-17-2021,TM14:45:50"));
    assert!(rebuilt.contains("GPS,PN1,LA56.534182082079,LN14.580282246876,EL233.590624"));
    assert_eq!(rw5::extract_all_points(&rebuilt).count(), 8);
}

#[test]
fn test_change_point_code() {
    let updated = rw5::change_point_code(NYADAL, 2, "BRUNN");
    let point = rw5::get_point(&updated, 2);
    assert!(point.starts_with("GPS,PN2,LA56.534180905203,LN14.580283080088,EL233.543759,--BRUNN\n"));
    assert!(point.contains("--GS,PN2,N 6305692.4777,E 498017.2712,EL198.9896,--BRUNN\n"));
    assert!(rw5::get_point(&updated, 22).contains(",--K\n"));
}
