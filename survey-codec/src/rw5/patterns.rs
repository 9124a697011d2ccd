//! Expressions régulières RW5, compilées une seule fois par processus

use std::sync::OnceLock;

use regex::Regex;

/// Bloc d'en-tête: ligne `JB,` puis lignes `--`, `MO`, `BP` ou `LS`
pub fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"JB,[^\n]+(?:\n(?:--|MO|BP|LS)[^\n]+)*\n?").expect("header regex must compile")
    })
}

/// Bloc de point: ligne `GPS,PN` puis lignes `--`
pub fn point_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"GPS,PN[^\n]+(?:\n--[^\n]+)*\n?").expect("point block regex must compile")
    })
}

/// Bloc de point identifié: accepte aussi les lignes `G<chiffre>` en continuation
pub fn numbered_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"GPS,PN(\d+),[^\n]+(?:\n(?:--|G\d)[^\n]+)*\n?")
            .expect("numbered block regex must compile")
    })
}

/// Numéro de point d'une ligne `GPS,PN`
pub fn gps_point_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"GPS,PN(\d+)").expect("gps point id regex must compile"))
}

/// Numéro de point entre `,PN` et la virgule suivante
pub fn point_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",PN(\d+),").expect("point number regex must compile"))
}

/// Nom de job sur la ligne `JB`
pub fn job_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(JB,NM)[^,\r\n]*").expect("job name regex must compile"))
}

/// Code de point après le premier `,--` des lignes `GPS,PN` et `--GS,PN`
pub fn point_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^((?:GPS|--GS),PN(\d+),[^\r\n]*?,--)[^\r\n]*")
            .expect("point code regex must compile")
    })
}

/// Annotation de système de coordonnées (valeur éventuellement vide)
pub fn crs_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"--(?:User Defined|Projection):[ \t]*([^\r\n]*)")
            .expect("crs line regex must compile")
    })
}

pub fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"--DT(\d{2}-\d{2}-\d{4})").expect("date regex must compile"))
}

pub fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"--TM(\d{2}:\d{2}:\d{2})").expect("time regex must compile"))
}
