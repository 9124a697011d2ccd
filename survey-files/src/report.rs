//! Rapport d'exécution des commandes (conversion, fusion, création)
//!
//! Collecte les fichiers produits avec leur checksum, les erreurs par fichier
//! et les warnings, puis les affiche ou les sauvegarde en JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

/// Statut global de l'opération
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportStatus {
    /// Tous les fichiers ont été produits
    Success,
    /// Certains fichiers sont en erreur
    PartialSuccess,
    /// Rien à faire (sélection vide)
    NoOp,
    /// Aucun fichier produit
    Failed,
}

/// Fichier produit
#[derive(Debug, Clone, Serialize)]
pub struct OutputFile {
    pub path: String,
    /// Nombre de points du fichier (0 pour un fichier texte sans point)
    pub points: usize,
    pub bytes: usize,
    /// Checksum blake3 (hex)
    pub checksum: String,
}

/// Erreur sur un fichier d'entrée
#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub path: String,
    pub message: String,
}

/// Rapport complet
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Commande exécutée (to-json, append, ...)
    pub operation: String,
    pub duration_secs: f64,
    pub status: ReportStatus,

    pub files_processed: usize,
    pub files_failed: usize,

    /// Points de la destination avant fusion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_before: Option<usize>,
    /// Points ajoutés par la fusion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_merged: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,

    pub outputs: Vec<OutputFile>,
    pub errors: Vec<FileError>,
    pub warnings: Vec<String>,
}

impl Report {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            duration_secs: 0.0,
            status: ReportStatus::Success,
            files_processed: 0,
            files_failed: 0,
            points_before: None,
            points_merged: None,
            crs: None,
            outputs: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Enregistre un fichier produit
    pub fn record_output(&mut self, path: &Path, points: usize, content: &[u8]) {
        self.files_processed += 1;
        self.outputs.push(OutputFile {
            path: path.display().to_string(),
            points,
            bytes: content.len(),
            checksum: checksum(content),
        });
    }

    /// Enregistre un fichier en échec
    pub fn record_failure(&mut self, path: &Path, message: &str) {
        self.files_processed += 1;
        self.files_failed += 1;
        self.errors.push(FileError {
            path: path.display().to_string(),
            message: message.to_string(),
        });
    }

    pub fn record_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Enregistre le résultat d'une fusion
    pub fn record_merge(&mut self, points_before: usize, merged: usize, crs: &str) {
        self.points_before = Some(points_before);
        self.points_merged = Some(merged);
        self.crs = Some(crs.to_string());
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        let produced = !self.outputs.is_empty();

        self.status = if self.points_merged == Some(0) {
            ReportStatus::NoOp
        } else if self.files_failed > 0 && produced {
            ReportStatus::PartialSuccess
        } else if self.files_failed > 0 {
            ReportStatus::Failed
        } else {
            ReportStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("REPORT - {}", self.operation);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);
        println!(
            "Files: {} processed, {} failed",
            self.files_processed, self.files_failed
        );

        if let (Some(before), Some(merged)) = (self.points_before, self.points_merged) {
            println!(
                "Points: {} before, {} merged, {} after ({})",
                before,
                merged,
                before + merged,
                self.crs.as_deref().unwrap_or("?")
            );
        }

        if !self.outputs.is_empty() {
            println!("\n--- OUTPUTS ---");
            for o in &self.outputs {
                println!(
                    "  {} ({} points, {} bytes) {}",
                    o.path,
                    o.points,
                    o.bytes,
                    &o.checksum[..16]
                );
            }
        }

        if !self.warnings.is_empty() {
            println!("\n--- WARNINGS ({}) ---", self.warnings.len());
            for w in self.warnings.iter().take(10) {
                println!("  {}", w);
            }
            if self.warnings.len() > 10 {
                println!("  ... and {} more", self.warnings.len() - 10);
            }
        }

        if !self.errors.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.errors.len());
            for e in self.errors.iter().take(20) {
                println!("  [{}] {}", e.path, e.message);
            }
            if self.errors.len() > 20 {
                println!("  ... and {} more", self.errors.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} files, {} failed, {} outputs",
            self.operation,
            self.files_processed,
            self.files_failed,
            self.outputs.len()
        )
    }
}

/// Checksum blake3 d'un contenu, en hex
pub fn checksum(content: &[u8]) -> String {
    hex::encode(blake3::hash(content).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_default_status() {
        let mut report = Report::new("to-json");
        report.finalize();
        assert_eq!(report.status, ReportStatus::Success);
        assert_eq!(report.files_processed, 0);
    }

    #[test]
    fn test_record_output() {
        let mut report = Report::new("to-crd");
        report.record_output(Path::new("a.crd"), 2, b"abc");

        assert_eq!(report.files_processed, 1);
        assert_eq!(report.outputs[0].bytes, 3);
        assert_eq!(report.outputs[0].checksum, checksum(b"abc"));
        assert_eq!(report.outputs[0].checksum.len(), 64);
    }

    #[test]
    fn test_finalize_partial_success() {
        let mut report = Report::new("to-json");
        report.record_output(Path::new("a.json"), 1, b"{}");
        report.record_failure(Path::new("b.crd"), "Truncated CRD record");
        report.finalize();

        assert_eq!(report.status, ReportStatus::PartialSuccess);
        assert_eq!(report.files_processed, 2);
    }

    #[test]
    fn test_finalize_failed() {
        let mut report = Report::new("to-json");
        report.record_failure(Path::new("b.crd"), "Truncated CRD record");
        report.finalize();

        assert_eq!(report.status, ReportStatus::Failed);
    }

    #[test]
    fn test_finalize_noop_merge() {
        let mut report = Report::new("append");
        report.record_merge(12, 0, "EPSG:3006");
        report.finalize();

        assert_eq!(report.status, ReportStatus::NoOp);
    }

    #[test]
    fn test_summary() {
        let mut report = Report::new("append");
        report.record_output(Path::new("a.crd"), 5, b"x");
        let summary = report.summary();
        assert!(summary.contains("append"));
        assert!(summary.contains("1 outputs"));
    }

    #[test]
    fn test_checksum_is_stable() {
        assert_eq!(checksum(b"JB,NMX\n"), checksum(b"JB,NMX\n"));
        assert_ne!(checksum(b"JB,NMX\n"), checksum(b"JB,NMY\n"));
    }
}
