//! Verdict model and the two scoring rules used to build it.
//!
//! The remote service answers in two different shapes: a file report
//! (`GET /files/{sha256}`) carrying the full per-engine breakdown, and an
//! analysis object (`GET /analyses/{id}`) carrying only malicious/suspicious
//! counts. Each shape has its own scoring rule. They are kept apart on purpose
//! because the analysis endpoint never reports how many engines took part.
//!
//! A verdict's `score` is lossy: the label and threat level cannot in general be
//! recovered from the score alone.

use serde::{Deserialize, Serialize};

/// Signature reported when no engine flagged the content.
pub const NO_SIGNATURE: &str = "None";

/// Signature reported for analysis-shaped results, which carry no engine names.
pub const URL_SIGNATURE: &str = "URL Threat";

/// Note attached to a file that was submitted for scanning.
pub const UPLOAD_PENDING_NOTE: &str = "File uploaded for scanning. Result pending.";

/// Note attached to a URL scan whose analysis did not complete within the poll budget.
pub const URL_PENDING_NOTE: &str = "URL scan submitted. Check back strictly later.";

/// Overall classification of a file or URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Clean,
    Suspicious,
    Malicious,
    /// The remote scan has not produced a final result yet.
    Queued,
    Unknown,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "Clean",
            Self::Suspicious => "Suspicious",
            Self::Malicious => "Malicious",
            Self::Queued => "Queued",
            Self::Unknown => "Unknown",
        }
    }
}

/// Coarse severity attached to a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatLevel {
    None,
    Low,
    Medium,
    High,
    Unknown,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Unknown => "Unknown",
        }
    }
}

/// Normalized classification result for a file or URL.
///
/// Serialized with the field names the web client already consumes
/// (`analysis` for the note, `analysis_id` for the pending handle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: Label,
    /// 0-100 for hash lookups, `10 * malicious` (unclamped) for analysis results.
    pub score: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub malicious_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_engines: Option<u64>,
    pub threat_level: ThreatLevel,
    pub signature: String,
    #[serde(rename = "analysis")]
    pub note: String,
    /// Remote analysis handle, only set on `Queued` verdicts for uploaded files.
    #[serde(
        rename = "analysis_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pending_analysis_id: Option<String>,
}

impl Verdict {
    /// Verdict returned right after a file was accepted for scanning.
    pub fn queued_upload(analysis_id: impl Into<String>) -> Self {
        Self {
            label: Label::Queued,
            score: 0,
            malicious_count: None,
            total_engines: None,
            threat_level: ThreatLevel::Unknown,
            signature: NO_SIGNATURE.to_string(),
            note: UPLOAD_PENDING_NOTE.to_string(),
            pending_analysis_id: Some(analysis_id.into()),
        }
    }

    /// Verdict returned when a URL analysis is still running after the poll budget.
    pub fn queued_url() -> Self {
        Self {
            label: Label::Queued,
            score: 0,
            malicious_count: None,
            total_engines: None,
            threat_level: ThreatLevel::Unknown,
            signature: NO_SIGNATURE.to_string(),
            note: URL_PENDING_NOTE.to_string(),
            pending_analysis_id: None,
        }
    }
}

/// Aggregate engine counts from a file report (`last_analysis_stats`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EngineStats {
    #[serde(default)]
    pub malicious: u64,
    #[serde(default)]
    pub suspicious: u64,
    #[serde(default)]
    pub harmless: u64,
    #[serde(default)]
    pub undetected: u64,
}

impl EngineStats {
    /// Saturates instead of overflowing on absurd remote counts.
    pub fn total(&self) -> u64 {
        self.malicious
            .saturating_add(self.suspicious)
            .saturating_add(self.harmless)
            .saturating_add(self.undetected)
    }
}

/// The part of a file report the hash scoring rule needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileReport {
    pub last_analysis_stats: EngineStats,
    /// Per-engine results keyed by engine name, in the order the service sent them.
    #[serde(default)]
    pub last_analysis_results: serde_json::Map<String, serde_json::Value>,
}

impl FileReport {
    /// Name of the first engine whose category is `malicious`.
    pub fn first_malicious_engine(&self) -> Option<&str> {
        self.last_analysis_results
            .iter()
            .find(|(_, result)| {
                result.get("category").and_then(serde_json::Value::as_str) == Some("malicious")
            })
            .map(|(engine, _)| engine.as_str())
    }
}

/// Counts reported by a completed analysis (`attributes.stats`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub malicious: u64,
    #[serde(default)]
    pub suspicious: u64,
}

fn label_for(malicious: u64, suspicious: u64) -> Label {
    if malicious > 0 {
        Label::Malicious
    } else if suspicious > 0 {
        Label::Suspicious
    } else {
        Label::Clean
    }
}

/// Hash-lookup scoring: score is the flagged share of all engines, rounded.
pub fn score_file_report(report: &FileReport) -> Verdict {
    let stats = report.last_analysis_stats;
    let total = stats.total();
    let score = if total > 0 {
        ((stats.malicious as f64 / total as f64) * 100.0).round() as u64
    } else {
        0
    };

    let label = label_for(stats.malicious, stats.suspicious);
    let threat_level = match label {
        Label::Malicious if stats.malicious > 5 => ThreatLevel::High,
        Label::Malicious => ThreatLevel::Medium,
        Label::Suspicious => ThreatLevel::Low,
        _ => ThreatLevel::None,
    };

    Verdict {
        label,
        score,
        malicious_count: Some(stats.malicious),
        total_engines: Some(total),
        threat_level,
        signature: report
            .first_malicious_engine()
            .unwrap_or(NO_SIGNATURE)
            .to_string(),
        note: format!("Flagged by {}/{total} vendors.", stats.malicious),
        pending_analysis_id: None,
    }
}

/// Analysis scoring: ten points per flagging engine, no normalization and no clamp.
pub fn score_analysis_report(report: &AnalysisReport) -> Verdict {
    let label = label_for(report.malicious, report.suspicious);
    let threat_level = match label {
        Label::Malicious => ThreatLevel::High,
        Label::Suspicious => ThreatLevel::Low,
        _ => ThreatLevel::None,
    };

    Verdict {
        label,
        score: report.malicious.saturating_mul(10),
        malicious_count: Some(report.malicious),
        total_engines: None,
        threat_level,
        signature: URL_SIGNATURE.to_string(),
        note: format!("URL flagged by {} vendors.", report.malicious),
        pending_analysis_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file_report(m: u64, s: u64, h: u64, u: u64) -> FileReport {
        FileReport {
            last_analysis_stats: EngineStats {
                malicious: m,
                suspicious: s,
                harmless: h,
                undetected: u,
            },
            last_analysis_results: serde_json::Map::new(),
        }
    }

    #[test]
    fn malicious_counts_drive_threat_level() {
        for m in 1..=12 {
            let verdict = score_file_report(&file_report(m, 3, 20, 30));
            assert_eq!(verdict.label, Label::Malicious);
            let expected = if m > 5 {
                ThreatLevel::High
            } else {
                ThreatLevel::Medium
            };
            assert_eq!(verdict.threat_level, expected, "m = {m}");
            assert_eq!(verdict.malicious_count, Some(m));
        }
    }

    #[test]
    fn suspicious_only_is_low() {
        let verdict = score_file_report(&file_report(0, 2, 10, 40));
        assert_eq!(verdict.label, Label::Suspicious);
        assert_eq!(verdict.threat_level, ThreatLevel::Low);
        assert_eq!(verdict.score, 0);
    }

    #[test]
    fn clean_report() {
        let verdict = score_file_report(&file_report(0, 0, 60, 12));
        assert_eq!(verdict.label, Label::Clean);
        assert_eq!(verdict.threat_level, ThreatLevel::None);
        assert_eq!(verdict.score, 0);
        assert_eq!(verdict.signature, NO_SIGNATURE);
        assert_eq!(verdict.note, "Flagged by 0/72 vendors.");
    }

    #[test]
    fn score_is_rounded_share_of_engines() {
        for (m, s, h, u) in [(1, 0, 1, 1), (2, 0, 0, 1), (5, 1, 30, 34), (7, 0, 0, 0), (1, 0, 0, 199)] {
            let total = m + s + h + u;
            let verdict = score_file_report(&file_report(m, s, h, u));
            let expected = (100.0 * m as f64 / total as f64).round() as u64;
            assert_eq!(verdict.score, expected);
            assert!(verdict.score <= 100);
            assert_eq!(verdict.total_engines, Some(total));
        }
        // 1/3 rounds down, 2/3 rounds up
        assert_eq!(score_file_report(&file_report(1, 0, 1, 1)).score, 33);
        assert_eq!(score_file_report(&file_report(2, 0, 0, 1)).score, 67);
    }

    #[test]
    fn extreme_counts_saturate() {
        let verdict = score_file_report(&file_report(u64::MAX, 1, 0, 0));
        assert_eq!(verdict.total_engines, Some(u64::MAX));
        assert_eq!(verdict.score, 100);
        assert_eq!(verdict.label, Label::Malicious);

        let verdict = score_analysis_report(&AnalysisReport {
            malicious: u64::MAX / 2,
            suspicious: 0,
        });
        assert_eq!(verdict.score, u64::MAX);
        assert_eq!(verdict.label, Label::Malicious);
    }

    #[test]
    fn empty_stats_score_zero() {
        let verdict = score_file_report(&file_report(0, 0, 0, 0));
        assert_eq!(verdict.score, 0);
        assert_eq!(verdict.total_engines, Some(0));
        assert_eq!(verdict.label, Label::Clean);
    }

    #[test]
    fn signature_is_first_malicious_engine_in_response_order() {
        let report: FileReport = serde_json::from_value(json!({
            "last_analysis_stats": { "malicious": 2, "suspicious": 0, "harmless": 1, "undetected": 0 },
            "last_analysis_results": {
                "Zillya": { "category": "malicious", "result": "Trojan.Generic" },
                "Avast": { "category": "harmless", "result": null },
                "Bkav": { "category": "malicious", "result": "W32.AIDetect" }
            }
        }))
        .unwrap();

        let verdict = score_file_report(&report);
        assert_eq!(verdict.signature, "Zillya");
        assert_eq!(verdict.note, "Flagged by 2/3 vendors.");
    }

    #[test]
    fn analysis_score_is_not_clamped() {
        let verdict = score_analysis_report(&AnalysisReport {
            malicious: 12,
            suspicious: 1,
        });
        assert_eq!(verdict.score, 120);
        assert_eq!(verdict.label, Label::Malicious);
        assert_eq!(verdict.threat_level, ThreatLevel::High);
        assert_eq!(verdict.signature, URL_SIGNATURE);
        assert_eq!(verdict.note, "URL flagged by 12 vendors.");
        assert_eq!(verdict.total_engines, None);
    }

    #[test]
    fn analysis_suspicious_and_clean() {
        let suspicious = score_analysis_report(&AnalysisReport {
            malicious: 0,
            suspicious: 4,
        });
        assert_eq!(suspicious.label, Label::Suspicious);
        assert_eq!(suspicious.threat_level, ThreatLevel::Low);
        assert_eq!(suspicious.score, 0);

        let clean = score_analysis_report(&AnalysisReport::default());
        assert_eq!(clean.label, Label::Clean);
        assert_eq!(clean.threat_level, ThreatLevel::None);
    }

    #[test]
    fn serializes_with_client_field_names() {
        let value = serde_json::to_value(Verdict::queued_upload("an-1")).unwrap();
        assert_eq!(value["label"], "Queued");
        assert_eq!(value["threat_level"], "Unknown");
        assert_eq!(value["analysis"], UPLOAD_PENDING_NOTE);
        assert_eq!(value["analysis_id"], "an-1");
        assert!(value.get("malicious_count").is_none());

        let url = serde_json::to_value(Verdict::queued_url()).unwrap();
        assert_eq!(url["analysis"], "URL scan submitted. Check back strictly later.");
        assert!(url.get("analysis_id").is_none());
    }
}
