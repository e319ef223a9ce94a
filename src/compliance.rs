use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{
    CheckStatus, ComplianceCheck, ComplianceResult, CriticalIssue, EmissionsAggregate, IssueKind,
    OverallStatus, Severity,
};
use crate::schema::standard;

/// Thresholds and constants of the compliance rubric.
///
/// Scores are percentages in [0, 100]; confidences are fractions in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Confidence at or above which a calculation counts as good data.
    pub high_confidence: f64,
    pub data_quality_pass: f64,
    pub data_quality_warning: f64,
    /// Factor-table entries needed for the full methodology score.
    pub methodology_min_factor_types: usize,
    pub methodology_full_score: f64,
    pub methodology_reduced_score: f64,
    pub methodology_pass: f64,
    pub scope_points_per_type: f64,
    pub scope_pass: f64,
    /// Fixed stand-in until documentation completeness is measured.
    pub documentation_score: f64,
    pub documentation_pass: f64,
    pub uncertainty_pass: f64,
    pub compliant_threshold: f64,
    pub partial_threshold: f64,
    /// kg CO2e above which monitoring is flagged.
    pub high_emissions_kg: f64,
    /// Confidence below which a calculation is reported as low confidence.
    pub low_confidence: f64,
    pub review_interval_days: i64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            high_confidence: 0.85,
            data_quality_pass: 80.0,
            data_quality_warning: 60.0,
            methodology_min_factor_types: 4,
            methodology_full_score: 95.0,
            methodology_reduced_score: 80.0,
            methodology_pass: 90.0,
            scope_points_per_type: 25.0,
            scope_pass: 70.0,
            documentation_score: 88.0,
            documentation_pass: 85.0,
            uncertainty_pass: 75.0,
            compliant_threshold: 80.0,
            partial_threshold: 60.0,
            high_emissions_kg: 50_000.0,
            low_confidence: 0.8,
            review_interval_days: 365,
        }
    }
}

/// Score an aggregate against the default rubric.
pub fn score(aggregate: &EmissionsAggregate) -> ComplianceResult {
    score_with(aggregate, &ScoringPolicy::default())
}

/// Score an aggregate against `policy`.
///
/// Reads no clock: `checked_at` and `next_review_date` stay unset until the
/// result is stamped (see [`ComplianceResult::stamp`]).
pub fn score_with(aggregate: &EmissionsAggregate, policy: &ScoringPolicy) -> ComplianceResult {
    let checks = vec![
        data_quality(aggregate, policy),
        methodology(aggregate, policy),
        scope_coverage(aggregate, policy),
        documentation(policy),
        uncertainty(aggregate, policy),
    ];

    let overall_score = checks.iter().map(|c| c.score).sum::<f64>() / checks.len() as f64;
    let overall_status = overall_status(overall_score, policy);
    let critical_issues = critical_issues(aggregate, policy);

    info!(
        overall_score,
        %overall_status,
        critical_issues = critical_issues.len(),
        "compliance check complete"
    );

    ComplianceResult {
        overall_score,
        overall_status,
        checks,
        critical_issues,
        standards: vec![
            standard::ISO_14064_1.to_string(),
            standard::GHG_PROTOCOL_CORPORATE.to_string(),
        ],
        checked_at: None,
        next_review_date: None,
    }
}

pub fn overall_status(overall_score: f64, policy: &ScoringPolicy) -> OverallStatus {
    if overall_score >= policy.compliant_threshold {
        OverallStatus::Compliant
    } else if overall_score >= policy.partial_threshold {
        OverallStatus::Partial
    } else {
        OverallStatus::NonCompliant
    }
}

// ── Rubric checks ───────────────────────────────────────────────────────────

fn check(
    category: &str,
    standard: &str,
    requirement: &str,
    status: CheckStatus,
    score: f64,
    details: String,
    remediation: [&str; 2],
) -> ComplianceCheck {
    let recommendations = if status == CheckStatus::Pass {
        Vec::new()
    } else {
        remediation.iter().map(|r| r.to_string()).collect()
    };
    ComplianceCheck {
        category: category.to_string(),
        standard: standard.to_string(),
        requirement: requirement.to_string(),
        status,
        score,
        details,
        recommendations,
        placeholder: false,
    }
}

fn pass_or_warn(score: f64, pass: f64) -> CheckStatus {
    if score >= pass {
        CheckStatus::Pass
    } else {
        CheckStatus::Warning
    }
}

/// Share of calculations at or above the high-confidence bar, as a percentage.
fn data_quality(aggregate: &EmissionsAggregate, policy: &ScoringPolicy) -> ComplianceCheck {
    let details = &aggregate.calculation_details;
    let score = if details.is_empty() {
        0.0
    } else {
        let high = details
            .iter()
            .filter(|d| d.confidence >= policy.high_confidence)
            .count();
        high as f64 / details.len() as f64 * 100.0
    };
    let status = if score >= policy.data_quality_pass {
        CheckStatus::Pass
    } else if score >= policy.data_quality_warning {
        CheckStatus::Warning
    } else {
        CheckStatus::Fail
    };
    check(
        "Data Quality",
        standard::ISO_14064_1,
        "Data completeness and accuracy",
        status,
        score,
        format!("{score:.1}% of data meets quality thresholds"),
        ["Improve data collection processes", "Validate emission factors"],
    )
}

fn methodology(aggregate: &EmissionsAggregate, policy: &ScoringPolicy) -> ComplianceCheck {
    let score = if aggregate.factors_used.len() >= policy.methodology_min_factor_types {
        policy.methodology_full_score
    } else {
        policy.methodology_reduced_score
    };
    ComplianceCheck {
        placeholder: true,
        ..check(
            "Methodology",
            standard::GHG_PROTOCOL,
            "Use of appropriate emission factors",
            pass_or_warn(score, policy.methodology_pass),
            score,
            "Standard emission factors applied consistently".to_string(),
            ["Update to latest emission factors", "Document methodology changes"],
        )
    }
}

fn scope_coverage(aggregate: &EmissionsAggregate, policy: &ScoringPolicy) -> ComplianceCheck {
    let sources = aggregate.emissions_by_type.len();
    let score = (sources as f64 * policy.scope_points_per_type).min(100.0);
    check(
        "Scope Coverage",
        standard::ISO_14064_1,
        "Comprehensive scope identification",
        pass_or_warn(score, policy.scope_pass),
        score,
        format!("{sources} emission sources identified"),
        ["Expand scope coverage", "Include additional emission sources"],
    )
}

fn documentation(policy: &ScoringPolicy) -> ComplianceCheck {
    let score = policy.documentation_score;
    ComplianceCheck {
        placeholder: true,
        ..check(
            "Documentation",
            standard::ISO_14064_1,
            "Adequate documentation and evidence",
            pass_or_warn(score, policy.documentation_pass),
            score,
            "Calculation methods and sources documented".to_string(),
            ["Improve documentation quality", "Add supporting evidence"],
        )
    }
}

/// Mean confidence across calculations, as a percentage.
fn uncertainty(aggregate: &EmissionsAggregate, policy: &ScoringPolicy) -> ComplianceCheck {
    let details = &aggregate.calculation_details;
    let score = if details.is_empty() {
        0.0
    } else {
        details.iter().map(|d| d.confidence).sum::<f64>() / details.len() as f64 * 100.0
    };
    check(
        "Uncertainty",
        standard::ISO_14064_1,
        "Uncertainty assessment",
        pass_or_warn(score, policy.uncertainty_pass),
        score,
        "Confidence levels tracked for data sources".to_string(),
        [
            "Improve uncertainty quantification",
            "Use higher quality data sources",
        ],
    )
}

fn critical_issues(aggregate: &EmissionsAggregate, policy: &ScoringPolicy) -> Vec<CriticalIssue> {
    let mut issues = Vec::new();

    if aggregate.total_emissions > policy.high_emissions_kg {
        issues.push(CriticalIssue {
            kind: IssueKind::HighEmissions,
            message: "High emissions detected - requires enhanced monitoring".to_string(),
            severity: Severity::Warning,
        });
    }

    let low = aggregate
        .calculation_details
        .iter()
        .filter(|d| d.confidence < policy.low_confidence)
        .count();
    if low > 0 {
        issues.push(CriticalIssue {
            kind: IssueKind::LowConfidence,
            message: format!(
                "{low} data points have low confidence (<{:.0}%)",
                policy.low_confidence * 100.0
            ),
            severity: Severity::Warning,
        });
    }

    issues
}
