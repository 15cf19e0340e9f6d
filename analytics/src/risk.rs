//! Weighted multi-factor risk scoring
//!
//! Each factor reading in `[0, 100]` is mapped onto a risk-direction unit
//! interval. Coverage and team experience lower risk, so they are inverted;
//! the other factors raise it. The overall score is the weighted sum of the
//! unit values and is classified against configurable thresholds.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_within, AnalyticsError, AnalyticsResult};

/// Allowed deviation of the weight sum from 1.0
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Window the historical failure rate is assumed to cover, in days
pub const PREDICTION_WINDOW_DAYS: f64 = 30.0;

const PREDICTION_Z: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    TestCoverage,
    CodeComplexity,
    ChangeFrequency,
    DefectHistory,
    TeamExperience,
    Dependencies,
}

/// How a reading relates to risk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorDirection {
    /// Higher reading means lower risk
    Inverted,
    /// Higher reading means higher risk
    Direct,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 6] = [
        RiskFactor::TestCoverage,
        RiskFactor::CodeComplexity,
        RiskFactor::ChangeFrequency,
        RiskFactor::DefectHistory,
        RiskFactor::TeamExperience,
        RiskFactor::Dependencies,
    ];

    pub fn direction(self) -> FactorDirection {
        match self {
            RiskFactor::TestCoverage | RiskFactor::TeamExperience => FactorDirection::Inverted,
            _ => FactorDirection::Direct,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RiskFactor::TestCoverage => "test_coverage",
            RiskFactor::CodeComplexity => "code_complexity",
            RiskFactor::ChangeFrequency => "change_frequency",
            RiskFactor::DefectHistory => "defect_history",
            RiskFactor::TeamExperience => "team_experience",
            RiskFactor::Dependencies => "dependencies",
        }
    }

    /// Map a `[0, 100]` reading onto the risk-direction unit interval
    pub fn risk_unit(self, reading: f64) -> f64 {
        let unit = (reading.max(0.0) / 100.0).min(1.0);
        match self.direction() {
            FactorDirection::Inverted => 1.0 - unit,
            FactorDirection::Direct => unit,
        }
    }

    /// Unit value above which the factor produces a recommendation
    fn recommendation_threshold(self) -> f64 {
        match self {
            RiskFactor::TestCoverage | RiskFactor::TeamExperience => 0.6,
            RiskFactor::DefectHistory => 0.5,
            RiskFactor::CodeComplexity
            | RiskFactor::ChangeFrequency
            | RiskFactor::Dependencies => 0.7,
        }
    }

    fn recommendation(self) -> &'static str {
        match self {
            RiskFactor::TestCoverage => "Increase test coverage for the affected area",
            RiskFactor::CodeComplexity => {
                "Reduce code complexity or add targeted tests for complex paths"
            }
            RiskFactor::ChangeFrequency => {
                "Frequent changes: add regression tests and stabilize the area"
            }
            RiskFactor::DefectHistory => {
                "High defect history: prioritize root-cause analysis and exploratory testing"
            }
            RiskFactor::TeamExperience => {
                "Pair less experienced contributors with domain experts and add review"
            }
            RiskFactor::Dependencies => "Many dependencies: add integration and contract tests",
        }
    }
}

/// Factor weights; must sum to 1.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RiskWeights {
    pub test_coverage: f64,
    pub code_complexity: f64,
    pub change_frequency: f64,
    pub defect_history: f64,
    pub team_experience: f64,
    pub dependencies: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            test_coverage: 0.25,
            code_complexity: 0.20,
            change_frequency: 0.15,
            defect_history: 0.20,
            team_experience: 0.10,
            dependencies: 0.10,
        }
    }
}

impl RiskWeights {
    pub fn weight(&self, factor: RiskFactor) -> f64 {
        match factor {
            RiskFactor::TestCoverage => self.test_coverage,
            RiskFactor::CodeComplexity => self.code_complexity,
            RiskFactor::ChangeFrequency => self.change_frequency,
            RiskFactor::DefectHistory => self.defect_history,
            RiskFactor::TeamExperience => self.team_experience,
            RiskFactor::Dependencies => self.dependencies,
        }
    }

    pub fn sum(&self) -> f64 {
        RiskFactor::ALL.iter().map(|f| self.weight(*f)).sum()
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        for factor in RiskFactor::ALL {
            ensure_within(factor.name(), self.weight(factor), 0.0, 1.0)?;
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(AnalyticsError::InvalidWeights { sum });
        }
        Ok(())
    }
}

/// Upper bounds of the low, medium and high levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RiskThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 0.2,
            medium: 0.5,
            high: 0.8,
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> AnalyticsResult<()> {
        ensure_within("thresholds.low", self.low, 0.0, 1.0)?;
        ensure_within("thresholds.high", self.high, 0.0, 1.0)?;
        if !(self.low < self.medium && self.medium < self.high) {
            return Err(AnalyticsError::InvalidConfig(format!(
                "risk thresholds must be ascending (got low={}, medium={}, high={})",
                self.low, self.medium, self.high
            )));
        }
        Ok(())
    }

    pub fn classify(&self, score: f64) -> RiskLevel {
        if score <= self.low {
            RiskLevel::Low
        } else if score <= self.medium {
            RiskLevel::Medium
        } else if score <= self.high {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskConfig {
    #[serde(default)]
    pub weights: RiskWeights,
    #[serde(default)]
    pub thresholds: RiskThresholds,
}

impl RiskConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        self.weights.validate()?;
        self.thresholds.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Factor readings, each normalized to `[0, 100]` by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskReadings {
    pub test_coverage: f64,
    pub code_complexity: f64,
    pub change_frequency: f64,
    pub defect_history: f64,
    pub team_experience: f64,
    pub dependencies: f64,
}

impl RiskReadings {
    pub fn reading(&self, factor: RiskFactor) -> f64 {
        match factor {
            RiskFactor::TestCoverage => self.test_coverage,
            RiskFactor::CodeComplexity => self.code_complexity,
            RiskFactor::ChangeFrequency => self.change_frequency,
            RiskFactor::DefectHistory => self.defect_history,
            RiskFactor::TeamExperience => self.team_experience,
            RiskFactor::Dependencies => self.dependencies,
        }
    }

    /// Use a quality defect density (defects per test) as the defect-history reading
    pub fn with_defect_density(mut self, defect_density: f64) -> Self {
        self.defect_history = (defect_density.max(0.0) * 100.0).min(100.0);
        self
    }

    fn validate(&self) -> AnalyticsResult<()> {
        for factor in RiskFactor::ALL {
            if !self.reading(factor).is_finite() {
                return Err(AnalyticsError::InvalidConfig(format!(
                    "reading for {} must be a finite number",
                    factor.name()
                )));
            }
        }
        Ok(())
    }
}

/// Weighted contribution of one factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskFactorScore {
    pub factor: RiskFactor,
    pub reading: f64,
    /// Risk-direction unit value in `[0, 1]`
    pub normalized_score: f64,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Failure-probability estimate over a prediction horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskPrediction {
    pub horizon_days: u32,
    pub historical_failure_rate: f64,
    pub failure_probability: f64,
    pub confidence_interval: ConfidenceInterval,
    pub sample_size: usize,
    /// No historical sample; the interval collapses to the point estimate
    pub insufficient_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskReport {
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub factors: Vec<RiskFactorScore>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<RiskPrediction>,
}

/// Inputs for the optional failure prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PredictionInput {
    pub horizon_days: u32,
    /// Observed per-execution failure rate in `[0, 1]`
    pub historical_failure_rate: f64,
    /// Executions the failure rate was observed over
    #[serde(default)]
    pub sample_size: usize,
}

/// Scores risk from factor readings with a validated configuration
#[derive(Debug, Clone, Default)]
pub struct RiskAssessmentEngine {
    config: RiskConfig,
}

impl RiskAssessmentEngine {
    /// Fails fast when weights do not sum to 1.0 or thresholds are unordered
    pub fn new(config: RiskConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn assess(&self, readings: &RiskReadings) -> AnalyticsResult<RiskReport> {
        readings.validate()?;

        let factors: Vec<RiskFactorScore> = RiskFactor::ALL
            .iter()
            .map(|factor| {
                let reading = readings.reading(*factor);
                let normalized_score = factor.risk_unit(reading);
                let weight = self.config.weights.weight(*factor);
                RiskFactorScore {
                    factor: *factor,
                    reading,
                    normalized_score,
                    weight,
                    contribution: normalized_score * weight,
                }
            })
            .collect();

        let overall_risk_score: f64 = factors.iter().map(|f| f.contribution).sum();
        let risk_level = self.config.thresholds.classify(overall_risk_score);

        let mut recommendations: Vec<String> = factors
            .iter()
            .filter(|f| f.normalized_score > f.factor.recommendation_threshold())
            .map(|f| f.factor.recommendation().to_string())
            .collect();
        if risk_level == RiskLevel::Critical {
            recommendations.push(
                "Critical overall risk: hold the release until the top factors are mitigated"
                    .to_string(),
            );
        }

        tracing::info!(
            "Risk assessment: score {:.3} ({:?}), {} recommendations",
            overall_risk_score,
            risk_level,
            recommendations.len()
        );

        Ok(RiskReport {
            overall_risk_score,
            risk_level,
            factors,
            recommendations,
            prediction: None,
        })
    }

    /// Proportional failure-probability extrapolation
    ///
    /// The historical rate is scaled up by the overall risk score and then
    /// linearly over the horizon relative to a 30-day window. The interval is
    /// the 95% Wald interval of the historical rate, transformed the same way.
    pub fn predict(
        &self,
        overall_risk_score: f64,
        input: &PredictionInput,
    ) -> AnalyticsResult<RiskPrediction> {
        if input.horizon_days == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "prediction horizon must be at least one day".to_string(),
            ));
        }
        ensure_within(
            "historical_failure_rate",
            input.historical_failure_rate,
            0.0,
            1.0,
        )?;

        let scale = |rate: f64| {
            let adjusted = (rate * (1.0 + overall_risk_score)).min(1.0);
            (adjusted * input.horizon_days as f64 / PREDICTION_WINDOW_DAYS).clamp(0.0, 1.0)
        };

        let p = input.historical_failure_rate;
        let failure_probability = scale(p);
        let insufficient_data = input.sample_size == 0;

        let confidence_interval = if insufficient_data {
            ConfidenceInterval {
                lower: failure_probability,
                upper: failure_probability,
            }
        } else {
            let margin = PREDICTION_Z * (p * (1.0 - p) / input.sample_size as f64).sqrt();
            ConfidenceInterval {
                lower: scale((p - margin).max(0.0)),
                upper: scale((p + margin).min(1.0)),
            }
        };

        Ok(RiskPrediction {
            horizon_days: input.horizon_days,
            historical_failure_rate: p,
            failure_probability,
            confidence_interval,
            sample_size: input.sample_size,
            insufficient_data,
        })
    }

    /// Assess and attach a prediction when one is requested
    pub fn assess_with_prediction(
        &self,
        readings: &RiskReadings,
        prediction: Option<&PredictionInput>,
    ) -> AnalyticsResult<RiskReport> {
        let mut report = self.assess(readings)?;
        if let Some(input) = prediction {
            report.prediction = Some(self.predict(report.overall_risk_score, input)?);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(coverage: f64, others: f64, experience: f64) -> RiskReadings {
        RiskReadings {
            test_coverage: coverage,
            code_complexity: others,
            change_frequency: others,
            defect_history: others,
            team_experience: experience,
            dependencies: others,
        }
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = RiskWeights::default();
        assert!((weights.sum() - 1.0).abs() < WEIGHT_TOLERANCE);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_invalid_weights_fail_fast() {
        let config = RiskConfig {
            weights: RiskWeights {
                dependencies: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        match RiskAssessmentEngine::new(config) {
            Err(AnalyticsError::InvalidWeights { sum }) => assert!((sum - 0.9).abs() < 1e-9),
            other => panic!("expected InvalidWeights, got {:?}", other),
        }
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let config = RiskConfig {
            thresholds: RiskThresholds {
                low: 0.5,
                medium: 0.4,
                high: 0.8,
            },
            ..Default::default()
        };
        assert!(RiskAssessmentEngine::new(config).is_err());
    }

    #[test]
    fn test_risk_unit_direction() {
        assert_eq!(RiskFactor::TestCoverage.risk_unit(100.0), 0.0);
        assert_eq!(RiskFactor::TestCoverage.risk_unit(0.0), 1.0);
        assert_eq!(RiskFactor::CodeComplexity.risk_unit(150.0), 1.0);
        assert_eq!(RiskFactor::Dependencies.risk_unit(-20.0), 0.0);
        assert!((RiskFactor::TeamExperience.risk_unit(25.0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_minimum_risk() {
        let engine = RiskAssessmentEngine::default();
        let report = engine.assess(&readings(100.0, 0.0, 100.0)).unwrap();

        assert_eq!(report.overall_risk_score, 0.0);
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert!(report.recommendations.is_empty());
        assert_eq!(report.factors.len(), 6);
    }

    #[test]
    fn test_maximum_risk_is_critical() {
        let engine = RiskAssessmentEngine::default();
        let report = engine.assess(&readings(0.0, 100.0, 0.0)).unwrap();

        assert!((report.overall_risk_score - 1.0).abs() < 1e-9);
        assert_eq!(report.risk_level, RiskLevel::Critical);
        assert_eq!(report.recommendations.len(), 7);
    }

    #[test]
    fn test_weighted_contributions() {
        let engine = RiskAssessmentEngine::default();
        // coverage 40 -> 0.6 * 0.25, experience 50 -> 0.5 * 0.1
        // the other four at 50 -> 0.5 * (0.2 + 0.15 + 0.2 + 0.1)
        let report = engine.assess(&readings(40.0, 50.0, 50.0)).unwrap();

        let expected = 0.6 * 0.25 + 0.5 * 0.65 + 0.5 * 0.1;
        assert!((report.overall_risk_score - expected).abs() < 1e-9);
        assert_eq!(report.risk_level, RiskLevel::High);
        let coverage = &report.factors[0];
        assert_eq!(coverage.factor, RiskFactor::TestCoverage);
        assert!((coverage.contribution - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_classification_boundaries() {
        let thresholds = RiskThresholds::default();
        assert_eq!(thresholds.classify(0.2), RiskLevel::Low);
        assert_eq!(thresholds.classify(0.21), RiskLevel::Medium);
        assert_eq!(thresholds.classify(0.5), RiskLevel::Medium);
        assert_eq!(thresholds.classify(0.8), RiskLevel::High);
        assert_eq!(thresholds.classify(0.81), RiskLevel::Critical);
    }

    #[test]
    fn test_non_finite_reading_rejected() {
        let engine = RiskAssessmentEngine::default();
        assert!(engine.assess(&readings(f64::NAN, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_defect_density_reading() {
        let r = readings(100.0, 0.0, 100.0).with_defect_density(0.35);
        assert!((r.defect_history - 35.0).abs() < 1e-9);
        let r = r.with_defect_density(4.0);
        assert_eq!(r.defect_history, 100.0);
    }

    #[test]
    fn test_prediction() {
        let engine = RiskAssessmentEngine::default();
        let input = PredictionInput {
            horizon_days: 15,
            historical_failure_rate: 0.2,
            sample_size: 100,
        };

        // (0.2 * 1.5) * 15 / 30 = 0.15
        let prediction = engine.predict(0.5, &input).unwrap();
        assert!((prediction.failure_probability - 0.15).abs() < 1e-9);
        assert!(prediction.confidence_interval.lower < prediction.failure_probability);
        assert!(prediction.confidence_interval.upper > prediction.failure_probability);
        assert!(!prediction.insufficient_data);
    }

    #[test]
    fn test_prediction_without_sample() {
        let engine = RiskAssessmentEngine::default();
        let input = PredictionInput {
            horizon_days: 90,
            historical_failure_rate: 0.5,
            sample_size: 0,
        };

        let prediction = engine.predict(1.0, &input).unwrap();
        assert_eq!(prediction.failure_probability, 1.0);
        assert_eq!(prediction.confidence_interval.lower, 1.0);
        assert!(prediction.insufficient_data);
    }

    #[test]
    fn test_prediction_validation() {
        let engine = RiskAssessmentEngine::default();
        let input = PredictionInput {
            horizon_days: 0,
            historical_failure_rate: 0.1,
            sample_size: 10,
        };
        assert!(engine.predict(0.1, &input).is_err());

        let input = PredictionInput {
            horizon_days: 7,
            historical_failure_rate: 1.5,
            sample_size: 10,
        };
        assert!(engine.predict(0.1, &input).is_err());
    }
}
