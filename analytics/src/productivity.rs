//! Team and individual productivity rates with benchmark comparison

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Raw activity counters for one contributor over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActorCounters {
    pub actor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default)]
    pub tests_created: u64,
    #[serde(default)]
    pub tests_executed: u64,
    #[serde(default)]
    pub defects_found: u64,
    #[serde(default)]
    pub automation_contributions: u64,
    #[serde(default)]
    pub hours_spent: f64,
}

/// Rate metrics derived from counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductivityMetrics {
    /// Tests created per hour
    pub test_creation_rate: f64,
    /// Executions per created test
    pub execution_efficiency: f64,
    /// Defects found per hour
    pub defect_detection_rate: f64,
    /// Automation contributions per created test
    pub automation_progress: f64,
    /// Created, executed and found items per hour
    pub velocity: f64,
}

/// Reference rates; only supplied fields are compared
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductivityBenchmark {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_creation_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_efficiency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defect_detection_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
}

/// Actual rates as a percentage of the benchmark
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BenchmarkComparison {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_creation_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_efficiency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defect_detection_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation_progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
}

impl BenchmarkComparison {
    fn ratios(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        [
            ("test creation rate", self.test_creation_rate),
            ("execution efficiency", self.execution_efficiency),
            ("defect detection rate", self.defect_detection_rate),
            ("automation progress", self.automation_progress),
            ("velocity", self.velocity),
        ]
        .into_iter()
        .filter_map(|(name, ratio)| ratio.map(|r| (name, r)))
    }
}

/// Team-level aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TeamProductivity {
    pub actor_count: usize,
    pub tests_created: u64,
    pub tests_executed: u64,
    pub defects_found: u64,
    pub automation_contributions: u64,
    pub hours_spent: f64,
    pub metrics: ProductivityMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark_comparison: Option<BenchmarkComparison>,
}

/// Per-contributor record; identity fields are absent when anonymized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IndividualProductivity {
    pub actor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    pub metrics: ProductivityMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark_comparison: Option<BenchmarkComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductivityReport {
    pub team_metrics: TeamProductivity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub individual_metrics: Option<Vec<IndividualProductivity>>,
    pub recommendations: Vec<String>,
}

/// Output options for a productivity report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductivityOptions {
    pub include_individuals: bool,
    pub anonymize: bool,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Rates for a set of counters; zero denominators yield 0
pub fn metrics_for(
    tests_created: u64,
    tests_executed: u64,
    defects_found: u64,
    automation_contributions: u64,
    hours_spent: f64,
) -> ProductivityMetrics {
    let hours = if hours_spent.is_finite() {
        hours_spent.max(0.0)
    } else {
        0.0
    };
    let created = tests_created as f64;

    ProductivityMetrics {
        test_creation_rate: ratio(created, hours),
        execution_efficiency: ratio(tests_executed as f64, created),
        defect_detection_rate: ratio(defects_found as f64, hours),
        automation_progress: ratio(automation_contributions as f64, created),
        velocity: ratio((tests_created + tests_executed + defects_found) as f64, hours),
    }
}

/// Compare metrics with a benchmark as `actual / benchmark * 100`
pub fn compare_to_benchmark(
    metrics: &ProductivityMetrics,
    benchmark: &ProductivityBenchmark,
) -> BenchmarkComparison {
    let percent = |actual: f64, reference: Option<f64>| {
        reference.map(|b| ratio(actual, b) * 100.0)
    };

    BenchmarkComparison {
        test_creation_rate: percent(metrics.test_creation_rate, benchmark.test_creation_rate),
        execution_efficiency: percent(metrics.execution_efficiency, benchmark.execution_efficiency),
        defect_detection_rate: percent(
            metrics.defect_detection_rate,
            benchmark.defect_detection_rate,
        ),
        automation_progress: percent(metrics.automation_progress, benchmark.automation_progress),
        velocity: percent(metrics.velocity, benchmark.velocity),
    }
}

/// Computes productivity reports from actor counters
#[derive(Debug, Clone, Default)]
pub struct ProductivityCalculator;

impl ProductivityCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn report(
        &self,
        actors: &[ActorCounters],
        benchmark: Option<&ProductivityBenchmark>,
        options: ProductivityOptions,
    ) -> ProductivityReport {
        let team_metrics = self.team(actors, benchmark);
        let individual_metrics = options
            .include_individuals
            .then(|| self.individuals(actors, benchmark, options.anonymize));
        let recommendations = Self::recommendations(&team_metrics);

        tracing::info!(
            "Productivity: {} actors, velocity {:.2}/h, individuals {}",
            team_metrics.actor_count,
            team_metrics.metrics.velocity,
            if options.include_individuals {
                if options.anonymize {
                    "anonymized"
                } else {
                    "included"
                }
            } else {
                "omitted"
            }
        );

        ProductivityReport {
            team_metrics,
            individual_metrics,
            recommendations,
        }
    }

    fn team(
        &self,
        actors: &[ActorCounters],
        benchmark: Option<&ProductivityBenchmark>,
    ) -> TeamProductivity {
        let tests_created = actors.iter().map(|a| a.tests_created).sum();
        let tests_executed = actors.iter().map(|a| a.tests_executed).sum();
        let defects_found = actors.iter().map(|a| a.defects_found).sum();
        let automation_contributions = actors.iter().map(|a| a.automation_contributions).sum();
        let hours_spent: f64 = actors
            .iter()
            .map(|a| a.hours_spent)
            .filter(|h| h.is_finite() && *h > 0.0)
            .sum();

        let metrics = metrics_for(
            tests_created,
            tests_executed,
            defects_found,
            automation_contributions,
            hours_spent,
        );
        let benchmark_comparison = benchmark.map(|b| compare_to_benchmark(&metrics, b));

        TeamProductivity {
            actor_count: actors.len(),
            tests_created,
            tests_executed,
            defects_found,
            automation_contributions,
            hours_spent,
            metrics,
            benchmark_comparison,
        }
    }

    /// Per-actor records ordered by output id
    ///
    /// Anonymized records carry `actor-NNN` ids assigned in ascending order
    /// of the original ids, with no name or team.
    fn individuals(
        &self,
        actors: &[ActorCounters],
        benchmark: Option<&ProductivityBenchmark>,
        anonymize: bool,
    ) -> Vec<IndividualProductivity> {
        let mut ordered: Vec<&ActorCounters> = actors.iter().collect();
        ordered.sort_by(|a, b| a.actor_id.cmp(&b.actor_id));

        ordered
            .into_iter()
            .enumerate()
            .map(|(index, actor)| {
                let metrics = metrics_for(
                    actor.tests_created,
                    actor.tests_executed,
                    actor.defects_found,
                    actor.automation_contributions,
                    actor.hours_spent,
                );
                let benchmark_comparison = benchmark.map(|b| compare_to_benchmark(&metrics, b));

                if anonymize {
                    IndividualProductivity {
                        actor_id: format!("actor-{:03}", index + 1),
                        display_name: None,
                        team: None,
                        metrics,
                        benchmark_comparison,
                    }
                } else {
                    IndividualProductivity {
                        actor_id: actor.actor_id.clone(),
                        display_name: actor.display_name.clone(),
                        team: actor.team.clone(),
                        metrics,
                        benchmark_comparison,
                    }
                }
            })
            .collect()
    }

    fn recommendations(team: &TeamProductivity) -> Vec<String> {
        let mut recommendations = Vec::new();
        if team.actor_count == 0 {
            return recommendations;
        }

        if team.metrics.automation_progress < 0.3 {
            recommendations.push(format!(
                "Automation progress is {:.0}% of created tests: invest in automating new tests",
                team.metrics.automation_progress * 100.0
            ));
        }
        if team.metrics.execution_efficiency < 1.0 {
            recommendations.push(
                "Fewer executions than created tests: make sure new tests are scheduled in runs"
                    .to_string(),
            );
        }
        if let Some(comparison) = &team.benchmark_comparison {
            for (name, percent) in comparison.ratios() {
                if percent < 80.0 {
                    recommendations.push(format!(
                        "Team {} is at {:.0}% of benchmark",
                        name, percent
                    ));
                }
            }
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(
        id: &str,
        created: u64,
        executed: u64,
        defects: u64,
        automated: u64,
        hours: f64,
    ) -> ActorCounters {
        ActorCounters {
            actor_id: id.to_string(),
            display_name: Some(format!("{} name", id)),
            team: Some("qa".to_string()),
            tests_created: created,
            tests_executed: executed,
            defects_found: defects,
            automation_contributions: automated,
            hours_spent: hours,
        }
    }

    #[test]
    fn test_metrics_for() {
        let metrics = metrics_for(20, 40, 5, 10, 10.0);
        assert_eq!(metrics.test_creation_rate, 2.0);
        assert_eq!(metrics.execution_efficiency, 2.0);
        assert_eq!(metrics.defect_detection_rate, 0.5);
        assert_eq!(metrics.automation_progress, 0.5);
        assert_eq!(metrics.velocity, 6.5);
    }

    #[test]
    fn test_zero_denominators() {
        let metrics = metrics_for(0, 10, 3, 2, 0.0);
        assert_eq!(metrics.test_creation_rate, 0.0);
        assert_eq!(metrics.execution_efficiency, 0.0);
        assert_eq!(metrics.defect_detection_rate, 0.0);
        assert_eq!(metrics.automation_progress, 0.0);
        assert_eq!(metrics.velocity, 0.0);
    }

    #[test]
    fn test_benchmark_comparison() {
        let metrics = metrics_for(20, 40, 5, 10, 10.0);
        let benchmark = ProductivityBenchmark {
            test_creation_rate: Some(4.0),
            velocity: Some(0.0),
            ..Default::default()
        };

        let comparison = compare_to_benchmark(&metrics, &benchmark);
        assert_eq!(comparison.test_creation_rate, Some(50.0));
        assert_eq!(comparison.velocity, Some(0.0));
        assert_eq!(comparison.execution_efficiency, None);
    }

    #[test]
    fn test_team_aggregates_counters() {
        let calculator = ProductivityCalculator::new();
        let actors = vec![actor("b", 10, 20, 2, 5, 5.0), actor("a", 10, 20, 3, 5, 5.0)];

        let report = calculator.report(&actors, None, ProductivityOptions::default());
        assert_eq!(report.team_metrics.actor_count, 2);
        assert_eq!(report.team_metrics.tests_created, 20);
        assert_eq!(report.team_metrics.metrics.test_creation_rate, 2.0);
        assert_eq!(report.team_metrics.metrics.defect_detection_rate, 0.5);
        assert!(report.individual_metrics.is_none());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_individuals_named() {
        let calculator = ProductivityCalculator::new();
        let actors = vec![actor("bob", 10, 20, 2, 5, 5.0), actor("alice", 4, 8, 1, 1, 2.0)];
        let options = ProductivityOptions {
            include_individuals: true,
            anonymize: false,
        };

        let individuals = calculator
            .report(&actors, None, options)
            .individual_metrics
            .unwrap();
        assert_eq!(individuals[0].actor_id, "alice");
        assert_eq!(individuals[0].display_name.as_deref(), Some("alice name"));
        assert_eq!(individuals[1].actor_id, "bob");
    }

    #[test]
    fn test_individuals_anonymized() {
        let calculator = ProductivityCalculator::new();
        let actors = vec![actor("bob", 10, 20, 2, 5, 5.0), actor("alice", 4, 8, 1, 1, 2.0)];
        let options = ProductivityOptions {
            include_individuals: true,
            anonymize: true,
        };

        let report = calculator.report(&actors, None, options);
        let individuals = report.individual_metrics.as_ref().unwrap();
        assert_eq!(individuals[0].actor_id, "actor-001");
        assert_eq!(individuals[0].metrics.test_creation_rate, 2.0);
        assert_eq!(individuals[1].actor_id, "actor-002");
        assert!(individuals.iter().all(|i| i.display_name.is_none() && i.team.is_none()));

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("alice"));
        assert!(!json.contains("display_name"));
    }

    #[test]
    fn test_recommendations() {
        let calculator = ProductivityCalculator::new();
        let actors = vec![actor("a", 10, 5, 1, 1, 10.0)];
        let benchmark = ProductivityBenchmark {
            test_creation_rate: Some(2.0),
            ..Default::default()
        };

        let report = calculator.report(&actors, Some(&benchmark), ProductivityOptions::default());
        assert_eq!(report.recommendations.len(), 3);
        assert!(report.recommendations[2].contains("test creation rate is at 50%"));
    }
}
