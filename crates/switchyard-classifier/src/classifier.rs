use std::collections::BTreeMap;

use serde_json::{Map, Value, json};
use switchyard_config::{Priority, Strategy};
use tracing::debug;

use crate::tables::{
  DOMAIN_PHRASE_WORD_SCORE, DOMAIN_WORD_SCORE, EFFORT_BUCKETS, EFFORT_OVERFLOW,
  REGULATORY_KEYWORDS, SECURITY_BONUS, SECURITY_KEYWORDS, SECURITY_WEIGHTS, complexity_keywords,
  domain_keywords, security_base, task_type_keywords,
};
use crate::text::{Text, word_count};
use crate::types::{
  Complexity, Domain, RiskAssessment, RiskLevel, TaskAnalysisResult, TaskContext, TaskType,
};

/// Confidence used when no complexity keyword matched.
const DEFAULT_COMPLEXITY_CONFIDENCE: f64 = 0.8;
/// Domain confidence when no domain keyword matched.
const DEFAULT_DOMAIN_CONFIDENCE: f64 = 0.2;
const MAX_CONFIDENCE: f64 = 0.95;
/// Relevance at which the security specialist is always involved.
const SECURITY_SPECIALIST_THRESHOLD: f64 = 0.6;
const MAX_SECONDARY_SPECIALISTS: usize = 2;

struct ComplexityScore {
  level: Complexity,
  confidence: f64,
  scores: Vec<(Complexity, f64)>,
}

struct DomainScore {
  primary: Domain,
  secondary: Vec<Domain>,
  confidence: f64,
  scores: Vec<(Domain, f64)>,
}

/// Keyword-weighted task classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskClassifier;

impl TaskClassifier {
  pub fn new() -> Self {
    Self
  }

  pub fn analyze(&self, description: &str, context: Option<&TaskContext>) -> TaskAnalysisResult {
    let tags = context.map(|c| c.tags.as_slice()).unwrap_or_default();
    let urgent = context.is_some_and(|c| c.urgent);
    let text = Text::new(std::iter::once(description).chain(tags.iter().map(String::as_str)));
    if text.is_empty() {
      debug!("classifying an empty description");
    }

    let complexity = score_complexity(&text);
    let domains = score_domains(&text);
    let (task_type, task_type_detected) = detect_task_type(&text);
    let security_relevance = security_relevance(&text, domains.primary);
    let risk = assess_risk(&text, complexity.level, &domains, security_relevance);
    let required_specialists =
      required_specialists(complexity.level, &domains, task_type, security_relevance);

    let priority_level = priority(
      complexity.level,
      domains.primary,
      security_relevance,
      &risk,
      urgent,
    );
    let estimated_hours = complexity.level.base_hours()
      * (1.0 + 0.5 * (required_specialists.len().max(1) - 1) as f64);
    let recommended_approach = recommend_approach(
      complexity.level,
      domains.primary,
      task_type,
      required_specialists.len(),
    );

    let type_confidence = if task_type_detected { 0.2 } else { 0.1 };
    let confidence_score = (0.4 * complexity.confidence + 0.4 * domains.confidence + type_confidence)
      .min(MAX_CONFIDENCE);

    let extensions = BTreeMap::from([
      (
        "complexity_scores".to_string(),
        Value::Object(
          complexity
            .scores
            .iter()
            .map(|(level, score)| (level.as_str().to_string(), json!(score)))
            .collect::<Map<String, Value>>(),
        ),
      ),
      (
        "domain_scores".to_string(),
        Value::Object(
          domains
            .scores
            .iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(domain, score)| (domain.as_str().to_string(), json!(score)))
            .collect::<Map<String, Value>>(),
        ),
      ),
      ("task_type_detected".to_string(), json!(task_type_detected)),
    ]);

    debug!(
      complexity = %complexity.level,
      domain = %domains.primary,
      task_type = %task_type,
      priority = %priority_level,
      approach = %recommended_approach,
      "task_classified"
    );

    TaskAnalysisResult {
      complexity: complexity.level,
      primary_domain: domains.primary,
      secondary_domains: domains.secondary,
      task_type,
      confidence_score,
      security_relevance,
      required_specialists,
      priority_level,
      estimated_effort: effort_label(estimated_hours).to_string(),
      estimated_hours,
      risk_assessment: risk,
      recommended_approach,
      extensions,
    }
  }
}

fn score_complexity(text: &Text) -> ComplexityScore {
  let mut scores: Vec<(Complexity, f64)> = Complexity::ALL
    .into_iter()
    .map(|level| {
      let matched = text.matched(complexity_keywords(level)).len();
      (level, matched as f64 * level.weight())
    })
    .collect();

  if !text.matched(SECURITY_KEYWORDS).is_empty() {
    if let Some((_, score)) = scores.iter_mut().find(|(l, _)| *l == Complexity::Critical) {
      *score += SECURITY_BONUS;
    }
  }

  let total: f64 = scores.iter().map(|(_, s)| s).sum();
  if total <= 0.0 {
    return ComplexityScore {
      level: Complexity::Simple,
      confidence: DEFAULT_COMPLEXITY_CONFIDENCE,
      scores,
    };
  }

  // Levels ascend, so `>=` hands ties to the higher level
  let (level, best) = scores
    .iter()
    .fold((Complexity::Simple, 0.0), |(best_level, best), (level, score)| {
      if *score >= best {
        (*level, *score)
      } else {
        (best_level, best)
      }
    });

  ComplexityScore {
    level,
    confidence: best / total,
    scores,
  }
}

fn score_domains(text: &Text) -> DomainScore {
  let scores: Vec<(Domain, f64)> = Domain::SCORED
    .into_iter()
    .map(|domain| {
      let score = text
        .matched(domain_keywords(domain))
        .into_iter()
        .map(|keyword| match word_count(keyword) {
          1 => DOMAIN_WORD_SCORE,
          words => DOMAIN_PHRASE_WORD_SCORE * words as f64,
        })
        .sum::<f64>();
      (domain, score)
    })
    .collect();

  let total: f64 = scores.iter().map(|(_, s)| s).sum();
  // Strict `>` keeps the earlier domain on ties
  let (primary, best) = scores
    .iter()
    .fold((Domain::General, 0.0), |(best_domain, best), (domain, score)| {
      if *score > best {
        (*domain, *score)
      } else {
        (best_domain, best)
      }
    });

  if total <= 0.0 {
    return DomainScore {
      primary: Domain::General,
      secondary: Vec::new(),
      confidence: DEFAULT_DOMAIN_CONFIDENCE,
      scores,
    };
  }

  let mut ranked: Vec<(Domain, f64)> = scores
    .iter()
    .copied()
    .filter(|(domain, score)| *domain != primary && *score > 0.0)
    .collect();
  ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

  DomainScore {
    primary,
    secondary: ranked.into_iter().map(|(domain, _)| domain).collect(),
    confidence: best / total,
    scores,
  }
}

/// The best-matching task type, and whether any keyword matched at all.
fn detect_task_type(text: &Text) -> (TaskType, bool) {
  let (task_type, hits) = TaskType::ORDER
    .into_iter()
    .map(|task_type| (task_type, text.matched(task_type_keywords(task_type)).len()))
    .fold((TaskType::Analysis, 0), |best, candidate| {
      if candidate.1 > best.1 { candidate } else { best }
    });
  (task_type, hits > 0)
}

fn security_relevance(text: &Text, primary: Domain) -> f64 {
  SECURITY_WEIGHTS
    .iter()
    .filter(|(keyword, _)| text.contains(keyword))
    .map(|(_, weight)| *weight)
    .fold(security_base(primary), f64::max)
    .min(1.0)
}

fn assess_risk(
  text: &Text,
  complexity: Complexity,
  domains: &DomainScore,
  security_relevance: f64,
) -> RiskAssessment {
  let security = if domains.primary == Domain::Security || security_relevance >= 0.7 {
    RiskLevel::High
  } else if security_relevance >= 0.4 || domains.secondary.contains(&Domain::Security) {
    RiskLevel::Medium
  } else {
    RiskLevel::Low
  };

  let complexity_risk = match complexity {
    Complexity::Simple | Complexity::Moderate => RiskLevel::Low,
    Complexity::Complex => RiskLevel::Medium,
    Complexity::Enterprise | Complexity::Critical => RiskLevel::High,
  };

  let domain_count = 1 + domains.secondary.len();
  let resource = match complexity {
    Complexity::Enterprise => RiskLevel::High,
    Complexity::Complex => RiskLevel::Medium,
    _ if domain_count >= 3 => RiskLevel::Medium,
    _ => RiskLevel::Low,
  };

  let compliance = if !text.matched(REGULATORY_KEYWORDS).is_empty() {
    RiskLevel::High
  } else if domains.primary == Domain::Compliance
    || domains.primary == Domain::Security
    || domains.secondary.contains(&Domain::Compliance)
  {
    RiskLevel::Medium
  } else {
    RiskLevel::Low
  };

  RiskAssessment {
    security,
    complexity: complexity_risk,
    resource,
    compliance,
  }
}

fn required_specialists(
  complexity: Complexity,
  domains: &DomainScore,
  task_type: TaskType,
  security_relevance: f64,
) -> Vec<String> {
  fn push(specialists: &mut Vec<String>, domain: Domain) {
    let name = domain.specialist();
    if !specialists.contains(&name) {
      specialists.push(name);
    }
  }

  let mut specialists: Vec<String> = Vec::new();
  if complexity == Complexity::Critical
    || domains.primary == Domain::Security
    || security_relevance >= SECURITY_SPECIALIST_THRESHOLD
  {
    push(&mut specialists, Domain::Security);
  }

  push(&mut specialists, domains.primary);

  if matches!(complexity, Complexity::Complex | Complexity::Enterprise) {
    for domain in domains.secondary.iter().take(MAX_SECONDARY_SPECIALISTS) {
      push(&mut specialists, *domain);
    }
  }

  match task_type {
    TaskType::Migration => push(&mut specialists, Domain::Infrastructure),
    TaskType::Optimization => push(&mut specialists, Domain::Performance),
    TaskType::SecurityAudit => {
      let security = Domain::Security.specialist();
      specialists.retain(|name| name != &security);
      specialists.insert(0, security);
    }
    _ => {}
  }

  specialists
}

fn priority(
  complexity: Complexity,
  primary: Domain,
  security_relevance: f64,
  risk: &RiskAssessment,
  urgent: bool,
) -> Priority {
  let score = (complexity.weight() * primary.priority_boost() + 2.0 * security_relevance)
    * risk.multiplier();

  let level = if score >= 12.0 {
    Priority::Critical
  } else if score >= 7.0 {
    Priority::High
  } else if score >= 3.5 {
    Priority::Medium
  } else {
    Priority::Low
  };

  if urgent { level.raised() } else { level }
}

fn recommend_approach(
  complexity: Complexity,
  primary: Domain,
  task_type: TaskType,
  specialist_count: usize,
) -> Strategy {
  if complexity == Complexity::Critical || primary == Domain::Security {
    return Strategy::SecurityFirst;
  }

  match complexity {
    Complexity::Simple => Strategy::SingleSpecialist,
    Complexity::Moderate if specialist_count >= 3 => Strategy::ParallelAnalysis,
    Complexity::Moderate => Strategy::Sequential,
    Complexity::Complex if task_type.is_analytical() => Strategy::ParallelAnalysis,
    Complexity::Complex if task_type.is_constructive() => Strategy::PhasedProject,
    Complexity::Complex => Strategy::Adaptive,
    Complexity::Enterprise => Strategy::HierarchicalDecomposition,
    Complexity::Critical => Strategy::SecurityFirst,
  }
}

fn effort_label(hours: f64) -> &'static str {
  EFFORT_BUCKETS
    .iter()
    .find(|(limit, _)| hours <= *limit)
    .map_or(EFFORT_OVERFLOW, |(_, label)| *label)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn analyze(description: &str) -> TaskAnalysisResult {
    TaskClassifier::new().analyze(description, None)
  }

  #[test]
  fn test_security_scan() {
    let result = analyze("Scan the codebase for security vulnerabilities");

    assert_eq!(result.complexity, Complexity::Critical);
    assert_eq!(result.primary_domain, Domain::Security);
    assert_eq!(result.required_specialists[0], "security_specialist");
    assert_eq!(result.recommended_approach, Strategy::SecurityFirst);
    assert_eq!(result.task_type, TaskType::SecurityAudit);
    assert_eq!(result.priority_level, Priority::Critical);
    assert_eq!(result.security_relevance, 0.85);
    assert_eq!(result.confidence_score, MAX_CONFIDENCE);
    assert_eq!(result.estimated_effort, "1-3 days");
    assert_eq!(result.risk_assessment.security, RiskLevel::High);
  }

  #[test]
  fn test_no_signal_degrades_to_defaults() {
    let result = analyze("");

    assert_eq!(result.complexity, Complexity::Simple);
    assert_eq!(result.primary_domain, Domain::General);
    assert!(result.secondary_domains.is_empty());
    assert_eq!(result.task_type, TaskType::Analysis);
    assert_eq!(result.security_relevance, 0.0);
    assert_eq!(result.required_specialists, vec!["general_specialist"]);
    assert_eq!(result.priority_level, Priority::Low);
    assert_eq!(result.estimated_effort, "1-2 hours");
    assert_eq!(result.recommended_approach, Strategy::SingleSpecialist);
    assert!((result.confidence_score - 0.5).abs() < 1e-9);
    assert_eq!(result.extensions["task_type_detected"], json!(false));
  }

  #[test]
  fn test_simple_fix() {
    let result = analyze("Fix a typo in the README");

    assert_eq!(result.complexity, Complexity::Simple);
    // Troubleshooting precedes documentation on ties
    assert_eq!(result.task_type, TaskType::Troubleshooting);
    assert_eq!(result.recommended_approach, Strategy::SingleSpecialist);
    assert_eq!(result.priority_level, Priority::Low);
  }

  #[test]
  fn test_moderate_single_domain_is_sequential() {
    let result = analyze("Refactor the API endpoint to improve the database query");

    assert_eq!(result.complexity, Complexity::Moderate);
    // Data and backend tie; data comes first in table order
    assert_eq!(result.primary_domain, Domain::Data);
    assert_eq!(result.secondary_domains, vec![Domain::Backend]);
    assert_eq!(result.required_specialists, vec!["data_specialist"]);
    assert_eq!(result.recommended_approach, Strategy::Sequential);
  }

  #[test]
  fn test_complex_review_is_parallel() {
    let result = analyze("Review the distributed system for scalability bottlenecks");

    assert_eq!(result.complexity, Complexity::Complex);
    assert_eq!(result.task_type, TaskType::Review);
    assert_eq!(result.primary_domain, Domain::Architecture);
    assert_eq!(
      result.required_specialists,
      vec!["architecture_specialist", "performance_specialist"]
    );
    assert_eq!(result.recommended_approach, Strategy::ParallelAnalysis);
  }

  #[test]
  fn test_complex_implementation_is_phased() {
    let result = analyze("Implement a distributed event pipeline");

    assert_eq!(result.complexity, Complexity::Complex);
    assert_eq!(result.task_type, TaskType::Implementation);
    assert_eq!(result.primary_domain, Domain::Infrastructure);
    assert_eq!(result.recommended_approach, Strategy::PhasedProject);
    assert_eq!(result.estimated_effort, "1-2 weeks");
  }

  #[test]
  fn test_enterprise_migration() {
    let result =
      analyze("Migrate the enterprise platform to microservices across multiple regions");

    assert_eq!(result.complexity, Complexity::Enterprise);
    assert_eq!(result.task_type, TaskType::Migration);
    assert_eq!(result.primary_domain, Domain::Architecture);
    assert_eq!(result.secondary_domains, vec![Domain::Infrastructure]);
    assert_eq!(
      result.required_specialists,
      vec!["architecture_specialist", "infrastructure_specialist"]
    );
    assert_eq!(
      result.recommended_approach,
      Strategy::HierarchicalDecomposition
    );
    assert_eq!(result.estimated_hours, 240.0);
    assert_eq!(result.estimated_effort, "1+ months");
    assert_eq!(result.priority_level, Priority::High);
  }

  #[test]
  fn test_optimization_forces_performance_specialist() {
    let result = analyze("Optimize the checkout database");

    assert_eq!(result.task_type, TaskType::Optimization);
    assert!(
      result
        .required_specialists
        .contains(&"performance_specialist".to_string())
    );
  }

  #[test]
  fn test_context_tags_and_urgency() {
    let classifier = TaskClassifier::new();
    let plain = classifier.analyze("Fix a typo in the README", None);
    let urgent = classifier.analyze(
      "Fix a typo in the README",
      Some(&TaskContext {
        tags: Vec::new(),
        urgent: true,
      }),
    );
    assert_eq!(urgent.priority_level, plain.priority_level.raised());

    let tagged = classifier.analyze(
      "Look at the login page",
      Some(&TaskContext {
        tags: vec!["security".to_string()],
        urgent: false,
      }),
    );
    assert_eq!(tagged.primary_domain, Domain::Security);
    assert_eq!(tagged.complexity, Complexity::Critical);
  }

  #[test]
  fn test_regulatory_terms_raise_compliance_risk() {
    let result = analyze("Document our GDPR data retention policy");

    assert_eq!(result.risk_assessment.compliance, RiskLevel::High);
    assert_eq!(result.primary_domain, Domain::Compliance);
    assert!(result.security_relevance >= 0.6);
    assert_eq!(result.required_specialists[0], "security_specialist");
  }

  #[test]
  fn test_specialists_have_no_duplicates() {
    let result = analyze(
      "Audit security of the enterprise platform authentication and encryption for breach risk",
    );
    let mut deduped = result.required_specialists.clone();
    deduped.dedup();
    assert_eq!(deduped, result.required_specialists);
    assert_eq!(result.required_specialists[0], "security_specialist");
  }

  #[test]
  fn test_effort_buckets() {
    assert_eq!(effort_label(2.0), "1-2 hours");
    assert_eq!(effort_label(3.0), "2-8 hours");
    assert_eq!(effort_label(24.0), "1-3 days");
    assert_eq!(effort_label(60.0), "1-2 weeks");
    assert_eq!(effort_label(160.0), "2-4 weeks");
    assert_eq!(effort_label(161.0), "1+ months");
  }
}
