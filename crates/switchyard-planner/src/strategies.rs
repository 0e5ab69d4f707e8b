//! Step layouts for each orchestration strategy.
//!
//! Builders only decide steps, executors, dependencies and estimates. Tools
//! are attached afterwards by the planner.

use switchyard_classifier::{Domain, TaskAnalysisResult, TaskType};
use switchyard_config::StepDef;

use crate::planner::COORDINATOR;

/// Phases of a phased project: id, name, share of effort and time.
const PHASES: [(&str, &str, f64); 5] = [
  ("discovery", "Discovery", 0.20),
  ("design", "Design", 0.25),
  ("implementation", "Implementation", 0.35),
  ("testing", "Testing", 0.15),
  ("deployment", "Deployment", 0.05),
];

/// Effort share of the synthesis step relative to the whole task.
const SYNTHESIS_SHARE: f64 = 0.1;

const ASSESSMENT_SHARE: f64 = 0.3;
const VALIDATION_SHARE: f64 = 0.3;

/// A work stream of a hierarchical decomposition.
#[derive(Debug, Clone, Copy)]
struct Stream {
  id: &'static str,
  name: &'static str,
  lead: Domain,
  share: f64,
}

const fn stream(id: &'static str, name: &'static str, lead: Domain, share: f64) -> Stream {
  Stream {
    id,
    name,
    lead,
    share,
  }
}

/// Keyword-selected stream templates, first match wins. The first stream
/// gates the middle streams, which gate the last.
const STREAM_PATTERNS: &[(&[&str], &[Stream])] = &[
  (
    &["migrat"],
    &[
      stream("assessment", "Assessment", Domain::Architecture, 0.20),
      stream("data_migration", "Data migration", Domain::Data, 0.35),
      stream(
        "infrastructure_setup",
        "Infrastructure setup",
        Domain::Infrastructure,
        0.30,
      ),
      stream("validation", "Validation", Domain::Testing, 0.15),
    ],
  ),
  (
    &["platform", "microservice"],
    &[
      stream("foundation", "Foundation", Domain::Architecture, 0.20),
      stream("services", "Services", Domain::Backend, 0.35),
      stream("interfaces", "Interfaces", Domain::Frontend, 0.25),
      stream("rollout", "Rollout", Domain::Infrastructure, 0.20),
    ],
  ),
];

/// Shares of the default decomposition: planning, delivery (split across
/// specialists), integration.
const DEFAULT_STREAM_SHARES: (f64, f64, f64) = (0.2, 0.6, 0.2);

/// Everything a builder needs to know about the task.
pub(crate) struct Draft<'a> {
  pub description: &'a str,
  pub analysis: &'a TaskAnalysisResult,
  /// Estimated effort of the whole task.
  pub total_minutes: f64,
  /// Wall-clock budget of the whole workflow, split by phase weight.
  pub timeout_budget: u64,
}

impl<'a> Draft<'a> {
  pub fn new(description: &'a str, analysis: &'a TaskAnalysisResult, timeout_budget: u64) -> Self {
    Self {
      description,
      analysis,
      total_minutes: analysis.estimated_hours * 60.0,
      timeout_budget,
    }
  }

  fn primary(&self) -> String {
    self.analysis.primary_domain.specialist()
  }

  fn specialists(&self) -> Vec<String> {
    if self.analysis.required_specialists.is_empty() {
      vec![self.primary()]
    } else {
      self.analysis.required_specialists.clone()
    }
  }

  fn has(&self, domain: Domain) -> bool {
    self
      .analysis
      .required_specialists
      .contains(&domain.specialist())
  }

  fn minutes(&self, share: f64) -> u64 {
    (self.total_minutes * share).round().max(1.0) as u64
  }

  fn timeout(&self, share: f64) -> u64 {
    (self.timeout_budget as f64 * share).round().max(1.0) as u64
  }

  fn step(&self, step_id: &str, name: &str, executor: &str, share: f64) -> StepDef {
    StepDef::new(step_id, name, executor)
      .with_description(format!("{name}: {}", self.description))
      .with_estimated_minutes(self.minutes(share))
  }
}

pub(crate) fn single_specialist(draft: &Draft) -> Vec<StepDef> {
  let executor = draft.primary();
  vec![draft.step(&executor, "Execute", &executor, 1.0)]
}

/// One step per specialist, chained in the order the task type calls for.
pub(crate) fn sequential(draft: &Draft) -> Vec<StepDef> {
  let specialists = ordered_specialists(draft.specialists(), draft.analysis.task_type);
  let share = 1.0 / specialists.len() as f64;

  let mut steps: Vec<StepDef> = Vec::with_capacity(specialists.len());
  for executor in &specialists {
    let mut step = draft.step(executor, executor, executor, share);
    if let Some(previous) = steps.last() {
      step = step.depends_on([previous.step_id.clone()]);
    }
    steps.push(step);
  }
  steps
}

/// Independent specialist steps joined by a synthesis step.
pub(crate) fn parallel_analysis(draft: &Draft) -> Vec<StepDef> {
  let specialists = draft.specialists();
  let share = (1.0 - SYNTHESIS_SHARE) / specialists.len() as f64;

  let mut steps: Vec<StepDef> = specialists
    .iter()
    .map(|executor| draft.step(executor, executor, executor, share))
    .collect();
  steps.push(
    draft
      .step("synthesis", "Synthesis", COORDINATOR, SYNTHESIS_SHARE)
      .depends_on(specialists),
  );
  steps
}

/// Five chained phases weighted by their share of the work.
pub(crate) fn phased_project(draft: &Draft) -> Vec<StepDef> {
  let primary = draft.primary();
  let lead = |domain: Domain| {
    if draft.has(domain) {
      domain.specialist()
    } else {
      primary.clone()
    }
  };

  let mut previous: Option<&str> = None;
  let mut steps = Vec::with_capacity(PHASES.len());
  for (step_id, name, share) in PHASES {
    let executor = match step_id {
      "design" => lead(Domain::Architecture),
      "testing" => lead(Domain::Testing),
      "deployment" => lead(Domain::Infrastructure),
      _ => primary.clone(),
    };

    let mut step = draft
      .step(step_id, name, &executor, share)
      .with_timeout_seconds(draft.timeout(share));
    if let Some(previous) = previous {
      step = step.depends_on([previous]);
    }
    previous = Some(step_id);
    steps.push(step);
  }
  steps
}

/// Work streams gated first-to-middle-to-last.
pub(crate) fn hierarchical_decomposition(draft: &Draft) -> Vec<StepDef> {
  let streams = match_streams(draft.description, draft.analysis.task_type)
    .map(<[Stream]>::to_vec)
    .unwrap_or_else(|| default_streams(draft));

  let Some((first, rest)) = streams.split_first() else {
    return single_specialist(draft);
  };
  let Some((last, middle)) = rest.split_last() else {
    return vec![stream_step(draft, first)];
  };

  let mut steps = vec![stream_step(draft, first)];
  for work in middle {
    steps.push(stream_step(draft, work).depends_on([first.id]));
  }

  let gates: Vec<&str> = if middle.is_empty() {
    vec![first.id]
  } else {
    middle.iter().map(|s| s.id).collect()
  };
  steps.push(stream_step(draft, last).depends_on(gates));
  steps
}

/// Assessment, the other specialists in parallel, then validation.
pub(crate) fn security_first(draft: &Draft) -> Vec<StepDef> {
  let security = Domain::Security.specialist();
  let others: Vec<String> = draft
    .specialists()
    .into_iter()
    .filter(|name| name != &security)
    .collect();

  let mut steps = vec![draft.step(
    "security_assessment",
    "Security assessment",
    &security,
    ASSESSMENT_SHARE,
  )];

  let middle_share = (1.0 - ASSESSMENT_SHARE - VALIDATION_SHARE) / others.len().max(1) as f64;
  for executor in &others {
    steps.push(
      draft
        .step(executor, executor, executor, middle_share)
        .depends_on(["security_assessment"]),
    );
  }

  let gates = if others.is_empty() {
    vec!["security_assessment".to_string()]
  } else {
    others
  };
  steps.push(
    draft
      .step(
        "security_validation",
        "Security validation",
        &security,
        VALIDATION_SHARE,
      )
      .depends_on(gates),
  );
  steps
}

fn stream_step(draft: &Draft, stream: &Stream) -> StepDef {
  let executor = stream.lead.specialist();
  draft.step(stream.id, stream.name, &executor, stream.share)
}

fn match_streams(description: &str, task_type: TaskType) -> Option<&'static [Stream]> {
  let description = description.to_lowercase();
  STREAM_PATTERNS
    .iter()
    .find(|(keywords, _)| {
      keywords.iter().any(|keyword| description.contains(keyword))
        || (keywords.contains(&"migrat") && task_type == TaskType::Migration)
    })
    .map(|(_, streams)| *streams)
}

/// Planning, one delivery stream per supporting specialist, integration.
fn default_streams(draft: &Draft) -> Vec<Stream> {
  let (planning, delivery, integration) = DEFAULT_STREAM_SHARES;
  let primary = draft.analysis.primary_domain;

  let mut supporting: Vec<Domain> = draft
    .analysis
    .secondary_domains
    .iter()
    .copied()
    .filter(|domain| draft.has(*domain))
    .collect();
  if supporting.is_empty() {
    supporting.push(primary);
  }

  let share = delivery / supporting.len() as f64;
  let mut streams = vec![stream("planning", "Planning", primary, planning)];
  streams.extend(supporting.into_iter().map(|domain| Stream {
    id: delivery_id(domain),
    name: "Delivery",
    lead: domain,
    share,
  }));
  streams.push(stream("integration", "Integration", primary, integration));
  streams
}

fn delivery_id(domain: Domain) -> &'static str {
  match domain {
    Domain::Security => "security_delivery",
    Domain::Compliance => "compliance_delivery",
    Domain::Architecture => "architecture_delivery",
    Domain::Infrastructure => "infrastructure_delivery",
    Domain::Performance => "performance_delivery",
    Domain::Data => "data_delivery",
    Domain::Frontend => "frontend_delivery",
    Domain::Backend => "backend_delivery",
    Domain::Testing => "testing_delivery",
    Domain::General => "delivery",
  }
}

/// Specialist order for sequential plans.
fn sequence_order(task_type: TaskType) -> &'static [Domain] {
  match task_type {
    TaskType::Migration => &[
      Domain::Architecture,
      Domain::Data,
      Domain::Infrastructure,
      Domain::Backend,
      Domain::Frontend,
      Domain::Testing,
    ],
    TaskType::Troubleshooting => &[
      Domain::Performance,
      Domain::Backend,
      Domain::Data,
      Domain::Infrastructure,
      Domain::Frontend,
      Domain::Testing,
    ],
    TaskType::Optimization => &[
      Domain::Performance,
      Domain::Data,
      Domain::Backend,
      Domain::Infrastructure,
      Domain::Frontend,
      Domain::Testing,
    ],
    TaskType::Implementation | TaskType::Design => &[
      Domain::Architecture,
      Domain::Backend,
      Domain::Data,
      Domain::Frontend,
      Domain::Infrastructure,
      Domain::Testing,
    ],
    _ => &[
      Domain::Architecture,
      Domain::Security,
      Domain::Compliance,
      Domain::Data,
      Domain::Backend,
      Domain::Frontend,
      Domain::Infrastructure,
      Domain::Performance,
      Domain::Testing,
    ],
  }
}

/// Stable sort by position in the order table; unlisted specialists go last.
fn ordered_specialists(mut specialists: Vec<String>, task_type: TaskType) -> Vec<String> {
  let order = sequence_order(task_type);
  specialists.sort_by_key(|name| {
    order
      .iter()
      .position(|domain| &domain.specialist() == name)
      .unwrap_or(order.len())
  });
  specialists
}
