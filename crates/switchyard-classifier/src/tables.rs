//! Keyword tables.
//!
//! Single-word entries of five or more characters also match as a prefix, so
//! `"vulnerabilit"` covers `vulnerability` and `vulnerabilities`.

use crate::types::{Complexity, Domain, TaskType};

pub(crate) fn complexity_keywords(level: Complexity) -> &'static [&'static str] {
  match level {
    Complexity::Simple => &[
      "simple", "quick", "basic", "minor", "small", "typo", "rename", "single", "trivial", "easy",
      "tweak",
    ],
    Complexity::Moderate => &[
      "update", "modify", "improve", "refactor", "optimiz", "enhance", "configur", "integrat",
      "extend", "moderate", "upgrade",
    ],
    Complexity::Complex => &[
      "complex", "architecture", "redesign", "migrat", "distributed", "scalab", "multiple",
      "overhaul", "concurren", "performance", "end-to-end",
    ],
    Complexity::Enterprise => &[
      "enterprise", "platform", "organiz", "company-wide", "microservices", "multi-region",
      "multi-tenant", "large-scale", "global", "ecosystem", "cross-team",
    ],
    Complexity::Critical => &[
      "critical", "urgent", "emergency", "outage", "breach", "incident", "zero-day", "exploit",
      "data loss", "production down",
    ],
  }
}

/// Any match adds [`SECURITY_BONUS`] to the critical score.
pub(crate) const SECURITY_KEYWORDS: &[&str] = &[
  "security", "vulnerabilit", "exploit", "breach", "authenticat", "authoriz", "encrypt",
  "compliance", "gdpr", "hipaa", "pci", "penetration", "malware", "attack", "threat", "cve",
  "xss", "injection", "password", "credential",
];

pub(crate) const SECURITY_BONUS: f64 = 3.0;

pub(crate) fn domain_keywords(domain: Domain) -> &'static [&'static str] {
  match domain {
    Domain::Security => &[
      "security", "vulnerabilit", "authenticat", "authoriz", "encrypt", "threat", "exploit",
      "breach", "malware", "firewall", "xss", "csrf", "injection", "cve", "credential",
      "password", "attack", "access control", "penetration test",
    ],
    Domain::Compliance => &[
      "compliance", "compliant", "gdpr", "hipaa", "pci", "sox", "soc2", "regulat", "policy",
      "policies", "privacy", "audit", "data protection", "iso 27001",
    ],
    Domain::Architecture => &[
      "architect", "scalab", "modular", "monolith", "microservices", "coupling",
      "design pattern", "system design", "domain model", "service mesh",
    ],
    Domain::Infrastructure => &[
      "infrastructure", "kubernetes", "docker", "deploy", "cloud", "terraform", "server",
      "network", "container", "aws", "azure", "gcp", "ci/cd", "pipeline", "migrat",
    ],
    Domain::Performance => &[
      "performance", "latency", "throughput", "optimiz", "slow", "bottleneck", "cpu", "cache",
      "profil", "benchmark", "memory leak", "load test",
    ],
    Domain::Data => &[
      "data", "database", "sql", "schema", "etl", "analytics", "query", "queries", "warehouse",
      "postgres", "mysql", "data pipeline",
    ],
    Domain::Frontend => &[
      "frontend", "ui", "ux", "react", "css", "html", "browser", "javascript", "accessibility",
      "component", "user interface",
    ],
    Domain::Backend => &[
      "backend", "api", "apis", "endpoint", "service", "rest", "graphql", "server-side",
      "business logic",
    ],
    Domain::Testing => &[
      "test", "tests", "testing", "coverage", "qa", "regression", "e2e", "mock", "unit test",
      "integration test",
    ],
    Domain::General => &[],
  }
}

/// Score of a matched single-word domain keyword.
pub(crate) const DOMAIN_WORD_SCORE: f64 = 1.0;

/// Score per word of a matched multi-word domain keyword.
pub(crate) const DOMAIN_PHRASE_WORD_SCORE: f64 = 1.5;

pub(crate) fn task_type_keywords(task_type: TaskType) -> &'static [&'static str] {
  match task_type {
    TaskType::SecurityAudit => &[
      "scan", "scanning", "audit", "pentest", "penetration", "vulnerabilit", "security review",
      "security audit", "threat model",
    ],
    TaskType::Migration => &[
      "migrat", "upgrade", "port", "legacy", "transition", "move to", "switch to",
    ],
    TaskType::Troubleshooting => &[
      "debug", "fix", "bug", "error", "crash", "failing", "broken", "troubleshoot", "investigat",
      "issue", "diagnos",
    ],
    TaskType::Optimization => &[
      "optimiz", "faster", "speed up", "tune", "efficien", "reduce latency", "improve performance",
    ],
    TaskType::Implementation => &[
      "implement", "build", "create", "develop", "add", "write", "code", "integrat",
    ],
    TaskType::Design => &["design", "architect", "plan", "blueprint", "model", "structure"],
    TaskType::Review => &["review", "evaluat", "assess", "inspect", "critique"],
    TaskType::Documentation => &["document", "readme", "docs", "explain", "tutorial", "guide"],
    TaskType::Analysis => &["analy", "examin", "research", "compare", "understand", "study"],
  }
}

/// Keyword weights feeding security relevance.
pub(crate) const SECURITY_WEIGHTS: &[(&str, f64)] = &[
  ("breach", 0.95),
  ("exploit", 0.9),
  ("malware", 0.9),
  ("cve", 0.9),
  ("zero-day", 0.95),
  ("vulnerabilit", 0.85),
  ("attack", 0.85),
  ("injection", 0.85),
  ("xss", 0.85),
  ("csrf", 0.85),
  ("threat", 0.8),
  ("penetration", 0.8),
  ("security", 0.75),
  ("credential", 0.75),
  ("authenticat", 0.7),
  ("authoriz", 0.7),
  ("encrypt", 0.7),
  ("password", 0.7),
  ("access control", 0.7),
  ("firewall", 0.6),
  ("compliance", 0.6),
  ("gdpr", 0.6),
  ("hipaa", 0.6),
  ("privacy", 0.5),
  ("audit", 0.5),
  ("token", 0.4),
];

/// Base relevance when the primary domain is security or compliance.
pub(crate) fn security_base(domain: Domain) -> f64 {
  match domain {
    Domain::Security => 0.8,
    Domain::Compliance => 0.6,
    _ => 0.0,
  }
}

/// Regulatory terms that make compliance risk high.
pub(crate) const REGULATORY_KEYWORDS: &[&str] = &[
  "gdpr", "hipaa", "pci", "sox", "soc2", "regulat", "iso 27001", "ferpa", "ccpa",
];

/// Upper bounds (hours) of the effort buckets; larger estimates are "1+ months".
pub(crate) const EFFORT_BUCKETS: &[(f64, &str)] = &[
  (2.0, "1-2 hours"),
  (8.0, "2-8 hours"),
  (24.0, "1-3 days"),
  (80.0, "1-2 weeks"),
  (160.0, "2-4 weeks"),
];

pub(crate) const EFFORT_OVERFLOW: &str = "1+ months";
