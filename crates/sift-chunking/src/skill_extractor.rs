use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use sift_domain::skills::{normalize, skills_in_text};

/// Source confidence tiers: structured skill fields beat project tech
/// stacks, which beat mentions buried in narrative text.
pub const CONFIDENCE_STRUCTURED: f32 = 1.0;
pub const CONFIDENCE_PROJECT: f32 = 0.9;
pub const CONFIDENCE_NARRATIVE: f32 = 0.6;

#[derive(Clone, Debug, PartialEq)]
pub struct LedgerDraft {
	pub skill_canonical: String,
	pub confidence: f32,
	pub evidence_count: i64,
	pub evidence_sources: Vec<String>,
}

#[derive(Default)]
struct Observation {
	sources: BTreeSet<String>,
	count: i64,
	max_confidence: f32,
}

/// Extract the skill ledger for one resume. Entries come back sorted by
/// canonical name; per skill, the highest-confidence observation wins and
/// every observation counts toward `evidence_count`.
pub fn extract_skills(resume: &Value) -> Vec<LedgerDraft> {
	let mut observations: BTreeMap<String, Observation> = BTreeMap::new();

	let mut add = |raw: &str, source: &str, confidence: f32| {
		let canonical = normalize(raw);
		if canonical.len() < 2 {
			return;
		}
		let entry = observations.entry(canonical).or_default();
		entry.sources.insert(source.to_string());
		entry.count += 1;
		entry.max_confidence = entry.max_confidence.max(confidence);
	};

	for exp in iter_array(resume.get("experience")) {
		let tech_env = exp.get("technical_environment").cloned().unwrap_or(Value::Null);
		for (key, source) in [
			("technologies", "tech_env.technologies"),
			("tools", "tech_env.tools"),
			("methodologies", "tech_env.methodologies"),
		] {
			for item in iter_array(tech_env.get(key)).filter_map(|v| v.as_str()) {
				add(item, source, CONFIDENCE_STRUCTURED);
			}
		}

		for resp in iter_array(exp.get("responsibilities")).filter_map(|v| v.as_str()) {
			for skill in skills_in_text(resp) {
				add(&skill, "experience.responsibilities", CONFIDENCE_NARRATIVE);
			}
		}
	}

	for proj in iter_array(resume.get("projects")) {
		for tech in iter_array(proj.get("technologies")).filter_map(|v| v.as_str()) {
			add(tech, "project.technologies", CONFIDENCE_PROJECT);
		}
		if let Some(description) = proj.get("description").and_then(|v| v.as_str()) {
			for skill in skills_in_text(description) {
				add(&skill, "project.description", CONFIDENCE_NARRATIVE);
			}
		}
	}

	if let Some(technical) = resume.pointer("/skills/technical").and_then(|v| v.as_object()) {
		for items in technical.values() {
			for item in iter_array(Some(items)) {
				match item {
					Value::String(name) => add(name, "skills.technical", CONFIDENCE_STRUCTURED),
					Value::Object(_) => {
						if let Some(name) = item.get("name").and_then(|v| v.as_str()) {
							add(name, "skills.technical", CONFIDENCE_STRUCTURED);
						}
					},
					_ => {},
				}
			}
		}
	}

	if let Some(summary) = resume.pointer("/personal_info/summary").and_then(|v| v.as_str()) {
		for skill in skills_in_text(summary) {
			add(&skill, "personal_info.summary", CONFIDENCE_NARRATIVE);
		}
	}

	observations
		.into_iter()
		.map(|(skill_canonical, obs)| LedgerDraft {
			skill_canonical,
			confidence: obs.max_confidence,
			evidence_count: obs.count,
			evidence_sources: obs.sources.into_iter().collect(),
		})
		.collect()
}

fn iter_array(value: Option<&Value>) -> impl Iterator<Item = &Value> {
	value.and_then(|v| v.as_array()).map(|v| v.as_slice()).unwrap_or_default().iter()
}
