use serde_json::Value;

use sift_domain::skills::skills_in_text;

#[derive(Clone, Debug)]
pub struct ChunkDraft {
	pub chunk_id: String,
	pub section_type: &'static str,
	pub section_ordinal: i64,
	pub chunk_text: String,
	pub skills_in_chunk: Vec<String>,
}

/// Decompose one resume into semantically coherent chunks: the summary,
/// one chunk per experience entry, per project, per education entry, and
/// a combined technical-skills overview.
pub fn chunk_resume(resume: &Value, resume_id: &str) -> Vec<ChunkDraft> {
	let mut chunks = Vec::new();

	if let Some(summary) = resume
		.pointer("/personal_info/summary")
		.and_then(|v| v.as_str())
		.filter(|s| !s.trim().is_empty())
	{
		chunks.push(make_chunk(resume_id, super::SECTION_SUMMARY, 0, summary.trim().to_string()));
	}

	for (idx, exp) in iter_array(resume.get("experience")).enumerate() {
		let text = experience_text(exp);
		if !text.is_empty() {
			chunks.push(make_chunk(resume_id, super::SECTION_EXPERIENCE, idx as i64, text));
		}
	}

	for (idx, proj) in iter_array(resume.get("projects")).enumerate() {
		let text = project_text(proj);
		if !text.is_empty() {
			chunks.push(make_chunk(resume_id, super::SECTION_PROJECT, idx as i64, text));
		}
	}

	for (idx, edu) in iter_array(resume.get("education")).enumerate() {
		let text = education_text(edu);
		if !text.is_empty() {
			chunks.push(make_chunk(resume_id, super::SECTION_EDUCATION, idx as i64, text));
		}
	}

	if let Some(text) = skills_overview_text(resume) {
		chunks.push(make_chunk(resume_id, super::SECTION_SKILLS, 0, text));
	}

	chunks
}

fn make_chunk(
	resume_id: &str,
	section_type: &'static str,
	section_ordinal: i64,
	chunk_text: String,
) -> ChunkDraft {
	// Deterministic per (resume, section, ordinal) so re-ingestion
	// replaces chunks instead of accumulating them.
	let chunk_id = format!("{resume_id}:{section_type}:{section_ordinal}");
	let skills_in_chunk = skills_in_text(&chunk_text);

	ChunkDraft { chunk_id, section_type, section_ordinal, chunk_text, skills_in_chunk }
}

fn experience_text(exp: &Value) -> String {
	let mut parts = Vec::new();

	let title = str_field(exp, "title");
	let company = str_field(exp, "company");
	if !title.is_empty() && !company.is_empty() {
		parts.push(format!("{title} at {company}"));
	} else if !title.is_empty() {
		parts.push(title.to_string());
	}

	let level = str_field(exp, "level");
	let employment_type = str_field(exp, "employment_type");
	let badge: Vec<&str> =
		[level, employment_type].into_iter().filter(|v| !v.is_empty()).collect();
	if !badge.is_empty() {
		parts.push(format!("({})", badge.join(", ")));
	}

	let duration = exp.pointer("/dates/duration").and_then(|v| v.as_str()).unwrap_or("").trim();
	if !duration.is_empty() {
		parts.push(format!("Duration: {duration}"));
	}

	let responsibilities: Vec<&str> = iter_array(exp.get("responsibilities"))
		.filter_map(|v| v.as_str())
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.collect();
	if !responsibilities.is_empty() {
		parts.push("Responsibilities:".to_string());
		for resp in responsibilities {
			parts.push(format!("- {resp}"));
		}
	}

	let tech_env = exp.get("technical_environment").cloned().unwrap_or(Value::Null);
	let mut tech_items = Vec::new();
	for key in ["technologies", "tools", "methodologies"] {
		tech_items.extend(
			iter_array(tech_env.get(key))
				.filter_map(|v| v.as_str())
				.map(|s| s.trim().to_string())
				.filter(|s| !s.is_empty()),
		);
	}
	if !tech_items.is_empty() {
		parts.push(format!("Technical Environment: {}", tech_items.join(", ")));
	}

	parts.join("\n")
}

fn project_text(proj: &Value) -> String {
	let mut parts = Vec::new();

	let name = str_field(proj, "name");
	if !name.is_empty() {
		parts.push(format!("Project: {name}"));
	}
	let role = str_field(proj, "role");
	if !role.is_empty() {
		parts.push(format!("Role: {role}"));
	}
	let description = str_field(proj, "description");
	if !description.is_empty() {
		parts.push(description.to_string());
	}
	let impact = str_field(proj, "impact");
	if !impact.is_empty() {
		parts.push(format!("Impact: {impact}"));
	}

	let technologies: Vec<&str> = iter_array(proj.get("technologies"))
		.filter_map(|v| v.as_str())
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.collect();
	if !technologies.is_empty() {
		parts.push(format!("Technologies: {}", technologies.join(", ")));
	}

	parts.join("\n")
}

fn education_text(edu: &Value) -> String {
	let mut parts = Vec::new();

	let degree = edu.get("degree").cloned().unwrap_or(Value::Null);
	let level = str_field(&degree, "level");
	let field = str_field(&degree, "field");
	let major = str_field(&degree, "major");
	if !level.is_empty() && !field.is_empty() {
		parts.push(format!("{level}'s degree in {field}"));
	}
	if !major.is_empty() && major != field {
		parts.push(format!("Major: {major}"));
	}

	let institution = edu.pointer("/institution/name").and_then(|v| v.as_str()).unwrap_or("");
	if !institution.trim().is_empty() {
		parts.push(format!("Institution: {}", institution.trim()));
	}

	let dates = edu.get("dates").cloned().unwrap_or(Value::Null);
	let start = str_field(&dates, "start");
	let end = {
		let graduation = str_field(&dates, "expected_graduation");
		if graduation.is_empty() { str_field(&dates, "end") } else { graduation }
	};
	if !start.is_empty() && !end.is_empty() {
		parts.push(format!("Period: {start} - {end}"));
	}

	let achievements = edu.get("achievements").cloned().unwrap_or(Value::Null);
	let coursework: Vec<&str> = iter_array(achievements.get("relevant_coursework"))
		.filter_map(|v| v.as_str())
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.collect();
	if !coursework.is_empty() {
		parts.push(format!("Coursework: {}", coursework.join(", ")));
	}
	let honors = str_field(&achievements, "honors");
	if !honors.is_empty() {
		parts.push(format!("Honors: {honors}"));
	}
	if let Some(gpa) = achievements.get("gpa").filter(|v| !v.is_null()) {
		parts.push(format!("GPA: {}", render_scalar(gpa)));
	}

	parts.join("\n")
}

fn skills_overview_text(resume: &Value) -> Option<String> {
	let technical = resume.pointer("/skills/technical")?.as_object()?;
	let mut parts = vec!["Technical Skills:".to_string()];

	for (category, items) in technical {
		let mut names = Vec::new();
		for item in iter_array(Some(items)) {
			match item {
				Value::String(name) if !name.trim().is_empty() => {
					names.push(name.trim().to_string());
				},
				Value::Object(_) => {
					let name = str_field(item, "name");
					if name.is_empty() {
						continue;
					}
					let level = str_field(item, "level");
					if level.is_empty() {
						names.push(name.to_string());
					} else {
						names.push(format!("{name} ({level})"));
					}
				},
				_ => {},
			}
		}
		if !names.is_empty() {
			parts.push(format!("{}: {}", category_label(category), names.join(", ")));
		}
	}

	if parts.len() > 1 { Some(parts.join("\n")) } else { None }
}

/// "programming_languages" -> "Programming Languages".
fn category_label(category: &str) -> String {
	category
		.split('_')
		.filter(|word| !word.is_empty())
		.map(|word| {
			let mut chars = word.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
				None => String::new(),
			}
		})
		.collect::<Vec<_>>()
		.join(" ")
}

fn render_scalar(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
	value.get(key).and_then(|v| v.as_str()).unwrap_or("").trim()
}

fn iter_array(value: Option<&Value>) -> impl Iterator<Item = &Value> {
	value.and_then(|v| v.as_array()).map(|v| v.as_slice()).unwrap_or_default().iter()
}
