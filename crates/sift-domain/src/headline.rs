/// Display headline from a resume's experience sequence, newest entry
/// first: `"<latest title> at <latest company>"`, degrading to whichever
/// half is present.
pub fn headline_from_experience(experience: &serde_json::Value) -> Option<String> {
	let latest = experience.as_array()?.first()?;
	let title = latest.get("title").and_then(|v| v.as_str()).unwrap_or("").trim();
	let company = latest.get("company").and_then(|v| v.as_str()).unwrap_or("").trim();

	match (title.is_empty(), company.is_empty()) {
		(false, false) => Some(format!("{title} at {company}")),
		(false, true) => Some(title.to_string()),
		(true, false) => Some(company.to_string()),
		(true, true) => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn formats_title_and_company() {
		let experience = serde_json::json!([
			{ "title": "Staff Engineer", "company": "Acme" },
			{ "title": "Engineer", "company": "Initech" }
		]);
		assert_eq!(headline_from_experience(&experience).as_deref(), Some("Staff Engineer at Acme"));
	}

	#[test]
	fn degrades_to_available_half() {
		let experience = serde_json::json!([{ "title": "Data Scientist" }]);
		assert_eq!(headline_from_experience(&experience).as_deref(), Some("Data Scientist"));

		let experience = serde_json::json!([{ "company": "Acme" }]);
		assert_eq!(headline_from_experience(&experience).as_deref(), Some("Acme"));
	}

	#[test]
	fn empty_experience_has_no_headline() {
		assert_eq!(headline_from_experience(&serde_json::json!([])), None);
		assert_eq!(headline_from_experience(&serde_json::Value::Null), None);
	}
}
