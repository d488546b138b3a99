//! Decomposition of structured resume documents into search artifacts:
//! per-section text chunks and canonical skill-ledger entries.
//!
//! The retrieval core only reads what this module emits, so the shapes
//! here are the ingestion-side contract: chunk ids are deterministic per
//! `(resume, section, ordinal)` and ledger entries are keyed by canonical
//! skill with the highest-confidence observation winning.

mod chunker;
mod skill_extractor;

pub use chunker::{ChunkDraft, chunk_resume};
pub use skill_extractor::{
	CONFIDENCE_NARRATIVE, CONFIDENCE_PROJECT, CONFIDENCE_STRUCTURED, LedgerDraft, extract_skills,
};

use serde_json::Value;
use time::Date;

pub const SECTION_SUMMARY: &str = "summary";
pub const SECTION_EXPERIENCE: &str = "experience";
pub const SECTION_PROJECT: &str = "project";
pub const SECTION_EDUCATION: &str = "education";
pub const SECTION_SKILLS: &str = "skills";

/// Total years of experience from experience date spans, floored to whole
/// years. Entries with an open end date run until `today`; overlapping
/// spans are summed, not merged, matching how resumes self-report.
pub fn total_yoe(experience: &Value, today: Date) -> u32 {
	let Some(entries) = experience.as_array() else {
		return 0;
	};

	let mut months = 0i64;
	for entry in entries {
		let dates = entry.get("dates").cloned().unwrap_or(Value::Null);
		let Some(start) = dates.get("start").and_then(|v| v.as_str()).and_then(parse_year_month)
		else {
			continue;
		};
		let end = dates
			.get("end")
			.and_then(|v| v.as_str())
			.and_then(parse_year_month)
			.unwrap_or((today.year(), u8::from(today.month())));
		let span = (i64::from(end.0) * 12 + i64::from(end.1))
			- (i64::from(start.0) * 12 + i64::from(start.1));
		months += span.max(0);
	}

	(months / 12).max(0) as u32
}

/// Accepts "YYYY-MM", "YYYY-MM-DD", and bare "YYYY" (mapped to January).
fn parse_year_month(raw: &str) -> Option<(i32, u8)> {
	let mut parts = raw.trim().splitn(3, '-');
	let year: i32 = parts.next()?.parse().ok()?;
	let month: u8 = match parts.next() {
		Some(month) => month.parse().ok().filter(|m| (1..=12).contains(m))?,
		None => 1,
	};
	Some((year, month))
}

#[cfg(test)]
mod tests {
	use super::*;
	use time::macros::date;

	#[test]
	fn total_yoe_sums_closed_spans() {
		let experience = serde_json::json!([
			{ "dates": { "start": "2015-01", "end": "2018-01" } },
			{ "dates": { "start": "2018-01", "end": "2020-07" } }
		]);
		assert_eq!(total_yoe(&experience, date!(2024 - 01 - 01)), 5);
	}

	#[test]
	fn total_yoe_extends_open_spans_to_today() {
		let experience = serde_json::json!([
			{ "dates": { "start": "2020-01", "end": null } }
		]);
		assert_eq!(total_yoe(&experience, date!(2024 - 01 - 15)), 4);
	}

	#[test]
	fn total_yoe_ignores_malformed_dates() {
		let experience = serde_json::json!([
			{ "dates": { "start": "unknown", "end": "2020-01" } },
			{ "dates": { "start": "2019-13", "end": "2020-01" } },
			{}
		]);
		assert_eq!(total_yoe(&experience, date!(2024 - 01 - 01)), 0);
	}

	#[test]
	fn parse_year_month_accepts_bare_years() {
		assert_eq!(parse_year_month("2019"), Some((2019, 1)));
		assert_eq!(parse_year_month("2019-06-30"), Some((2019, 6)));
	}
}
