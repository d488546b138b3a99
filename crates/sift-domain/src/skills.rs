//! Canonical skill vocabulary.
//!
//! The alias table is the single source of truth shared by the ingestion
//! and query paths; gating breaks the moment two copies drift apart.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Raw alias -> canonical form. Keys and values are already lowercase;
/// values never appear as keys, which keeps `normalize` idempotent.
const SKILL_ALIASES: &[(&str, &str)] = &[
	// Languages.
	("c sharp", "csharp"),
	("c#", "csharp"),
	("c++", "cpp"),
	("cplusplus", "cpp"),
	("ecmascript", "javascript"),
	("golang", "go"),
	("js", "javascript"),
	("objective c", "objective-c"),
	("objc", "objective-c"),
	("pl/sql", "plsql"),
	("py", "python"),
	("python3", "python"),
	("rustlang", "rust"),
	("shell scripting", "shell"),
	("bash scripting", "bash"),
	("ts", "typescript"),
	("visual basic", "vb.net"),
	// Frontend frameworks.
	("angular.js", "angular"),
	("angularjs", "angular"),
	("next.js", "nextjs"),
	("next js", "nextjs"),
	("nuxt.js", "nuxtjs"),
	("react.js", "react"),
	("react js", "react"),
	("reactjs", "react"),
	("react native", "react-native"),
	("svelte.js", "svelte"),
	("tailwind", "tailwindcss"),
	("tailwind css", "tailwindcss"),
	("vue.js", "vue"),
	("vue js", "vue"),
	("vuejs", "vue"),
	// Backend frameworks and runtimes.
	("asp.net", "aspnet"),
	("asp net", "aspnet"),
	("express.js", "express"),
	("expressjs", "express"),
	("fast api", "fastapi"),
	("nest.js", "nestjs"),
	("node", "nodejs"),
	("node.js", "nodejs"),
	("node js", "nodejs"),
	("rails", "ruby on rails"),
	("ror", "ruby on rails"),
	("spring boot", "spring"),
	("springboot", "spring"),
	// ML and data terms.
	("ai", "artificial intelligence"),
	("cv", "computer vision"),
	("dl", "deep learning"),
	("gen ai", "generative ai"),
	("genai", "generative ai"),
	("huggingface", "hugging face"),
	("llm", "large language models"),
	("llms", "large language models"),
	("ml", "machine learning"),
	("nlp", "natural language processing"),
	("pytorch lightning", "pytorch"),
	("rl", "reinforcement learning"),
	("scikit learn", "scikit-learn"),
	("sklearn", "scikit-learn"),
	("tf", "tensorflow"),
	("xg boost", "xgboost"),
	// Data engineering.
	("airflow", "apache airflow"),
	("apache spark", "spark"),
	("beam", "apache beam"),
	("databricks platform", "databricks"),
	("dbt core", "dbt"),
	("flink", "apache flink"),
	("hadoop ecosystem", "hadoop"),
	("kafka streams", "kafka"),
	("pyspark", "spark"),
	// Clouds and infrastructure.
	("amazon web services", "aws"),
	("azure devops", "azure"),
	("ec2", "aws"),
	("gcp", "google cloud platform"),
	("google cloud", "google cloud platform"),
	("ibm cloud platform", "ibm cloud"),
	("k8s", "kubernetes"),
	("kube", "kubernetes"),
	("microsoft azure", "azure"),
	("s3", "aws"),
	// Databases.
	("dynamo", "dynamodb"),
	("elastic search", "elasticsearch"),
	("elastic", "elasticsearch"),
	("mongo", "mongodb"),
	("mongo db", "mongodb"),
	("ms sql", "sql server"),
	("mssql", "sql server"),
	("pg", "postgresql"),
	("postgres", "postgresql"),
	("redis cache", "redis"),
	("sqlite3", "sqlite"),
	// Tooling and practice.
	("ci cd", "ci/cd"),
	("cicd", "ci/cd"),
	("continuous integration", "ci/cd"),
	("gh actions", "github actions"),
	("git version control", "git"),
	("gitlab ci", "gitlab"),
	("grpc framework", "grpc"),
	("iac", "infrastructure as code"),
	("microservice", "microservices"),
	("oop", "object-oriented programming"),
	("rest", "rest api"),
	("rest apis", "rest api"),
	("restful", "rest api"),
	("restful api", "rest api"),
	("restful apis", "rest api"),
	("tdd", "test-driven development"),
	("terraform cloud", "terraform"),
	("unit tests", "unit testing"),
	// Web basics.
	("css3", "css"),
	("html5", "html"),
	("sass/scss", "sass"),
	("scss", "sass"),
];

static ALIAS_MAP: Lazy<HashMap<&'static str, &'static str>> =
	Lazy::new(|| SKILL_ALIASES.iter().copied().collect());

/// Skills worth scanning for in narrative text. Matched on word boundaries,
/// case-insensitively; hits are normalized through the alias table.
const NARRATIVE_SCAN_SKILLS: &[&str] = &[
	"python",
	"java",
	"javascript",
	"typescript",
	"c++",
	"c#",
	"go",
	"rust",
	"ruby",
	"php",
	"scala",
	"kotlin",
	"swift",
	"matlab",
	"react",
	"angular",
	"vue",
	"node.js",
	"express",
	"django",
	"flask",
	"fastapi",
	"spring",
	"rails",
	"tensorflow",
	"pytorch",
	"keras",
	"scikit-learn",
	"xgboost",
	"sql",
	"nosql",
	"mongodb",
	"postgresql",
	"mysql",
	"redis",
	"elasticsearch",
	"aws",
	"azure",
	"gcp",
	"docker",
	"kubernetes",
	"machine learning",
	"deep learning",
	"nlp",
	"computer vision",
	"rest api",
	"graphql",
	"microservices",
	"git",
	"jenkins",
	"ci/cd",
	"terraform",
	"ansible",
	"agile",
	"scrum",
	"devops",
	"pandas",
	"numpy",
	"spark",
	"kafka",
	"hadoop",
	"selenium",
	"cypress",
	"jest",
	"pytest",
	"html",
	"css",
];

static NARRATIVE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
	NARRATIVE_SCAN_SKILLS
		.iter()
		.filter_map(|skill| {
			Regex::new(&narrative_pattern(skill)).ok().map(|pattern| (pattern, *skill))
		})
		.collect()
});

fn narrative_pattern(skill: &str) -> String {
	let escaped = regex::escape(skill);
	// A trailing word boundary cannot follow a symbol character ("c++",
	// "c#"), so anchor only the start for those.
	if skill.ends_with(|c: char| !c.is_ascii_alphanumeric()) {
		format!(r"(?i)\b{escaped}")
	} else {
		format!(r"(?i)\b{escaped}\b")
	}
}

/// Normalize a raw skill string to its canonical form: trim, lowercase,
/// strip trailing punctuation, then resolve through the alias table.
pub fn normalize(raw: &str) -> String {
	let cleaned = raw.trim().to_lowercase();
	let cleaned = cleaned.trim_end_matches(['.', ',', ';', ':']);
	match ALIAS_MAP.get(cleaned) {
		Some(canonical) => (*canonical).to_string(),
		None => cleaned.to_string(),
	}
}

/// Normalize every element, dropping empties and duplicates while
/// preserving first-seen order.
pub fn normalize_list(raw: &[String]) -> Vec<String> {
	let mut seen = std::collections::HashSet::new();
	let mut out = Vec::with_capacity(raw.len());
	for value in raw {
		let canonical = normalize(value);
		if canonical.is_empty() {
			continue;
		}
		if seen.insert(canonical.clone()) {
			out.push(canonical);
		}
	}
	out
}

/// Canonical skills mentioned in a free-text chunk, sorted for determinism.
pub fn skills_in_text(text: &str) -> Vec<String> {
	let mut found: Vec<String> = NARRATIVE_PATTERNS
		.iter()
		.filter(|(pattern, _)| pattern.is_match(text))
		.map(|(_, skill)| normalize(skill))
		.collect();
	found.sort();
	found.dedup();
	found
}
