//! Typed event stream for the agentic pipeline. Events are emitted in a
//! strict total order; a consumer that replays them can reconstruct all
//! progress state. `error` is terminal and is always followed by `done`.

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::shortlist::{MissionSpec, ShortlistData};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	JdUnderstanding,
	Retrieval,
	Fusion,
	EvidenceBuilding,
	Ranking,
	Assembly,
}

impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::JdUnderstanding => "jd_understanding",
			Self::Retrieval => "retrieval",
			Self::Fusion => "fusion",
			Self::EvidenceBuilding => "evidence_building",
			Self::Ranking => "ranking",
			Self::Assembly => "assembly",
		}
	}
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
	AgentStart {
		timestamp: String,
		agent: &'static str,
	},
	AgentThought {
		timestamp: String,
		agent: &'static str,
		message: String,
	},
	ToolCall {
		timestamp: String,
		tool: &'static str,
		args: serde_json::Value,
	},
	ToolResult {
		timestamp: String,
		tool: &'static str,
		timing_ms: u64,
		summary: String,
	},
	StageComplete {
		timestamp: String,
		stage: Stage,
		timing_ms: u64,
	},
	MissionSpec {
		timestamp: String,
		data: MissionSpec,
	},
	Result {
		timestamp: String,
		data: Box<ShortlistData>,
	},
	Error {
		timestamp: String,
		message: String,
	},
	Done {
		timestamp: String,
	},
}

impl PipelineEvent {
	pub fn name(&self) -> &'static str {
		match self {
			Self::AgentStart { .. } => "agent_start",
			Self::AgentThought { .. } => "agent_thought",
			Self::ToolCall { .. } => "tool_call",
			Self::ToolResult { .. } => "tool_result",
			Self::StageComplete { .. } => "stage_complete",
			Self::MissionSpec { .. } => "mission_spec",
			Self::Result { .. } => "result",
			Self::Error { .. } => "error",
			Self::Done { .. } => "done",
		}
	}
}

pub fn timestamp() -> String {
	OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// Bounded channel to the SSE writer plus the abort token. Once the
/// consumer goes away or the token fires, nothing is emitted again and
/// the token stops in-flight stage work.
#[derive(Clone)]
pub(crate) struct EventSink {
	tx: mpsc::Sender<PipelineEvent>,
	cancel: CancellationToken,
}

impl EventSink {
	pub(crate) fn new(tx: mpsc::Sender<PipelineEvent>, cancel: CancellationToken) -> Self {
		Self { tx, cancel }
	}

	pub(crate) fn cancel_token(&self) -> &CancellationToken {
		&self.cancel
	}

	pub(crate) fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Returns `false` when the pipeline should stop: the consumer closed
	/// its end or cancellation fired.
	pub(crate) async fn emit(&self, event: PipelineEvent) -> bool {
		if self.cancel.is_cancelled() {
			return false;
		}
		if self.tx.send(event).await.is_err() {
			self.cancel.cancel();
			return false;
		}
		true
	}
}
