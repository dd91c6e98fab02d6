//! Data model shared by the record stores and the analytics pipeline

pub mod agent;
pub mod call;
pub mod window;

pub use agent::{recompute_agent_counters, Agent, AgentStatus, MatrixLevel, SecurityClearance, VoiceConfig};
pub use call::{CallRecord, CallStatus};
pub use window::AnalysisWindow;
