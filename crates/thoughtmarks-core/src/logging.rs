//! Structured logging schema and field name constants for Thoughtmarks.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (per-candidate scores) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across a request's sub-calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "search", "db", "ai"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "similarity", "advisor", "openai", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "find_similar", "embed_text", "suggest", "analyze"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Numeric user id the operation runs on behalf of.
pub const USER_ID: &str = "user_id";

/// Thoughtmark id being operated on.
pub const THOUGHTMARK_ID: &str = "thoughtmark_id";

/// Bin id being operated on.
pub const BIN_ID: &str = "bin_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of candidates considered during a similarity scan.
pub const CANDIDATE_COUNT: &str = "candidate_count";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for an external provider call.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
