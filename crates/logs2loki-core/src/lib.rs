// logs2loki-core - Platform-agnostic translation logic
//
// This crate contains the PURE logic for turning an inbound log submission
// into a Loki push request. No I/O, no async, no runtime dependencies.
//
// - Essence: request body + query labels -> validated Loki push payload
// - Accident: HTTP serving, outbound client, env access (platform-specific)

pub mod clock;
pub mod error;
pub mod labels;
pub mod model;
pub mod parse;
pub mod push;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ValidationError;
pub use labels::{is_valid_label_name, resolve_client_ip, LabelSet};
pub use model::{LogEntry, PushPayload, Stream};
pub use parse::IngestMode;
pub use push::{LokiTarget, PushRequest, PUSH_PATH};

/// Value of the `proxy` label stamped on every stream.
pub const PROXY_LABEL_VALUE: &str = "logs2loki";

/// Label name carrying the fixed proxy identifier.
pub const PROXY_LABEL: &str = "proxy";

/// Label name carrying the resolved client address.
pub const IP_LABEL: &str = "ip";

/// A single inbound submission, already stripped of its HTTP framing.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub body: &'a [u8],
    pub query: &'a [(String, String)],
    pub client_ip: &'a str,
}

/// Translate a submission into a push payload according to `mode`.
///
/// Validation runs to completion before anything is returned, so a rejected
/// submission never yields a partial payload. Query parameters only become
/// labels in [`IngestMode::LabeledStructured`]; the other modes carry just the
/// injected `proxy` and `ip` labels.
pub fn translate(
    mode: IngestMode,
    submission: &Submission<'_>,
    clock: &dyn Clock,
) -> Result<PushPayload, ValidationError> {
    let (entries, mut labels) = match mode {
        IngestMode::Structured => (
            parse::parse_structured(submission.body, clock)?,
            LabelSet::new(),
        ),
        IngestMode::Passthrough => (
            vec![parse::parse_passthrough(submission.body, clock)?],
            LabelSet::new(),
        ),
        IngestMode::LabeledStructured => {
            let entries = parse::parse_structured(submission.body, clock)?;
            (entries, LabelSet::from_query(submission.query)?)
        }
    };

    labels.inject_system_labels(submission.client_ip);
    Ok(PushPayload::single(labels, entries))
}
