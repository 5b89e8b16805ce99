// Response normalization: the single choke point between pipeline outcomes
// and the wire.
use serde_json::{json, Value};

use crate::error::ApiFault;
use crate::logging::Logger;

/// The HTTP response surface the pipeline writes to. Implemented by the
/// routing adapter; `BufferedResponse` is the in-memory form used on the
/// request path and in tests. `Send` because chains hold the writer across
/// await points.
pub trait ResponseWriter: Send {
    fn status(&mut self, code: u16);
    fn json(&mut self, body: Value);
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferedResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self { status: 200, body: None }
    }
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter for BufferedResponse {
    fn status(&mut self, code: u16) {
        self.status = code;
    }

    fn json(&mut self, body: Value) {
        self.body = Some(body);
    }
}

/// Write a success payload. A status override is honored only inside
/// (200, 208]; anything else falls back to 200.
pub fn success(res: &mut dyn ResponseWriter, status: Option<u16>, data: Value) {
    let status = match status {
        Some(code) if code > 200 && code <= 208 => code,
        _ => 200,
    };
    res.status(status);
    res.json(data);
}

/// Write an error response. Validation faults and storage conflicts are
/// recoverable and log at `error`; everything else logs at `fatal` with the
/// raw fault. A missing logger is always tolerated.
pub fn error(res: &mut dyn ResponseWriter, logger: Option<&dyn Logger>, fault: &ApiFault) {
    if fault.is_validation() {
        let status = fault.status();
        let code = fault.code();
        let message = fault.message();
        if let Some(logger) = logger {
            logger.error(
                "request validation failed",
                json!({ "status": status, "code": code, "message": message }),
            );
        }
        res.status(status);
        res.json(json!({ "code": code, "message": message }));
    } else if fault.is_storage_conflict() {
        if let Some(logger) = logger {
            logger.error("storage conflict", fault.to_value());
        }
        res.status(409);
        res.json(json!({ "code": fault.message() }));
    } else {
        if let Some(logger) = logger {
            logger.fatal("unhandled pipeline error", fault.to_value());
        }
        res.status(fault.status());
        res.json(json!({ "code": fault.code(), "message": fault.message() }));
    }
}
