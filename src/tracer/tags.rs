//! Standard tag and log field names.

pub const SPAN_KIND: &str = "span.kind";
pub const SPAN_KIND_SERVER: &str = "server";
pub const SPAN_KIND_CLIENT: &str = "client";

pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_URL: &str = "http.url";
pub const HTTP_STATUS_CODE: &str = "http.status_code";

pub const ERROR: &str = "error";

/// Log field naming the kind of event.
pub const EVENT: &str = "event";
/// Log field holding the failure itself.
pub const ERROR_OBJECT: &str = "error.object";

pub const SAMPLER_TYPE: &str = "sampler.type";
pub const SAMPLER_PARAM: &str = "sampler.param";
