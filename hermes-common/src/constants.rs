/// The version of the client, reported along with page views.
pub const CLIENT_VERSION: &str = "0.3.2";

/// The collector used when no server is configured.
pub const DEFAULT_SERVER: &str = "https://apollo-kl.netease.com";

/// Path of the error report endpoint, relative to the collector.
pub const ERROR_REPORT_PATH: &str = "/api/stat/error/report";

/// Path of the page view endpoint, relative to the collector.
pub const PAGE_VIEW_PATH: &str = "/hermuz";

/// Header carrying the obfuscated user identifier.
pub const USER_HEADER: &str = "X-Requested-User";

/// Content type of event payloads.
pub const PAYLOAD_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Default and hard upper limit for the number of buffered breadcrumbs.
pub const MAX_BREADCRUMBS: usize = 100;

/// Default number of stack frames retained per trace.
pub const DEFAULT_STACK_TRACE_LIMIT: usize = 50;

/// Default maximum length of URL-shaped values.
pub const DEFAULT_MAX_URL_LENGTH: usize = 250;

/// Backoff applied after the first throttling response without a `Retry-After` header.
pub const INITIAL_BACKOFF_MS: u64 = 1000;
