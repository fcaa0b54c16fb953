//! Relay constants
//!
//! Centralized location for wire-level values and configuration defaults.

// Transport envelope
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const CONNECTOR_NS: &str = "http://www.boomi.com/connector/wss";
pub const OPERATION_NAME: &str = "GetPurchaseOrder";

// Wire call headers
pub const TOKEN_HEADER: &str = "x-frontline-jwt";
pub const SOAP_ACTION_HEADER: &str = "SOAPAction";
pub const XML_CONTENT_TYPE: &str = "text/xml";

// Token issuance defaults
pub const DEFAULT_TOKEN_EXPIRY_MINUTES: u32 = 5;

// Submission defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_SECS: u64 = 5;

// Archiving
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const CLAIM_EXTENSION: &str = "processing";
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const ERROR_DETAIL_SUFFIX: &str = ".error.txt";
