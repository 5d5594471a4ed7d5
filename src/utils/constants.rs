//! Shared constants and invariants

// opt-in; 0 keeps the strict `now < expires_at` rule
pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 0;
pub const DEFAULT_CONNECTION_REQUEST_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10000;
pub const DEFAULT_MAX_CONNECTIONS: usize = 4;

// Environment
pub const MS_LOGIN_URL_ENV: &str = "MS_LOGIN_URL";
pub const MS_CLIENT_ID_ENV: &str = "MS_CLIENT_ID";
pub const MS_CLIENT_SECRET_ENV: &str = "MS_CLIENT_SECRET";
pub const MS_TENANT_ID_ENV: &str = "MS_TENANT_ID";

// Client-credentials grant
pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";
