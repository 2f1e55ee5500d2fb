//! Environment variable vocabulary.
//!
//! Every variable the resolver may consult, with its type, whether it is
//! required and its default.

/// Env var: deployment environment name (string, required outside the build
/// context; see [`EnvReader::environment_name`](crate::EnvReader::environment_name)).
pub const ENVIRONMENT: &str = "ENVIRONMENT";
/// Env var: home directory, used only by the developer-machine heuristic.
pub const HOME: &str = "HOME";
/// Env var: login name, used only by the developer-machine heuristic.
pub const USER: &str = "USER";

/// Env var: secret key for signing (string, required; build default `xxx`).
pub const SECRET_KEY: &str = "SECRET_KEY";
/// Env var: debug toggle (boolean, default `false`).
pub const DEBUG: &str = "DEBUG";
/// Env var: default time zone (string, default from resolver options).
pub const TIME_ZONE: &str = "TIME_ZONE";
/// Env var: public base URL of the site (URL, optional; required with the CMS layer).
pub const BASE_URL: &str = "BASE_URL";

/// Env var: database connection URL (URL, required; build default dummy URL).
pub const DATABASE_URL: &str = "DATABASE_URL";
/// Env var: keep database connections open between requests (boolean, default `false`).
pub const POOL_DB_CONNECTIONS: &str = "POOL_DB_CONNECTIONS";

/// Env var: shared cache/broker resource URL (URL, default `redis://localhost`).
pub const REDIS_URL: &str = "REDIS_URL";
/// Env var: dedicated task-queue broker URL (URL, default the shared resource).
pub const QUEUE_BROKER_URL: &str = "QUEUE_BROKER_URL";
/// Env var: task-queue result store URL (URL, default the database).
pub const QUEUE_RESULT_URL: &str = "QUEUE_RESULT_URL";
/// Env var: hard time limit for a queued task in seconds (integer, default from options).
pub const QUEUE_TASK_TIME_LIMIT: &str = "QUEUE_TASK_TIME_LIMIT";
/// Env var: dedicated pub/sub transport URL (URL, default the shared resource).
pub const PUBSUB_URL: &str = "PUBSUB_URL";

/// Env var: storage provider selector (`s3` or `do`, default `s3`).
pub const STORAGES_MODE: &str = "STORAGES_MODE";
/// Env var: object storage access key (string, required unless on AWS with `s3`).
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Env var: object storage secret key (string, required unless on AWS with `s3`).
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Env var: bucket name (string, required; build default `xxx`).
pub const AWS_STORAGE_BUCKET_NAME: &str = "AWS_STORAGE_BUCKET_NAME";
/// Env var: set by AWS container runtimes that inject credentials (string, optional).
pub const AWS_CONTAINER_CREDENTIALS_RELATIVE_URI: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";
/// Env var: DigitalOcean Spaces region (string, required in `do` mode).
pub const DO_REGION: &str = "DO_REGION";
/// Env var: serve uploaded files publicly (boolean, default `false`).
pub const STORAGE_MAKE_FILES_PUBLIC: &str = "STORAGE_MAKE_FILES_PUBLIC";
/// Env var: CDN domain for public files (string, required when files are public).
pub const AWS_S3_CUSTOM_DOMAIN: &str = "AWS_S3_CUSTOM_DOMAIN";

/// Env var: email transport selector (`console`, `mailjet`, `mandrill`, `memory`; default `console`).
pub const EMAIL_MODE: &str = "EMAIL_MODE";
/// Env var: Mailjet public API key (string, required in mailjet email mode).
pub const MAILJET_API_KEY_PUBLIC: &str = "MAILJET_API_KEY_PUBLIC";
/// Env var: Mailjet private API key (string, required in mailjet email mode).
pub const MAILJET_API_KEY_PRIVATE: &str = "MAILJET_API_KEY_PRIVATE";
/// Env var: Mandrill API key (string, required in mandrill email mode).
pub const MANDRILL_API_KEY: &str = "MANDRILL_API_KEY";
/// Env var: SMS transport selector (`console`, `mailjet`, `memory`; default `console`).
pub const SMS_MODE: &str = "SMS_MODE";
/// Env var: Mailjet SMS API token (string, required in mailjet SMS mode).
pub const MAILJET_API_TOKEN: &str = "MAILJET_API_TOKEN";

/// Env var: error reporting DSN (string, optional; enables error reporting).
pub const SENTRY_DSN: &str = "SENTRY_DSN";
