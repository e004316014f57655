//! System-wide constants and default paths.

/// Compose file names probed in a project directory, in priority order.
pub const COMPOSE_FILE_CANDIDATES: [&str; 4] = [
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

/// Environment file read next to the compose file.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Tag implied when an image reference carries neither tag nor digest.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Environment key holding the MongoDB root user name.
pub const MONGO_ROOT_USERNAME_KEY: &str = "MONGO_INITDB_ROOT_USERNAME";

/// Environment key holding the MongoDB root password.
pub const MONGO_ROOT_PASSWORD_KEY: &str = "MONGO_INITDB_ROOT_PASSWORD";

/// Database the MongoDB root user authenticates against.
pub const MONGO_AUTH_DATABASE: &str = "admin";

/// Host directory dumps are written to by default.
pub const DEFAULT_DUMP_DIR: &str = "./mongodb/dump";

/// Program used to drive the container runtime.
pub const CONTAINER_CLI: &str = "docker";
