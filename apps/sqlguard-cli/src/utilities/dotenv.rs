//! # .env File Loading
//!
//! Files are read from the working directory in this order of precedence:
//! 1. `.env.local` - Local overrides (gitignored)
//! 2. `.env` - Shared defaults
//!
//! Existing process environment variables are never overwritten, so a
//! `SQLGUARD_*` variable exported in the shell always wins.
//!
//! ```text
//! # .env
//! SQLGUARD_DATABASE__HOST=db.internal
//! SQLGUARD_LIMITS__MAX_QUERY_ROWS=500
//!
//! # .env.local
//! SQLGUARD_DATABASE__PASSWORD=my-secret
//! ```

use std::path::Path;
use tracing::debug;

const ENV_FILES: [&str; 2] = [".env.local", ".env"];

/// Loads `.env` files found in `directory`. Returns the files that were loaded.
pub fn load_dotenv_files(directory: &Path) -> Vec<String> {
    let mut loaded = Vec::new();

    // dotenvy never overwrites, so the highest priority file goes first
    for env_file in ENV_FILES {
        let env_path = directory.join(env_file);
        if !env_path.exists() {
            debug!("Skipping {} (file not found)", env_file);
            continue;
        }

        match dotenvy::from_path(&env_path) {
            Ok(_) => {
                debug!("Loaded environment from {}", env_file);
                loaded.push(env_file.to_string());
            }
            Err(e) => debug!("Failed to load {}: {}", env_file, e),
        }
    }

    loaded
}
