//! Bootstrap env loading.
//!
//! The private key and network overrides arrive through the environment;
//! besides the process environment and `./.env`, a per-user file at
//! `~/.injagent/.env` holds long-lived settings so the key never has to live
//! in a project directory.

use std::path::PathBuf;

/// Path to the per-user env file: `~/.injagent/.env`.
pub fn injagent_env_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".injagent")
        .join(".env")
}

/// Load env vars from `~/.injagent/.env` in addition to the standard `.env`.
///
/// Call this **after** `dotenvy::dotenv()`. dotenvy never overwrites
/// existing env vars, so the effective priority is:
///
///   explicit env vars > `./.env` > `~/.injagent/.env`
pub fn load_injagent_env() {
    let path = injagent_env_path();
    if path.exists() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn env_path_is_under_home() {
        let path = injagent_env_path();
        assert!(path.ends_with(".injagent/.env"));
    }

    #[test]
    fn per_user_env_file_parses_quoted_values() {
        let dir = tempdir().unwrap();
        let env_path = dir.path().join(".env");

        std::fs::write(
            &env_path,
            "INJECTIVE_PRIVATE_KEY=\"00000000000000000000000000000000000000000000000000000000000000aa\"\nINJAGENT_NETWORK=testnet\n",
        )
        .unwrap();

        // from_path_iter parses without mutating the process environment.
        let parsed: Vec<(String, String)> = dotenvy::from_path_iter(&env_path)
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].0, "INJECTIVE_PRIVATE_KEY");
        assert!(parsed[0].1.ends_with("aa"));
        assert_eq!(parsed[1], ("INJAGENT_NETWORK".to_string(), "testnet".to_string()));
    }
}
