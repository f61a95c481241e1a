// src/session/repo.rs

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::{AstroError, Result};
use crate::exec::hooks;
use crate::session::signal;

/// Name of the session repository directory under the project root.
pub const SESSION_REPO_DIR: &str = ".astro";

/// Name of the shared provisioner plugin cache inside the repository.
/// Deliberately lowercase so it can never be mistaken for a session id.
const PLUGIN_CACHE_DIR: &str = "plugin-cache";

/// Crockford base32, the alphabet of session identifiers.
const ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Generate a 26-character, upper-case alphanumeric session identifier.
///
/// The leading 10 characters encode the current time in milliseconds, so ids
/// sort chronologically; the rest is random.
pub fn generate_session_id() -> String {
    let mut out = [0u8; 26];

    let mut millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    for slot in out[..10].iter_mut().rev() {
        *slot = ID_ALPHABET[(millis % 32) as usize];
        millis /= 32;
    }

    let mut rng = rand::thread_rng();
    for slot in out[10..].iter_mut() {
        *slot = ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())];
    }

    String::from_utf8(out.to_vec()).expect("session id is ascii")
}

/// A parent directory containing individual project sessions.
pub struct SessionRepo {
    path: PathBuf,
    generate_id: Box<dyn Fn() -> String + Send + Sync>,
}

impl SessionRepo {
    /// Create or open a session repository at the given path.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_id_generator(path, generate_session_id)
    }

    /// Like [`SessionRepo::open`] with a custom id generator.
    pub fn with_id_generator(
        path: impl Into<PathBuf>,
        generate_id: impl Fn() -> String + Send + Sync + 'static,
    ) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            fs::create_dir(&path).map_err(AstroError::io(format!(
                "creating session repository {}",
                path.display()
            )))?;
        }

        Ok(Self {
            path,
            generate_id: Box::new(generate_id),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a new session directory and subscribe it to OS signals.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new_session(&self) -> Result<Session> {
        let id = (self.generate_id)();
        let path = self.path.join(&id);
        fs::create_dir(&path).map_err(AstroError::io(format!(
            "creating session directory {}",
            path.display()
        )))?;

        let plugin_cache = self.path.join(PLUGIN_CACHE_DIR);
        fs::create_dir_all(&plugin_cache).map_err(AstroError::io(format!(
            "creating plugin cache {}",
            plugin_cache.display()
        )))?;

        let token = CancellationToken::new();
        signal::subscribe(token.clone());

        info!(session = %id, path = %path.display(), "session created");

        Ok(Session {
            id,
            path,
            plugin_cache,
            token,
            hook_env: Mutex::new(HashMap::new()),
        })
    }
}

/// One orchestration run: a directory holding per-execution working trees,
/// state files and the shared cancellation token.
pub struct Session {
    id: String,
    path: PathBuf,
    plugin_cache: PathBuf,
    token: CancellationToken,
    hook_env: Mutex<HashMap<String, String>>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn plugin_cache(&self) -> &Path {
        &self.plugin_cache
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel all of this session's operations, as an OS signal would.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Run project-level startup hooks in the session directory, folding the
    /// environment they export into the session's hook environment.
    pub async fn run_startup_hooks(&self, commands: &[String]) -> Result<()> {
        for command in commands {
            debug!(session = %self.id, hook = %command, "running startup hook");
            let env = self.hook_env_snapshot().await;
            match hooks::run_hook(&self.path, command, &env).await {
                Ok(exported) => self.merge_hook_env(exported).await,
                Err(AstroError::Hook(msg)) => return Err(AstroError::StartupHook(msg)),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    pub(crate) async fn hook_env_snapshot(&self) -> HashMap<String, String> {
        self.hook_env.lock().await.clone()
    }

    pub(crate) async fn merge_hook_env(&self, vars: HashMap<String, String>) {
        self.hook_env.lock().await.extend(vars);
    }
}
