use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    /// Root of the blob store the spawned server writes into
    #[allow(dead_code)]
    pub storage_dir: PathBuf,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Blobs from test uploads land in a throwaway directory
        let storage_dir = std::env::temp_dir().join(format!("hrm-api-test-{}", port));

        // Spawn the already-built binary to keep start fast during tests
        // Assumes debug profile; adjust if you run tests with --release
        let mut cmd = Command::new("target/debug/hrm-api-rust");
        cmd.env("HRM_API_PORT", port.to_string())
            .env("STORAGE_ROOT_DIR", &storage_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server can see DATABASE_URL from .env
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, storage_dir, child })
    }

    /// Whether the spawned server has a live database behind it. Tests that
    /// need real rows call this and skip when it is false, so the suite still
    /// passes in environments without DATABASE_URL.
    #[allow(dead_code)]
    pub async fn database_ready(&self) -> bool {
        reqwest::Client::new()
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map(|r| r.status() == StatusCode::OK)
            .unwrap_or(false)
    }

    /// Count regular files under the blob store, recursively
    #[allow(dead_code)]
    pub fn blob_count(&self) -> usize {
        fn walk(dir: &std::path::Path, acc: &mut usize) {
            let Ok(entries) = std::fs::read_dir(dir) else { return };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, acc);
                } else {
                    *acc += 1;
                }
            }
        }
        let mut count = 0;
        walk(&self.storage_dir, &mut count);
        count
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                // The server is up even when the database is not; 503 from
                // /health still means the process is serving requests
                if resp.status() == StatusCode::OK
                    || resp.status() == StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Unique suffix for usernames and id numbers so reruns against the same
/// database never collide
#[allow(dead_code)]
pub fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

/// Token for a main-manager session, signed with the same dev secret the
/// spawned server falls back to
#[allow(dead_code)]
pub fn main_manager_token() -> String {
    let claims = hrm_api_rust::auth::Claims::new(1, "admin".into(), "main_manager".into(), None);
    hrm_api_rust::auth::generate_jwt(&claims).expect("token generation")
}

/// Token for a branch-manager session scoped to the given branch
#[allow(dead_code)]
pub fn branch_manager_token(branch_id: i32) -> String {
    let claims = hrm_api_rust::auth::Claims::new(
        100 + branch_id,
        format!("branch-{}", branch_id),
        "branch_manager".into(),
        Some(branch_id),
    );
    hrm_api_rust::auth::generate_jwt(&claims).expect("token generation")
}
