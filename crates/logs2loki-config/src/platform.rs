// Platform detection based on environment variables
//
// Auto-detects runtime environment:
// - Cloudflare Workers: CF_WORKER env var present
// - Server: default

use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Server,
    CloudflareWorkers,
}

impl Platform {
    /// Auto-detect the current platform based on environment variables
    pub fn detect() -> Self {
        if env::var("CF_WORKER").is_ok() {
            Platform::CloudflareWorkers
        } else {
            Platform::Server
        }
    }

    /// Get platform-specific defaults
    pub fn defaults(&self) -> PlatformDefaults {
        match self {
            Platform::Server => PlatformDefaults {
                max_payload_bytes: 8 * 1024 * 1024, // 8 MB
                with_server: true,
            },
            Platform::CloudflareWorkers => PlatformDefaults {
                max_payload_bytes: 10 * 1024 * 1024, // 10 MB
                with_server: false,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlatformDefaults {
    pub max_payload_bytes: usize,
    /// Whether the `[server]` section applies (listener, log format).
    pub with_server: bool,
}
