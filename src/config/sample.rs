//! # Sample procfile emission.
//!
//! Produces a small but representative procfile: two groups with a
//! dependency between them, both restart modes, cascading settings, and one
//! file-output process. `procvd sample > procfile.json` is the quickest way
//! to a working setup.

use serde_json::json;

/// Returns a pretty-printed sample procfile.
pub fn sample_procfile() -> String {
    let sample = json!({
        "outputDir": "logs",
        "defaults": {
            "restartMode": "group",
            "restartDelayMs": 1000,
            "env": { "APP_ENV": "development" }
        },
        "groupSets": {
            "backend": {
                "groups": ["core", "api"],
                "maxRestarts": 10
            }
        },
        "groups": {
            "core": {
                "processes": {
                    "db": { "command": "postgres -D ./data" },
                    "cache": { "command": "redis-server --port 6380" }
                }
            },
            "api": {
                "dependsOn": ["core"],
                "restartMode": "process",
                "output": "file",
                "outputMaxBytes": 1048576,
                "outputMaxFiles": 3,
                "processes": {
                    "web": {
                        "path": "bin/web",
                        "args": ["--port", "8080"],
                        "env": { "RUST_LOG": "info" }
                    },
                    "worker": { "command": "bin/worker --queue default" }
                }
            }
        }
    });
    serde_json::to_string_pretty(&sample).unwrap_or_default()
}
