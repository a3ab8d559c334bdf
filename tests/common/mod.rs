// tests/common/mod.rs

//! Shared fixture world for integration tests.

use apk_resolver::{NamedIndex, Package, RepositoryIndex, Resolver};

pub const MAIN_URI: &str = "https://pkgs.example.org/v3.20/main";
pub const EDGE_URI: &str = "https://pkgs.example.org/edge/main";

/// A small alpine-flavored world: an untagged main index plus an index
/// tagged `edge`, with shared-library provides, origins, dependencies and
/// an install-if package.
pub fn alpine_like_indexes() -> Vec<RepositoryIndex> {
    let main: Vec<Package> = serde_json::from_str(
        r#"[
            {"name": "musl", "version": "1.2.5", "origin": "musl"},
            {"name": "busybox", "version": "1.36.1-r29", "origin": "busybox"},
            {"name": "zlib", "version": "1.3.1",
             "origin": "zlib",
             "provides": ["so:libz.so.1=1.3.1"]},
            {"name": "libcrypto3", "version": "3.3.0",
             "origin": "openssl",
             "provides": ["so:libcrypto.so.3=3.3.0"]},
            {"name": "libssl3", "version": "3.3.0",
             "origin": "openssl",
             "provides": ["so:libssl.so.3=3.3.0"],
             "dependencies": ["so:libcrypto.so.3"]},
            {"name": "ca-certificates", "version": "20240226",
             "origin": "ca-certificates"},
            {"name": "curl", "version": "8.8.0", "origin": "curl",
             "dependencies": ["so:libssl.so.3", "so:libcrypto.so.3",
                              "so:libz.so.1", "ca-certificates"]},
            {"name": "docs", "version": "0.2", "origin": "docs"},
            {"name": "curl-doc", "version": "8.8.0", "origin": "curl",
             "install_if": ["curl", "docs"]},
            {"name": "wget-ssl", "version": "1.24.5", "origin": "wget",
             "provides": ["wget=1.24.5"]},
            {"name": "wget-busybox", "version": "1.36.1", "origin": "busybox",
             "provides": ["wget=1.36.1"]}
        ]"#,
    )
    .unwrap();

    let edge: Vec<Package> = serde_json::from_str(
        r#"[
            {"name": "curl", "version": "8.9.0_rc1", "origin": "curl",
             "dependencies": ["so:libssl.so.3", "ca-certificates"]}
        ]"#,
    )
    .unwrap();

    vec![
        RepositoryIndex::new("", MAIN_URI, main),
        RepositoryIndex::new("edge", EDGE_URI, edge),
    ]
}

pub fn resolver_for(indexes: &[RepositoryIndex]) -> Resolver {
    let refs: Vec<&dyn NamedIndex> = indexes.iter().map(|i| i as &dyn NamedIndex).collect();
    Resolver::new(&refs)
}
