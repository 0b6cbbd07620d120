//! Build script for the storefront crate.
//!
//! Fingerprints the stylesheet and the cart script so both can be served
//! with long-lived cache headers. Each asset is copied to a `derived/`
//! sibling directory as `<stem>.<hash>.<ext>` and the hash is exposed to
//! the crate as a compile-time environment variable.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// `(path under static/, environment variable)` pairs.
const ASSETS: &[(&str, &str)] = &[("css/main.css", "CSS_HASH"), ("js/cart.js", "JS_HASH")];

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let static_dir = Path::new(&manifest_dir).join("static");

    for (asset, var) in ASSETS {
        fingerprint(&static_dir, asset, var);
    }
}

fn fingerprint(static_dir: &Path, asset: &str, var: &str) {
    let source = static_dir.join(asset);
    println!("cargo:rerun-if-changed={}", source.display());

    let content = match fs::read(&source) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {asset}: {e}");
            println!("cargo:rustc-env={var}=");
            return;
        }
    };

    let digest = format!("{:x}", Sha256::digest(&content));
    let short = digest.get(..8).unwrap_or(&digest);
    println!("cargo:rustc-env={var}={short}");

    let (Some(parent), Some(stem), Some(ext)) = (
        source.parent(),
        source.file_stem().and_then(|s| s.to_str()),
        source.extension().and_then(|s| s.to_str()),
    ) else {
        return;
    };
    let derived_dir = parent.join("derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived asset directory");
    fs::copy(&source, derived_dir.join(format!("{stem}.{short}.{ext}")))
        .expect("Failed to copy fingerprinted asset");
}
