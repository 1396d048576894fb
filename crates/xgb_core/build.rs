use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=XGBOOST_LIB_DIR");

    // Only the `native` feature links libxgboost.
    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    if let Ok(dir) = env::var("XGBOOST_LIB_DIR") {
        let dir = PathBuf::from(dir);
        println!("cargo:rustc-link-search=native={}", dir.display());
    }
}
