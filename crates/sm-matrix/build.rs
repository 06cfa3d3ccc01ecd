fn main() {
    println!("cargo:rerun-if-env-changed=SM_KERNEL_LIB_DIR");
    println!("cargo:rerun-if-env-changed=SM_KERNEL_LIB");

    // Only the `native` feature references the external kernel symbols.
    if std::env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    if let Ok(dir) = std::env::var("SM_KERNEL_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    }
    let lib = std::env::var("SM_KERNEL_LIB").unwrap_or_else(|_| "matmul_kernels".to_string());
    println!("cargo:rustc-link-lib=static={}", lib);
}
