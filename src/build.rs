fn main() {
    println!("cargo:rerun-if-changed=src/build.rs");

    // The abi3 wheel targets Python 3.8; newer macOS framework builds need
    // pyo3 told explicitly that forward compatibility is fine.
    if cfg!(target_os = "macos") {
        unsafe {
            std::env::set_var("PYO3_USE_ABI3_FORWARD_COMPATIBILITY", "1");
        };
        println!("cargo:rustc-env=PYO3_USE_ABI3_FORWARD_COMPATIBILITY=1");
    }
}
