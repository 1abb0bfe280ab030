fn main() {
    println!("cargo:rerun-if-env-changed=OS_LOG_LEVEL");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
}
