fn main() {
    // Transcript ids come from Uuid::new_v4(). On riscv64 musl the libc-backed
    // getrandom wrapper crashes in release builds, so pin the raw-syscall backend.
    let target = |key: &str| std::env::var(key).unwrap_or_default();
    if target("CARGO_CFG_TARGET_ARCH") == "riscv64"
        && target("CARGO_CFG_TARGET_OS") == "linux"
        && target("CARGO_CFG_TARGET_ENV") == "musl"
    {
        println!("cargo:rustc-cfg=getrandom_backend=\"linux_raw\"");
    }
}
