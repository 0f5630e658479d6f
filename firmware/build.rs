//! Puts `memory.x` on the linker search path for the board binary.
//!
//! Inside a workspace the linker does not search the member crate's root,
//! so the file is copied into `OUT_DIR`. Host builds (no `stm32` feature)
//! skip this entirely.

use std::{env, fs, io, path::PathBuf};

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    if env::var_os("CARGO_FEATURE_STM32").is_none() {
        return Ok(());
    }

    let out = PathBuf::from(env::var_os("OUT_DIR").ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "OUT_DIR environment variable not set")
    })?);
    fs::write(out.join("memory.x"), include_bytes!("memory.x"))?;
    println!("cargo:rustc-link-search={}", out.display());
    Ok(())
}
