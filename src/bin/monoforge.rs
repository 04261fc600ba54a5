//! monoforge CLI binary
//!
//! This is a thin wrapper that calls the monoforge-forge library's `run()`
//! function. It enables `cargo install monoforge` to provide the `monoforge`
//! CLI tool.

fn main() -> anyhow::Result<()> {
    monoforge_forge::run()
}
