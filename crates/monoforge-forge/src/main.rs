//! monoforge CLI - declarative monorepo generation.

fn main() -> anyhow::Result<()> {
    monoforge_forge::run()
}
