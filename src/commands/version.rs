use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("sondewatch version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
