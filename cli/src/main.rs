use anyhow::Result;

fn main() -> Result<()> {
    rdfgraft_cli::run()
}
