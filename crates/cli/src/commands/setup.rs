//! `anchorage setup` - create the trust database.

use anchorage_certdb::CertStore;
use anchorage_core::Config;
use anyhow::Result;

pub async fn run(store: &dyn CertStore, config: &Config) -> Result<()> {
    // Opening the store already created the schema; run the migration
    // again explicitly and verify the database answers.
    store.migrate().await?;
    store.health_check().await?;
    println!(
        "trust database ready at {}",
        config.database.path.display()
    );
    Ok(())
}
