use std::path::Path;

const WORKSPACE_MIGRATIONS_DIR: &str = "server/migrations";
const CRATE_MIGRATIONS_DIR: &str = "./migrations";

/// Resolves the migrations directory whether the binary starts from the
/// workspace root or from `server/`.
fn migrations_path() -> &'static Path {
    let workspace_path = Path::new(WORKSPACE_MIGRATIONS_DIR);
    if workspace_path.exists() {
        return workspace_path;
    }
    Path::new(CRATE_MIGRATIONS_DIR)
}

/// Creates the `kv_store` table that holds one JSON mapping list per map
/// variant. Safe to run on every start.
pub async fn run(pool: &sqlx::PgPool) -> Result<(), sqlx_core::migrate::MigrateError> {
    let migrator = sqlx_core::migrate::Migrator::new(migrations_path()).await?;
    migrator.run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_directory_holds_kv_store_table() {
        let dir = migrations_path();
        let sql: String = std::fs::read_dir(dir)
            .expect("migrations directory")
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .filter_map(|entry| std::fs::read_to_string(entry.path()).ok())
            .collect();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS kv_store"));
    }
}
