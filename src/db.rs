// connexion BD

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};

use crate::models::accounts;

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Crée la table accounts (et son index unique sur email) si elle n'existe pas
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let statement = schema
        .create_table_from_entity(accounts::Entity)
        .if_not_exists()
        .to_owned();

    db.execute(backend.build(&statement)).await?;

    Ok(())
}
