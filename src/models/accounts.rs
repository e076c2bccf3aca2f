// ============================================================================
// MODÈLE : ACCOUNTS
// ============================================================================
//
// Colonnes de la table accounts:
//   - id (UUID, PRIMARY KEY) - UUID v4 généré à l'inscription
//   - email (VARCHAR, UNIQUE, NOT NULL)
//   - name (VARCHAR, NOT NULL, peut être vide)
//   - password_hash (VARCHAR, NOT NULL) - pbkdf2_sha256$iterations$salt$hash
//   - is_active (BOOLEAN, NOT NULL) - false tant que l'email n'est pas vérifié
//   - last_login (TIMESTAMPTZ, NULL)
//   - created_at (TIMESTAMPTZ, NOT NULL)
//
// Workflow:
//   1. POST /api/users/signup crée le compte avec is_active = false
//   2. Le lien envoyé par email active le compte (is_active = true)
//   3. Un compte inactif ne peut pas se connecter
//
// Points d'attention:
//   - L'index unique sur email garantit un seul compte par adresse
//   - Un nouveau signup sur l'email d'un compte inactif supprime ce compte
//   - Les comptes inactifs trop vieux sont purgés au démarrage
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub email: String,

    pub name: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub is_active: bool,

    pub last_login: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
