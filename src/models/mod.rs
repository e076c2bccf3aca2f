// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Liste des modules:
//   - health : Health check API
//   - accounts : Comptes utilisateurs (table accounts, SeaORM)
//   - dto : Data Transfer Objects pour les réponses API
//
// Points d'attention:
//   - Les changements d'email et resets de mot de passe n'ont PAS de table:
//     tout est porté par le token signé (voir utils::signing)
//
// ============================================================================

pub mod health;
pub mod accounts;
pub mod dto;
