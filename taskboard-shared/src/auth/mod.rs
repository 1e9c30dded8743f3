/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and policy
/// - [`jwt`]: access/refresh token issuance and validation
/// - [`middleware`]: request auth context and bearer extraction
/// - [`authorization`]: project-scoped permission rules
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::password::{hash_password, verify_password};
/// use taskboard_shared::auth::jwt::{create_token, validate_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// let hash = hash_password("user_password").unwrap();
/// assert!(verify_password("user_password", &hash).unwrap());
///
/// let secret = "secret-key-that-is-at-least-32-bytes";
/// let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), secret).unwrap();
/// assert!(validate_token(&token, secret).is_ok());
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
