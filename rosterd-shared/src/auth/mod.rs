/// Authentication primitives for rosterd
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength policy
/// - [`jwt`]: JWT token generation and validation
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with access/refresh token pair
/// - **Constant-time Comparison**: password verification is constant-time
///
/// # Example
///
/// ```no_run
/// use rosterd_shared::auth::password::{hash_password, verify_password};
/// use rosterd_shared::auth::jwt::{create_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!!")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod password;
