use crate::database::{MongoDB, USERS_COLLECTION};
use crate::models::{User, UserInfo};
use crate::utils::error::AppError;
use crate::utils::validate;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub name: Option<String>,
    pub iat: usize, // issued at
    pub exp: usize, // expiration
    pub jti: String, // JWT ID
    pub aud: String, // audience
    pub iss: String, // issuer
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

fn get_jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "default-secret-change-me".to_string())
}

fn get_jwt_issuer() -> String {
    std::env::var("JWT_ISSUER").unwrap_or_else(|_| "campus-poll-service".to_string())
}

fn get_jwt_audience() -> String {
    std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "campus-poll-api".to_string())
}

// Generate JWT token (24h expiry)
pub fn generate_jwt(user: &User) -> Result<String, AppError> {
    let iat = Utc::now().timestamp() as usize;
    let exp = (Utc::now() + Duration::hours(24)).timestamp() as usize;
    let jti = Uuid::new_v4().to_string();

    let claims = Claims {
        sub: user.user_id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        iat,
        exp,
        jti,
        aud: get_jwt_audience(),
        iss: get_jwt_issuer(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_jwt_secret().as_ref()),
    )
    .map_err(|e| AppError::Database(format!("Failed to generate token: {}", e)))
}

// Verify JWT token
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[get_jwt_audience()]);

    let mut issuers = HashSet::new();
    issuers.insert(get_jwt_issuer());
    validation.iss = Some(issuers);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(get_jwt_secret().as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

async fn find_by_email(db: &MongoDB, email: &str) -> Result<Option<User>, AppError> {
    db.collection::<User>(USERS_COLLECTION)
        .find_one(doc! { "email": email })
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

async fn find_by_user_id(db: &MongoDB, user_id: &str) -> Result<User, AppError> {
    db.collection::<User>(USERS_COLLECTION)
        .find_one(doc! { "user_id": user_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

// User registration
pub async fn register(db: &MongoDB, request: &RegisterRequest) -> Result<AuthResponse, AppError> {
    let email = validate::validate_email(&request.email)?;
    validate::validate_password(&request.password)?;
    let name = match &request.name {
        Some(raw) => Some(validate::validate_name(&crate::utils::sanitize::strip_xss(raw))?),
        None => None,
    };

    if find_by_email(db, &email).await?.is_some() {
        return Err(AppError::Conflict("An account with this email already exists".to_string()));
    }

    let hashed_password = hash(&request.password, DEFAULT_COST)
        .map_err(|e| AppError::Database(format!("Failed to hash password: {}", e)))?;

    let new_user = User {
        id: None,
        user_id: ObjectId::new().to_hex(),
        email,
        password: hashed_password,
        name,
        created_at: Some(BsonDateTime::now()),
        updated_at: Some(BsonDateTime::now()),
        last_login: Some(BsonDateTime::now()),
    };

    db.collection::<User>(USERS_COLLECTION)
        .insert_one(&new_user)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create user: {}", e)))?;

    let token = generate_jwt(&new_user)?;

    log::info!("✅ User registered successfully: {}", new_user.email);

    Ok(AuthResponse {
        success: true,
        token,
        user: UserInfo::from(&new_user),
    })
}

// User login
pub async fn login(db: &MongoDB, request: &LoginRequest) -> Result<AuthResponse, AppError> {
    let email = request.email.trim().to_lowercase();

    // Same message for unknown email and wrong password
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = find_by_email(db, &email).await?.ok_or_else(invalid)?;

    let valid = verify(&request.password, &user.password)
        .map_err(|e| AppError::Database(format!("Password verification error: {}", e)))?;

    if !valid {
        return Err(invalid());
    }

    db.collection::<User>(USERS_COLLECTION)
        .update_one(
            doc! { "user_id": &user.user_id },
            doc! { "$set": { "last_login": BsonDateTime::now() } },
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let token = generate_jwt(&user)?;

    Ok(AuthResponse {
        success: true,
        token,
        user: UserInfo::from(&user),
    })
}

// Get current user
pub async fn get_current_user(db: &MongoDB, user_id: &str) -> Result<UserInfo, AppError> {
    let user = find_by_user_id(db, user_id).await?;
    Ok(UserInfo::from(&user))
}

// Update email and/or display name
pub async fn update_profile(
    db: &MongoDB,
    user_id: &str,
    request: &UpdateProfileRequest,
) -> Result<UserInfo, AppError> {
    let user = find_by_user_id(db, user_id).await?;

    let mut set = doc! { "updated_at": BsonDateTime::now() };

    if let Some(raw_email) = &request.email {
        let email = validate::validate_email(raw_email)?;
        if email != user.email {
            if find_by_email(db, &email).await?.is_some() {
                return Err(AppError::Conflict("An account with this email already exists".to_string()));
            }
            set.insert("email", email);
        }
    }

    if let Some(raw_name) = &request.name {
        let name = validate::validate_name(&crate::utils::sanitize::strip_xss(raw_name))?;
        set.insert("name", name);
    }

    db.collection::<User>(USERS_COLLECTION)
        .update_one(doc! { "user_id": user_id }, doc! { "$set": set })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let updated = find_by_user_id(db, user_id).await?;
    Ok(UserInfo::from(&updated))
}

// Change password (requires the current one)
pub async fn change_password(
    db: &MongoDB,
    user_id: &str,
    request: &ChangePasswordRequest,
) -> Result<(), AppError> {
    let user = find_by_user_id(db, user_id).await?;

    let valid = verify(&request.current_password, &user.password)
        .map_err(|e| AppError::Database(format!("Password verification error: {}", e)))?;

    if !valid {
        return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
    }

    validate::validate_password(&request.new_password)?;

    let hashed = hash(&request.new_password, DEFAULT_COST)
        .map_err(|e| AppError::Database(format!("Failed to hash password: {}", e)))?;

    db.collection::<User>(USERS_COLLECTION)
        .update_one(
            doc! { "user_id": user_id },
            doc! { "$set": { "password": hashed, "updated_at": BsonDateTime::now() } },
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    log::info!("🔑 Password changed for user: {}", user_id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: None,
            user_id: ObjectId::new().to_hex(),
            email: "student@campus.edu".to_string(),
            password: "not-a-real-hash".to_string(),
            name: Some("Student".to_string()),
            created_at: None,
            updated_at: None,
            last_login: None,
        }
    }

    #[test]
    fn test_jwt_round_trip() {
        let user = sample_user();
        let token = generate_jwt(&user).unwrap();
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.user_id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.name, user.name);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_tampered_token_fails() {
        let user = sample_user();
        let token = generate_jwt(&user).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        assert!(verify_token(&tampered).is_err());
        assert!(verify_token("not.a.token").is_err());
    }

    #[test]
    fn test_tokens_carry_unique_jti() {
        let user = sample_user();
        let a = verify_token(&generate_jwt(&user).unwrap()).unwrap();
        let b = verify_token(&generate_jwt(&user).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_bcrypt_hash_and_verify() {
        let hashed = hash("s3cret-password", 4).unwrap(); // low cost, test only
        assert!(verify("s3cret-password", &hashed).unwrap());
        assert!(!verify("wrong-password", &hashed).unwrap());
    }
}
