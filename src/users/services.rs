use axum::extract::FromRef;
use tracing::info;

use super::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateUserRequest,
    UserView,
};
use super::repo::User;
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, Result};
use crate::response::{PageMeta, PaginationQuery};
use crate::state::AppState;

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<AuthResponse> {
    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let hash = hash_password(&req.password, state.config.hash_memory_kib)?;
    let user = User::create(&state.db, &req.email, &hash, &req.display_name).await?;

    let token = JwtKeys::from_ref(state).sign(user.id, &user.email, user.role)?;
    info!(user_id = user.id, email = %user.email, "user registered");

    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<AuthResponse> {
    // One generic rejection for unknown email, inactive account and bad
    // password, so responses cannot be used to enumerate accounts.
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;
    if !user.is_active {
        return Err(invalid());
    }
    if !verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = JwtKeys::from_ref(state).sign(user.id, &user.email, user.role)?;
    info!(user_id = user.id, "user logged in");

    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

/// Deactivated accounts are indistinguishable from absent ones.
pub async fn get_active(state: &AppState, id: i64) -> Result<User> {
    User::find_active_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}

pub async fn list(state: &AppState, page: &PaginationQuery) -> Result<(Vec<UserView>, PageMeta)> {
    let total = User::count_active(&state.db).await?;
    let users = User::list_active(&state.db, page.limit(), page.offset()).await?;
    let meta = PageMeta::new(page.page(), page.limit(), total);
    Ok((users.into_iter().map(UserView::from).collect(), meta))
}

pub async fn update(state: &AppState, id: i64, req: UpdateUserRequest) -> Result<UserView> {
    get_active(state, id).await?;

    if let Some(ref email) = req.email {
        if let Some(existing) = User::find_by_email(&state.db, email).await? {
            if existing.id != id {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }
    }

    let password_hash = match req.password {
        Some(ref plain) => Some(hash_password(plain, state.config.hash_memory_kib)?),
        None => None,
    };

    let user = User::update(
        &state.db,
        id,
        req.email.as_deref(),
        req.display_name.as_deref(),
        password_hash.as_deref(),
    )
    .await?;
    info!(user_id = id, "user updated");
    Ok(user.into())
}

pub async fn change_password(
    state: &AppState,
    id: i64,
    req: ChangePasswordRequest,
) -> Result<()> {
    let user = get_active(state, id).await?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(AppError::Domain("Current password is incorrect".to_string()));
    }

    let hash = hash_password(&req.new_password, state.config.hash_memory_kib)?;
    User::set_password(&state.db, id, &hash).await?;
    info!(user_id = id, "password changed");
    Ok(())
}

pub async fn deactivate(state: &AppState, id: i64) -> Result<()> {
    get_active(state, id).await?;
    User::deactivate(&state.db, id).await?;
    info!(user_id = id, "user deactivated");
    Ok(())
}
