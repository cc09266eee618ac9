//! Account endpoints: registration, login, profile.

use super::{path_id, AppState};
use crate::auth::{hash_password, verify_password};
use crate::db::UserStore;
use crate::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
use serde_json::json;
use tracing::info;

/// `POST /users/register`
pub fn register(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let (Some(username), Some(password), Some(email)) = (
        req.body_str("username"),
        req.body_str("password"),
        req.body_str("email"),
    ) else {
        return Ok(HandlerResponse::error(
            400,
            "Missing username or password or email",
        ));
    };

    let mut conn = state.db()?;

    if UserStore::by_username_or_email(&mut conn, username)?.is_some()
        || UserStore::by_username_or_email(&mut conn, email)?.is_some()
    {
        return Ok(HandlerResponse::error(409, "Username already exists"));
    }

    let user_id = UserStore::insert(&mut conn, username, &hash_password(password), email)?;
    info!(user_id = user_id, "User registered");

    Ok(HandlerResponse::json(
        200,
        json!({
            "code": 200,
            "message": "User registered successfully",
            "user_id": user_id
        }),
    ))
}

/// `POST /users/login`
pub fn login(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let (Some(needle), Some(password)) = (
        req.body_str("username_or_email"),
        req.body_str("password"),
    ) else {
        return Ok(HandlerResponse::error(
            400,
            "Missing username or email or password",
        ));
    };

    let mut conn = state.db()?;

    let Some(user) = UserStore::by_username_or_email(&mut conn, needle)? else {
        return Ok(HandlerResponse::error(404, "User not found"));
    };

    if !verify_password(password, &user.passwd_hash) {
        return Ok(HandlerResponse::error(401, "Incorrect password"));
    }

    let token = state.tokens.issue(user.id, &user.username, &user.email)?;
    info!(user_id = user.id, "Login successful");

    Ok(HandlerResponse::json(
        200,
        json!({
            "code": 200,
            "message": "Login successful",
            "token": token,
            "user": user
        }),
    ))
}

/// `GET /users/:id` - bearer token required; a user can only read their own
/// profile.
pub fn get_profile(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };
    let id = match path_id(req, "id") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    if claims.uid != id {
        return Ok(HandlerResponse::error(401, "Token does not match user"));
    }

    let mut conn = state.db()?;
    let Some(user) = UserStore::by_id(&mut conn, id)? else {
        return Ok(HandlerResponse::error(404, "User not found"));
    };

    Ok(HandlerResponse::json(200, json!({ "code": 200, "user": user })))
}

/// `PUT /users/:id`
pub fn update_profile(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };
    let id = match path_id(req, "id") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    if claims.uid != id {
        return Ok(HandlerResponse::error(401, "Token does not match user"));
    }

    let (Some(username), Some(email)) = (req.body_str("username"), req.body_str("email")) else {
        return Ok(HandlerResponse::error(400, "Missing username or email"));
    };

    let mut conn = state.db()?;
    let updated = UserStore::update(
        &mut conn,
        id,
        username,
        email,
        req.body_str("qq_id"),
        req.body_str("netease_id"),
    )?;
    if !updated {
        return Ok(HandlerResponse::error(404, "User not found"));
    }

    Ok(HandlerResponse::json(
        200,
        json!({ "code": 200, "message": "User updated" }),
    ))
}

/// `PUT /users/:id/password`
pub fn update_password(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };
    let id = match path_id(req, "id") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    if claims.uid != id {
        return Ok(HandlerResponse::error(401, "Token does not match user"));
    }

    let (Some(old_password), Some(new_password)) = (
        req.body_str("old_password"),
        req.body_str("new_password"),
    ) else {
        return Ok(HandlerResponse::error(
            400,
            "Missing old_password or new_password",
        ));
    };

    let mut conn = state.db()?;
    let Some(user) = UserStore::by_id(&mut conn, id)? else {
        return Ok(HandlerResponse::error(404, "User not found"));
    };
    if !verify_password(old_password, &user.passwd_hash) {
        return Ok(HandlerResponse::error(401, "Incorrect password"));
    }

    UserStore::update_password(&mut conn, id, &hash_password(new_password))?;
    info!(user_id = id, "Password updated");

    Ok(HandlerResponse::json(
        200,
        json!({ "code": 200, "message": "Password updated" }),
    ))
}
