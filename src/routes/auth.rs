// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Session routes.
//!
//! Login happens at the identity provider, which sets the session cookie;
//! this service only clears it.

use axum::{response::Redirect, routing::get, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::sync::Arc;

use crate::middleware::auth::SESSION_COOKIE;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/logout", get(logout))
}

/// Logout - remove the session cookie and send the browser home.
async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::temporary("/"))
}
