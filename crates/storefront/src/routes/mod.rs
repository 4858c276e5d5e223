//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET  /                           - Game list
//! GET  /price/{id}                 - Price list for one game
//! GET  /about                      - About page
//! GET  /activity                   - Promotions page
//! GET  /api/game/{id}              - One catalog entry as JSON
//!
//! # Auth
//! GET  /register                   - Registration form
//! POST /register                   - Create account
//! GET  /login                      - Login form
//! POST /login                      - Authenticate
//! GET  /logout                     - End the session
//!
//! # Cart and checkout (requires auth)
//! GET  /cart                       - Cart lines and past orders
//! POST /add_to_cart                - Append a line
//! GET  /clear_cart                 - Empty the cart
//! GET  /checkout                   - Review page
//! POST /checkout                   - Place the order
//!
//! # Admin console (requires admin)
//! GET  /admin                      - Dashboard
//! GET  /admin/users                - Account list
//! GET  /admin/user/{username}/orders - One account's orders
//! GET  /admin/orders               - Order queue
//! POST /admin/update_order/{id}    - Change an order's status
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod home;
pub mod pages;
pub mod views;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the catalog and static page routes.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/price/{id}", get(home::price))
        .route("/about", get(pages::about))
        .route("/activity", get(pages::activity))
        .route("/api/game/{id}", get(home::game_api))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
}

/// Create the cart and checkout routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show))
        .route("/add_to_cart", post(cart::add))
        .route("/clear_cart", get(cart::clear))
        .route("/checkout", get(cart::checkout_page).post(cart::checkout))
}

/// Create the admin console routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/users", get(admin::users))
        .route("/user/{username}/orders", get(admin::user_orders))
        .route("/orders", get(admin::orders))
        .route("/update_order/{id}", post(admin::update_order))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .merge(auth_routes())
        .merge(cart_routes())
        .nest("/admin", admin_routes())
}
