//! Catalog pages and the catalog JSON API.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::instrument;

use crate::catalog::Game;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// A game tile on the home page.
#[derive(Clone)]
pub struct GameCard {
    pub id: usize,
    pub name: String,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl GameCard {
    fn new(id: usize, game: &Game) -> Self {
        Self {
            id,
            name: game.name().to_owned(),
            image: game.image().map(str::to_owned),
            description: game.description().map(str::to_owned),
        }
    }
}

/// A purchasable item row on the price page.
#[derive(Clone)]
pub struct ItemRow {
    pub name: String,
    pub price: i64,
}

// =============================================================================
// Templates
// =============================================================================

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub username: Option<String>,
    pub games: Vec<GameCard>,
}

/// Price list template for one game.
#[derive(Template, WebTemplate)]
#[template(path = "price.html")]
pub struct PriceTemplate {
    pub username: Option<String>,
    pub game: GameCard,
    pub items: Vec<ItemRow>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the catalog.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    let games = state
        .catalog()
        .games()
        .iter()
        .enumerate()
        .map(|(id, game)| GameCard::new(id, game))
        .collect();

    IndexTemplate {
        username: user.map(|u| u.username.into_inner()),
        games,
    }
}

/// Display the price list of one game.
///
/// # Errors
///
/// Returns 404 if there is no game at `id`.
#[instrument(skip(state, user))]
pub async fn price(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<PriceTemplate> {
    let (id, game) = id
        .parse::<usize>()
        .ok()
        .and_then(|index| state.catalog().get(index).map(|game| (index, game)))
        .ok_or_else(|| AppError::NotFound(format!("game {id}")))?;

    let items = game
        .items()
        .into_iter()
        .map(|item| ItemRow {
            name: item.name,
            price: item.price.amount(),
        })
        .collect();

    Ok(PriceTemplate {
        username: user.map(|u| u.username.into_inner()),
        game: GameCard::new(id, game),
        items,
    })
}

/// Return one catalog entry as JSON, exactly as stored in the data file.
///
/// Any id that is not an index into the catalog, including negative or
/// non-numeric ones, gets the same 404 body.
#[instrument(skip(state))]
pub async fn game_api(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let game = id.parse::<usize>().ok().and_then(|id| state.catalog().get(id));
    match game {
        Some(game) => Json(game.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response(),
    }
}
