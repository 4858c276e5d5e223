//! Static informational pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::middleware::OptionalAuth;

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub username: Option<String>,
}

/// Activity (promotions) page template.
#[derive(Template, WebTemplate)]
#[template(path = "activity.html")]
pub struct ActivityTemplate {
    pub username: Option<String>,
}

/// Display the about page.
#[instrument(skip_all)]
pub async fn about(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    AboutTemplate {
        username: user.map(|u| u.username.into_inner()),
    }
}

/// Display the activity page.
#[instrument(skip_all)]
pub async fn activity(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    ActivityTemplate {
        username: user.map(|u| u.username.into_inner()),
    }
}
