use axum::Router;

pub async fn create_test_app() -> Router {
    std::env::set_var("DATABASE_URL", "");
    std::env::set_var("GENERATION_DISPATCH", "sync");

    deckrest_backend::create_app().await
}
