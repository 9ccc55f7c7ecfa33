use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::system::get_version))
        .merge(persona_routes())
        .merge(file_routes(config))
        .merge(client_routes())
}

fn persona_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::persona::get_persona))
        .routes(routes!(handlers::persona::set_name))
        .routes(routes!(handlers::persona::recover))
        .routes(routes!(handlers::persona::activate_admin))
}

fn file_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::file::upload_file))
        .layer(handlers::file::upload_body_limit(
            config.storage.max_blob_size,
        ));

    OpenApiRouter::new()
        .routes(routes!(handlers::file::list_files))
        .routes(routes!(
            handlers::file::get_file,
            handlers::file::update_file,
            handlers::file::delete_file
        ))
        .routes(routes!(handlers::file::download_file))
        .merge(upload)
}

fn client_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::client::list_clients))
        .routes(routes!(
            handlers::client::update_client,
            handlers::client::delete_client
        ))
}
