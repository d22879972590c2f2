use actix_cors::Cors;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    cookie::Key,
    middleware::{DefaultHeaders, Logger},
    web, App, HttpResponse, HttpServer, Responder,
};
use clap::Parser;
use modqueue_backend::{
    config::Config,
    events::EventBus,
    helper::redirect_helpers::DiversionSubscriber,
    routes,
};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::convert::TryFrom;
use std::fs;
use std::path::PathBuf;

/// A simple handler for the root URL.
async fn root_handler() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

#[derive(Parser, Debug)]
#[command(
    name = "modqueue_server",
    author,
    version,
    about = "Starts the moderation queue web server."
)]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let db_path = config.forum_db_path();
    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Failed to create database directory");
    }

    let manager = SqliteConnectionManager::file(&db_path);
    let pool = Pool::builder()
        .build(manager)
        .expect("FATAL: Failed to create Rusqlite connection pool.");

    {
        // Fail fast if the schema was never created.
        let conn = pool
            .get()
            .expect("Failed to get DB connection for startup check.");
        if modqueue_backend::models::db_operations::users_db_operations::read_setting(
            &conn,
            "post_approval_enabled",
        )
        .is_none()
        {
            panic!("FATAL: forum.db is not initialized. Run 'cargo run --bin setup_cli -- --env-file <path> db setup'");
        }
    }

    let mut bus = EventBus::new();
    bus.subscribe_draft_created(Box::new(DiversionSubscriber));
    let bus = web::Data::new(bus);

    let session_key_bytes = hex::decode(&config.session_secret_key)
        .expect("FATAL: SESSION_SECRET_KEY in .env is not a valid hex string.");
    let session_key = Key::try_from(session_key_bytes.as_slice()).expect(
        "FATAL: The decoded SESSION_SECRET_KEY is not long enough (minimum 64 bytes required).",
    );

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    println!("🚀 Server starting at http://{}", server_address);

    HttpServer::new(move || {
        let session_mw =
            SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                .cookie_secure(config.use_secure_cookies)
                .cookie_http_only(true)
                .cookie_same_site(actix_web::cookie::SameSite::Lax)
                .build();

        let cors = {
            let allowed_origins_str = &config.allowed_origins;
            if allowed_origins_str.trim() == "*" {
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .supports_credentials()
                    .max_age(3600)
            } else {
                let mut cors = Cors::default();
                let origins: Vec<&str> = allowed_origins_str
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .collect();
                for origin in origins {
                    cors = cors.allowed_origin(origin);
                }
                cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .supports_credentials()
                    .max_age(3600)
            }
        };

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(pool.clone()))
            .app_data(bus.clone())
            .route("/", web::get().to(root_handler))
            .service(
                web::scope("")
                    .wrap(session_mw)
                    .configure(routes::auth::config)
                    .configure(routes::topics::config)
                    .configure(routes::approval::config)
                    .configure(routes::admin::config),
            )
    })
    .bind(server_address)?
    .run()
    .await
}
