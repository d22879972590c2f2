use bcrypt::{hash, DEFAULT_COST};
use clap::{Parser, Subcommand};
use modqueue_backend::config::Config;
use modqueue_backend::models::db_operations::{forum_db_operations, users_db_operations};
use modqueue_backend::models::notification_levels;
use modqueue_backend::setup::db_setup;
use rusqlite::{params, Connection};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial application setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    Setup,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    Set {
        #[arg(long)]
        key: String,
        #[arg(long)]
        value: String,
    },
}

#[derive(Subcommand, Debug)]
enum SeedAction {
    /// Seeds a moderation group, categories and a badge so the approval
    /// flow can be exercised end to end.
    Demo,
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup => setup_forum_database(&config),
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { username, password } => {
                create_admin_user(&config, username, password);
            }
        },
        Commands::Settings { action } => match action {
            SettingsAction::Set { key, value } => {
                set_setting(&config, key, value);
            }
        },
        Commands::Seed { action } => match action {
            SeedAction::Demo => seed_demo(&config),
        },
    }
}

fn setup_forum_database(config: &Config) {
    let db_path = config.forum_db_path();
    if db_path.exists() {
        println!(
            "ℹ️ Forum database already exists at '{}'. Skipping creation.",
            db_path.display()
        );
        return;
    }
    println!("\nSetting up forum database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let mut conn = Connection::open(&db_path).expect("Could not create forum database file.");
    match db_setup::setup_forum_db(&mut conn) {
        Ok(_) => println!("✅ Forum database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up forum database: {}", e),
    }
}

fn open_existing(config: &Config) -> Option<Connection> {
    let db_path = config.forum_db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Forum database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    Some(Connection::open(&db_path).expect("Could not open forum database."))
}

fn create_admin_user(config: &Config, username: &str, password: &str) {
    let conn = match open_existing(config) {
        Some(conn) => conn,
        None => return,
    };
    let hashed_password = hash(password, DEFAULT_COST).expect("Failed to hash password");

    match conn.execute(
        "INSERT INTO users (username, password_hash, trust_level, admin, created_at)
         VALUES (?1, ?2, 4, 1, ?3)",
        params![username, hashed_password, chrono::Utc::now().to_rfc3339()],
    ) {
        Ok(_) => println!("✅ Admin user '{}' created successfully.", username),
        Err(e) => eprintln!(
            "❌ Error creating admin user: {}. It might be because the username already exists.",
            e
        ),
    }
}

fn set_setting(config: &Config, key: &str, value: &str) {
    let conn = match open_existing(config) {
        Some(conn) => conn,
        None => return,
    };
    match users_db_operations::update_setting(&conn, key, value) {
        Ok(_) => println!("✅ Setting '{}' set to '{}'.", key, value),
        Err(e) => eprintln!("❌ Error updating setting: {}", e),
    }
}

fn seed_demo(config: &Config) {
    let conn = match open_existing(config) {
        Some(conn) => conn,
        None => return,
    };

    let group_name = "moderation-team";
    let group_id = match users_db_operations::lookup_group(&conn, group_name) {
        Some(group) => group.id,
        None => users_db_operations::create_group(&conn, group_name)
            .expect("Failed to create moderation group"),
    };

    let moderator_id = match users_db_operations::read_user_by_username(&conn, "moderator") {
        Some(user) => user.id,
        None => users_db_operations::create_user(&conn, "moderator", "changeme", 3, false)
            .expect("Failed to create moderator"),
    };
    users_db_operations::add_group_user(
        &conn,
        group_id,
        moderator_id,
        notification_levels::WATCHING,
    )
    .expect("Failed to add moderator to group");

    let creations = forum_db_operations::create_category(&conn, "Creations", 0)
        .expect("Failed to create 'Creations' category");
    forum_db_operations::update_category_redirect(
        &conn,
        creations,
        true,
        Some("Thanks for your submission! The moderation team will review it shortly."),
        true,
        Some("Thanks for your reply! The moderation team will review it shortly."),
    )
    .expect("Failed to configure redirect");
    forum_db_operations::create_category(&conn, "Published Creations", 0)
        .expect("Failed to create 'Published Creations' category");

    let badge_id = forum_db_operations::create_badge(&conn, "Approved Creator", "approved-creator", true)
        .expect("Failed to create badge");

    for (key, value) in [
        ("post_approval_enabled", "true".to_string()),
        ("post_approval_redirect_group", group_name.to_string()),
        ("post_approval_button_group", group_name.to_string()),
        ("post_approval_badge", badge_id.to_string()),
    ] {
        users_db_operations::update_setting(&conn, key, &value)
            .expect("Failed to update setting");
    }

    println!("✅ Demo data seeded:");
    println!("  > Group '{}' with user 'moderator' (password 'changeme').", group_name);
    println!("  > Categories 'Creations' (redirecting) and 'Published Creations'.");
    println!("  > Badge 'Approved Creator' wired to the approval response.");
}
