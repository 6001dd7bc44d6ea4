use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recipe_server::config::Config;
use recipe_server::store::Store;
use recipe_server::users::{create_superuser, update_profile, ProfileUpdate};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recipe-admin")]
#[command(about = "Recipe server administration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user with staff and superuser rights in the configured store
    CreateSuperuser {
        /// Login email for the new account
        #[arg(long)]
        email: String,
        /// Password for the new account
        #[arg(long, env = "RECIPE_ADMIN_PASSWORD")]
        password: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the OpenAPI document
    Openapi,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::CreateSuperuser {
            email,
            password,
            name,
        } => {
            let config = Config::from_env().context("Invalid configuration")?;
            let store = config.open_store()?;
            superuser(store.as_ref(), &email, &password, name)?;
        }
        Commands::Openapi => {
            println!("{}", recipe_server::api::openapi().to_pretty_json()?);
        }
    }

    Ok(())
}

fn superuser(store: &dyn Store, email: &str, password: &str, name: Option<String>) -> Result<()> {
    let mut user = create_superuser(store, email, password)
        .with_context(|| format!("Failed to create superuser {}", email))?;

    if name.is_some() {
        user = update_profile(
            store,
            &user,
            ProfileUpdate {
                name,
                ..Default::default()
            },
        )?;
    }

    println!("Created superuser {} ({})", user.email, user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_server::store::MemoryStore;

    #[test]
    fn test_superuser_with_name() {
        let store = MemoryStore::new();
        superuser(&store, "admin@example.com", "adminpass", Some("Admin".to_string())).unwrap();

        let user = store.find_user_by_email("admin@example.com").unwrap().unwrap();
        assert!(user.is_superuser);
        assert!(user.is_staff);
        assert_eq!(user.name, "Admin");
    }

    #[test]
    fn test_cli_parses_create_superuser() {
        let cli = Cli::try_parse_from([
            "recipe-admin",
            "create-superuser",
            "--email",
            "admin@example.com",
            "--password",
            "adminpass",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::CreateSuperuser { name: None, .. }
        ));
    }
}
