use clap::{Parser, Subcommand};

/// snapbook: authentication service for the photographer booking marketplace
#[derive(Parser)]
#[command(name = "snapbook", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (defaults to SNAPBOOK_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage administrator accounts
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Manage live sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Create an administrator
    Create {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SNAPBOOK_ADMIN_PASSWORD")]
        password: String,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Drop the registry entry for a token
    Revoke {
        #[arg(long)]
        token: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_create() {
        let cli = Cli::parse_from([
            "snapbook", "admin", "create", "--email", "root@x.com", "--password", "pw",
        ]);
        match cli.command {
            Some(Commands::Admin {
                command: AdminCommands::Create { email, password },
            }) => {
                assert_eq!(email, "root@x.com");
                assert_eq!(password, "pw");
            }
            _ => panic!("expected admin create"),
        }
    }

    #[test]
    fn test_serve_port_is_optional() {
        let cli = Cli::parse_from(["snapbook", "serve"]);
        assert!(matches!(cli.command, Some(Commands::Serve { port: None })));
    }
}
