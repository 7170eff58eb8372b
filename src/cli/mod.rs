// keygate — CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: init, passcode, add, read, delete, list, audit.

mod commands;

use clap::{Parser, Subcommand};

pub use commands::execute;

pub const DEFAULT_USERNAME: &str = "appleseed";
pub const DEFAULT_PASSWORD: &str = "1234";
pub const DEFAULT_SERVER: &str = "www.example.com";

/// keygate — store credentials that only come back after user presence.
#[derive(Parser, Debug)]
#[command(name = "keygate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the master key and the item database.
    Init,

    /// Manage the device passcode used to prove user presence.
    Passcode {
        #[command(subcommand)]
        action: PasscodeAction,
    },

    /// Store credentials for a server, gated by user presence.
    Add {
        #[arg(long, default_value = DEFAULT_USERNAME)]
        username: String,

        /// Lands in shell history. Defaults to the sample credential;
        /// use --password-stdin for a real secret.
        #[arg(long, default_value = DEFAULT_PASSWORD)]
        password: String,

        /// Read the password from the first line of stdin (not hidden when typed).
        #[arg(long, default_value = "false", conflicts_with = "password")]
        password_stdin: bool,

        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },

    /// Read the credentials stored for a server (prompts for the passcode).
    Read {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,

        /// Fail instead of prompting.
        #[arg(long, default_value = "false")]
        no_interaction: bool,
    },

    /// Delete the credentials stored for a server.
    Delete {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },

    /// List stored accounts and servers (no secrets, no prompt).
    List,

    /// Show the audit trail for a server.
    Audit {
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum PasscodeAction {
    /// Enrol or replace the device passcode. Reads one line from stdin when
    /// omitted; typed input is echoed, so pipe it in on shared terminals.
    Set {
        #[arg(long)]
        passcode: Option<String>,
    },

    /// Remove the device passcode. Passcode-gated items become unreachable.
    Clear,

    /// Show whether a passcode is enrolled.
    Status,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_defaults_to_sample_credentials() {
        let cli = Cli::try_parse_from(["keygate", "add"]).unwrap();
        match cli.command {
            Commands::Add {
                username,
                password,
                password_stdin,
                server,
            } => {
                assert_eq!(username, "appleseed");
                assert_eq!(password, "1234");
                assert!(!password_stdin);
                assert_eq!(server, "www.example.com");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_password_stdin_excludes_password_flag() {
        let cli = Cli::try_parse_from(["keygate", "add", "--password-stdin"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Add {
                password_stdin: true,
                ..
            }
        ));
        assert!(Cli::try_parse_from([
            "keygate",
            "add",
            "--password",
            "hunter2",
            "--password-stdin"
        ])
        .is_err());
    }

    #[test]
    fn test_read_no_interaction_flag() {
        let cli =
            Cli::try_parse_from(["keygate", "read", "--server", "a.example", "--no-interaction"])
                .unwrap();
        match cli.command {
            Commands::Read {
                server,
                no_interaction,
            } => {
                assert_eq!(server, "a.example");
                assert!(no_interaction);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_passcode_subcommands() {
        let cli = Cli::try_parse_from(["keygate", "passcode", "set", "--passcode", "2468"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Passcode {
                action: PasscodeAction::Set { passcode: Some(ref p) }
            } if p == "2468"
        ));
        assert!(Cli::try_parse_from(["keygate", "passcode", "clear"]).is_ok());
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["keygate", "serve"]).is_err());
    }
}
