// keygate — CLI Command Handlers
//
// Each function handles one CLI subcommand. They wire the platform keyring
// (master key and passcode), the item database and the console broker into
// a keychain, then drive it through the credential client.

use std::io::{BufRead, IsTerminal};
use std::sync::Arc;

use crate::access::DeviceState;
use crate::broker::{AuthContext, ConsoleBroker};
use crate::client::{status_text, CredentialClient, Credentials, READ_PROMPT};
use crate::config::Config;
use crate::enclave::{
    EnclaveError, KeyringProvider, MasterKeyProvider, PresenceVerifier, SealingKeystore,
};
use crate::error::KeygateError;
use crate::keychain::{Keychain, KeychainError};
use crate::store::Database;

use super::{Commands, PasscodeAction};

type ConsoleKeychain = Keychain<
    SealingKeystore,
    ConsoleBroker<KeyringProvider, std::io::StdinLock<'static>, std::io::Stderr>,
>;

/// Execute the parsed CLI command.
pub fn execute(command: Commands, config: &Config) -> Result<(), KeygateError> {
    match command {
        Commands::Init => cmd_init(config),
        Commands::Passcode { action } => cmd_passcode(action, config),
        Commands::Add {
            username,
            password,
            password_stdin,
            server,
        } => {
            let password = if password_stdin {
                read_secret_line(std::io::stdin().lock())?
            } else {
                password
            };
            cmd_add(config, username, password, server)
        }
        Commands::Read {
            server,
            no_interaction,
        } => cmd_read(config, server, no_interaction),
        Commands::Delete { server } => cmd_delete(config, server),
        Commands::List => cmd_list(config),
        Commands::Audit { server } => cmd_audit(config, server),
    }
}

// ─── Init ────────────────────────────────────────────────────────────────────

fn cmd_init(config: &Config) -> Result<(), KeygateError> {
    let provider = KeyringProvider::with_service(&config.keyring_service);

    std::fs::create_dir_all(&config.data_dir)?;

    // Creates the master secret on first run; derivation proves it is usable.
    SealingKeystore::unlock(&provider)?;

    let path = config.db_path();
    Database::open(&path)?;

    println!("✓ keygate initialized successfully");
    println!("  Database: {}", path.display());
    println!("  Master key stored in platform keyring");
    println!();
    if !provider.has_passcode()? {
        println!("Next: enrol a passcode with `keygate passcode set`");
    } else {
        println!("Next: store credentials with `keygate add`");
    }

    Ok(())
}

// ─── Passcode ────────────────────────────────────────────────────────────────

fn cmd_passcode(action: PasscodeAction, config: &Config) -> Result<(), KeygateError> {
    let provider = KeyringProvider::with_service(&config.keyring_service);

    match action {
        PasscodeAction::Set { passcode } => {
            let passcode = match passcode {
                Some(p) => p,
                None => {
                    if std::io::stdin().is_terminal() {
                        eprint!("New passcode (echoed): ");
                    }
                    read_secret_line(std::io::stdin().lock())?
                }
            };
            if passcode.is_empty() {
                return Err(KeygateError::Other("Passcode must not be empty".to_string()));
            }
            provider.enroll_passcode(&passcode)?;
            println!("✓ Passcode enrolled");
        }
        PasscodeAction::Clear => {
            provider.clear_passcode()?;
            println!("✓ Passcode removed");
            println!("  Items that require a passcode are no longer readable");
        }
        PasscodeAction::Status => {
            if provider.has_passcode()? {
                println!("Passcode: set");
            } else {
                println!("Passcode: not set");
            }
        }
    }

    Ok(())
}

/// First line of `input` without its line ending. EOF yields an empty string.
fn read_secret_line(mut input: impl BufRead) -> Result<String, KeygateError> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

// ─── Add / Read / Delete ─────────────────────────────────────────────────────

fn cmd_add(
    config: &Config,
    username: String,
    password: String,
    server: String,
) -> Result<(), KeygateError> {
    if password.is_empty() {
        return Err(KeygateError::Other("Password must not be empty".to_string()));
    }
    let client = CredentialClient::new(open_keychain(config)?);
    let credentials = Credentials::new(username, password);

    let result = client.add_credentials(&credentials, &server);
    report(result, "✓ Credentials added")?;
    println!("  Account: {}", credentials.username);
    println!("  Server:  {}", server);

    Ok(())
}

fn cmd_read(config: &Config, server: String, no_interaction: bool) -> Result<(), KeygateError> {
    let mut client = CredentialClient::new(open_keychain(config)?);
    if no_interaction {
        let context = AuthContext::new().with_prompt(READ_PROMPT).non_interactive();
        client = client.with_shared_context(Arc::new(context));
    }

    let result = client.read_credentials(&server);
    let credentials = report(result, "✓ Credentials read")?;
    println!("  Username: {}", credentials.username);
    println!("  Password: {}", credentials.password());

    Ok(())
}

fn cmd_delete(config: &Config, server: String) -> Result<(), KeygateError> {
    let client = CredentialClient::new(open_keychain(config)?);

    let result = client.delete_credentials(&server);
    report(result, "✓ Credentials deleted")?;
    println!("  Server: {}", server);

    Ok(())
}

// ─── List / Audit ────────────────────────────────────────────────────────────

fn cmd_list(config: &Config) -> Result<(), KeygateError> {
    let client = CredentialClient::new(open_keychain(config)?);
    let summaries = client.list_credentials()?;

    if summaries.is_empty() {
        println!("No credentials stored yet.");
        println!("Add some with: keygate add --username <name> --password <value> --server <host>");
        return Ok(());
    }

    println!("Stored credentials ({}):\n", summaries.len());
    for summary in &summaries {
        println!("  {} │ {}", summary.id, summary);
    }

    Ok(())
}

fn cmd_audit(config: &Config, server: String) -> Result<(), KeygateError> {
    let keychain = open_keychain(config)?;
    let logs = keychain.audit_log(&server)?;

    if logs.is_empty() {
        println!("No audit logs found for server: {}", server);
        return Ok(());
    }

    println!("Audit Log for Server: {}", server);
    println!("{:-<80}", "");
    for log in logs {
        println!("{}", log);
    }
    println!("{:-<80}", "");

    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Print the success line, or hand the store's status back to `main`.
fn report<T>(result: Result<T, KeychainError>, success: &str) -> Result<T, KeygateError> {
    let line = status_text(&result, success);
    match result {
        Ok(value) => {
            println!("{}", line);
            Ok(value)
        }
        Err(e) => {
            tracing::debug!(status = e.code(), "{}", line);
            Err(e.into())
        }
    }
}

/// Assemble the keychain from the platform keyring and the item database.
fn open_keychain(config: &Config) -> Result<ConsoleKeychain, KeygateError> {
    let provider = KeyringProvider::with_service(&config.keyring_service);

    if !provider.has_master_secret()? {
        return Err(EnclaveError::MasterSecretNotFound.into());
    }

    let keystore = SealingKeystore::unlock(&provider)?;

    let path = config.db_path();
    let db = Database::open_existing(&path).map_err(|e| {
        KeygateError::Other(format!("Failed to open database at {}: {}", path.display(), e))
    })?;

    let device = DeviceState {
        passcode_set: provider.has_passcode()?,
        ..DeviceState::default()
    };

    Ok(Keychain::new(db, keystore, ConsoleBroker::stdio(provider), device))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
