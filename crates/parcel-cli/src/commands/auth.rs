//! Authentication commands.

use super::build_coordinator;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use client_core::Config;
use client_storage::UserRole;
use session_engine::{AuthState, RegisterRequest};
use std::io::{self, Write};

/// Login with email and password.
pub async fn login(config: &Config, format: &OutputFormat) -> Result<()> {
    let coordinator = build_coordinator(config)?;

    // An existing session survives a reload; don't ask again.
    if let AuthState::Authenticated(user) = coordinator.bootstrap().await {
        output::print_success(&format!("Already logged in as {}", user.email), format);
        return Ok(());
    }

    let email = prompt("Email: ")?;
    if email.is_empty() {
        output::print_error("Email is required", format);
        return Ok(());
    }

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        output::print_error("Password is required", format);
        return Ok(());
    }

    println!("Logging in...");

    match coordinator.login(&email, &password).await {
        Ok(user) => {
            output::print_success(&format!("Logged in as {}", user.email), format);
        }
        Err(e) => {
            output::print_error(&format!("Login failed: {}", e), format);
        }
    }

    Ok(())
}

/// Logout and clear the session.
pub async fn logout(config: &Config, format: &OutputFormat) -> Result<()> {
    let coordinator = build_coordinator(config)?;

    if coordinator.bootstrap().await == AuthState::Anonymous {
        output::print_success("Not logged in", format);
        return Ok(());
    }

    coordinator.logout().await;
    output::print_success("Logged out successfully", format);
    Ok(())
}

/// Check authentication status.
pub async fn status(config: &Config, format: &OutputFormat) -> Result<()> {
    let coordinator = build_coordinator(config)?;
    let state = coordinator.bootstrap().await;

    match format {
        OutputFormat::Text => {
            output::print_heading("Session");
            output::print_row("State", state.label());
            if let Some(user) = state.profile() {
                output::print_row("Name", &user.name);
                output::print_row("Email", &user.email);
                output::print_row("Role", user.role.as_str());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}

/// Register a new account.
pub async fn register(config: &Config, format: &OutputFormat) -> Result<()> {
    let coordinator = build_coordinator(config)?;

    let name = prompt("Name: ")?;
    let email = prompt("Email: ")?;
    let phone = prompt("Phone: ")?;
    let address = prompt("Address: ")?;
    let role = prompt("Role (sender/receiver): ")?;
    let role = match parse_role(&role) {
        Some(role) => role,
        None => {
            output::print_error("Role must be 'sender' or 'receiver'", format);
            return Ok(());
        }
    };

    if name.is_empty() || email.is_empty() {
        output::print_error("Name and email are required", format);
        return Ok(());
    }

    let password = rpassword::prompt_password("Password: ")?;
    let confirmation = rpassword::prompt_password("Confirm password: ")?;
    if password != confirmation {
        output::print_error("Passwords do not match", format);
        return Ok(());
    }

    let request = RegisterRequest {
        name,
        email,
        password,
        phone,
        role,
        address,
    };

    match coordinator.register(&request).await {
        Ok(()) => {
            output::print_success(
                "Account created. Run 'parcel login' to sign in.",
                format,
            );
        }
        Err(e) => {
            output::print_error(&format!("Registration failed: {}", e), format);
        }
    }

    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

// Admin accounts are provisioned server-side, not via self-signup.
fn parse_role(value: &str) -> Option<UserRole> {
    match value.to_lowercase().as_str() {
        "sender" => Some(UserRole::Sender),
        "receiver" => Some(UserRole::Receiver),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_accepts_signup_roles() {
        assert_eq!(parse_role("sender"), Some(UserRole::Sender));
        assert_eq!(parse_role("Receiver"), Some(UserRole::Receiver));
    }

    #[test]
    fn test_parse_role_rejects_admin_and_garbage() {
        assert_eq!(parse_role("admin"), None);
        assert_eq!(parse_role("courier"), None);
        assert_eq!(parse_role(""), None);
    }
}
