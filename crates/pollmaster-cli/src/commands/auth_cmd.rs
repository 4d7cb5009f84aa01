use pollmaster_core::auth::SignUpRequest;
use pollmaster_core::{SessionState, SignUpOutcome};

use crate::cli::AuthCommands;
use crate::commands::common::{open_session, CliPaths};
use crate::error::CliError;

pub async fn run_auth(
    command: AuthCommands,
    paths: &CliPaths,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let (resolved, session) = open_session(paths, global_profile).await?;
    let profile_name = resolved.name;

    match command {
        AuthCommands::Login { email, password } => {
            let user = session.sign_in(&email, &password).await?;
            println!(
                "Signed in profile '{profile_name}' as {} ({})",
                user.email, user.role
            );
        }
        AuthCommands::Signup {
            name,
            email,
            password,
            admin_key,
        } => {
            let mut request = SignUpRequest::user(name, email, password);
            if let Some(key) = admin_key {
                request = request.as_admin(key);
            }
            match session.sign_up(&request).await? {
                SignUpOutcome::SignedIn(user) => {
                    println!("Registered and signed in as {} ({})", user.email, user.role);
                }
                SignUpOutcome::VerificationRequired { email } => {
                    println!(
                        "Registered {email}. Enter the 6-digit code with `pollmaster auth verify --code <CODE>`."
                    );
                }
                SignUpOutcome::ConfirmationRequired => {
                    println!("Registered. Confirm your email, then sign in.");
                }
            }
        }
        AuthCommands::Verify { code } => {
            let user = session.verify_otp(&code).await?;
            println!("Verified {}; profile '{profile_name}' is signed in", user.email);
        }
        AuthCommands::Status => match (session.state(), session.user()) {
            (SessionState::Authenticated, Some(user)) => {
                let verified = if user.verified { "verified" } else { "unverified" };
                println!(
                    "Profile '{profile_name}' is signed in as {} ({}, {verified})",
                    user.email, user.role
                );
            }
            (SessionState::PendingVerification, _) => {
                println!(
                    "Profile '{profile_name}' is waiting for verification. Run `pollmaster auth verify --code <CODE>`."
                );
            }
            _ => {
                if let Some(user) = session.cached_user()? {
                    println!(
                        "Profile '{profile_name}' has a stored session for {} (not validated)",
                        user.email
                    );
                } else {
                    println!("Profile '{profile_name}' is not signed in.");
                }
            }
        },
        AuthCommands::Logout => {
            session.sign_out()?;
            println!("Signed out profile '{profile_name}'");
        }
        AuthCommands::ForgotPassword { email } => {
            let message = session.forgot_password(&email).await?;
            println!("{message}");
        }
        AuthCommands::ResetPassword { token, password } => {
            session.reset_password(&token, &password).await?;
            println!("Password updated. Sign in with the new password.");
        }
    }

    session.teardown();
    Ok(())
}
