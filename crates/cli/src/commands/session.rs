//! Session commands.

use tradepost_gateway::{Gateway, Roles};

use super::{CliError, print_json};

#[allow(clippy::print_stdout)]
pub async fn login(gateway: &Gateway, login: &str, password: &str) -> Result<(), CliError> {
    let outcome = gateway.auth().login(login, password).await?;
    tracing::info!("Signed in as {login}");
    if let Some(expires_at) = outcome.expires_at {
        println!("Session expires at {expires_at}");
    }
    whoami(gateway).await
}

#[allow(clippy::print_stdout)]
pub async fn logout(gateway: &Gateway, forget_orders: bool) -> Result<(), CliError> {
    gateway.auth().logout()?;
    if forget_orders {
        gateway.orders().index().clear().await?;
        tracing::info!("Order history cleared");
    }
    println!("Signed out");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn whoami(gateway: &Gateway) -> Result<(), CliError> {
    let snapshot = gateway.session().refresh().await;
    let Some(user) = snapshot.user else {
        println!("Not signed in");
        return Ok(());
    };

    let field = |value: Option<&str>| value.unwrap_or("-").to_string();
    let id = user.id.map_or_else(|| "-".to_string(), |id| id.to_string());
    println!("id:       {id}");
    println!("username: {}", field(user.username.as_deref()));
    println!("email:    {}", field(user.email.as_deref()));
    match user.roles {
        Some(Roles::List(roles)) => println!("roles:    {}", roles.join(", ")),
        Some(Roles::Single(role)) => println!("roles:    {role}"),
        None => println!("roles:    -"),
    }
    Ok(())
}

pub async fn sign_up(
    gateway: &Gateway,
    email: &str,
    username: &str,
    password: &str,
) -> Result<(), CliError> {
    let account = gateway.auth().sign_up(email, username, password).await?;
    tracing::info!("Account {} created", account.id);
    print_json(&account)
}
