use std::str::FromStr;

use chrono::Utc;
use http::Method;
use orderdesk_application::{NavigationDecision, OutboundRequest, SignInRequest};
use orderdesk_core::{AppError, AppResult};
use orderdesk_domain::{
    Actor, RoleSelection, Session, SubscriptionLifecycle, SubscriptionStatus,
};
use serde_json::Value;

use crate::client_services::ClientServices;

pub async fn sign_in(services: &ClientServices, email: String, password: String) -> AppResult<()> {
    let session = services
        .sessions
        .sign_in(SignInRequest {
            email,
            password,
            platform: services.platform.clone(),
        })
        .await?;

    println!(
        "Signed in as {} (workspace {})",
        session.identity().display_name(),
        session.tenant_id()
    );

    if !services.device_state.pwa_prompt_shown().await? {
        println!("Tip: run `orderdesk whoami` to see which panels this device can open.");
        services.device_state.mark_pwa_prompt_shown().await?;
    }

    Ok(())
}

pub async fn sign_out(services: &ClientServices) -> AppResult<()> {
    services.sessions.sign_out().await?;
    services.workspace.lock_panels().await;
    println!("Signed out.");
    Ok(())
}

pub async fn whoami(services: &ClientServices) -> AppResult<()> {
    let session = initialized_session(services).await?;
    let lifecycle = services.workspace.lifecycle_at(Utc::now()).await;
    let actor = services.workspace.current_actor().await;
    let panels = services.workspace.accessible_panels().await;

    println!("User:         {}", session.identity().display_name());
    if let Some(email) = session.identity().email() {
        println!("Email:        {email}");
    }
    println!("Workspace:    {}", session.tenant_id());
    println!("Acting as:    {}", describe_actor(&actor));
    println!("Subscription: {}", describe_lifecycle(&lifecycle));
    println!(
        "Panels:       {}",
        panels
            .iter()
            .map(|panel| panel.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

pub async fn request(
    services: &ClientServices,
    method: &str,
    target: String,
    body: Option<String>,
    anonymous: bool,
) -> AppResult<()> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|error| AppError::Validation(format!("invalid HTTP method '{method}': {error}")))?;

    let mut outbound = OutboundRequest::new(method, target);
    if let Some(body) = body {
        let body = serde_json::from_str::<Value>(body.as_str())
            .map_err(|error| AppError::Validation(format!("request body is not JSON: {error}")))?;
        outbound = outbound.with_body(body);
    }
    if anonymous {
        outbound = outbound.without_credential();
    }

    let response = services.coordinator.send(outbound).await?;
    println!("{}", response.status);
    if let Some(body) = response.body {
        let rendered = serde_json::to_string_pretty(&body)
            .map_err(|error| AppError::Internal(format!("failed to render body: {error}")))?;
        println!("{rendered}");
    }

    Ok(())
}

pub async fn navigate(
    services: &ClientServices,
    path: &str,
    password: Option<String>,
) -> AppResult<()> {
    initialized_session(services).await?;
    let mut decision = services.workspace.navigate_at(path, true, Utc::now()).await;

    if let (NavigationDecision::ChallengePassword(panel), Some(password)) = (&decision, password) {
        services
            .sessions
            .confirm_password(password.as_str(), services.platform.as_str())
            .await?;
        services.workspace.unlock_panel(*panel).await;
        decision = services.workspace.navigate_at(path, true, Utc::now()).await;
    }

    println!("{}", describe_navigation(&decision));
    Ok(())
}

pub async fn select_role(
    services: &ClientServices,
    selection: &str,
    password: Option<String>,
) -> AppResult<()> {
    let selection = RoleSelection::from_str(selection)?;
    initialized_session(services).await?;

    let password_confirmed = match password {
        Some(password) => {
            services
                .sessions
                .confirm_password(password.as_str(), services.platform.as_str())
                .await?;
            true
        }
        None => false,
    };

    let actor = services
        .workspace
        .select_role(selection, password_confirmed)
        .await?;
    println!("Now acting as {}.", describe_actor(&actor));
    Ok(())
}

async fn initialized_session(services: &ClientServices) -> AppResult<Session> {
    let session = services.sessions.current_session().await.ok_or_else(|| {
        AppError::Unauthorized("not signed in; run `orderdesk sign-in` first".to_owned())
    })?;

    services.workspace.initialize(session.tenant_id()).await?;

    // Initialization may have renewed the credential.
    Ok(services
        .sessions
        .current_session()
        .await
        .unwrap_or(session))
}

fn describe_actor(actor: &Actor) -> String {
    match actor {
        Actor::Owner => "owner".to_owned(),
        Actor::Role(role) => format!("{} ({})", role.name, role.id),
        Actor::Unselected => "no role selected".to_owned(),
    }
}

fn describe_lifecycle(lifecycle: &SubscriptionLifecycle) -> String {
    let state = match lifecycle.status {
        None => "none",
        Some(_) if lifecycle.is_blocked => "blocked",
        Some(_) if lifecycle.in_grace_period => "grace period",
        Some(status) if lifecycle.is_trial || lifecycle.is_active => status.as_str(),
        Some(status) => match status {
            SubscriptionStatus::Paused => "paused, access denied",
            SubscriptionStatus::Expired => "expired, access denied",
            _ => "inactive, access denied",
        },
    };

    let mut description = match lifecycle.days_remaining {
        Some(days) => format!("{state}, {days} days remaining"),
        None => state.to_owned(),
    };
    if lifecycle.show_warning {
        description.push_str(" (attention needed)");
    }

    description
}

fn describe_navigation(decision: &NavigationDecision) -> String {
    match decision {
        NavigationDecision::Loading => "loading".to_owned(),
        NavigationDecision::Allow => "allow".to_owned(),
        NavigationDecision::Redirect(target) => format!("redirect {target}"),
        NavigationDecision::Hide => "hide".to_owned(),
        NavigationDecision::Disable => "disable".to_owned(),
        NavigationDecision::ChallengePassword(panel) => {
            format!("password required for {}", panel.as_str())
        }
    }
}
