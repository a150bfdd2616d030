//! Service actions: start, stop, restart, monitor, unmonitor.

use crate::client::Endpoint;
use crate::ops::ui::{print_error, print_success};

/// Path and form for an action on one or several services.
pub fn action_request<'a>(
    action: &'a str,
    names: &'a [String],
    token: Option<&'a str>,
) -> (String, Vec<(&'a str, &'a str)>) {
    let mut form = vec![("action", action)];
    let path = if let [single] = names {
        format!("/{}", urlencoding::encode(single))
    } else {
        form.extend(names.iter().map(|n| ("service", n.as_str())));
        "/_doaction".to_string()
    };
    if let Some(token) = token {
        form.push(("token", token));
    }
    (path, form)
}

pub async fn run_action(
    endpoint: &Endpoint,
    action: &str,
    names: &[String],
    token: Option<&str>,
) -> anyhow::Result<()> {
    if names.is_empty() {
        anyhow::bail!("no service names given");
    }
    let (path, form) = action_request(action, names, token);
    match endpoint.post_form(&path, &form).await {
        Ok(_) => {
            print_success(&format!("{} requested for {}", action, names.join(", ")));
            Ok(())
        }
        Err(e) => {
            print_error(&e.to_string());
            Err(e)
        }
    }
}
