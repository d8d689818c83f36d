//! Read-only lookups: `devhub_user` and `devhub_role`.
//!
//! Nothing is tracked for a lookup, so a missing object is an error rather
//! than something to drop.

use anyhow::{Context, Result, bail};
use devhub_client::{Client, Role, User, UserLookup};

pub const USER_TYPE_NAME: &str = "devhub_user";
pub const ROLE_TYPE_NAME: &str = "devhub_role";

/// Look up a user by email or name. The name wins when both are given.
pub fn user(client: &Client, email: Option<String>, name: Option<String>) -> Result<User> {
    let Some(lookup) = UserLookup::from_parts(email, name) else {
        bail!("{USER_TYPE_NAME}: one of email or name must be set");
    };

    let user = client.get_user(&lookup).with_context(|| {
        format!(
            "{USER_TYPE_NAME}: no user with {} {:?}",
            lookup.field(),
            lookup.value()
        )
    })?;
    log::info!("{USER_TYPE_NAME}: found {}", user.id);
    Ok(user)
}

pub fn role(client: &Client, name: &str) -> Result<Role> {
    if name.is_empty() {
        bail!("{ROLE_TYPE_NAME}: name must not be empty");
    }

    let role = client
        .get_role(name)
        .with_context(|| format!("{ROLE_TYPE_NAME}: no role named {name:?}"))?;
    log::info!("{ROLE_TYPE_NAME}: found {}", role.id);
    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devhub_client::MockTransport;
    use devhub_client::transport::Method;
    use serde_json::json;

    fn mock_client() -> (MockTransport, Client) {
        let mock = MockTransport::new();
        mock.insert(
            "users",
            json!({ "id": "u-1", "name": "Ada", "email": "ada@example.com" }),
        );
        mock.insert(
            "users",
            json!({ "id": "u-2", "name": "Grace", "email": "grace@example.com" }),
        );
        mock.insert(
            "roles",
            json!({ "id": "r-1", "name": "Admin", "description": "Everything", "managed": true }),
        );
        let client = Client::with_transport(Box::new(mock.clone()));
        (mock, client)
    }

    #[test]
    fn test_user_by_email() {
        let (_mock, client) = mock_client();
        let found = user(&client, Some("grace@example.com".to_string()), None).unwrap();
        assert_eq!(found.id, "u-2");
        assert_eq!(found.name, "Grace");
    }

    #[test]
    fn test_user_name_wins_over_email() {
        let (mock, client) = mock_client();
        let found = user(
            &client,
            Some("grace@example.com".to_string()),
            Some("Ada".to_string()),
        )
        .unwrap();
        assert_eq!(found.id, "u-1");
        assert_eq!(mock.calls()[0].path, "users/lookup?name=Ada");
    }

    #[test]
    fn test_user_requires_a_key() {
        let (mock, client) = mock_client();
        assert!(user(&client, None, None).is_err());
        assert!(user(&client, Some(String::new()), None).is_err());
        assert_eq!(mock.count(Method::Get), 0);
    }

    #[test]
    fn test_user_not_found_is_an_error() {
        let (_mock, client) = mock_client();
        let err = user(&client, Some("nobody@example.com".to_string()), None).unwrap_err();
        assert!(err.to_string().contains("nobody@example.com"));
    }

    #[test]
    fn test_role() {
        let (_mock, client) = mock_client();
        let found = role(&client, "Admin").unwrap();
        assert_eq!(found.id, "r-1");
        assert!(found.managed);

        assert!(role(&client, "Viewer").is_err());
        assert!(role(&client, "").is_err());
    }
}
