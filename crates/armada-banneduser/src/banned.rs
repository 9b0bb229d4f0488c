//! BannedUser construction and lookup

use std::collections::BTreeMap;

use async_trait::async_trait;
use kube::api::{ListParams, ObjectMeta};
use kube::{Api, Client, ResourceExt};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use armada_common::crd::{BannedUser, BannedUserSpec, UserSignup};
use armada_common::kube_utils::label_selector;
use armada_common::{BANNED_BY_LABEL, EMAIL_HASH_LABEL, PHONE_HASH_LABEL};

use crate::{BannedUserError, Result};

/// Lists BannedUser resources
///
/// `labels` is an exact-match filter and the listing is scoped to `namespace`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BannedUserLister: Send + Sync {
    /// BannedUsers in `namespace` carrying every label in `labels`
    async fn list(
        &self,
        labels: &BTreeMap<String, String>,
        namespace: &str,
    ) -> Result<Vec<BannedUser>>;
}

/// Lister backed by the Kubernetes API
pub struct KubeBannedUserLister {
    client: Client,
}

impl KubeBannedUserLister {
    /// Create a lister using `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BannedUserLister for KubeBannedUserLister {
    async fn list(
        &self,
        labels: &BTreeMap<String, String>,
        namespace: &str,
    ) -> Result<Vec<BannedUser>> {
        let api: Api<BannedUser> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&label_selector(labels));
        Ok(api.list(&params).await?.items)
    }
}

/// Build the BannedUser for `signup`, recording `banned_by`
///
/// The signup must carry the email-hash label; the phone-hash label is
/// copied when present.
pub fn new_banned_user(signup: &UserSignup, banned_by: &str) -> Result<BannedUser> {
    let email_hash = signup
        .labels()
        .get(EMAIL_HASH_LABEL)
        .ok_or_else(|| BannedUserError::MissingLabel {
            signup: signup.name_any(),
            label: EMAIL_HASH_LABEL.to_string(),
        })?;

    let mut labels = BTreeMap::from([
        (EMAIL_HASH_LABEL.to_string(), email_hash.clone()),
        (BANNED_BY_LABEL.to_string(), banned_by.to_string()),
    ]);
    if let Some(phone_hash) = signup.labels().get(PHONE_HASH_LABEL) {
        labels.insert(PHONE_HASH_LABEL.to_string(), phone_hash.clone());
    }

    Ok(BannedUser {
        metadata: ObjectMeta {
            name: Some(format!("banneduser-{email_hash}")),
            namespace: signup.namespace(),
            labels: Some(labels),
            ..Default::default()
        },
        spec: BannedUserSpec {
            email: signup.spec.identity_claims.email.clone(),
        },
    })
}

/// Whether a BannedUser with the same email hash already exists in `namespace`
///
/// List errors are returned unchanged.
pub async fn is_already_banned<L>(
    lister: &L,
    banned_user: &BannedUser,
    namespace: &str,
) -> Result<bool>
where
    L: BannedUserLister + ?Sized,
{
    let email_hash = banned_user
        .labels()
        .get(EMAIL_HASH_LABEL)
        .cloned()
        .unwrap_or_default();
    let labels = BTreeMap::from([(EMAIL_HASH_LABEL.to_string(), email_hash)]);

    let existing = lister.list(&labels, namespace).await?;
    debug!(
        banned_user = %banned_user.name_any(),
        namespace,
        matches = existing.len(),
        "Checked for existing BannedUser"
    );
    Ok(!existing.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use armada_common::crd::{IdentityClaims, UserSignupSpec};

    const HOST_NAMESPACE: &str = "armada-host-operator";

    fn signup(labels: &[(&str, &str)]) -> UserSignup {
        let mut signup = UserSignup::new(
            "johnny",
            UserSignupSpec {
                identity_claims: IdentityClaims {
                    email: "johnny@example.com".to_string(),
                    ..Default::default()
                },
            },
        );
        signup.metadata.namespace = Some(HOST_NAMESPACE.to_string());
        for (k, v) in labels {
            signup.labels_mut().insert(k.to_string(), v.to_string());
        }
        signup
    }

    mod new_banned_user {
        use super::*;

        #[test]
        fn test_without_phone_hash() {
            let banned =
                new_banned_user(&signup(&[(EMAIL_HASH_LABEL, "a7b1b413c1cbddbcd19a51222ef8e20a")]), "mr-bob")
                    .unwrap();

            assert_eq!(banned.name_any(), "banneduser-a7b1b413c1cbddbcd19a51222ef8e20a");
            assert_eq!(banned.namespace().as_deref(), Some(HOST_NAMESPACE));
            assert_eq!(banned.spec.email, "johnny@example.com");
            assert_eq!(banned.labels().len(), 2);
            assert_eq!(banned.labels()[BANNED_BY_LABEL], "mr-bob");
            assert!(!banned.labels().contains_key(PHONE_HASH_LABEL));
        }

        #[test]
        fn test_with_phone_hash() {
            let banned = new_banned_user(
                &signup(&[(EMAIL_HASH_LABEL, "abc"), (PHONE_HASH_LABEL, "fd276563a8232d16620da8ec85d0575f")]),
                "mr-bob",
            )
            .unwrap();

            assert_eq!(banned.labels().len(), 3);
            assert_eq!(banned.labels()[EMAIL_HASH_LABEL], "abc");
            assert_eq!(
                banned.labels()[PHONE_HASH_LABEL],
                "fd276563a8232d16620da8ec85d0575f"
            );
        }

        #[test]
        fn test_missing_email_hash_label() {
            let err = new_banned_user(&signup(&[(PHONE_HASH_LABEL, "123")]), "mr-bob").unwrap_err();

            assert!(matches!(err, BannedUserError::MissingLabel { .. }));
            assert_eq!(
                err.to_string(),
                format!("the UserSignup johnny doesn't have the label '{EMAIL_HASH_LABEL}' set")
            );
        }
    }

    mod is_already_banned {
        use super::*;

        fn banned(email_hash: &str) -> BannedUser {
            new_banned_user(&signup(&[(EMAIL_HASH_LABEL, email_hash)]), "mr-bob").unwrap()
        }

        #[tokio::test]
        async fn test_not_banned() {
            let mut lister = MockBannedUserLister::new();
            lister
                .expect_list()
                .withf(|labels, namespace| {
                    labels.len() == 1
                        && labels.get(EMAIL_HASH_LABEL).map(String::as_str) == Some("abc")
                        && namespace.to_string() == HOST_NAMESPACE
                })
                .times(1)
                .returning(|_, _| Ok(vec![]));

            let result = is_already_banned(&lister, &banned("abc"), HOST_NAMESPACE)
                .await
                .unwrap();
            assert!(!result);
        }

        #[tokio::test]
        async fn test_already_banned() {
            let existing = banned("abc");
            let mut lister = MockBannedUserLister::new();
            lister
                .expect_list()
                .returning(move |_, _| Ok(vec![existing.clone()]));

            let result = is_already_banned(&lister, &banned("abc"), HOST_NAMESPACE)
                .await
                .unwrap();
            assert!(result);
        }

        #[tokio::test]
        async fn test_list_error_is_propagated() {
            let mut lister = MockBannedUserLister::new();
            lister.expect_list().returning(|_, _| {
                Err(BannedUserError::List(armada_common::Error::internal_with_context(
                    "list",
                    "mock List error",
                )))
            });

            let err = is_already_banned(&lister, &banned("abc"), HOST_NAMESPACE)
                .await
                .unwrap_err();
            assert!(err.to_string().contains("mock List error"));
        }

        #[tokio::test]
        async fn test_works_through_trait_object() {
            let mut lister = MockBannedUserLister::new();
            lister.expect_list().returning(|_, _| Ok(vec![]));
            let lister: Box<dyn BannedUserLister> = Box::new(lister);

            assert!(!is_already_banned(lister.as_ref(), &banned("abc"), HOST_NAMESPACE)
                .await
                .unwrap());
        }
    }
}
