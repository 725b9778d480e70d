use serde::Serialize;
use serde_json::Value;

use super::password::{PasswordDigest, PasswordHasher};
use crate::validation::Record;

pub const DEFAULT_IMAGE_URL: &str = "https://cdn.filestackcontent.com/default-image.png";
pub const DEFAULT_BIO: &str = "This user prefers to keep an air of mystery about them.";

/// User record as held by the store.
///
/// `Serialize` is derived on purpose: the credential field refuses to
/// serialize, so handing a `User` to a generic serializer fails instead of
/// emitting the hash. Outbound data goes through `UserSchema` instead.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    id: i64,
    username: String,
    #[serde(rename = "password_hash")]
    credential: PasswordDigest,
    image_url: String,
    bio: String,
}

impl User {
    pub(crate) fn from_parts(id: i64, new: NewUser) -> Self {
        Self {
            id,
            username: new.username,
            credential: new.credential,
            image_url: new.image_url,
            bio: new.bio,
        }
    }

    pub(crate) fn from_stored(
        id: i64,
        username: String,
        password_hash: String,
        image_url: String,
        bio: String,
    ) -> Self {
        Self {
            id,
            username,
            credential: PasswordDigest::from_stored(password_hash),
            image_url,
            bio,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn bio(&self) -> &str {
        &self.bio
    }

    /// Replace the credential with a fresh hash of `plain`. No length policy
    /// is applied here.
    pub fn set_password(&mut self, hasher: &PasswordHasher, plain: &str) -> anyhow::Result<()> {
        self.credential = hasher.hash(plain)?;
        Ok(())
    }

    pub fn authenticate(&self, plain: &str) -> bool {
        self.credential.verify(plain)
    }

    pub(crate) fn credential(&self) -> &PasswordDigest {
        &self.credential
    }

    pub(crate) fn set_username(&mut self, username: String) {
        self.username = username;
    }

    pub(crate) fn set_image_url(&mut self, image_url: String) {
        self.image_url = image_url;
    }

    pub(crate) fn set_bio(&mut self, bio: String) {
        self.bio = bio;
    }

    /// Every outbound-eligible column plus the given `recipes` records.
    pub(crate) fn to_record(&self, recipes: Vec<Value>) -> Record {
        let mut record = Record::new();
        record.insert("id".into(), self.id.into());
        record.insert("username".into(), self.username.clone().into());
        record.insert("image_url".into(), self.image_url.clone().into());
        record.insert("bio".into(), self.bio.clone().into());
        record.insert("recipes".into(), Value::Array(recipes));
        record
    }
}

/// A user that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub(crate) username: String,
    pub(crate) credential: PasswordDigest,
    pub(crate) image_url: String,
    pub(crate) bio: String,
}

impl NewUser {
    /// Direct construction: hashes whatever it is given and fills in the
    /// placeholder image and bio.
    pub fn new(
        hasher: &PasswordHasher,
        username: impl Into<String>,
        plain_password: &str,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            username: username.into(),
            credential: hasher.hash(plain_password)?,
            image_url: DEFAULT_IMAGE_URL.to_string(),
            bio: DEFAULT_BIO.to_string(),
        })
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn authenticate(&self, plain: &str) -> bool {
        self.credential.verify(plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::password::{cheap_hasher, HASH_NOT_VIEWABLE};

    fn user() -> User {
        let new = NewUser::new(&cheap_hasher(), "julia", "bon-appetit").unwrap();
        User::from_parts(7, new)
    }

    #[test]
    fn new_user_fills_placeholders() {
        let u = user();
        assert_eq!(u.id(), 7);
        assert_eq!(u.image_url(), DEFAULT_IMAGE_URL);
        assert_eq!(u.bio(), DEFAULT_BIO);
    }

    #[test]
    fn authenticate_checks_the_set_password() {
        let mut u = user();
        assert!(u.authenticate("bon-appetit"));
        assert!(!u.authenticate("bon-appetit!"));

        u.set_password(&cheap_hasher(), "new-secret").unwrap();
        assert!(u.authenticate("new-secret"));
        assert!(!u.authenticate("bon-appetit"));
    }

    #[test]
    fn entity_layer_accepts_short_and_empty_passwords() {
        let new = NewUser::new(&cheap_hasher(), "ab", "").unwrap();
        assert!(new.authenticate(""));
    }

    #[test]
    fn generic_serialization_of_a_user_fails() {
        let err = serde_json::to_value(user()).unwrap_err();
        assert!(err.to_string().contains(HASH_NOT_VIEWABLE));
    }

    #[test]
    fn debug_output_hides_the_hash() {
        let u = user();
        let out = format!("{u:?}");
        assert!(out.contains("julia"));
        assert!(!out.contains("$argon2"));
    }

    #[test]
    fn record_has_no_credential() {
        let record = user().to_record(vec![]);
        assert!(!record.contains_key("password_hash"));
        assert!(!record.contains_key("password"));
        assert_eq!(record["recipes"], serde_json::json!([]));
    }
}
