//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for every sensitive configuration
//! value in the gateway: the webhook HMAC secret, the database URL (which
//! carries credentials), and bearer tokens when they have to be held.
//!
//! `SecretString` implements `Debug` with redaction, so a struct that derives
//! `Debug` and holds one is safe to log. The value is zeroized on drop.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct WebhookSettings {
//!     header: String,
//!     secret: SecretString,
//! }
//!
//! let settings = WebhookSettings {
//!     header: "X-Signature".to_string(),
//!     secret: SecretString::from("whsec_123"),
//! };
//!
//! assert!(!format!("{settings:?}").contains("whsec_123"));
//! assert_eq!(settings.secret.expose_secret(), "whsec_123");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
