//! Service layer: the event bus, external collaborators, and the domain
//! services the GraphQL resolvers dispatch into.

pub mod catalog;
pub mod directory;
pub mod events;
pub mod fake_users;
pub mod github;
pub mod storage;

pub use catalog::{NewPhoto, PhotoCatalog};
pub use directory::{AuthOutcome, UserDirectory};
pub use events::EventBus;
pub use fake_users::{ProfileSource, RandomUserClient, SyntheticProfile};
pub use github::{CodeExchange, ExchangedProfile, GithubClient};
pub use storage::PhotoStorage;
