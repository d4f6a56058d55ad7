//! `haocai-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP: it defines the principal,
//! policy descriptors and their evaluator, and the collaborators the web
//! layer consumes (token service and issuer, identity loader, credential
//! verifier).

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod login;
pub mod password;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{AuthzError, evaluate};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use identity::{IdentityError, IdentityLoader, InMemoryIdentityLoader, UserRecord, UserStatus};
pub use login::{CredentialVerifier, LoginError};
pub use password::{HashedPassword, PasswordError};
pub use permissions::Permission;
pub use policy::{Logical, OperationId, PolicyDescriptor, PolicyError, PolicyRegistry, PolicyRegistryBuilder};
pub use principal::Principal;
pub use roles::{Role, RoleCatalog};
pub use token::{Hs256TokenService, IssuedToken, TokenError, TokenIssuer, TokenService};
