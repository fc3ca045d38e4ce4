//! Auth domain - verifies bearer JWTs issued by the external identity provider
//!
//! Login, registration and sessions live outside this service. Write
//! endpoints only need to know that a token was signed with the shared
//! secret and issuer.

pub mod jwt;

pub use jwt::{Claims, JwtService};
