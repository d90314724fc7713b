//! Session tokens: claims, codec and the issuing authority.

pub mod authority;
pub mod claims;
pub mod codec;
pub mod token;

pub use authority::{TokenAuthority, TokenPolicy};
pub use claims::ClaimSet;
pub use codec::{ClaimsCodec, SUPPORTED_ALGORITHM};
pub use token::{ClaimRequirements, SignatureVerified, Token, TokenState, Unverified, Validated};
