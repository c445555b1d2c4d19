//! JWT decode, signature verification, claims validation, and encode (C3-C5).

mod claims;
mod codec;
mod header;
mod verify;

pub use claims::{ClaimsValidator, ValidationOptions};
pub use codec::{decode, encode, EncodedJwt};
pub use header::Header;
pub use verify::verify_signature;
