/*
[INPUT]:  EIP-712 wire schema and address conventions
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - shared types for issuer, verifier and wallet session
[UPDATE]: When the envelope wire shape or address rules change
*/

pub mod address;
pub mod envelope;
pub mod typed_data;

pub use address::{addresses_match, is_valid_address, normalize_address};
pub use envelope::{AuthEnvelope, AuthMessage, AuthTypes, Domain, TypeField};
pub use typed_data::TypedPayload;
