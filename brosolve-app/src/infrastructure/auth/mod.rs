mod token_verifier;

pub use token_verifier::{bearer_token, Claims, TokenVerifier};
