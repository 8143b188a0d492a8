pub mod token;
pub mod validation;

pub use token::{generate_random_token, generate_temporary_password, hash_token};
pub use validation::ValidatedJson;
