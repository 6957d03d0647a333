pub mod codes;
pub mod password;
pub mod validation;

pub use password::{
    hash_password, verify_password, Password, PasswordHashString, PasswordScheme,
    PasswordVerifier,
};
pub use validation::ValidatedJson;
