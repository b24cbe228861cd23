pub mod admin;
pub mod user;

/// Entities reconciled by email across local and federated sign-up paths.
pub trait EmailKeyed {
    fn email(&self) -> &str;
}
