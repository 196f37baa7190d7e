#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("credential lookup failed for user {user}: {message}")]
    CredentialLookup { user: String, message: String },
}
