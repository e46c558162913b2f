pub mod followup;
pub mod interaction;
pub mod response;
